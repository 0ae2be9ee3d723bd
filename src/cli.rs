use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use crate::profile::FormProfile;

#[derive(Parser, Debug)]
#[command(
    name = "formsplit",
    version,
    about = "Segment survey-form PDFs into records, stamp QR labels or split them into named files"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Annotate(AnnotateArgs),
    Split(SplitArgs),
    Scan(ScanArgs),
    Profile(ProfileArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ProfileOverrides {
    #[arg(long)]
    pub profile: Option<PathBuf>,

    #[arg(long)]
    pub marker: Option<String>,

    #[arg(long)]
    pub max_filename_length: Option<usize>,

    #[arg(long)]
    pub qr_x: Option<f32>,

    #[arg(long)]
    pub qr_y: Option<f32>,

    #[arg(long)]
    pub qr_size: Option<f32>,
}

impl ProfileOverrides {
    pub fn resolve(&self) -> Result<FormProfile> {
        let mut profile = FormProfile::load_or_default(self.profile.as_deref())?;

        if let Some(marker) = &self.marker {
            profile.marker = marker.clone();
        }
        if let Some(max_length) = self.max_filename_length {
            profile.max_filename_length = max_length;
        }
        if let Some(x) = self.qr_x {
            profile.qr.x = x;
        }
        if let Some(y) = self.qr_y {
            profile.qr.y = y;
        }
        if let Some(size) = self.qr_size {
            profile.qr.size = size;
        }

        profile.validate()?;
        Ok(profile)
    }
}

#[derive(Args, Debug, Clone)]
pub struct AnnotateArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub output: Option<PathBuf>,

    #[arg(long)]
    pub report_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    #[command(flatten)]
    pub overrides: ProfileOverrides,
}

#[derive(Args, Debug, Clone)]
pub struct SplitArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub output_dir: PathBuf,

    #[arg(long)]
    pub report_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    #[command(flatten)]
    pub overrides: ProfileOverrides,
}

#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub json: bool,

    #[command(flatten)]
    pub overrides: ProfileOverrides,
}

#[derive(Args, Debug, Clone)]
pub struct ProfileArgs {
    #[arg(long)]
    pub output: PathBuf,

    #[arg(long, default_value_t = false)]
    pub force: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_args_parse_with_overrides() {
        let cli = Cli::try_parse_from([
            "formsplit",
            "split",
            "--input",
            "forms.pdf",
            "--output-dir",
            "out",
            "--marker",
            "CATATAN",
            "--max-filename-length",
            "40",
        ])
        .unwrap();

        let Commands::Split(args) = cli.command else {
            panic!("expected split command");
        };
        assert_eq!(args.output_dir, PathBuf::from("out"));
        assert!(!args.dry_run);

        let profile = args.overrides.resolve().unwrap();
        assert_eq!(profile.marker, "CATATAN");
        assert_eq!(profile.max_filename_length, 40);
    }

    #[test]
    fn overrides_reject_invalid_values() {
        let overrides = ProfileOverrides {
            qr_size: Some(-5.0),
            ..ProfileOverrides::default()
        };
        assert!(overrides.resolve().is_err());
    }

    #[test]
    fn annotate_geometry_overrides_apply() {
        let cli = Cli::try_parse_from([
            "formsplit",
            "annotate",
            "--input",
            "forms.pdf",
            "--qr-x",
            "700",
            "--qr-size",
            "120",
        ])
        .unwrap();

        let Commands::Annotate(args) = cli.command else {
            panic!("expected annotate command");
        };
        let profile = args.overrides.resolve().unwrap();
        assert_eq!(profile.qr.x, 700.0);
        assert_eq!(profile.qr.y, 50.0);
        assert_eq!(profile.qr.size, 120.0);
    }
}
