use anyhow::{Result, bail};
use tracing::info;

use crate::cli::ProfileArgs;
use crate::profile::FormProfile;
use crate::util::write_json_pretty;

pub fn run(args: ProfileArgs) -> Result<()> {
    if args.output.exists() && !args.force {
        bail!(
            "refusing to overwrite existing profile {} (pass --force)",
            args.output.display()
        );
    }

    let profile = FormProfile::default();
    write_json_pretty(&args.output, &profile)?;
    info!(
        path = %args.output.display(),
        marker = %profile.marker,
        keywords = profile.identity_keywords.len(),
        boilerplate = profile.boilerplate.len(),
        "wrote default form profile"
    );

    Ok(())
}
