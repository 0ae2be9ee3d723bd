use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::model::QrGeometry;
use crate::pipeline::normalize::collapse_whitespace;

pub const DEFAULT_MARKER: &str = "BLOK IV. CATATAN";
pub const DEFAULT_LABEL_SENTINEL: &str = "no_data";
pub const DEFAULT_FILENAME_SENTINEL: &str = "document";
pub const DEFAULT_MAX_FILENAME_LENGTH: usize = 100;

const DEFAULT_IDENTITY_KEYWORDS: &[&str] = &[
    "Identitas Blok Sensus",
    "Identitas SLS",
    "IDENTITAS SAMPEL SATUAN LINGKUNGAN SETEMPAT",
    "IDENTITAS SAMPEL BLOK SENSUS",
    "Identitas",
];

const DEFAULT_BOILERPLATE: &[&str] = &[
    "SERUTI24.DSRT",
    "DAFTAR SAMPEL RUMAH TANGGA",
    "RAHASIA",
    "BLOK I. IDENTITAS SAMPEL BLOK SENSUS",
    "1. Provinsi",
    "2. Kabupaten/Kota",
    "3. Kecamatan",
    "4. Desa/Kelurahan",
    "5. Klasifikasi Desa/Kelurahan",
    "7. Nomor Kode Sampel (NKS)Perkotaan",
    "BLOK II. KETERANGAN PETUGAS",
    "Nama Pencacah",
    "Pedesaan",
    "Perkotaan",
    "Nomor Blok Sensus",
    "Tgl. Pelaksanaan",
    "Tanda Tangan",
    "Nama Pengawas",
    "BLOK III. CATATAN",
    "SURVEI EKONOMI RUMAH TANGGA TRIWULANAN 2024",
    "Triwulan 2",
    "BLOK I. IDENTITAS SAMPEL SATUAN LINGKUNGAN SETEMPAT",
    "6. Kode SLS/Sub-SLS",
    "8. Satuan Lingkungan Setempat (SLS)",
    "BLOK II. REKAPITULASI HASIL PEMUTAKHIRAN",
    "BLOK III. KETERANGAN PETUGAS",
    "BLOK IV. CATATAN",
    "Identitas Blok Sensus",
    "Identitas SLS",
    "SURVEI SOSIAL EKONOMI NASIONAL 2020",
    "DAFTAR PEMUTAKHIRAN RUMAH TANGGA",
    "Sumber Data : DTSEN",
    "SAMPEL SERUTI",
    "BLOK I.",
    "BLOK II.",
    "BLOK III.",
    "BLOK IV.",
    "Kabupaten/Kota *)",
    "Desa/Kelurahan *)",
    "*) Coret yang tidak perlu",
];

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ErrorCorrection {
    L,
    M,
    Q,
    H,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QrSettings {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub error_correction: ErrorCorrection,
    pub module_pixels: u32,
    pub quiet_zone_modules: u32,
}

impl Default for QrSettings {
    fn default() -> Self {
        Self {
            x: 780.0,
            y: 50.0,
            size: 180.0,
            error_correction: ErrorCorrection::H,
            module_pixels: 10,
            quiet_zone_modules: 4,
        }
    }
}

impl QrSettings {
    pub fn geometry(&self) -> QrGeometry {
        QrGeometry {
            x: self.x,
            y: self.y,
            size: self.size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormProfile {
    pub marker: String,
    pub identity_keywords: Vec<String>,
    pub strip_keywords_from_matches: bool,
    pub boilerplate: Vec<String>,
    pub label_sentinel: String,
    pub filename_sentinel: String,
    pub max_filename_length: usize,
    pub metadata_page_offset: usize,
    pub qr: QrSettings,
}

impl Default for FormProfile {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER.to_string(),
            identity_keywords: DEFAULT_IDENTITY_KEYWORDS
                .iter()
                .map(|keyword| keyword.to_string())
                .collect(),
            strip_keywords_from_matches: true,
            boilerplate: DEFAULT_BOILERPLATE
                .iter()
                .map(|entry| entry.to_string())
                .collect(),
            label_sentinel: DEFAULT_LABEL_SENTINEL.to_string(),
            filename_sentinel: DEFAULT_FILENAME_SENTINEL.to_string(),
            max_filename_length: DEFAULT_MAX_FILENAME_LENGTH,
            metadata_page_offset: 1,
            qr: QrSettings::default(),
        }
    }
}

impl FormProfile {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let mut profile: FormProfile = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        profile.collapse_boilerplate();
        profile
            .validate()
            .with_context(|| format!("rejected profile {}", path.display()))?;
        Ok(profile)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    // Labels are whitespace-collapsed before boilerplate removal, so entries
    // must be in the same form to match.
    pub fn collapse_boilerplate(&mut self) {
        for entry in &mut self.boilerplate {
            *entry = collapse_whitespace(entry);
        }
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.marker.trim().is_empty() {
            return Err(PipelineError::InvalidProfile(
                "marker must not be empty".to_string(),
            ));
        }
        if self.identity_keywords.is_empty() {
            return Err(PipelineError::InvalidProfile(
                "at least one identity keyword is required".to_string(),
            ));
        }
        if let Some(index) = self
            .identity_keywords
            .iter()
            .position(|keyword| keyword.trim().is_empty())
        {
            return Err(PipelineError::InvalidProfile(format!(
                "identity keyword #{} is empty",
                index + 1
            )));
        }
        if let Some(index) = self.boilerplate.iter().position(|entry| entry.is_empty()) {
            return Err(PipelineError::InvalidProfile(format!(
                "boilerplate entry #{} is empty",
                index + 1
            )));
        }
        if let Some(index) = self
            .boilerplate
            .iter()
            .position(|entry| collapse_whitespace(entry) != *entry)
        {
            return Err(PipelineError::InvalidProfile(format!(
                "boilerplate entry #{} has leading, trailing or repeated whitespace",
                index + 1
            )));
        }
        if self.label_sentinel.trim().is_empty() || self.filename_sentinel.trim().is_empty() {
            return Err(PipelineError::InvalidProfile(
                "sentinel values must not be empty".to_string(),
            ));
        }
        if self.max_filename_length == 0 {
            return Err(PipelineError::InvalidProfile(
                "max_filename_length must be at least 1".to_string(),
            ));
        }
        if self.metadata_page_offset == 0 {
            return Err(PipelineError::InvalidProfile(
                "metadata_page_offset must point past the marker page".to_string(),
            ));
        }
        if self.qr.size.is_nan() || self.qr.size <= 0.0 {
            return Err(PipelineError::InvalidProfile(
                "qr.size must be positive".to_string(),
            ));
        }
        if self.qr.module_pixels == 0 {
            return Err(PipelineError::InvalidProfile(
                "qr.module_pixels must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
