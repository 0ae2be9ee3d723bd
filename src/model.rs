use std::ops::Range;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageText {
    pub page_index: usize,
    pub raw_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct MarkerHit {
    pub page_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Record {
    pub start_page: usize,
    pub end_page: usize,
}

impl Record {
    pub fn page_count(&self) -> usize {
        self.end_page.saturating_sub(self.start_page)
    }

    pub fn pages(&self) -> Range<usize> {
        self.start_page..self.end_page
    }

    pub fn contains(&self, page_index: usize) -> bool {
        self.pages().contains(&page_index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityFragment {
    pub keyword_used: Option<String>,
    pub lines: Vec<String>,
}

impl IdentityFragment {
    pub fn whole_page(page_text: &str) -> Self {
        Self {
            keyword_used: None,
            lines: vec![page_text.to_string()],
        }
    }

    pub fn is_whole_page(&self) -> bool {
        self.keyword_used.is_none()
    }

    pub fn matched_line_count(&self) -> usize {
        if self.is_whole_page() {
            0
        } else {
            self.lines.len()
        }
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedLabel {
    pub text: String,
    pub fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedFilename {
    pub name: String,
    pub fallback: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QrGeometry {
    pub x: f32,
    pub y: f32,
    pub size: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlacementRect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl PlacementRect {
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    // Rect is in top-left page space; PDF user space has its origin bottom-left.
    pub fn pdf_origin(&self, page_height: f32) -> (f32, f32) {
        (self.x0, page_height - self.y1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutputArtifact {
    Qr {
        target_page: usize,
        payload: String,
        geometry: QrGeometry,
    },
    File {
        file_name: String,
        start_page: usize,
        end_page: usize,
        disk_path: String,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Annotate,
    Split,
    Scan,
}

impl RunMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Annotate => "annotate",
            Self::Split => "split",
            Self::Scan => "scan",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStage {
    Rendering,
    Extracting,
    Writing,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Planned,
    Written,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordDiagnostics {
    pub record_number: usize,
    pub marker_page: usize,
    pub start_page: usize,
    pub end_page: usize,
    pub metadata_page: Option<usize>,
    pub missing_metadata_page: bool,
    pub keyword_used: Option<String>,
    pub matched_line_count: usize,
    pub label: String,
    pub label_fallback: bool,
    pub file_name: Option<String>,
    pub filename_fallback: bool,
    pub collision_suffix: Option<usize>,
    pub status: RecordStatus,
    pub skipped_stage: Option<RecordStage>,
    pub skip_reason: Option<String>,
}

impl RecordDiagnostics {
    pub fn mark_written(&mut self) {
        self.status = RecordStatus::Written;
    }

    pub fn mark_skipped(&mut self, stage: RecordStage, reason: impl Into<String>) {
        self.status = RecordStatus::Skipped;
        self.skipped_stage = Some(stage);
        self.skip_reason = Some(reason.into());
    }
}

#[derive(Debug, Clone)]
pub struct PlannedRecord {
    pub artifact: OutputArtifact,
    pub diagnostics: RecordDiagnostics,
}

#[derive(Debug, Clone)]
pub struct RunPlan {
    pub page_count: usize,
    pub marker_pages: Vec<usize>,
    pub records: Vec<PlannedRecord>,
    pub warnings: Vec<String>,
}

impl RunPlan {
    pub fn planned_outputs(&self) -> (Vec<OutputArtifact>, Vec<RecordDiagnostics>) {
        self.records
            .iter()
            .map(|planned| (planned.artifact.clone(), planned.diagnostics.clone()))
            .unzip()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunCounts {
    pub record_count: usize,
    pub written_count: usize,
    pub skipped_count: usize,
    pub planned_count: usize,
    pub label_fallback_count: usize,
    pub filename_fallback_count: usize,
    pub missing_metadata_page_count: usize,
    pub whole_page_fallback_count: usize,
    pub collisions_resolved: usize,
}

impl RunCounts {
    pub fn tally(records: &[RecordDiagnostics]) -> Self {
        let mut counts = Self {
            record_count: records.len(),
            ..Self::default()
        };

        for record in records {
            match record.status {
                RecordStatus::Written => counts.written_count += 1,
                RecordStatus::Skipped => counts.skipped_count += 1,
                RecordStatus::Planned => counts.planned_count += 1,
            }
            if record.label_fallback {
                counts.label_fallback_count += 1;
            }
            if record.filename_fallback {
                counts.filename_fallback_count += 1;
            }
            if record.missing_metadata_page {
                counts.missing_metadata_page_count += 1;
            } else if record.keyword_used.is_none() {
                counts.whole_page_fallback_count += 1;
            }
            if record.collision_suffix.is_some() {
                counts.collisions_resolved += 1;
            }
        }

        counts
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub manifest_version: u32,
    pub run_id: String,
    pub mode: RunMode,
    pub status: String,
    pub started_at: String,
    pub completed_at: String,
    pub command: String,
    pub input_path: String,
    pub input_sha256: String,
    pub output_path: Option<String>,
    pub page_count: usize,
    pub marker: String,
    pub marker_pages: Vec<usize>,
    pub counts: RunCounts,
    pub artifacts: Vec<OutputArtifact>,
    pub records: Vec<RecordDiagnostics>,
    pub warnings: Vec<String>,
}
