use std::path::Path;

use anyhow::Result;
use tracing::{info, warn};

use crate::commands::source::SourceDocument;
use crate::model::{
    OutputArtifact, RecordDiagnostics, RecordStatus, RunCounts, RunMode, RunPlan, RunReport,
};
use crate::util::{now_utc_string, render_command, write_json_pretty};

pub struct ReportDraft {
    pub run_id: String,
    pub mode: RunMode,
    pub started_at: String,
    pub marker: String,
    pub output_path: Option<String>,
}

impl ReportDraft {
    pub fn finish(
        self,
        source: &SourceDocument,
        plan: &RunPlan,
        artifacts: Vec<OutputArtifact>,
        records: Vec<RecordDiagnostics>,
    ) -> RunReport {
        let counts = RunCounts::tally(&records);
        let status = if counts.skipped_count > 0 {
            "completed_with_skips"
        } else if counts.planned_count > 0 {
            "planned"
        } else {
            "completed"
        };

        RunReport {
            manifest_version: 1,
            run_id: self.run_id,
            mode: self.mode,
            status: status.to_string(),
            started_at: self.started_at,
            completed_at: now_utc_string(),
            command: render_command(),
            input_path: source.path.display().to_string(),
            input_sha256: source.sha256.clone(),
            output_path: self.output_path,
            page_count: plan.page_count,
            marker: self.marker,
            marker_pages: plan.marker_pages.clone(),
            counts,
            artifacts,
            records,
            warnings: plan.warnings.clone(),
        }
    }
}

pub fn log_summary(report: &RunReport) {
    for record in &report.records {
        if record.status == RecordStatus::Skipped {
            warn!(
                record = record.record_number,
                stage = ?record.skipped_stage,
                reason = record.skip_reason.as_deref().unwrap_or(""),
                "record skipped"
            );
        }
    }
    for warning in &report.warnings {
        warn!(warning = %warning, "fallback applied");
    }

    info!(
        run_id = %report.run_id,
        mode = report.mode.as_str(),
        status = %report.status,
        records = report.counts.record_count,
        written = report.counts.written_count,
        skipped = report.counts.skipped_count,
        label_fallbacks = report.counts.label_fallback_count,
        filename_fallbacks = report.counts.filename_fallback_count,
        missing_metadata_pages = report.counts.missing_metadata_page_count,
        collisions = report.counts.collisions_resolved,
        "run finished"
    );
}

pub fn write_report(path: Option<&Path>, report: &RunReport) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    write_json_pretty(path, report)?;
    info!(path = %path.display(), "wrote run report");
    Ok(())
}
