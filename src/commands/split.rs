use std::path::Path;

use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use tracing::{info, warn};

use crate::cli::SplitArgs;
use crate::commands::report::{ReportDraft, log_summary, write_report};
use crate::commands::source::SourceDocument;
use crate::model::{OutputArtifact, RecordDiagnostics, RecordStage, RunMode, RunPlan};
use crate::pdf::{PdfEditor, save_new_document};
use crate::pipeline::{DirectoryNamespace, LabelPipeline, ProcessMode, process};
use crate::util::{ensure_directory, run_id_for};

struct SplitOutcome {
    plan: RunPlan,
    artifacts: Vec<OutputArtifact>,
    records: Vec<RecordDiagnostics>,
}

pub fn run(args: SplitArgs) -> Result<()> {
    let started_ts = Utc::now();
    let run_id = run_id_for(started_ts);
    let profile = args.overrides.resolve()?;
    let pipeline = LabelPipeline::new(&profile)?;

    info!(
        input = %args.input.display(),
        output_dir = %args.output_dir.display(),
        marker = %profile.marker,
        run_id = %run_id,
        "starting split"
    );

    let source = SourceDocument::load(&args.input)?;
    let outcome = split_source(&source, &pipeline, &args.output_dir, args.dry_run)?;

    if args.dry_run {
        info!("dry run, no record files written");
    }

    let report = ReportDraft {
        run_id,
        mode: RunMode::Split,
        started_at: started_ts.to_rfc3339_opts(SecondsFormat::Secs, true),
        marker: profile.marker.clone(),
        output_path: Some(args.output_dir.display().to_string()),
    }
    .finish(&source, &outcome.plan, outcome.artifacts, outcome.records);

    log_summary(&report);
    write_report(args.report_path.as_deref(), &report)?;

    Ok(())
}

// The output directory is only created once planning has succeeded.
fn split_source(
    source: &SourceDocument,
    pipeline: &LabelPipeline<'_>,
    output_dir: &Path,
    dry_run: bool,
) -> Result<SplitOutcome> {
    let namespace = DirectoryNamespace::new(output_dir);
    let plan = process(
        &source.store,
        pipeline,
        ProcessMode::Split {
            output_dir,
            namespace: &namespace,
        },
    )?;

    if dry_run {
        let (artifacts, records) = plan.planned_outputs();
        return Ok(SplitOutcome {
            plan,
            artifacts,
            records,
        });
    }

    ensure_directory(output_dir)?;
    let (artifacts, records) = write_records(&source.editor, &plan);
    Ok(SplitOutcome {
        plan,
        artifacts,
        records,
    })
}

fn write_records(
    editor: &PdfEditor,
    plan: &RunPlan,
) -> (Vec<OutputArtifact>, Vec<RecordDiagnostics>) {
    let mut artifacts = Vec::with_capacity(plan.records.len());
    let mut records = Vec::with_capacity(plan.records.len());
    for planned in &plan.records {
        let mut diagnostics = planned.diagnostics.clone();
        match write_record(editor, &planned.artifact) {
            Ok(()) => diagnostics.mark_written(),
            Err((stage, err)) => {
                warn!(
                    record = diagnostics.record_number,
                    file_name = diagnostics.file_name.as_deref().unwrap_or("-"),
                    stage = ?stage,
                    error = %format!("{err:#}"),
                    "failed to write record file"
                );
                diagnostics.mark_skipped(stage, format!("{err:#}"));
            }
        }
        artifacts.push(planned.artifact.clone());
        records.push(diagnostics);
    }
    (artifacts, records)
}

fn write_record(
    editor: &PdfEditor,
    artifact: &OutputArtifact,
) -> Result<(), (RecordStage, anyhow::Error)> {
    let OutputArtifact::File {
        start_page,
        end_page,
        disk_path,
        ..
    } = artifact
    else {
        return Err((
            RecordStage::Writing,
            anyhow::anyhow!("split expects file artifacts, got {artifact:?}"),
        ));
    };

    let mut document = editor
        .extract_range(*start_page..*end_page)
        .map_err(|err| (RecordStage::Extracting, err))?;
    save_new_document(&mut document, Path::new(disk_path))
        .map_err(|err| (RecordStage::Writing, err))
}
