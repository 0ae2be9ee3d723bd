use anyhow::{Result, anyhow};
use chrono::{SecondsFormat, Utc};
use tracing::{info, warn};

use crate::cli::AnnotateArgs;
use crate::commands::report::{ReportDraft, log_summary, write_report};
use crate::commands::source::SourceDocument;
use crate::model::{OutputArtifact, RecordDiagnostics, RecordStage, RunMode, RunPlan};
use crate::pdf::{PdfEditor, render_qr};
use crate::pipeline::{LabelPipeline, ProcessMode, placement_rect, process};
use crate::profile::QrSettings;
use crate::util::{annotated_output_path, now_utc_string, run_id_for};

pub fn run(args: AnnotateArgs) -> Result<()> {
    let started_ts = Utc::now();
    let run_id = run_id_for(started_ts);
    let profile = args.overrides.resolve()?;
    let pipeline = LabelPipeline::new(&profile)?;
    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| annotated_output_path(&args.input));

    info!(
        input = %args.input.display(),
        output = %output_path.display(),
        marker = %profile.marker,
        run_id = %run_id,
        "starting annotate"
    );

    let mut source = SourceDocument::load(&args.input)?;
    let plan = process(&source.store, &pipeline, ProcessMode::Annotate)?;

    let (artifacts, records) = if args.dry_run {
        plan.planned_outputs()
    } else {
        stamp_records(&mut source.editor, &plan, &profile.qr)
    };

    if args.dry_run {
        info!("dry run, annotated PDF not written");
    } else {
        source.editor.save(&output_path)?;
    }

    let report = ReportDraft {
        run_id,
        mode: RunMode::Annotate,
        started_at: started_ts.to_rfc3339_opts(SecondsFormat::Secs, true),
        marker: profile.marker.clone(),
        output_path: (!args.dry_run).then(|| output_path.display().to_string()),
    }
    .finish(&source, &plan, artifacts, records);

    log_summary(&report);
    write_report(args.report_path.as_deref(), &report)?;
    info!(finished_at = %now_utc_string(), "annotate completed");

    Ok(())
}

fn stamp_records(
    editor: &mut PdfEditor,
    plan: &RunPlan,
    settings: &QrSettings,
) -> (Vec<OutputArtifact>, Vec<RecordDiagnostics>) {
    let mut artifacts = Vec::with_capacity(plan.records.len());
    let mut records = Vec::with_capacity(plan.records.len());
    for planned in &plan.records {
        let mut diagnostics = planned.diagnostics.clone();
        match stamp_record(editor, &planned.artifact, settings) {
            Ok(()) => diagnostics.mark_written(),
            Err((stage, err)) => {
                warn!(
                    record = diagnostics.record_number,
                    page = diagnostics.marker_page,
                    stage = ?stage,
                    error = %format!("{err:#}"),
                    "failed to stamp QR code"
                );
                diagnostics.mark_skipped(stage, format!("{err:#}"));
            }
        }
        artifacts.push(planned.artifact.clone());
        records.push(diagnostics);
    }
    (artifacts, records)
}

// The raster lives only for this call, so nothing outlives the record step.
fn stamp_record(
    editor: &mut PdfEditor,
    artifact: &OutputArtifact,
    settings: &QrSettings,
) -> Result<(), (RecordStage, anyhow::Error)> {
    let OutputArtifact::Qr {
        target_page,
        payload,
        geometry,
    } = artifact
    else {
        return Err((
            RecordStage::Writing,
            anyhow!("annotate expects QR artifacts, got {artifact:?}"),
        ));
    };

    let raster = render_qr(payload, settings).map_err(|err| (RecordStage::Rendering, err))?;
    let page_box = editor
        .page_box(*target_page)
        .map_err(|err| (RecordStage::Writing, err))?;
    let rect = placement_rect(*geometry, page_box.height);
    editor
        .insert_qr(*target_page, &raster, rect, page_box)
        .map_err(|err| (RecordStage::Writing, err))?;

    info!(
        page = target_page,
        version = %raster.version,
        payload_chars = payload.chars().count(),
        "stamped QR code"
    );
    Ok(())
}
