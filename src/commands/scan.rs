use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};

use crate::cli::ScanArgs;
use crate::commands::report::ReportDraft;
use crate::commands::source::SourceDocument;
use crate::model::{RunMode, RunReport};
use crate::pipeline::{
    DirectoryNamespace, LabelPipeline, MemoryNamespace, OutputNamespace, ProcessMode, process,
};
use crate::util::run_id_for;

pub fn run(args: ScanArgs) -> Result<()> {
    let started_ts = Utc::now();
    let profile = args.overrides.resolve()?;
    let pipeline = LabelPipeline::new(&profile)?;

    let source = SourceDocument::load(&args.input)?;
    // Without an output directory, names are previewed against an empty namespace.
    let empty = MemoryNamespace::default();
    let directory = args.output_dir.as_deref().map(DirectoryNamespace::new);
    let namespace: &dyn OutputNamespace = match &directory {
        Some(directory) => directory,
        None => &empty,
    };
    let plan = process(
        &source.store,
        &pipeline,
        ProcessMode::Split {
            output_dir: args.output_dir.as_deref().unwrap_or(Path::new(".")),
            namespace,
        },
    )?;

    let (artifacts, records) = plan.planned_outputs();
    let report = ReportDraft {
        run_id: run_id_for(started_ts),
        mode: RunMode::Scan,
        started_at: started_ts.to_rfc3339_opts(SecondsFormat::Secs, true),
        marker: profile.marker.clone(),
        output_path: args
            .output_dir
            .as_ref()
            .map(|dir| dir.display().to_string()),
    }
    .finish(&source, &plan, artifacts, records);

    if args.json {
        write_json_scan(&report)
    } else {
        write_text_scan(&report)
    }
}

fn write_json_scan(report: &RunReport) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());
    serde_json::to_writer_pretty(&mut output, report)
        .context("failed to serialize scan json output")?;
    writeln!(output)?;
    output.flush()?;
    Ok(())
}

fn write_text_scan(report: &RunReport) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());

    writeln!(output, "Input: {}", report.input_path)?;
    writeln!(
        output,
        "Pages: {} marker=\"{}\" marker_pages={:?}",
        report.page_count, report.marker, report.marker_pages
    )?;
    writeln!(
        output,
        "Records: {} label_fallbacks={} filename_fallbacks={} missing_metadata_pages={} whole_page={}",
        report.counts.record_count,
        report.counts.label_fallback_count,
        report.counts.filename_fallback_count,
        report.counts.missing_metadata_page_count,
        report.counts.whole_page_fallback_count,
    )?;

    for record in &report.records {
        writeln!(
            output,
            "{}.\tpages {}-{}\t{}\t{}",
            record.record_number,
            record.start_page,
            record.end_page.saturating_sub(1),
            record.label,
            record.file_name.as_deref().unwrap_or("-"),
        )?;
        writeln!(
            output,
            "\tkeyword={} matched_lines={} metadata_page={}",
            record.keyword_used.as_deref().unwrap_or("(whole page)"),
            record.matched_line_count,
            record
                .metadata_page
                .map(|page| page.to_string())
                .unwrap_or_else(|| "(missing)".to_string()),
        )?;
    }

    for warning in &report.warnings {
        writeln!(output, "warning: {warning}")?;
    }

    output.flush()?;
    Ok(())
}
