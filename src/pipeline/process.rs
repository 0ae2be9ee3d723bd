use std::path::Path;

use anyhow::Result;
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::model::{
    IdentityFragment, NormalizedLabel, PlannedRecord, Record, RecordDiagnostics, RecordStatus,
    RunMode, RunPlan,
};
use crate::pipeline::binder::{FileBinder, OutputNamespace, bind_qr};
use crate::pipeline::identity::{IdentityRules, strip_keywords};
use crate::pipeline::markers::find_markers;
use crate::pipeline::normalize::normalize_fragment;
use crate::pipeline::page_store::PageTextStore;
use crate::pipeline::sanitize::LabelSanitizer;
use crate::pipeline::segment::segment;
use crate::profile::FormProfile;

pub enum ProcessMode<'a> {
    Annotate,
    Split {
        output_dir: &'a Path,
        namespace: &'a dyn OutputNamespace,
    },
}

impl ProcessMode<'_> {
    fn run_mode(&self) -> RunMode {
        match self {
            Self::Annotate => RunMode::Annotate,
            Self::Split { .. } => RunMode::Split,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordLabel {
    pub metadata_page: Option<usize>,
    pub fragment: Option<IdentityFragment>,
    pub label: NormalizedLabel,
}

impl RecordLabel {
    pub fn missing_metadata_page(&self) -> bool {
        self.metadata_page.is_none()
    }
}

pub struct LabelPipeline<'a> {
    profile: &'a FormProfile,
    rules: IdentityRules,
    sanitizer: LabelSanitizer,
}

impl<'a> LabelPipeline<'a> {
    pub fn new(profile: &'a FormProfile) -> Result<Self> {
        profile.validate()?;
        Ok(Self {
            profile,
            rules: IdentityRules::from_keywords(&profile.identity_keywords),
            sanitizer: LabelSanitizer::new(&profile.filename_sentinel)?,
        })
    }

    pub fn profile(&self) -> &FormProfile {
        self.profile
    }

    pub fn sanitizer(&self) -> &LabelSanitizer {
        &self.sanitizer
    }

    pub fn label_for_text(&self, page_text: &str) -> (IdentityFragment, NormalizedLabel) {
        let fragment = self.rules.extract(page_text);
        let stripped = if self.profile.strip_keywords_from_matches {
            strip_keywords(&fragment, &self.profile.identity_keywords)
        } else {
            fragment.clone()
        };
        let label = normalize_fragment(
            &stripped,
            &self.profile.boilerplate,
            &self.profile.label_sentinel,
        );
        (fragment, label)
    }

    pub fn label_record(&self, store: &PageTextStore, marker_page: usize) -> RecordLabel {
        let metadata_page = marker_page + self.profile.metadata_page_offset;

        let Some(page_text) = store.text(metadata_page) else {
            warn!(
                marker_page,
                metadata_page,
                sentinel = %self.profile.label_sentinel,
                "metadata page missing, using sentinel label"
            );
            return RecordLabel {
                metadata_page: None,
                fragment: None,
                label: NormalizedLabel {
                    text: self.profile.label_sentinel.clone(),
                    fallback: true,
                },
            };
        };

        if page_text.trim().is_empty() {
            warn!(metadata_page, "metadata page has no text");
        }

        let (fragment, label) = self.label_for_text(page_text);
        RecordLabel {
            metadata_page: Some(metadata_page),
            fragment: Some(fragment),
            label,
        }
    }
}

pub fn process(
    store: &PageTextStore,
    pipeline: &LabelPipeline<'_>,
    mode: ProcessMode<'_>,
) -> Result<RunPlan, PipelineError> {
    let profile = pipeline.profile();
    let run_mode = mode.run_mode();

    info!(mode = run_mode.as_str(), pages = store.page_count(), "scanning for markers");
    let markers = find_markers(store.pages(), &profile.marker);
    if markers.is_empty() {
        warn!(marker = %profile.marker, "no marker pages found, refusing to continue");
        return Err(PipelineError::NoMarkerFound {
            marker: profile.marker.clone(),
        });
    }

    let records = segment(&markers, store.end_bound());
    info!(records = records.len(), "segmented document into records");

    let mut binder = match &mode {
        ProcessMode::Annotate => None,
        ProcessMode::Split {
            output_dir,
            namespace,
        } => Some(FileBinder::new(*namespace, output_dir)),
    };

    let mut warnings = Vec::new();
    let mut planned = Vec::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        let record_number = index + 1;
        info!(
            record = record_number,
            start_page = record.start_page,
            end_page = record.end_page,
            "extracting record label"
        );

        let labelled = pipeline.label_record(store, record.start_page);
        if let Some(metadata_page) = labelled.metadata_page {
            if !record.contains(metadata_page) {
                warnings.push(format!(
                    "record {record_number}: metadata page {metadata_page} lies outside pages {}..{}",
                    record.start_page, record.end_page
                ));
            }
        }

        let mut diagnostics = diagnostics_for(record_number, record, &labelled);
        collect_label_warnings(&mut warnings, &diagnostics);

        let artifact = match binder.as_mut() {
            None => bind_qr(
                record.start_page,
                &labelled.label.text,
                profile.qr.geometry(),
            ),
            Some(binder) => {
                let filename = pipeline
                    .sanitizer()
                    .sanitize(&labelled.label.text, profile.max_filename_length);
                if filename.fallback {
                    warnings.push(format!(
                        "record {record_number}: filename fell back to '{}'",
                        filename.name
                    ));
                }
                let bound = binder.bind_file(*record, &filename);
                diagnostics.filename_fallback = filename.fallback;
                diagnostics.file_name = Some(bound.file_name);
                diagnostics.collision_suffix = bound.collision_suffix;
                bound.artifact
            }
        };

        info!(
            record = record_number,
            label = %diagnostics.label,
            file_name = diagnostics.file_name.as_deref().unwrap_or("-"),
            "record planned"
        );
        planned.push(PlannedRecord {
            artifact,
            diagnostics,
        });
    }

    Ok(RunPlan {
        page_count: store.page_count(),
        marker_pages: markers.iter().map(|hit| hit.page_index).collect(),
        records: planned,
        warnings,
    })
}

fn diagnostics_for(record_number: usize, record: &Record, labelled: &RecordLabel) -> RecordDiagnostics {
    RecordDiagnostics {
        record_number,
        marker_page: record.start_page,
        start_page: record.start_page,
        end_page: record.end_page,
        metadata_page: labelled.metadata_page,
        missing_metadata_page: labelled.missing_metadata_page(),
        keyword_used: labelled
            .fragment
            .as_ref()
            .and_then(|fragment| fragment.keyword_used.clone()),
        matched_line_count: labelled
            .fragment
            .as_ref()
            .map(IdentityFragment::matched_line_count)
            .unwrap_or(0),
        label: labelled.label.text.clone(),
        label_fallback: labelled.label.fallback,
        file_name: None,
        filename_fallback: false,
        collision_suffix: None,
        status: RecordStatus::Planned,
        skipped_stage: None,
        skip_reason: None,
    }
}

fn collect_label_warnings(warnings: &mut Vec<String>, diagnostics: &RecordDiagnostics) {
    let record_number = diagnostics.record_number;
    if diagnostics.missing_metadata_page {
        warnings.push(format!(
            "record {record_number}: marker on page {} has no following metadata page",
            diagnostics.marker_page
        ));
    } else if diagnostics.keyword_used.is_none() {
        warnings.push(format!(
            "record {record_number}: no identity keyword matched, whole page text used"
        ));
    }
    if diagnostics.label_fallback {
        warnings.push(format!(
            "record {record_number}: label fell back to '{}'",
            diagnostics.label
        ));
    }
}
