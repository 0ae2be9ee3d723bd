use std::fs;
use std::path::Path;

use super::binder::{FileBinder, bind_qr};
use super::identity::{IdentityRules, strip_keywords};
use super::markers::find_markers;
use super::normalize::{collapse_whitespace, normalize};
use super::page_store::{decode_text_layer, split_form_feed_pages};
use super::sanitize::LabelSanitizer;
use super::segment::segment;
use super::*;
use crate::error::PipelineError;
use crate::model::{
    IdentityFragment, MarkerHit, OutputArtifact, QrGeometry, Record, RecordStatus,
    SanitizedFilename,
};
use crate::profile::FormProfile;

const MARKER: &str = "BLOK IV. CATATAN";

fn six_page_store() -> PageTextStore {
    PageTextStore::from_pages([
        "RAHASIA\nBLOK IV. CATATAN\nCatatan pencacah",
        "SERUTI24.DSRT\nIdentitas Blok Sensus: ABC123\nNama Pencacah",
        "daftar rumah tangga",
        "BLOK IV. CATATAN",
        "Identitas SLS: 3201 RT 04",
        "lampiran",
    ])
}

fn hits(pages: &[usize]) -> Vec<MarkerHit> {
    pages
        .iter()
        .map(|page_index| MarkerHit {
            page_index: *page_index,
        })
        .collect()
}

fn extract_identity<S: AsRef<str>>(page_text: &str, keywords: &[S]) -> IdentityFragment {
    IdentityRules::from_keywords(keywords).extract(page_text)
}

fn is_reserved_char(character: char) -> bool {
    matches!(
        character,
        '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'
    ) || (character as u32) < 0x20
}

#[test]
fn split_form_feed_pages_keeps_blank_pages_and_drops_remainder() {
    assert_eq!(split_form_feed_pages("a\u{000C}b\u{000C}"), vec!["a", "b"]);
    assert_eq!(
        split_form_feed_pages("a\u{000C}\u{000C}c\u{000C}"),
        vec!["a", "", "c"]
    );
    assert_eq!(split_form_feed_pages("a\u{000C} \u{000C}"), vec!["a", " "]);
    assert_eq!(split_form_feed_pages("x\u{0000}y\u{000C}"), vec!["xy"]);
    assert!(split_form_feed_pages("").is_empty());
}

#[test]
fn decode_text_layer_rejects_invalid_utf8() {
    let path = Path::new("forms.pdf");
    assert_eq!(
        decode_text_layer(path, "Identitas SLS: 3201\u{000C}".as_bytes().to_vec()).unwrap(),
        "Identitas SLS: 3201\u{000C}"
    );

    let err = decode_text_layer(path, vec![b'a', 0xFF, 0xFE]).unwrap_err();
    match err {
        PipelineError::FatalInput { path, reason } => {
            assert_eq!(path, "forms.pdf");
            assert!(reason.contains("UTF-8"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn page_store_is_one_based() {
    let store = six_page_store();
    assert_eq!(store.page_count(), 6);
    assert_eq!(store.end_bound(), 7);
    assert!(store.text(0).is_none());
    assert_eq!(store.text(4), Some("BLOK IV. CATATAN"));
    assert!(store.text(7).is_none());
    assert_eq!(store.pages()[1].page_index, 2);
}

#[test]
fn page_store_reports_missing_input_as_fatal() {
    let err = PageTextStore::extract(Path::new("/definitely/not/here.pdf")).unwrap_err();
    assert!(matches!(err, PipelineError::FatalInput { .. }));
}

#[test]
fn find_markers_is_case_insensitive_and_ordered() {
    let store = PageTextStore::from_pages([
        "intro",
        "blok iv. catatan",
        "BLOK IV. CATATAN and BLOK IV. CATATAN again",
        "nothing",
        "Blok IV. Catatan",
    ]);
    let found = find_markers(store.pages(), MARKER);
    assert_eq!(found, hits(&[2, 3, 5]));
}

#[test]
fn find_markers_returns_empty_when_absent() {
    let store = PageTextStore::from_pages(["a", "b"]);
    assert!(find_markers(store.pages(), MARKER).is_empty());
}

#[test]
fn segment_matches_reference_scenario() {
    let records = segment(&hits(&[1, 4]), 6);
    assert_eq!(
        records,
        vec![
            Record {
                start_page: 1,
                end_page: 4
            },
            Record {
                start_page: 4,
                end_page: 6
            },
        ]
    );
}

#[test]
fn segment_partitions_every_marker_set() {
    let end_bound = 9;
    for mask in 1u32..256 {
        let markers = (1..=8usize)
            .filter(|page| mask & (1 << (page - 1)) != 0)
            .collect::<Vec<usize>>();
        let records = segment(&hits(&markers), end_bound);

        assert_eq!(records.len(), markers.len());
        assert_eq!(records[0].start_page, markers[0]);
        assert_eq!(records.last().map(|record| record.end_page), Some(end_bound));
        for pair in records.windows(2) {
            assert_eq!(pair[0].end_page, pair[1].start_page);
            assert!(pair[0].start_page < pair[0].end_page);
        }
        let covered = records.iter().map(Record::page_count).sum::<usize>();
        assert_eq!(covered, end_bound - markers[0]);
    }
}

#[test]
fn segment_marker_on_last_page_yields_single_page_record() {
    let store = six_page_store();
    let records = segment(&hits(&[1, 6]), store.end_bound());
    assert_eq!(records[1].page_count(), 1);
    assert!(records[1].contains(6));
}

#[test]
fn extract_identity_prefers_first_matching_keyword() {
    let keywords = ["alpha", "beta", "gamma"];
    let fragment = extract_identity("header\nGAMMA: 7\nfooter\ngamma two", &keywords);
    assert_eq!(fragment.keyword_used.as_deref(), Some("gamma"));
    assert_eq!(fragment.lines, vec!["GAMMA: 7", "gamma two"]);

    let fragment = extract_identity("beta 1\ngamma 2", &keywords);
    assert_eq!(fragment.keyword_used.as_deref(), Some("beta"));
    assert_eq!(fragment.lines, vec!["beta 1"]);
}

#[test]
fn extract_identity_falls_back_to_whole_page() {
    let page = "no keys here\n  just  text";
    let fragment = extract_identity(page, &["Identitas"]);
    assert!(fragment.is_whole_page());
    assert_eq!(fragment.text(), page);
    assert_eq!(fragment.matched_line_count(), 0);
}

// Lower-priority keyword lines are dropped once a higher-priority keyword hits.
#[test]
fn extract_identity_discards_lines_only_matched_by_lower_priority_keywords() {
    let profile = FormProfile::default();
    let fragment = extract_identity(
        "Identitas SLS: 11\nIdentitas: 22",
        &profile.identity_keywords,
    );
    assert_eq!(fragment.keyword_used.as_deref(), Some("Identitas SLS"));
    assert_eq!(fragment.lines, vec!["Identitas SLS: 11"]);
}

#[test]
fn strip_keywords_leaves_whole_page_fragments_untouched() {
    let keywords = ["Identitas"];
    let fragment = extract_identity("Identitas tidak ada", &["missing"]);
    assert_eq!(strip_keywords(&fragment, &keywords), fragment);

    let fragment = extract_identity("Identitas: 42", &keywords);
    assert_eq!(strip_keywords(&fragment, &keywords).lines, vec![": 42"]);
}

#[test]
fn normalize_collapses_whitespace_and_strips_boilerplate() {
    let label = normalize(
        "  RAHASIA\n\n 3201  Kota\tBandung  Nama Pencacah ",
        &["RAHASIA", "Nama Pencacah"],
        "no_data",
    );
    assert_eq!(label.text, "3201 Kota Bandung");
    assert!(!label.fallback);
}

#[test]
fn normalize_trims_field_separators_left_by_label_removal() {
    let label = normalize(": ABC123 ;", &[] as &[&str], "no_data");
    assert_eq!(label.text, "ABC123");
}

#[test]
fn normalize_strips_entries_exposed_by_earlier_removal() {
    let label = normalize("BLOK IBLOK I.. x", &["BLOK I."], "no_data");
    assert_eq!(label.text, "x");
}

#[test]
fn normalize_substitutes_sentinel_when_empty() {
    let label = normalize("RAHASIA  BLOK I.", &["RAHASIA", "BLOK I."], "no_data");
    assert_eq!(label.text, "no_data");
    assert!(label.fallback);

    let label = normalize("   \n\t ", &[] as &[&str], "no_data");
    assert!(label.fallback);
}

#[test]
fn normalize_is_idempotent() {
    let profile = FormProfile::default();
    let corpus = [
        "",
        "   ",
        "Identitas Blok Sensus: ABC123",
        "BLOK I. IDENTITAS SAMPEL BLOK SENSUS 1. Provinsi JAWA BARAT 2. Kabupaten/Kota BOGOR",
        "BLOK IBLOK I.. x",
        ":;, |",
        "RAHASIA\nRAHASIA\n",
        "Pedesaan Perkotaan 3201 | 004B",
        "no_data",
        "  trailing :",
        "BLOK II.BLOK III. CATATAN",
    ];

    for input in corpus {
        let once = normalize(input, &profile.boilerplate, &profile.label_sentinel);
        let twice = normalize(&once.text, &profile.boilerplate, &profile.label_sentinel);
        assert_eq!(twice.text, once.text, "input: {input:?}");
    }
}

#[test]
fn collapse_whitespace_joins_runs() {
    assert_eq!(collapse_whitespace(" a \n\n b\tc "), "a b c");
}

#[test]
fn sanitize_replaces_each_reserved_char() {
    let sanitizer = LabelSanitizer::new("document").unwrap();
    let result = sanitizer.sanitize(r#"a<b>c:d"e/f\g|h?i*j"#, 100);
    assert_eq!(result.name, "a_b_c_d_e_f_g_h_i_j");
    assert!(!result.fallback);

    assert_eq!(sanitizer.sanitize("<<>>", 100).name, "____");
    assert_eq!(sanitizer.sanitize("tab\there", 100).name, "tab_here");
    assert_eq!(sanitizer.sanitize("a \u{0001}\u{001F} b", 100).name, "a __ b");
}

#[test]
fn sanitize_collapses_and_trims() {
    let sanitizer = LabelSanitizer::new("document").unwrap();
    assert_eq!(sanitizer.sanitize("  ..abc   def.. ", 100).name, "abc def");
    assert_eq!(sanitizer.sanitize("abc. def", 4).name, "abc");
}

#[test]
fn sanitize_truncates_by_char() {
    let sanitizer = LabelSanitizer::new("document").unwrap();
    assert_eq!(sanitizer.sanitize(&"x".repeat(150), 100).name.len(), 100);
    assert_eq!(sanitizer.sanitize("ÄÖÜ", 2).name, "ÄÖ");
}

#[test]
fn sanitize_falls_back_to_sentinel() {
    let sanitizer = LabelSanitizer::new("document").unwrap();
    let result = sanitizer.sanitize("", 100);
    assert_eq!(result.name, "document");
    assert!(result.fallback);

    assert_eq!(sanitizer.sanitize(" .. . ", 100).name, "document");
    assert_eq!(sanitizer.sanitize("", 3).name, "doc");
}

#[test]
fn sanitize_output_is_always_safe() {
    let sanitizer = LabelSanitizer::new("document").unwrap();
    let long_label = "long label ".repeat(30);
    let corpus = [
        "",
        "....",
        "   ",
        "<>:\"/\\|?*",
        "\u{0000}\u{0007}\n\r\t",
        "3201/004B: Kota Bandung?",
        "ÄÖÜ ß ...",
        "a.b.c.",
        long_label.as_str(),
    ];

    for input in corpus {
        for max_length in [1usize, 5, 100] {
            let result = sanitizer.sanitize(input, max_length);
            assert!(!result.name.is_empty(), "input: {input:?}");
            assert!(result.name.chars().count() <= max_length, "input: {input:?}");
            assert!(
                !result.name.chars().any(is_reserved_char),
                "input: {input:?} produced {}",
                result.name
            );
        }
    }
}

#[test]
fn bind_file_suffixes_collisions_in_processing_order() {
    let namespace = MemoryNamespace::default();
    let mut binder = FileBinder::new(&namespace, Path::new("out"));
    let label = SanitizedFilename {
        name: "ABC123".to_string(),
        fallback: false,
    };
    let record = Record {
        start_page: 1,
        end_page: 4,
    };

    let first = binder.bind_file(record, &label);
    let second = binder.bind_file(record, &label);
    let third = binder.bind_file(record, &label);

    assert_eq!(first.file_name, "ABC123.pdf");
    assert_eq!(first.collision_suffix, None);
    assert_eq!(second.file_name, "ABC123_1.pdf");
    assert_eq!(second.collision_suffix, Some(1));
    assert_eq!(third.file_name, "ABC123_2.pdf");
}

#[test]
fn process_separates_labels_differing_only_in_case() {
    let profile = FormProfile::default();
    let pipeline = LabelPipeline::new(&profile).unwrap();
    let store = PageTextStore::from_pages([
        "BLOK IV. CATATAN",
        "Identitas SLS: Kota Bandung",
        "BLOK IV. CATATAN",
        "Identitas SLS: KOTA BANDUNG",
    ]);
    let namespace = MemoryNamespace::default();

    let plan = process(
        &store,
        &pipeline,
        ProcessMode::Split {
            output_dir: Path::new("out"),
            namespace: &namespace,
        },
    )
    .unwrap();

    let names = plan
        .records
        .iter()
        .filter_map(|record| record.diagnostics.file_name.clone())
        .collect::<Vec<String>>();
    assert_eq!(names, vec!["Kota Bandung.pdf", "KOTA BANDUNG_1.pdf"]);
    assert_ne!(names[0].to_lowercase(), names[1].to_lowercase());
}

#[test]
fn bind_file_skips_names_present_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("ABC123.pdf"), b"%PDF").unwrap();
    fs::write(dir.path().join("ABC123_1.pdf"), b"%PDF").unwrap();

    let namespace = DirectoryNamespace::new(dir.path());
    let mut binder = FileBinder::new(&namespace, dir.path());
    let label = SanitizedFilename {
        name: "ABC123".to_string(),
        fallback: false,
    };
    let bound = binder.bind_file(
        Record {
            start_page: 2,
            end_page: 5,
        },
        &label,
    );

    assert_eq!(bound.file_name, "ABC123_2.pdf");
    match bound.artifact {
        OutputArtifact::File {
            start_page,
            end_page,
            disk_path,
            ..
        } => {
            assert_eq!((start_page, end_page), (2, 5));
            assert!(disk_path.ends_with("ABC123_2.pdf"));
        }
        other => panic!("unexpected artifact: {other:?}"),
    }
}

#[test]
fn placement_rect_measures_from_bottom_edge() {
    let geometry = QrGeometry {
        x: 780.0,
        y: 50.0,
        size: 180.0,
    };
    let rect = placement_rect(geometry, 595.0);
    assert_eq!((rect.x0, rect.y0, rect.x1, rect.y1), (780.0, 365.0, 960.0, 545.0));
    assert_eq!(rect.width(), 180.0);
    assert_eq!(rect.height(), 180.0);
    assert_eq!(rect.pdf_origin(595.0), (780.0, 50.0));

    let artifact = bind_qr(4, "3201", geometry);
    assert_eq!(
        artifact,
        OutputArtifact::Qr {
            target_page: 4,
            payload: "3201".to_string(),
            geometry,
        }
    );
}

#[test]
fn process_split_labels_each_record() {
    let profile = FormProfile::default();
    let pipeline = LabelPipeline::new(&profile).unwrap();
    let store = six_page_store();
    let namespace = MemoryNamespace::default();

    let plan = process(
        &store,
        &pipeline,
        ProcessMode::Split {
            output_dir: Path::new("out"),
            namespace: &namespace,
        },
    )
    .unwrap();

    assert_eq!(plan.marker_pages, vec![1, 4]);
    assert_eq!(plan.records.len(), 2);

    let first = &plan.records[0].diagnostics;
    assert_eq!((first.start_page, first.end_page), (1, 4));
    assert_eq!(first.metadata_page, Some(2));
    assert_eq!(first.keyword_used.as_deref(), Some("Identitas Blok Sensus"));
    assert_eq!(first.label, "ABC123");
    assert_eq!(first.file_name.as_deref(), Some("ABC123.pdf"));
    assert_eq!(first.status, RecordStatus::Planned);

    let second = &plan.records[1].diagnostics;
    assert_eq!((second.start_page, second.end_page), (4, 7));
    assert_eq!(second.keyword_used.as_deref(), Some("Identitas SLS"));
    assert_eq!(second.label, "3201 RT 04");
    assert_eq!(second.file_name.as_deref(), Some("3201 RT 04.pdf"));
}

#[test]
fn process_annotate_builds_qr_payloads_from_normalized_labels() {
    let profile = FormProfile::default();
    let pipeline = LabelPipeline::new(&profile).unwrap();
    let store = PageTextStore::from_pages([
        "BLOK IV. CATATAN",
        "Identitas Blok Sensus: 3201/004B",
    ]);

    let plan = process(&store, &pipeline, ProcessMode::Annotate).unwrap();
    assert_eq!(plan.records.len(), 1);
    assert_eq!(
        plan.records[0].artifact,
        OutputArtifact::Qr {
            target_page: 1,
            payload: "3201/004B".to_string(),
            geometry: profile.qr.geometry(),
        }
    );
    assert!(plan.records[0].diagnostics.file_name.is_none());
}

#[test]
fn process_uses_sentinel_when_marker_is_on_last_page() {
    let profile = FormProfile::default();
    let pipeline = LabelPipeline::new(&profile).unwrap();
    let store = PageTextStore::from_pages([
        "BLOK IV. CATATAN",
        "Identitas Blok Sensus: ABC123",
        "c",
        "d",
        "e",
        "BLOK IV. CATATAN",
    ]);
    let namespace = MemoryNamespace::default();

    let plan = process(
        &store,
        &pipeline,
        ProcessMode::Split {
            output_dir: Path::new("out"),
            namespace: &namespace,
        },
    )
    .unwrap();

    let last = &plan.records[1].diagnostics;
    assert_eq!((last.start_page, last.end_page), (6, 7));
    assert!(last.missing_metadata_page);
    assert!(last.label_fallback);
    assert_eq!(last.label, "no_data");
    assert_eq!(last.file_name.as_deref(), Some("no_data.pdf"));
    assert!(plan.warnings.iter().any(|warning| warning.contains("no following metadata page")));
}

#[test]
fn process_refuses_documents_without_markers() {
    let profile = FormProfile::default();
    let pipeline = LabelPipeline::new(&profile).unwrap();
    let store = PageTextStore::from_pages(["a", "b", "c"]);

    let err = process(&store, &pipeline, ProcessMode::Annotate).unwrap_err();
    match err {
        PipelineError::NoMarkerFound { marker } => assert_eq!(marker, MARKER),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn process_resolves_colliding_labels_in_record_order() {
    let profile = FormProfile::default();
    let pipeline = LabelPipeline::new(&profile).unwrap();
    let store = PageTextStore::from_pages([
        "BLOK IV. CATATAN",
        "Identitas SLS: 3201",
        "BLOK IV. CATATAN",
        "Identitas SLS: 3201",
    ]);
    let namespace = MemoryNamespace::default();

    let plan = process(
        &store,
        &pipeline,
        ProcessMode::Split {
            output_dir: Path::new("out"),
            namespace: &namespace,
        },
    )
    .unwrap();

    let names = plan
        .records
        .iter()
        .filter_map(|record| record.diagnostics.file_name.clone())
        .collect::<Vec<String>>();
    assert_eq!(names, vec!["3201.pdf", "3201_1.pdf"]);
    assert_eq!(plan.records[1].diagnostics.collision_suffix, Some(1));
}

#[test]
fn process_flags_whole_page_fallback() {
    let profile = FormProfile::default();
    let pipeline = LabelPipeline::new(&profile).unwrap();
    let store = PageTextStore::from_pages(["BLOK IV. CATATAN", "RAHASIA\nKode 3201 004B"]);

    let plan = process(&store, &pipeline, ProcessMode::Annotate).unwrap();
    let record = &plan.records[0].diagnostics;
    assert!(record.keyword_used.is_none());
    assert_eq!(record.label, "Kode 3201 004B");
    assert!(plan.warnings.iter().any(|warning| warning.contains("whole page text used")));
}
