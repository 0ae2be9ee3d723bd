use tracing::debug;

use crate::model::{MarkerHit, Record};

// `end_bound` is exclusive. Over 1-based page indices the pipeline passes
// `page_count + 1` so the last record keeps the final page.
pub fn segment(markers: &[MarkerHit], end_bound: usize) -> Vec<Record> {
    let records = markers
        .iter()
        .enumerate()
        .map(|(index, marker)| {
            let end_page = markers
                .get(index + 1)
                .map(|next| next.page_index)
                .unwrap_or(end_bound);
            Record {
                start_page: marker.page_index,
                end_page: end_page.max(marker.page_index),
            }
        })
        .collect::<Vec<Record>>();

    for record in &records {
        debug!(
            start_page = record.start_page,
            end_page = record.end_page,
            pages = record.page_count(),
            "record segmented"
        );
    }

    records
}
