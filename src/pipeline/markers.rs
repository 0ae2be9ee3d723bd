use tracing::{debug, info};

use crate::model::{MarkerHit, PageText};

pub fn find_markers(pages: &[PageText], marker: &str) -> Vec<MarkerHit> {
    let needle = marker.to_lowercase();

    let mut hits = pages
        .iter()
        .filter(|page| page.raw_text.to_lowercase().contains(&needle))
        .map(|page| MarkerHit {
            page_index: page.page_index,
        })
        .collect::<Vec<MarkerHit>>();

    hits.sort();
    hits.dedup();

    for hit in &hits {
        debug!(page = hit.page_index, marker = %marker, "marker found");
    }
    info!(marker = %marker, hits = hits.len(), "marker scan complete");

    hits
}
