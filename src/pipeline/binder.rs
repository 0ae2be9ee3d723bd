use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::model::{OutputArtifact, PlacementRect, QrGeometry, Record, SanitizedFilename};

pub trait OutputNamespace {
    fn contains(&self, file_name: &str) -> bool;
}

#[derive(Debug, Clone)]
pub struct DirectoryNamespace {
    root: PathBuf,
}

impl DirectoryNamespace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl OutputNamespace for DirectoryNamespace {
    fn contains(&self, file_name: &str) -> bool {
        self.root.join(file_name).exists()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryNamespace {
    names: HashSet<String>,
}

impl OutputNamespace for MemoryNamespace {
    fn contains(&self, file_name: &str) -> bool {
        self.names.contains(file_name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundFile {
    pub artifact: OutputArtifact,
    pub file_name: String,
    pub collision_suffix: Option<usize>,
}

pub struct FileBinder<'a, N: OutputNamespace + ?Sized> {
    namespace: &'a N,
    output_dir: PathBuf,
    claimed: HashSet<String>,
}

impl<'a, N: OutputNamespace + ?Sized> FileBinder<'a, N> {
    pub fn new(namespace: &'a N, output_dir: &Path) -> Self {
        Self {
            namespace,
            output_dir: output_dir.to_path_buf(),
            claimed: HashSet::new(),
        }
    }

    // Checking the namespace and claiming the name happen under `&mut self`,
    // so two records in one run can never resolve to the same file. Claimed
    // names are case-folded for case-insensitive filesystems.
    pub fn bind_file(&mut self, record: Record, label: &SanitizedFilename) -> BoundFile {
        let base = label.name.as_str();
        let mut file_name = format!("{base}.pdf");
        let mut suffix = None;
        let mut counter = 1usize;

        while self.is_taken(&file_name) {
            debug!(file_name = %file_name, "output name already taken");
            file_name = format!("{base}_{counter}.pdf");
            suffix = Some(counter);
            counter += 1;
        }

        self.claimed.insert(file_name.to_lowercase());
        if let Some(counter) = suffix {
            info!(
                label = %base,
                file_name = %file_name,
                suffix = counter,
                "resolved filename collision"
            );
        }

        let disk_path = self.output_dir.join(&file_name);
        BoundFile {
            artifact: OutputArtifact::File {
                file_name: file_name.clone(),
                start_page: record.start_page,
                end_page: record.end_page,
                disk_path: disk_path.display().to_string(),
            },
            file_name,
            collision_suffix: suffix,
        }
    }

    fn is_taken(&self, file_name: &str) -> bool {
        self.claimed.contains(&file_name.to_lowercase()) || self.namespace.contains(file_name)
    }
}

pub fn bind_qr(record_marker_page: usize, payload: &str, geometry: QrGeometry) -> OutputArtifact {
    OutputArtifact::Qr {
        target_page: record_marker_page,
        payload: payload.to_string(),
        geometry,
    }
}

// The rect is in top-left page space. `x` is the offset from the left edge
// and `y` the offset from the bottom edge.
pub fn placement_rect(geometry: QrGeometry, page_height: f32) -> PlacementRect {
    PlacementRect {
        x0: geometry.x,
        y0: page_height - geometry.size - geometry.y,
        x1: geometry.x + geometry.size,
        y1: page_height - geometry.y,
    }
}
