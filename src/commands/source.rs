use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::info;

use crate::error::PipelineError;
use crate::pdf::PdfEditor;
use crate::pipeline::PageTextStore;
use crate::util::sha256_file;

pub struct SourceDocument {
    pub path: PathBuf,
    pub store: PageTextStore,
    pub editor: PdfEditor,
    pub sha256: String,
}

impl SourceDocument {
    pub fn load(path: &Path) -> Result<Self> {
        let store = PageTextStore::extract(path)?;
        let editor = PdfEditor::open(path).map_err(|err| {
            PipelineError::fatal_input(path.display().to_string(), format!("{err:#}"))
        })?;

        if editor.page_count() != store.page_count() {
            return Err(PipelineError::fatal_input(
                path.display().to_string(),
                format!(
                    "text layer has {} pages but the document has {}",
                    store.page_count(),
                    editor.page_count()
                ),
            )
            .into());
        }

        let sha256 = sha256_file(path)?;
        info!(
            path = %path.display(),
            pages = store.page_count(),
            sha256 = %sha256,
            "loaded source document"
        );

        Ok(Self {
            path: path.to_path_buf(),
            store,
            editor,
            sha256,
        })
    }
}
