use std::path::Path;
use std::process::Command;

use tracing::{debug, info};

use crate::error::PipelineError;
use crate::model::PageText;

#[derive(Debug, Clone, Default)]
pub struct PageTextStore {
    pages: Vec<PageText>,
}

impl PageTextStore {
    pub fn from_pages<I, S>(pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pages = pages
            .into_iter()
            .enumerate()
            .map(|(index, raw_text)| PageText {
                page_index: index + 1,
                raw_text: raw_text.into(),
            })
            .collect();
        Self { pages }
    }

    pub fn extract(pdf_path: &Path) -> Result<Self, PipelineError> {
        if !pdf_path.is_file() {
            return Err(PipelineError::fatal_input(
                pdf_path.display().to_string(),
                "file not found",
            ));
        }

        let output = Command::new("pdftotext")
            .arg("-enc")
            .arg("UTF-8")
            .arg(pdf_path)
            .arg("-")
            .output()
            .map_err(|err| {
                PipelineError::fatal_input(
                    pdf_path.display().to_string(),
                    format!("failed to execute pdftotext: {err}"),
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PipelineError::fatal_input(
                pdf_path.display().to_string(),
                format!("pdftotext returned non-zero exit status: {}", stderr.trim()),
            ));
        }

        let raw = decode_text_layer(pdf_path, output.stdout)?;
        let store = Self::from_pages(split_form_feed_pages(&raw));
        info!(
            path = %pdf_path.display(),
            pages = store.page_count(),
            "extracted page text"
        );
        Ok(store)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn end_bound(&self) -> usize {
        self.pages.len() + 1
    }

    pub fn pages(&self) -> &[PageText] {
        &self.pages
    }

    pub fn text(&self, page_index: usize) -> Option<&str> {
        if page_index == 0 {
            return None;
        }
        self.pages
            .get(page_index - 1)
            .map(|page| page.raw_text.as_str())
    }
}

pub fn decode_text_layer(pdf_path: &Path, stdout: Vec<u8>) -> Result<String, PipelineError> {
    String::from_utf8(stdout).map_err(|err| {
        PipelineError::fatal_input(
            pdf_path.display().to_string(),
            format!("pdftotext output is not valid UTF-8: {}", err.utf8_error()),
        )
    })
}

// pdftotext terminates every page with a form feed, so the last chunk is
// the empty remainder, not a page.
pub fn split_form_feed_pages(raw: &str) -> Vec<String> {
    let mut pages: Vec<String> = raw
        .split('\u{000C}')
        .map(|chunk| chunk.replace('\u{0000}', ""))
        .collect();

    if pages.len() > 1 && pages.last().is_some_and(|last| last.trim().is_empty()) {
        pages.pop();
    }
    if pages.len() == 1 && pages[0].trim().is_empty() {
        pages.clear();
    }

    debug!(pages = pages.len(), "split pdftotext output");
    pages
}
