use anyhow::{Context, Result};
use regex::Regex;
use tracing::warn;

use crate::model::SanitizedFilename;

const LAST_RESORT_NAME: &str = "_";

#[derive(Debug, Clone)]
pub struct LabelSanitizer {
    reserved: Regex,
    whitespace: Regex,
    sentinel: String,
}

impl LabelSanitizer {
    pub fn new(sentinel: &str) -> Result<Self> {
        Ok(Self {
            reserved: Regex::new(r#"[<>:"/\\|?*\x00-\x1f]"#)
                .context("failed to compile reserved filename character regex")?,
            whitespace: Regex::new(r"\s+").context("failed to compile whitespace regex")?,
            sentinel: sentinel.to_string(),
        })
    }

    pub fn sanitize(&self, label: &str, max_length: usize) -> SanitizedFilename {
        let cleaned = self.clean(label, max_length);
        if !cleaned.is_empty() {
            return SanitizedFilename {
                name: cleaned,
                fallback: false,
            };
        }

        let sentinel = self.clean(&self.sentinel, max_length);
        let name = if sentinel.is_empty() {
            LAST_RESORT_NAME.to_string()
        } else {
            sentinel
        };
        warn!(
            label = %label,
            fallback = %name,
            "sanitized filename is empty, substituting sentinel"
        );

        SanitizedFilename {
            name,
            fallback: true,
        }
    }

    fn clean(&self, label: &str, max_length: usize) -> String {
        let replaced = self.reserved.replace_all(label, "_");
        let collapsed = self.whitespace.replace_all(&replaced, " ");
        let trimmed = trim_dots_and_spaces(&collapsed);
        let truncated = trimmed.chars().take(max_length).collect::<String>();
        trim_dots_and_spaces(&truncated).to_string()
    }
}

fn trim_dots_and_spaces(input: &str) -> &str {
    input.trim_matches(|character: char| character == '.' || character == ' ')
}
