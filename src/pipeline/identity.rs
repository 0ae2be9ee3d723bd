use tracing::{debug, info};

use crate::model::IdentityFragment;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordRule {
    pub priority: usize,
    pub keyword: String,
    needle: String,
}

impl KeywordRule {
    fn matches(&self, line: &str) -> bool {
        line.to_lowercase().contains(&self.needle)
    }
}

#[derive(Debug, Clone, Default)]
pub struct IdentityRules {
    rules: Vec<KeywordRule>,
}

impl IdentityRules {
    pub fn from_keywords<S: AsRef<str>>(keywords: &[S]) -> Self {
        let rules = keywords
            .iter()
            .enumerate()
            .map(|(priority, keyword)| KeywordRule {
                priority,
                keyword: keyword.as_ref().to_string(),
                needle: keyword.as_ref().to_lowercase(),
            })
            .collect();
        Self { rules }
    }

    pub fn extract(&self, page_text: &str) -> IdentityFragment {
        let lines = page_text.lines().collect::<Vec<&str>>();

        for rule in &self.rules {
            let matched = lines
                .iter()
                .filter(|line| rule.matches(line))
                .map(|line| line.to_string())
                .collect::<Vec<String>>();

            debug!(
                priority = rule.priority,
                keyword = %rule.keyword,
                matched_lines = matched.len(),
                "identity keyword tried"
            );

            if !matched.is_empty() {
                info!(
                    keyword = %rule.keyword,
                    priority = rule.priority,
                    matched_lines = matched.len(),
                    "identity keyword matched"
                );
                return IdentityFragment {
                    keyword_used: Some(rule.keyword.clone()),
                    lines: matched,
                };
            }
        }

        info!(
            chars = page_text.chars().count(),
            "no identity keyword matched, using whole page text"
        );
        IdentityFragment::whole_page(page_text)
    }
}

// Source forms repeat the keyword as the field label, so it is dropped from
// the matched lines before normalization.
pub fn strip_keywords<S: AsRef<str>>(fragment: &IdentityFragment, keywords: &[S]) -> IdentityFragment {
    if fragment.is_whole_page() {
        return fragment.clone();
    }

    let lines = fragment
        .lines
        .iter()
        .map(|line| {
            keywords
                .iter()
                .fold(line.clone(), |acc, keyword| acc.replace(keyword.as_ref(), ""))
        })
        .collect();

    IdentityFragment {
        keyword_used: fragment.keyword_used.clone(),
        lines,
    }
}
