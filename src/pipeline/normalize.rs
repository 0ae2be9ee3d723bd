use tracing::{debug, warn};

use crate::model::{IdentityFragment, NormalizedLabel};

const FIELD_SEPARATORS: &[char] = &[':', ';', ',', '|'];

pub fn normalize<S: AsRef<str>>(text: &str, boilerplate: &[S], sentinel: &str) -> NormalizedLabel {
    let mut current = collapse_whitespace(text);
    debug!(chars = current.chars().count(), "collapsed whitespace");

    // Removing one entry can splice together another, so strip to a fixpoint.
    loop {
        let stripped = boilerplate
            .iter()
            .fold(current.clone(), |acc, entry| acc.replace(entry.as_ref(), ""));
        let next = trim_field_separators(&collapse_whitespace(&stripped));
        if next == current {
            break;
        }
        current = next;
    }

    if current.is_empty() {
        warn!(sentinel = %sentinel, "normalized label is empty, substituting sentinel");
        return NormalizedLabel {
            text: sentinel.to_string(),
            fallback: true,
        };
    }

    NormalizedLabel {
        text: current,
        fallback: false,
    }
}

pub fn normalize_fragment<S: AsRef<str>>(
    fragment: &IdentityFragment,
    boilerplate: &[S],
    sentinel: &str,
) -> NormalizedLabel {
    normalize(&fragment.text(), boilerplate, sentinel)
}

pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<&str>>().join(" ")
}

fn trim_field_separators(input: &str) -> String {
    input
        .trim_matches(|character: char| {
            character.is_whitespace() || FIELD_SEPARATORS.contains(&character)
        })
        .to_string()
}
