//! Finding citation clusters in a line of text.

use std::sync::OnceLock;

use regex::Regex;

use crate::member::{CITEKEY, parse_member, parse_suffix};
use crate::{CiteItem, CitePosition};

fn full_cluster_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[([^\[\]]*@[^\[\]]+)\]").expect("Invalid cluster regex"))
}

fn in_text_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"@(?:\{{([^{{}}\s][^{{}}]*)\}}|({CITEKEY}))(?:[ \t]+\[([^\[\]@]*)\])?"
        ))
        .expect("Invalid in-text citation regex")
    })
}

/// Bracketed clusters such as `[see @doe99, p. 4; @roe]`.
///
/// Escaped brackets, wiki links and Markdown links (`[@x](url)`) are not
/// clusters. Members without a usable citekey are dropped, and a cluster
/// left without members is dropped entirely.
pub(crate) fn full_clusters(text: &str) -> Vec<CitePosition> {
    let mut clusters = Vec::new();
    for caps in full_cluster_regex().captures_iter(text) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let before = &text[..whole.start()];
        let after = &text[whole.end()..];
        if before.ends_with('\\') || before.ends_with('[') || after.starts_with('(') {
            continue;
        }

        let citations: Vec<CiteItem> = inner
            .as_str()
            .split(';')
            .filter_map(|raw| {
                let item = parse_member(raw);
                if item.is_none() {
                    log::debug!("dropping citation member {raw:?} in {:?}", whole.as_str());
                }
                item
            })
            .collect();
        if citations.is_empty() {
            log::debug!("no citations left in cluster {:?}", whole.as_str());
            continue;
        }

        clusters.push(CitePosition {
            from: whole.start(),
            to: whole.end(),
            source: whole.as_str().to_string(),
            composite: false,
            citations,
        });
    }
    clusters
}

/// In-text citations such as `@doe99` or `@doe99 [p. 4]`, skipping any that
/// fall inside one of `clusters`.
pub(crate) fn in_text(text: &str, clusters: &[CitePosition]) -> Vec<CitePosition> {
    let mut found = Vec::new();
    for caps in in_text_regex().captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let at = whole.start();
        let preceded_ok = text[..at]
            .chars()
            .next_back()
            .is_none_or(|c| c.is_whitespace() || c == '(');
        if !preceded_ok || clusters.iter().any(|c| c.from <= at && at < c.to) {
            continue;
        }
        let Some(id) = caps.get(1).or_else(|| caps.get(2)) else {
            continue;
        };
        let parts = caps
            .get(3)
            .map(|suffix| parse_suffix(suffix.as_str()))
            .unwrap_or_default();

        found.push(CitePosition {
            from: at,
            to: whole.end(),
            source: whole.as_str().to_string(),
            composite: true,
            citations: vec![CiteItem {
                id: id.as_str().trim().to_string(),
                prefix: None,
                suffix: parts.suffix,
                locator: parts.locator,
                label: parts.label.to_string(),
                suppress_author: false,
            }],
        });
    }
    found
}
