//! Pandoc-style citation extraction for Zettelkasten notes.
//!
//! Finds bracketed clusters like `[see @doe99, pp. 33-35; -@roe]` and
//! in-text citations like `@doe99 [p. 4]` and splits each citation into
//! citekey, prefix, locator, label and suffix.

use serde::Serialize;

mod detect;
pub mod labels;
mod member;

pub use labels::{DEFAULT_LABEL, LABELS, label_names, match_label};

/// One citation inside a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CiteItem {
    pub id: String,
    /// Text before the citekey. `Some("")` for a bare suppressed-author
    /// citation such as `-@doe99`.
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub locator: Option<String>,
    /// One of the canonical names in [`LABELS`], `page` unless stated.
    pub label: String,
    pub suppress_author: bool,
}

/// A citation cluster and where it sits in the text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CitePosition {
    /// Byte offset of the first character of the cluster.
    pub from: usize,
    /// Byte offset just past the last character.
    pub to: usize,
    pub source: String,
    /// `true` for in-text citations, `false` for bracketed clusters.
    pub composite: bool,
    pub citations: Vec<CiteItem>,
}

/// Every citation cluster in `text`, ordered by position.
///
/// Offsets are byte offsets into `text`. In-text citations inside a
/// bracketed cluster belong to that cluster and are not reported twice.
pub fn extract_citations(text: &str) -> Vec<CitePosition> {
    let clusters = detect::full_clusters(text);
    let in_text = detect::in_text(text, &clusters);

    let mut all: Vec<CitePosition> = clusters.into_iter().chain(in_text).collect();
    all.sort_by_key(|position| position.from);
    log::trace!("found {} citation clusters", all.len());
    all
}
