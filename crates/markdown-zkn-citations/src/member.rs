//! Parsing of a single citation inside a cluster.

use std::sync::OnceLock;

use regex::Regex;

use crate::CiteItem;
use crate::labels::{DEFAULT_LABEL, match_label};

/// A bare citekey: starts and ends with a letter, digit or underscore and may
/// contain common punctuation in between.
pub(crate) const CITEKEY: &str = r"[\p{L}\p{N}_](?:[\p{L}\p{N}_:.#$%&+?<>~/\-]*[\p{L}\p{N}_])?";

fn member_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"@(?:\{{([^{{}}]+)\}}|({CITEKEY}))"))
            .expect("Invalid citation member regex")
    })
}

fn locator_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:[0-9]+(?:\s*[-–,]\s*[0-9]+)*|[ivxlcdm]+(?:\s*[-–,]\s*[ivxlcdm]+)*)")
            .expect("Invalid locator regex")
    })
}

/// What follows a citekey, split into locator, label and free suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SuffixParts {
    pub locator: Option<String>,
    pub label: &'static str,
    pub suffix: Option<String>,
}

impl Default for SuffixParts {
    fn default() -> Self {
        Self {
            locator: None,
            label: DEFAULT_LABEL,
            suffix: None,
        }
    }
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Trims and drops a leading comma.
fn clean(text: &str) -> &str {
    let text = text.trim();
    text.strip_prefix(',').unwrap_or(text).trim()
}

/// Parses one `;`-separated member of a bracketed cluster, such as
/// `see -@doe99, pp. 33-35 and elsewhere`. Returns `None` when it holds no
/// usable citekey.
pub(crate) fn parse_member(raw: &str) -> Option<CiteItem> {
    let caps = member_regex()
        .captures_iter(raw)
        .find(|caps| caps.get(0).is_some_and(|m| at_word_start(raw, m.start())))?;
    let whole = caps.get(0)?;
    let id = caps.get(1).or_else(|| caps.get(2))?.as_str().trim().to_string();
    if id.is_empty() {
        return None;
    }

    let prefix = raw[..whole.start()].trim();
    let (prefix, suppress_author) = match prefix.strip_suffix('-') {
        Some(rest) => (Some(rest.trim_end().to_string()), true),
        None if prefix.is_empty() => (None, false),
        None => (Some(prefix.to_string()), false),
    };

    let rest = &raw[whole.end()..];
    let parts = match rest.strip_prefix('{').and_then(|body| body.split_once('}')) {
        Some((locator, after)) => explicit_locator(locator, after),
        None => parse_suffix(rest),
    };

    Some(CiteItem {
        id,
        prefix,
        suffix: parts.suffix,
        locator: parts.locator,
        label: parts.label.to_string(),
        suppress_author,
    })
}

/// An `@` starts a member after whitespace, or after a suppress-author `-`
/// that itself starts a word.
fn at_word_start(raw: &str, at: usize) -> bool {
    let mut before = raw[..at].chars().rev();
    match before.next() {
        None => true,
        Some('-') => before.next().is_none_or(char::is_whitespace),
        Some(c) => c.is_whitespace(),
    }
}

/// Splits the text after a citekey into locator, label and suffix.
///
/// A locator in braces at the start is taken verbatim. Otherwise a label
/// followed by a page or line range anywhere in the text wins over a bare
/// range at its start.
pub(crate) fn parse_suffix(text: &str) -> SuffixParts {
    let text = clean(text);
    if text.is_empty() {
        return SuffixParts::default();
    }
    if let Some((locator, after)) = text.strip_prefix('{').and_then(|body| body.split_once('}')) {
        return explicit_locator(locator, after);
    }
    labelled_locator(text)
        .or_else(|| bare_locator(text))
        .unwrap_or_else(|| SuffixParts {
            suffix: non_empty(text),
            ..SuffixParts::default()
        })
}

fn explicit_locator(locator: &str, after: &str) -> SuffixParts {
    let locator = locator.trim();
    let (label, value) = match match_label(locator) {
        Some((label, len)) => (label, &locator[len..]),
        None => (DEFAULT_LABEL, locator),
    };
    SuffixParts {
        locator: non_empty(value),
        label,
        suffix: non_empty(clean(after)),
    }
}

/// A range at the start of `text` and the byte offset where it ends.
///
/// Roman numerals need a following letter-free boundary, bare ones
/// (`require_end`) must even be followed by the end or a comma.
fn range_at(text: &str, require_end: bool) -> Option<usize> {
    let found = locator_regex().find(text)?;
    let next = text[found.end()..].chars().next();
    let roman = !found.as_str().starts_with(|c: char| c.is_ascii_digit());
    let accepted = if roman && require_end {
        next.is_none_or(|c| c == ',')
    } else {
        next.is_none_or(|c| !c.is_alphanumeric())
    };
    accepted.then_some(found.end())
}

fn labelled_locator(text: &str) -> Option<SuffixParts> {
    let mut previous = None::<char>;
    for (i, c) in text.char_indices() {
        let at_word_start = previous.is_none_or(|p| !p.is_alphanumeric());
        previous = Some(c);
        if !at_word_start {
            continue;
        }
        let Some((label, len)) = match_label(&text[i..]) else {
            continue;
        };
        let after_label = &text[i + len..];
        let value = after_label.trim_start();
        let Some(end) = range_at(value, false) else {
            continue;
        };
        let leftover = [clean(&text[..i]), clean(&value[end..])]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        return Some(SuffixParts {
            locator: Some(value[..end].to_string()),
            label,
            suffix: non_empty(&leftover),
        });
    }
    None
}

fn bare_locator(text: &str) -> Option<SuffixParts> {
    let end = range_at(text, true)?;
    Some(SuffixParts {
        locator: Some(text[..end].to_string()),
        label: DEFAULT_LABEL,
        suffix: non_empty(clean(&text[end..])),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn parts(locator: Option<&str>, label: &'static str, suffix: Option<&str>) -> SuffixParts {
        SuffixParts {
            locator: locator.map(str::to_string),
            label,
            suffix: suffix.map(str::to_string),
        }
    }

    #[rstest]
    #[case("", parts(None, "page", None))]
    #[case(", 33 and someplace else", parts(Some("33"), "page", Some("and someplace else")))]
    #[case(", pp. 33-35", parts(Some("33-35"), "page", None))]
    #[case(", chap. 4, for example", parts(Some("4"), "chapter", Some("for example")))]
    #[case(", see also vol. 2", parts(Some("2"), "volume", Some("see also")))]
    #[case(", 12 and ch. 3", parts(Some("3"), "chapter", Some("12 and")))]
    #[case(", xiv", parts(Some("xiv"), "page", None))]
    #[case(", mix of things", parts(None, "page", Some("mix of things")))]
    #[case(", {Fig. 3a} right", parts(Some("3a"), "figure", Some("right")))]
    #[case(", emphasis added", parts(None, "page", Some("emphasis added")))]
    fn splits_suffix(#[case] text: &str, #[case] expected: SuffixParts) {
        assert_eq!(parse_suffix(text), expected);
    }

    #[test]
    fn member_with_prefix_and_explicit_locator() {
        let item = parse_member("see @doe99{ch. 2}, with changes").unwrap();
        assert_eq!(item.id, "doe99");
        assert_eq!(item.prefix.as_deref(), Some("see"));
        assert_eq!(item.locator.as_deref(), Some("2"));
        assert_eq!(item.label, "chapter");
        assert_eq!(item.suffix.as_deref(), Some("with changes"));
        assert!(!item.suppress_author);
    }

    #[test]
    fn braced_key_keeps_inner_text() {
        let item = parse_member("@{Doe & Co 2001}").unwrap();
        assert_eq!(item.id, "Doe & Co 2001");
    }

    #[test]
    fn suppress_author_with_prose_prefix() {
        let item = parse_member(" compare -@smith04, 12").unwrap();
        assert!(item.suppress_author);
        assert_eq!(item.prefix.as_deref(), Some("compare"));
        assert_eq!(item.locator.as_deref(), Some("12"));
    }

    #[rstest]
    #[case("see - @doe99", Some("see"))]
    #[case("see -@doe99", Some("see"))]
    #[case(" - @doe99", Some(""))]
    #[case("-@doe99", Some(""))]
    fn trailing_dash_in_prefix_suppresses_author(
        #[case] raw: &str,
        #[case] prefix: Option<&str>,
    ) {
        let item = parse_member(raw).unwrap();
        assert!(item.suppress_author);
        assert_eq!(item.prefix.as_deref(), prefix);
    }

    #[test]
    fn dash_inside_a_word_is_not_a_marker() {
        assert_eq!(parse_member("foo-@doe99"), None);
        let item = parse_member("pre-print @doe99").unwrap();
        assert!(!item.suppress_author);
        assert_eq!(item.prefix.as_deref(), Some("pre-print"));
    }

    #[rstest]
    #[case("no key here")]
    #[case("mail me@example.com")]
    #[case("@")]
    fn members_without_key_are_rejected(#[case] raw: &str) {
        assert_eq!(parse_member(raw), None);
    }

    #[test]
    fn key_does_not_swallow_trailing_punctuation() {
        let item = parse_member("@doe99.").unwrap();
        assert_eq!(item.id, "doe99");
        assert_eq!(item.suffix.as_deref(), Some("."));
    }
}
