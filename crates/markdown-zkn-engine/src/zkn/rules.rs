//! Ordered recognisers for the body of a Zettelkasten note.
//!
//! Each rule either claims the read position and returns a style, or passes
//! without consuming anything. The first rule that claims wins, so the order
//! of [`NORMAL_RULES`] decides every conflict between constructs.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;

use super::css::css_escape;
use super::{MathDelimiter, MathState, ZknMode, ZknState};
use crate::grammar::{Mode, Style, join_styles};
use crate::stream::StringStream;

pub const ESCAPE_CHAR: &str = "escape-char";
pub const FOOTNOTE_FORMATTING: &str = "formatting formatting-footnote";
pub const LINK_FORMATTING: &str = "formatting formatting-link zkn-link-formatting";
pub const LINK: &str = "zkn-link";
pub const MATH_FORMATTING: &str = "formatting formatting-math";
pub const MATH: &str = "math";
pub const HIGHLIGHT: &str = "highlight";
pub const TABLE: &str = "table";
pub const IDENTIFIER: &str = "zkn-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    FootnoteDefinition,
    CodeOrComment,
    MathContent,
    MathClose,
    Escape,
    EscapedChar,
    LinkContent,
    MathOpen,
    Highlight,
    TableRow,
    Heading,
    Hashtag,
    LinkOpen,
    Identifier,
    Markdown,
}

pub(crate) enum Outcome {
    Pass,
    Emit(Option<Style>),
}

type RuleFn = fn(&ZknMode, &mut StringStream<'_>, &mut ZknState) -> Outcome;

pub(crate) struct Rule {
    pub kind: RuleKind,
    pub apply: RuleFn,
}

#[rustfmt::skip]
pub(crate) const NORMAL_RULES: [Rule; 15] = [
    Rule { kind: RuleKind::FootnoteDefinition, apply: footnote_definition },
    Rule { kind: RuleKind::CodeOrComment, apply: code_or_comment },
    Rule { kind: RuleKind::MathContent, apply: math_content },
    Rule { kind: RuleKind::MathClose, apply: math_close },
    Rule { kind: RuleKind::Escape, apply: escape },
    Rule { kind: RuleKind::EscapedChar, apply: escaped_char },
    Rule { kind: RuleKind::LinkContent, apply: link_content },
    Rule { kind: RuleKind::MathOpen, apply: math_open },
    Rule { kind: RuleKind::Highlight, apply: highlight },
    Rule { kind: RuleKind::TableRow, apply: table_row },
    Rule { kind: RuleKind::Heading, apply: heading },
    Rule { kind: RuleKind::Hashtag, apply: hashtag },
    Rule { kind: RuleKind::LinkOpen, apply: link_open },
    Rule { kind: RuleKind::Identifier, apply: identifier },
    Rule { kind: RuleKind::Markdown, apply: markdown },
];

/// Runs the rules in order and returns the style of the first one that claims.
pub(crate) fn run(
    mode: &ZknMode,
    stream: &mut StringStream<'_>,
    state: &mut ZknState,
) -> Option<Style> {
    for rule in &NORMAL_RULES {
        if let Outcome::Emit(style) = (rule.apply)(mode, stream, state) {
            return style;
        }
    }
    None
}

/// Applies a single rule, for tests that need to check one rule in isolation.
#[cfg(test)]
pub(crate) fn apply_rule(
    kind: RuleKind,
    mode: &ZknMode,
    stream: &mut StringStream<'_>,
    state: &mut ZknState,
) -> Option<Option<Style>> {
    let rule = NORMAL_RULES.iter().find(|rule| rule.kind == kind)?;
    match (rule.apply)(mode, stream, state) {
        Outcome::Pass => None,
        Outcome::Emit(style) => Some(style),
    }
}

macro_rules! static_regex {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| {
                Regex::new($pattern).expect(concat!("Invalid regex ", stringify!($name)))
            })
        }
    };
}

static_regex!(footnote_definition_regex, r"^\[\^[^\]\s]+\]:");
static_regex!(highlight_regex, r"^(?:==[^\s=](?:[^=]*[^\s=])?==|::[^\s:](?:[^:]*[^\s:])?::)");
static_regex!(pipe_row_regex, r"^\s*\|.*\|\s*$");
static_regex!(grid_border_regex, r"^\s*\+[-=:+]+\+\s*$");
static_regex!(heading_regex, r"^#{1,6}(?:\s|$)");

fn emit(style: &'static str) -> Outcome {
    Outcome::Emit(Some(Cow::Borrowed(style)))
}

/// Whether the byte at `at` follows an odd run of backslashes.
fn is_escaped(text: &str, at: usize) -> bool {
    text[..at].bytes().rev().take_while(|&b| b == b'\\').count() % 2 == 1
}

/// Byte offset of the first unescaped closing delimiter in `rest`.
fn find_math_close(rest: &str, delimiter: MathDelimiter) -> Option<usize> {
    let token = delimiter.token();
    let mut from = 0;
    while let Some(found) = rest[from..].find(token) {
        let at = from + found;
        if !is_escaped(rest, at) {
            return Some(at);
        }
        from = at + 1;
    }
    None
}

fn footnote_definition(_: &ZknMode, stream: &mut StringStream<'_>, _: &mut ZknState) -> Outcome {
    if stream.sol() && stream.match_regex(footnote_definition_regex(), true).is_some() {
        return emit(FOOTNOTE_FORMATTING);
    }
    Outcome::Pass
}

fn code_or_comment(mode: &ZknMode, stream: &mut StringStream<'_>, state: &mut ZknState) -> Outcome {
    if state.markdown.in_code_or_comment() {
        return Outcome::Emit(mode.markdown.token(stream, &mut state.markdown));
    }
    Outcome::Pass
}

fn math_content(mode: &ZknMode, stream: &mut StringStream<'_>, state: &mut ZknState) -> Outcome {
    let Some(math) = state.math.as_mut() else {
        return Outcome::Pass;
    };
    let style = match find_math_close(stream.rest(), math.delimiter) {
        Some(0) => return Outcome::Pass,
        Some(offset) => {
            let limit = stream.pos() + offset;
            stream.with_limit(limit, |s| mode.tex.token(s, &mut math.tex))
        }
        None => mode.tex.token(stream, &mut math.tex),
    };
    Outcome::Emit(join_styles(Some(Cow::Borrowed(MATH)), style))
}

fn math_close(_: &ZknMode, stream: &mut StringStream<'_>, state: &mut ZknState) -> Outcome {
    let Some(math) = &state.math else {
        return Outcome::Pass;
    };
    if stream.match_str(math.delimiter.token(), true) {
        state.math = None;
        return emit(MATH_FORMATTING);
    }
    Outcome::Pass
}

fn escape(_: &ZknMode, stream: &mut StringStream<'_>, state: &mut ZknState) -> Outcome {
    if stream.eat('\\') {
        state.escaped = !stream.eol();
        return emit(ESCAPE_CHAR);
    }
    Outcome::Pass
}

fn escaped_char(_: &ZknMode, stream: &mut StringStream<'_>, state: &mut ZknState) -> Outcome {
    if state.escaped {
        state.escaped = false;
        stream.bump();
        return Outcome::Emit(None);
    }
    Outcome::Pass
}

fn link_content(mode: &ZknMode, stream: &mut StringStream<'_>, state: &mut ZknState) -> Outcome {
    if !state.in_link {
        return Outcome::Pass;
    }
    let end = mode.options.link_end();
    if stream.match_str(end, true) {
        state.in_link = false;
        return emit(LINK_FORMATTING);
    }
    if !stream.skip_to_str(end) {
        stream.skip_to_end();
    }
    emit(LINK)
}

fn math_open(_: &ZknMode, stream: &mut StringStream<'_>, state: &mut ZknState) -> Outcome {
    if stream.match_str(MathDelimiter::Double.token(), true) {
        state.math = Some(MathState::new(MathDelimiter::Double));
        return emit(MATH_FORMATTING);
    }
    if stream.peek() != Some('$') {
        return Outcome::Pass;
    }
    // `$` must hug its content on both sides and close on this line.
    let body = &stream.rest()[1..];
    if body.chars().next().is_none_or(|c| c.is_whitespace() || c == '$') {
        return Outcome::Pass;
    }
    let Some(close) = find_math_close(body, MathDelimiter::Single) else {
        return Outcome::Pass;
    };
    if body[..close].ends_with(char::is_whitespace) {
        return Outcome::Pass;
    }
    if body[close + 1..].chars().next().is_some_and(|c| c.is_ascii_digit()) {
        return Outcome::Pass;
    }
    stream.bump();
    state.math = Some(MathState::new(MathDelimiter::Single));
    emit(MATH_FORMATTING)
}

fn highlight(_: &ZknMode, stream: &mut StringStream<'_>, _: &mut ZknState) -> Outcome {
    if stream.match_regex(highlight_regex(), true).is_some() {
        return emit(HIGHLIGHT);
    }
    Outcome::Pass
}

fn table_row(_: &ZknMode, stream: &mut StringStream<'_>, _: &mut ZknState) -> Outcome {
    let line = stream.text();
    if stream.sol() && (pipe_row_regex().is_match(line) || grid_border_regex().is_match(line)) {
        stream.skip_to_end();
        return emit(TABLE);
    }
    Outcome::Pass
}

fn heading(mode: &ZknMode, stream: &mut StringStream<'_>, state: &mut ZknState) -> Outcome {
    if stream.sol() && stream.match_regex(heading_regex(), false).is_some() {
        return Outcome::Emit(mode.markdown.token(stream, &mut state.markdown));
    }
    Outcome::Pass
}

fn hashtag(mode: &ZknMode, stream: &mut StringStream<'_>, _: &mut ZknState) -> Outcome {
    if stream.peek() != Some('#') || !stream.preceding_char().is_none_or(char::is_whitespace) {
        return Outcome::Pass;
    }
    match stream.match_regex(mode.options.tag_regex(), true) {
        Some(tag) => Outcome::Emit(Some(Cow::Owned(format!(
            "zkn-tag zkn-tag-{}",
            css_escape(&tag[1..])
        )))),
        None => Outcome::Pass,
    }
}

fn link_open(mode: &ZknMode, stream: &mut StringStream<'_>, state: &mut ZknState) -> Outcome {
    let start = mode.options.link_start();
    let rest = stream.rest();
    if rest.starts_with(start) && rest[start.len()..].contains(mode.options.link_end()) {
        stream.match_str(start, true);
        state.in_link = true;
        return emit(LINK_FORMATTING);
    }
    Outcome::Pass
}

fn identifier(mode: &ZknMode, stream: &mut StringStream<'_>, _: &mut ZknState) -> Outcome {
    if stream.preceding_char().is_some_and(char::is_alphanumeric) {
        return Outcome::Pass;
    }
    let rest = stream.rest();
    let Some(len) = mode.options.identifier_len(rest) else {
        return Outcome::Pass;
    };
    if rest[len..].chars().next().is_some_and(char::is_alphanumeric) {
        return Outcome::Pass;
    }
    stream.set_pos(stream.pos() + len);
    emit(IDENTIFIER)
}

fn markdown(mode: &ZknMode, stream: &mut StringStream<'_>, state: &mut ZknState) -> Outcome {
    Outcome::Emit(mode.markdown.token(stream, &mut state.markdown))
}
