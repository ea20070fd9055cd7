use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;

use crate::grammar::{Mode, Style, join_styles};
use crate::stream::StringStream;

const HEADER_STYLES: [&str; 6] = [
    "formatting formatting-header formatting-header-1 header header-1",
    "formatting formatting-header formatting-header-2 header header-2",
    "formatting formatting-header formatting-header-3 header header-3",
    "formatting formatting-header formatting-header-4 header header-4",
    "formatting formatting-header formatting-header-5 header header-5",
    "formatting formatting-header formatting-header-6 header header-6",
];

const CODE_BLOCK_FORMATTING: &str = "formatting formatting-code-block";
const CODE_BLOCK: &str = "code-block";
const INLINE_CODE_FORMATTING: &str = "formatting formatting-code code";
const INLINE_CODE: &str = "code";
const COMMENT: &str = "comment";

/// An open fenced code block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fence {
    pub marker: char,
    pub len: usize,
    pub info: String,
}

/// Block and inline context carried across lines.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MarkdownState {
    pub fence: Option<Fence>,
    /// Length of the backtick run that opened an inline code span.
    pub inline_code: Option<usize>,
    pub comment: bool,
    pub strong: bool,
    pub em: bool,
    pub strike: bool,
    pub link_text: bool,
    /// ATX heading level of the current line, 0 when none.
    pub header: u8,
    pub quote: u8,
    pub list: bool,
}

impl MarkdownState {
    /// True while inside a code block, an inline code span or an HTML comment.
    pub fn in_code_or_comment(&self) -> bool {
        self.fence.is_some() || self.inline_code.is_some() || self.comment
    }

    /// Classes that apply to every token on the current line or inline span.
    fn context_style(&self) -> Option<Style> {
        let mut parts: Vec<Cow<'static, str>> = Vec::new();
        if self.header > 0 {
            parts.push(Cow::Owned(format!("header header-{}", self.header)));
        }
        if self.quote > 0 {
            parts.push(Cow::Owned(format!("quote quote-{}", self.quote)));
        }
        if self.strong {
            parts.push(Cow::Borrowed("strong"));
        }
        if self.em {
            parts.push(Cow::Borrowed("em"));
        }
        if self.strike {
            parts.push(Cow::Borrowed("strikethrough"));
        }
        if self.link_text {
            parts.push(Cow::Borrowed("link"));
        }
        match parts.len() {
            0 => None,
            1 => parts.pop(),
            _ => Some(Cow::Owned(parts.join(" "))),
        }
    }

    /// Clears the line-level context (heading, quote, list) at a line start.
    pub fn start_line(&mut self) {
        self.header = 0;
        self.quote = 0;
        self.list = false;
    }

    fn reset_inline(&mut self) {
        self.inline_code = None;
        self.strong = false;
        self.em = false;
        self.strike = false;
        self.link_text = false;
    }
}

/// CommonMark-flavoured Markdown tokenizer.
///
/// Block constructs are recognised at the start of a line; everything else
/// is tokenized as inline text in word-sized chunks so that a grammar layered
/// on top can claim any position between words.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownMode;

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

static_regex!(atx_heading, r"^ {0,3}(#{1,6})(?:[ \t]+|$)");
static_regex!(thematic_break, r"^ {0,3}(?:(?:-[ \t]*){3,}|(?:\*[ \t]*){3,}|(?:_[ \t]*){3,})$");
static_regex!(fence_open, r"^ {0,3}(?:(`{3,})([^`]*)|(~{3,})(.*))$");
static_regex!(quote_marker, r"^ {0,3}>[ \t]?");
static_regex!(list_marker, r"^[ \t]*(?:[*+-]|\d{1,9}[.)])(?:[ \t]+|$)");
static_regex!(task_box, r"^\[[ xX]\](?:[ \t]|$)");
static_regex!(autolink, r"^<(?:(?:https?|ftp|mailto):[^\s>]+|[\w.+-]+@[\w-]+(?:\.[\w-]+)+)>");
static_regex!(bare_url, r"^(?:https?://|www\.)[^\s<>\[\]()]+");
static_regex!(link_target, r#"^\]\((?:[^()\s]|\([^()\s]*\))*(?:[ \t]+"[^"]*")?\)"#);
static_regex!(reference_target, r"^\]\[[^\]]*\]");
static_regex!(footnote_ref, r"^\[\^[^\]\s]+\]");
static_regex!(text_run, r"^[^\s#!\[\]*_\\<>`$=:|~]+");

fn is_fence_close(fence: &Fence, line: &str) -> bool {
    let trimmed = line.trim_start_matches(' ');
    if line.len() - trimmed.len() > 3 {
        return false;
    }
    let run = trimmed.chars().take_while(|&c| c == fence.marker).count();
    run >= fence.len && trimmed[run * fence.marker.len_utf8()..].trim().is_empty()
}

fn backtick_run(rest: &str) -> usize {
    rest.bytes().take_while(|&b| b == b'`').count()
}

/// Whether a `[` at the read position starts a link with a resolvable target.
fn starts_link(rest: &str) -> bool {
    let Some(close) = rest.find(']') else {
        return false;
    };
    let after = &rest[close..];
    link_target().is_match(after) || reference_target().is_match(after)
}

impl MarkdownMode {
    fn block_start(
        &self,
        stream: &mut StringStream<'_>,
        state: &mut MarkdownState,
    ) -> Option<Style> {
        if let Some(caps) = stream.captures(atx_heading(), true) {
            let level = caps.get(1).map_or(1, |m| m.len());
            state.header = level as u8;
            return Some(Cow::Borrowed(HEADER_STYLES[level - 1]));
        }

        if stream.match_regex(thematic_break(), true).is_some() {
            return Some(Cow::Borrowed("hr"));
        }

        if let Some(caps) = stream.captures(fence_open(), true) {
            let (run, info) = match caps.get(1) {
                Some(run) => (Some(run), caps.get(2)),
                None => (caps.get(3), caps.get(4)),
            };
            let Some(run) = run else {
                return None;
            };
            let marker = if run.as_str().starts_with('`') { '`' } else { '~' };
            state.fence = Some(Fence {
                marker,
                len: run.len(),
                info: info.map_or(String::new(), |m| m.as_str().trim().to_string()),
            });
            return Some(Cow::Borrowed(CODE_BLOCK_FORMATTING));
        }

        let mut depth = 0u8;
        while stream.match_regex(quote_marker(), true).is_some() {
            depth = depth.saturating_add(1);
        }
        if depth > 0 {
            state.quote = depth;
            return Some(Cow::Owned(format!(
                "formatting formatting-quote formatting-quote-{depth} quote quote-{depth}"
            )));
        }

        if stream.match_regex(list_marker(), true).is_some() {
            state.list = true;
            if stream.match_regex(task_box(), true).is_some() {
                return Some(Cow::Borrowed("formatting formatting-list formatting-task list"));
            }
            return Some(Cow::Borrowed("formatting formatting-list list"));
        }

        None
    }

    fn inline(&self, stream: &mut StringStream<'_>, state: &mut MarkdownState) -> Option<Style> {
        let context = state.context_style();
        let Some(c) = stream.peek() else {
            return context;
        };

        if c.is_whitespace() {
            stream.eat_while(char::is_whitespace);
            return context;
        }

        if stream.match_str("<!--", true) {
            if stream.skip_to_str("-->") {
                stream.match_str("-->", true);
            } else {
                stream.skip_to_end();
                state.comment = true;
            }
            return Some(Cow::Borrowed(COMMENT));
        }

        if c == '`' {
            let run = backtick_run(stream.rest());
            stream.set_pos(stream.pos() + run);
            state.inline_code = Some(run);
            return join_styles(context, Some(Cow::Borrowed(INLINE_CODE_FORMATTING)));
        }

        if stream.match_str("**", true) || stream.match_str("__", true) {
            state.strong = !state.strong;
            return join_styles(context, Some(Cow::Borrowed("formatting formatting-strong strong")));
        }

        if stream.match_str("~~", true) {
            state.strike = !state.strike;
            return join_styles(
                context,
                Some(Cow::Borrowed("formatting formatting-strikethrough strikethrough")),
            );
        }

        if c == '*' || c == '_' {
            let intraword = c == '_'
                && stream.preceding_char().is_some_and(char::is_alphanumeric)
                && stream.rest()[1..].chars().next().is_some_and(char::is_alphanumeric);
            stream.bump();
            if intraword {
                return context;
            }
            state.em = !state.em;
            return join_styles(context, Some(Cow::Borrowed("formatting formatting-em em")));
        }

        if stream.match_regex(footnote_ref(), true).is_some() {
            return join_styles(context, Some(Cow::Borrowed("link footnote")));
        }

        if c == '!' && stream.rest()[1..].starts_with('[') && starts_link(&stream.rest()[1..]) {
            stream.match_str("![", true);
            state.link_text = true;
            return join_styles(
                context,
                Some(Cow::Borrowed("formatting formatting-image image link")),
            );
        }

        if c == '[' && !state.link_text && starts_link(stream.rest()) {
            stream.bump();
            state.link_text = true;
            return join_styles(context, Some(Cow::Borrowed("formatting formatting-link link")));
        }

        if c == ']' && state.link_text {
            state.link_text = false;
            if stream.match_regex(link_target(), true).is_some()
                || stream.match_regex(reference_target(), true).is_some()
            {
                return join_styles(
                    state.context_style(),
                    Some(Cow::Borrowed("formatting formatting-link-string string url")),
                );
            }
            stream.bump();
            return join_styles(context, Some(Cow::Borrowed("formatting formatting-link link")));
        }

        if stream.match_regex(autolink(), true).is_some() {
            return join_styles(context, Some(Cow::Borrowed("link url")));
        }

        let at_word_start = stream.preceding_char().is_none_or(|p| !p.is_alphanumeric());
        if at_word_start && stream.match_regex(bare_url(), true).is_some() {
            return join_styles(context, Some(Cow::Borrowed("url")));
        }

        if stream.match_regex(text_run(), true).is_none() {
            stream.bump();
        }
        context
    }
}

impl Mode for MarkdownMode {
    type State = MarkdownState;

    fn name(&self) -> &str {
        "markdown"
    }

    fn start_state(&self) -> MarkdownState {
        MarkdownState::default()
    }

    fn token(&self, stream: &mut StringStream<'_>, state: &mut MarkdownState) -> Option<Style> {
        if stream.sol() {
            state.start_line();
        }

        if let Some(fence) = &state.fence {
            if stream.sol() && is_fence_close(fence, stream.text()) {
                stream.skip_to_end();
                state.fence = None;
                return Some(Cow::Borrowed(CODE_BLOCK_FORMATTING));
            }
            stream.skip_to_end();
            return Some(Cow::Borrowed(CODE_BLOCK));
        }

        if state.comment {
            if stream.skip_to_str("-->") {
                stream.match_str("-->", true);
                state.comment = false;
            } else {
                stream.skip_to_end();
            }
            return Some(Cow::Borrowed(COMMENT));
        }

        if stream.sol() && stream.text().trim().is_empty() {
            stream.skip_to_end();
            self.blank_line(state);
            return None;
        }

        if let Some(open) = state.inline_code {
            let run = backtick_run(stream.rest());
            if run == open {
                stream.set_pos(stream.pos() + run);
                state.inline_code = None;
                return join_styles(
                    state.context_style(),
                    Some(Cow::Borrowed(INLINE_CODE_FORMATTING)),
                );
            }
            if run > 0 {
                stream.set_pos(stream.pos() + run);
            } else if !stream.skip_to('`') {
                stream.skip_to_end();
            }
            return join_styles(state.context_style(), Some(Cow::Borrowed(INLINE_CODE)));
        }

        if stream.sol()
            && let Some(style) = self.block_start(stream, state)
        {
            return Some(style);
        }

        self.inline(stream, state)
    }

    fn blank_line(&self, state: &mut MarkdownState) {
        state.reset_inline();
        state.start_line();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(lines: &[&str]) -> (Vec<Vec<(String, Option<String>)>>, MarkdownState) {
        let mut state = MarkdownMode.start_state();
        let tokens = lines
            .iter()
            .map(|line| {
                if line.is_empty() {
                    MarkdownMode.blank_line(&mut state);
                }
                let mut stream = StringStream::new(line);
                let mut out = Vec::new();
                while !stream.eol() {
                    stream.begin_token();
                    let style = MarkdownMode.token(&mut stream, &mut state);
                    out.push((stream.current().to_string(), style.map(|s| s.into_owned())));
                }
                out
            })
            .collect();
        (tokens, state)
    }

    fn tok(text: &str, style: Option<&str>) -> (String, Option<String>) {
        (text.to_string(), style.map(str::to_string))
    }

    #[test]
    fn heading_styles_whole_line() {
        let (lines, _) = run(&["## Title here"]);
        assert_eq!(
            lines[0],
            vec![
                tok("## ", Some(HEADER_STYLES[1])),
                tok("Title", Some("header header-2")),
                tok(" ", Some("header header-2")),
                tok("here", Some("header header-2")),
            ]
        );
    }

    #[test]
    fn hashtag_is_not_a_heading() {
        let (lines, state) = run(&["#tag"]);
        assert_eq!(state.header, 0);
        assert_eq!(lines[0][0], tok("#", None));
    }

    #[test]
    fn fenced_block_tracks_marker_and_length() {
        let (lines, state) = run(&["````rust", "```", "code", "````"]);
        assert_eq!(lines[0], vec![tok("````rust", Some(CODE_BLOCK_FORMATTING))]);
        assert_eq!(lines[1], vec![tok("```", Some(CODE_BLOCK))]);
        assert_eq!(lines[2], vec![tok("code", Some(CODE_BLOCK))]);
        assert_eq!(lines[3], vec![tok("````", Some(CODE_BLOCK_FORMATTING))]);
        assert_eq!(state.fence, None);
    }

    #[test]
    fn fence_survives_blank_line() {
        let (_, state) = run(&["~~~", ""]);
        assert_eq!(
            state.fence,
            Some(Fence {
                marker: '~',
                len: 3,
                info: String::new()
            })
        );
        assert!(state.in_code_or_comment());
    }

    #[test]
    fn inline_code_matches_backtick_run_length() {
        let (lines, state) = run(&["a ``x ` y`` b"]);
        let styles: Vec<_> = lines[0].iter().map(|(t, s)| (t.as_str(), s.as_deref())).collect();
        assert_eq!(
            styles,
            vec![
                ("a", None),
                (" ", None),
                ("``", Some(INLINE_CODE_FORMATTING)),
                ("x ", Some(INLINE_CODE)),
                ("`", Some(INLINE_CODE)),
                (" y", Some(INLINE_CODE)),
                ("``", Some(INLINE_CODE_FORMATTING)),
                (" ", None),
                ("b", None),
            ]
        );
        assert_eq!(state.inline_code, None);
    }

    #[test]
    fn comment_spans_lines() {
        let (lines, state) = run(&["text <!-- open", "still", "done --> after"]);
        assert_eq!(lines[0][2], tok("<!-- open", Some(COMMENT)));
        assert_eq!(lines[1], vec![tok("still", Some(COMMENT))]);
        assert_eq!(lines[2][0], tok("done -->", Some(COMMENT)));
        assert!(!state.comment);
    }

    #[test]
    fn emphasis_toggles_and_blank_line_resets() {
        let (lines, state) = run(&["**bold** *it"]);
        assert_eq!(lines[0][1], tok("bold", Some("strong")));
        assert_eq!(lines[0][4], tok("*", Some("formatting formatting-em em")));
        assert!(state.em);
        let (_, state) = run(&["*it", ""]);
        assert!(!state.em);
    }

    #[test]
    fn intraword_underscore_is_text() {
        let (_, state) = run(&["snake_case_name"]);
        assert!(!state.em);
    }

    #[test]
    fn link_with_target() {
        let (lines, _) = run(&["[text](http://x.y)"]);
        assert_eq!(
            lines[0],
            vec![
                tok("[", Some("formatting formatting-link link")),
                tok("text", Some("link")),
                tok("](http://x.y)", Some("formatting formatting-link-string string url")),
            ]
        );
    }

    #[test]
    fn bracket_without_target_is_text() {
        let (lines, state) = run(&["[not a link]"]);
        assert_eq!(lines[0][0], tok("[", None));
        assert!(!state.link_text);
    }

    #[test]
    fn bare_url_and_autolink() {
        let (lines, _) = run(&["see https://example.org/a and <mailto:x@y.z>"]);
        assert_eq!(lines[0][2], tok("https://example.org/a", Some("url")));
        assert_eq!(lines[0].last(), Some(&tok("<mailto:x@y.z>", Some("link url"))));
    }

    #[test]
    fn block_markers() {
        let (lines, _) = run(&["> quoted", "- [x] done", "1. item", "***"]);
        assert_eq!(
            lines[0][0],
            tok("> ", Some("formatting formatting-quote formatting-quote-1 quote quote-1"))
        );
        assert_eq!(lines[0][1], tok("quoted", Some("quote quote-1")));
        assert_eq!(
            lines[1][0],
            tok("- [x] ", Some("formatting formatting-list formatting-task list"))
        );
        assert_eq!(lines[2][0], tok("1. ", Some("formatting formatting-list list")));
        assert_eq!(lines[3], vec![tok("***", Some("hr"))]);
    }

    #[test]
    fn whitespace_only_line_counts_as_blank() {
        let (lines, state) = run(&["*open", "   "]);
        assert_eq!(lines[1], vec![tok("   ", None)]);
        assert!(!state.em);
    }

    #[test]
    fn text_runs_stop_at_special_characters() {
        let (lines, _) = run(&["a==b"]);
        assert_eq!(lines[0][0], tok("a", None));
    }
}
