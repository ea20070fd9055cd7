//! Turns lines of text into styled token spans.

mod highlighter;

use serde::Serialize;

use crate::grammar::{AnyState, Grammar, Style};
use crate::stream::StringStream;

pub use highlighter::Highlighter;

/// A styled byte range of one line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenSpan {
    pub from: usize,
    pub to: usize,
    pub class: Option<Style>,
}

/// Tokens of one line plus the state to feed into the next line.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenizedLine {
    pub tokens: Vec<TokenSpan>,
    pub state: AnyState,
    /// Offsets where the grammar failed to consume input and the driver
    /// skipped a character on its behalf.
    pub stalls: Vec<usize>,
}

/// Output of [`tokenize_line_in_place`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineTokens {
    pub tokens: Vec<TokenSpan>,
    pub stalls: Vec<usize>,
}

fn strip_terminator(text: &str) -> &str {
    let text = text.strip_suffix('\n').unwrap_or(text);
    text.strip_suffix('\r').unwrap_or(text)
}

/// Tokenizes a single line starting from a copy of `state_in`.
///
/// A trailing line terminator is ignored. An empty line produces no tokens
/// and runs the grammar's blank-line hook instead.
pub fn tokenize_line(grammar: &dyn Grammar, text: &str, state_in: &AnyState) -> TokenizedLine {
    let mut state = state_in.clone();
    let LineTokens { tokens, stalls } = tokenize_line_in_place(grammar, text, &mut state);
    TokenizedLine {
        tokens,
        state,
        stalls,
    }
}

/// Tokenizes a single line, advancing `state` in place.
pub fn tokenize_line_in_place(
    grammar: &dyn Grammar,
    text: &str,
    state: &mut AnyState,
) -> LineTokens {
    let text = strip_terminator(text);
    let mut out = LineTokens::default();
    if text.is_empty() {
        grammar.blank_line_any(state);
        return out;
    }

    let mut stream = StringStream::new(text);
    while !stream.eol() {
        let token = next_token(grammar, &mut stream, state, &mut out.stalls);
        out.tokens.push(token);
    }
    out
}

/// The state in effect at byte `column` of a line, i.e. after every token
/// that starts before it.
pub fn state_at(
    grammar: &dyn Grammar,
    text: &str,
    state_in: &AnyState,
    column: usize,
) -> AnyState {
    let text = strip_terminator(text);
    let mut state = state_in.clone();
    let mut stream = StringStream::new(text);
    let mut stalls = Vec::new();
    while !stream.eol() && stream.pos() < column {
        next_token(grammar, &mut stream, &mut state, &mut stalls);
    }
    state
}

fn next_token(
    grammar: &dyn Grammar,
    stream: &mut StringStream<'_>,
    state: &mut AnyState,
    stalls: &mut Vec<usize>,
) -> TokenSpan {
    let from = stream.pos();
    stream.begin_token();
    let class = grammar.token_any(stream, state);
    if stream.pos() > from {
        return TokenSpan {
            from,
            to: stream.pos(),
            class,
        };
    }

    log::warn!(
        "grammar {} made no progress at offset {from} of {:?}, skipping a character",
        grammar.grammar_name(),
        stream.text()
    );
    stalls.push(from);
    stream.set_pos(from);
    stream.bump();
    TokenSpan {
        from,
        to: stream.pos(),
        class: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Mode;
    use crate::modes::MarkdownMode;
    use crate::zkn::ZknMode;
    use pretty_assertions::assert_eq;
    use std::borrow::Cow;

    /// Consumes nothing on `!`, otherwise one character.
    struct Sticky;

    impl Mode for Sticky {
        type State = usize;

        fn name(&self) -> &str {
            "sticky"
        }

        fn start_state(&self) -> usize {
            0
        }

        fn token(&self, stream: &mut StringStream<'_>, state: &mut usize) -> Option<Style> {
            *state += 1;
            if stream.peek() == Some('!') {
                return Some(Cow::Borrowed("never-emitted"));
            }
            stream.bump();
            Some(Cow::Borrowed("ok"))
        }

        fn blank_line(&self, state: &mut usize) {
            *state = 100;
        }
    }

    #[test]
    fn tokens_cover_the_line_without_gaps() {
        let grammar = ZknMode::default();
        let start = Grammar::start_any(&grammar);
        let line = tokenize_line(&grammar, "Some *text* with #tag and [[link]]", &start);
        let mut expected_from = 0;
        for token in &line.tokens {
            assert_eq!(token.from, expected_from);
            assert!(token.to > token.from);
            expected_from = token.to;
        }
        assert_eq!(expected_from, 34);
        assert!(line.stalls.is_empty());
    }

    #[test]
    fn input_state_is_not_modified() {
        let grammar = MarkdownMode;
        let start = Grammar::start_any(&grammar);
        let snapshot = start.clone();
        let line = tokenize_line(&grammar, "*open emphasis", &start);
        assert_eq!(start, snapshot);
        assert_ne!(line.state, snapshot);
    }

    #[test]
    fn empty_line_runs_blank_line_hook() {
        let start = Grammar::start_any(&Sticky);
        let line = tokenize_line(&Sticky, "", &start);
        assert!(line.tokens.is_empty());
        assert_eq!(line.state.downcast_ref::<usize>(), Some(&100));
    }

    #[test]
    fn stall_is_recorded_and_skipped() {
        let start = Grammar::start_any(&Sticky);
        let line = tokenize_line(&Sticky, "a!b", &start);
        assert_eq!(line.stalls, vec![1]);
        assert_eq!(
            line.tokens,
            vec![
                TokenSpan { from: 0, to: 1, class: Some("ok".into()) },
                TokenSpan { from: 1, to: 2, class: None },
                TokenSpan { from: 2, to: 3, class: Some("ok".into()) },
            ]
        );
    }

    #[test]
    fn line_terminator_is_ignored() {
        let grammar = MarkdownMode;
        let start = Grammar::start_any(&grammar);
        let with = tokenize_line(&grammar, "word\r\n", &start);
        let without = tokenize_line(&grammar, "word", &start);
        assert_eq!(with, without);
    }

    #[test]
    fn state_at_stops_before_column() {
        let grammar = ZknMode::default();
        let start = Grammar::start_any(&grammar);
        let before = state_at(&grammar, "a $x$ b", &start, 2);
        let inside = state_at(&grammar, "a $x$ b", &start, 3);
        assert_eq!(crate::grammar::effective_mode(&grammar, &before), "markdown");
        assert_eq!(crate::grammar::effective_mode(&grammar, &inside), "stex");
    }
}
