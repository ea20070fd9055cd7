use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;

use crate::grammar::{Mode, Style};
use crate::stream::StringStream;

/// Brace nesting inside a TeX math expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TexState {
    pub depth: usize,
}

/// Tokenizer for TeX math, used for `$...$` equations and `tex` fences.
#[derive(Debug, Clone, Copy, Default)]
pub struct TexMode;

fn command_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\\(?:[A-Za-z@]+\*?|.)").expect("Invalid TeX command regex"))
}

fn number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+(?:\.\d+)?").expect("Invalid TeX number regex"))
}

impl Mode for TexMode {
    type State = TexState;

    fn name(&self) -> &str {
        "stex"
    }

    fn start_state(&self) -> TexState {
        TexState::default()
    }

    fn token(&self, stream: &mut StringStream<'_>, state: &mut TexState) -> Option<Style> {
        if stream.eat_while(char::is_whitespace) {
            return None;
        }
        if stream.eat('%') {
            stream.skip_to_end();
            return Some(Cow::Borrowed("comment"));
        }
        if stream.match_regex(command_regex(), true).is_some() {
            return Some(Cow::Borrowed("tag"));
        }
        if stream.match_regex(number_regex(), true).is_some() {
            return Some(Cow::Borrowed("number"));
        }
        if stream.eat_while(char::is_alphabetic) {
            return Some(Cow::Borrowed("variable-2"));
        }
        match stream.bump() {
            Some('{') => {
                state.depth += 1;
                Some(Cow::Borrowed("bracket"))
            }
            Some('}') => {
                state.depth = state.depth.saturating_sub(1);
                Some(Cow::Borrowed("bracket"))
            }
            Some('[' | ']' | '(' | ')') => Some(Cow::Borrowed("bracket")),
            Some('^' | '_' | '&') => Some(Cow::Borrowed("keyword")),
            Some(
                '+' | '-' | '*' | '/' | '=' | '<' | '>' | '!' | '|' | ',' | '.' | ';' | ':' | '\'',
            ) => Some(Cow::Borrowed("operator")),
            _ => None,
        }
    }
}
