//! Spellchecking as an overlay grammar.

mod cache;
mod oracle;

use std::borrow::Cow;
use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::grammar::{Mode, Style};
use crate::stream::StringStream;

pub use cache::SpellcheckCache;
pub use oracle::{HunspellOracle, OracleError, SpellOracle};

pub const SPELL_ERROR: &str = "spell-error";

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:[a-zA-Z][a-zA-Z0-9+.-]*://|www\.)\S+").expect("Invalid URL regex")
    })
}

/// Marks misspelled words with [`SPELL_ERROR`].
///
/// Verdicts come from a shared [`SpellcheckCache`]. URLs, `@citekeys`,
/// `#tags` and words containing digits are never checked.
#[derive(Debug, Clone)]
pub struct SpellcheckOverlay {
    cache: Arc<SpellcheckCache>,
    delimiters: String,
}

impl SpellcheckOverlay {
    /// `delimiters` are extra characters that end a word, usually the
    /// grammar's formatting characters.
    pub fn new(cache: Arc<SpellcheckCache>, delimiters: impl Into<String>) -> Self {
        Self {
            cache,
            delimiters: delimiters.into(),
        }
    }

    pub fn cache(&self) -> &Arc<SpellcheckCache> {
        &self.cache
    }

    fn is_word_char(&self, c: char) -> bool {
        (c.is_alphanumeric() || c == '_') && !self.delimiters.contains(c)
    }

    /// Consumes a word, allowing single inner apostrophes (`don't`).
    fn eat_word(&self, stream: &mut StringStream<'_>) {
        loop {
            stream.eat_while(|c| self.is_word_char(c));
            let rest = stream.rest();
            let mut chars = rest.chars();
            match (chars.next(), chars.next()) {
                (Some('\'' | '’'), Some(next)) if self.is_word_char(next) => {
                    stream.bump();
                }
                _ => break,
            }
        }
    }
}

impl Mode for SpellcheckOverlay {
    type State = ();

    fn name(&self) -> &str {
        "spellcheck"
    }

    fn start_state(&self) {}

    fn token(&self, stream: &mut StringStream<'_>, _state: &mut ()) -> Option<Style> {
        if stream.eat_while(char::is_whitespace) {
            return None;
        }

        let at_word_start = stream.preceding_char().is_none_or(|c| !self.is_word_char(c));
        if at_word_start && stream.match_regex(url_regex(), true).is_some() {
            return None;
        }

        if matches!(stream.peek(), Some('@' | '#')) && at_word_start {
            stream.bump();
            stream.eat_while(|c| !c.is_whitespace() && !self.delimiters.contains(c));
            return None;
        }

        let c = stream.peek()?;
        if !self.is_word_char(c) {
            stream.bump();
            stream.eat_while(|c| {
                !c.is_whitespace() && !self.is_word_char(c) && c != '@' && c != '#'
            });
            return None;
        }

        let start = stream.pos();
        self.eat_word(stream);
        let word = &stream.text()[start..stream.pos()];
        if word.chars().any(|c| c.is_numeric() || c == '_') {
            return None;
        }

        match self.cache.lookup(word) {
            Some(false) => Some(Cow::Borrowed(SPELL_ERROR)),
            Some(true) => None,
            None => {
                self.cache.record_miss(word);
                None
            }
        }
    }
}
