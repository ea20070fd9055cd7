use regex::{Captures, Regex};

/// A cursor over a single line of text.
///
/// Offsets are byte positions into the line. `start` marks the beginning of
/// the token currently being produced and `pos` is the read position. The
/// `limit` is the visible end of the line: combinators temporarily lower it
/// so that a sub-grammar cannot read past a delimiter it does not own.
#[derive(Debug, Clone)]
pub struct StringStream<'a> {
    text: &'a str,
    limit: usize,
    start: usize,
    pos: usize,
}

impl<'a> StringStream<'a> {
    /// Creates a stream positioned at the start of `text`.
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            limit: text.len(),
            start: 0,
            pos: 0,
        }
    }

    /// The visible part of the line.
    pub fn text(&self) -> &'a str {
        &self.text[..self.limit]
    }

    /// The whole line, ignoring any temporary truncation.
    pub fn full_text(&self) -> &'a str {
        self.text
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Marks the current position as the start of the next token.
    pub fn begin_token(&mut self) {
        self.start = self.pos;
    }

    /// Moves the read position. Clamped to the visible line and snapped back
    /// to a character boundary.
    pub fn set_pos(&mut self, pos: usize) {
        self.pos = floor_boundary(self.text, pos.min(self.limit));
    }

    /// True when the visible line is fully consumed.
    pub fn eol(&self) -> bool {
        self.pos >= self.limit
    }

    /// True at the very beginning of the line.
    pub fn sol(&self) -> bool {
        self.pos == 0
    }

    /// Returns the next character without consuming it.
    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Returns the character just before the read position, looking past the
    /// start of the current token if needed.
    pub fn preceding_char(&self) -> Option<char> {
        self.text[..self.pos].chars().next_back()
    }

    /// Consumes and returns the next character.
    pub fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    /// Consumes the next character if it equals `ch`.
    pub fn eat(&mut self, ch: char) -> bool {
        if self.peek() == Some(ch) {
            self.pos += ch.len_utf8();
            true
        } else {
            false
        }
    }

    /// Consumes the next character if it satisfies `pred`.
    pub fn eat_if(&mut self, pred: impl Fn(char) -> bool) -> Option<char> {
        let ch = self.peek().filter(|&c| pred(c))?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    /// Consumes characters while `pred` holds. Returns true if any were consumed.
    pub fn eat_while(&mut self, pred: impl Fn(char) -> bool) -> bool {
        let before = self.pos;
        while self.eat_if(&pred).is_some() {}
        self.pos > before
    }

    /// Consumes horizontal whitespace.
    pub fn eat_space(&mut self) -> bool {
        self.eat_while(|c| c == ' ' || c == '\t')
    }

    pub fn skip_to_end(&mut self) {
        self.pos = self.limit;
    }

    /// Advances to the next occurrence of `ch` without consuming it.
    pub fn skip_to(&mut self, ch: char) -> bool {
        match self.rest().find(ch) {
            Some(idx) => {
                self.pos += idx;
                true
            }
            None => false,
        }
    }

    /// Advances to the next occurrence of `needle` without consuming it.
    pub fn skip_to_str(&mut self, needle: &str) -> bool {
        match self.rest().find(needle) {
            Some(idx) => {
                self.pos += idx;
                true
            }
            None => false,
        }
    }

    /// Checks whether the remaining visible text starts with `s`.
    pub fn starts_with(&self, s: &str) -> bool {
        self.rest().starts_with(s)
    }

    /// Matches a literal at the read position, consuming it when asked.
    pub fn match_str(&mut self, s: &str, consume: bool) -> bool {
        if s.is_empty() || !self.starts_with(s) {
            return false;
        }
        if consume {
            self.pos += s.len();
        }
        true
    }

    /// Case-insensitive variant of [`match_str`](Self::match_str).
    pub fn match_str_ignore_case(&mut self, s: &str, consume: bool) -> bool {
        let rest = self.rest();
        let Some(head) = rest.get(..s.len()) else {
            return false;
        };
        if s.is_empty() || !head.eq_ignore_ascii_case(s) {
            return false;
        }
        if consume {
            self.pos += s.len();
        }
        true
    }

    /// Matches `re` at the read position.
    ///
    /// The match is implicitly anchored: a match that starts later in the line
    /// is treated as no match. Patterns should begin with `^` so the regex
    /// engine can stop early.
    pub fn match_regex(&mut self, re: &Regex, consume: bool) -> Option<&'a str> {
        let rest = self.rest();
        let m = re.find(rest).filter(|m| m.start() == 0)?;
        if consume {
            self.pos += m.end();
        }
        Some(m.as_str())
    }

    /// Like [`match_regex`](Self::match_regex) but returns capture groups.
    /// Group offsets are relative to the read position before consumption.
    pub fn captures(&mut self, re: &Regex, consume: bool) -> Option<Captures<'a>> {
        let rest = self.rest();
        let caps = re.captures(rest)?;
        let whole = caps.get(0)?;
        if whole.start() != 0 {
            return None;
        }
        if consume {
            self.pos += whole.end();
        }
        Some(caps)
    }

    /// Moves the read position back by `n` bytes, never before the line start.
    pub fn back_up(&mut self, n: usize) {
        self.pos = floor_boundary(self.text, self.pos.saturating_sub(n));
    }

    /// Text of the current token (`start..pos`).
    pub fn current(&self) -> &'a str {
        &self.text[self.start.min(self.pos)..self.pos]
    }

    /// Remaining visible text.
    pub fn rest(&self) -> &'a str {
        &self.text[self.pos..self.limit]
    }

    /// Runs `f` with the visible line truncated at `limit`.
    ///
    /// The limit can only shrink the view and never cuts behind the read
    /// position. The previous limit is restored afterwards.
    pub fn with_limit<R>(&mut self, limit: usize, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = self.limit;
        self.limit = floor_boundary(self.text, limit.clamp(self.pos, saved));
        let out = f(self);
        self.limit = saved;
        out
    }
}

fn floor_boundary(text: &str, mut idx: usize) -> usize {
    idx = idx.min(text.len());
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}
