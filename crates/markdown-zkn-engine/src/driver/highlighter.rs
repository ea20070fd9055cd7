use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use xi_rope::Rope;

use super::{TokenSpan, state_at, tokenize_line_in_place};
use crate::grammar::{AnyState, Grammar, effective_mode};
use crate::rope;

/// Incremental tokenizer for a whole document.
///
/// Line `n` is tokenized from the state left behind by line `n - 1`, so the
/// cache is a prefix of the document: `states[n]` is the state entering
/// line `n` and `lines[n]` its tokens. An edit truncates the prefix at the
/// first touched line and later requests re-tokenize from there.
#[derive(Clone)]
pub struct Highlighter {
    grammar: Arc<dyn Grammar>,
    rope: Rope,
    /// Always one longer than `lines`.
    states: Vec<AnyState>,
    lines: Vec<Vec<TokenSpan>>,
}

impl std::fmt::Debug for Highlighter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Highlighter")
            .field("grammar", &self.grammar.grammar_name())
            .field("len", &self.rope.len())
            .field("frontier", &self.lines.len())
            .finish()
    }
}

impl Highlighter {
    pub fn new(grammar: Arc<dyn Grammar>, text: &str) -> Self {
        Self::from_rope(grammar, Rope::from(text))
    }

    pub fn from_rope(grammar: Arc<dyn Grammar>, rope: Rope) -> Self {
        let start = grammar.start_any();
        Self {
            grammar,
            rope,
            states: vec![start],
            lines: Vec::new(),
        }
    }

    pub fn grammar(&self) -> &Arc<dyn Grammar> {
        &self.grammar
    }

    pub fn rope(&self) -> &Rope {
        &self.rope
    }

    pub fn text(&self) -> String {
        String::from(&self.rope)
    }

    pub fn line_count(&self) -> usize {
        rope::line_count(&self.rope)
    }

    /// Number of leading lines with cached tokens.
    pub fn frontier(&self) -> usize {
        self.lines.len()
    }

    /// Tokens for the lines in `lines`, clamped to the document.
    pub fn highlight(&mut self, lines: Range<usize>) -> &[Vec<TokenSpan>] {
        let end = lines.end.min(self.line_count());
        self.advance_to(end, None);
        &self.lines[lines.start.min(end)..end]
    }

    /// Like [`highlight`](Self::highlight) but gives up with `None` once
    /// `cancel` is set. Lines finished before cancellation stay cached.
    pub fn highlight_cancellable(
        &mut self,
        lines: Range<usize>,
        cancel: &AtomicBool,
    ) -> Option<&[Vec<TokenSpan>]> {
        let end = lines.end.min(self.line_count());
        if !self.advance_to(end, Some(cancel)) {
            return None;
        }
        Some(&self.lines[lines.start.min(end)..end])
    }

    /// Tokens for a single line.
    pub fn line_tokens(&mut self, line: usize) -> Option<&[TokenSpan]> {
        if line >= self.line_count() {
            return None;
        }
        self.advance_to(line + 1, None);
        self.lines.get(line).map(Vec::as_slice)
    }

    /// The state entering `line`. `line_count()` is allowed and yields the
    /// state after the last line.
    pub fn line_state(&mut self, line: usize) -> Option<&AnyState> {
        if line > self.line_count() {
            return None;
        }
        self.advance_to(line, None);
        self.states.get(line)
    }

    /// Name of the innermost grammar in effect at byte `offset`.
    pub fn mode_at(&mut self, offset: usize) -> String {
        let offset = offset.min(self.rope.len());
        let line = self.rope.line_of_offset(offset);
        let column = offset - self.rope.offset_of_line(line);
        self.advance_to(line, None);
        let Some(text) = rope::line_at(&self.rope, line) else {
            return self.grammar.grammar_name().to_string();
        };
        let state = state_at(&*self.grammar, &text.text, &self.states[line], column);
        effective_mode(&*self.grammar, &state).to_string()
    }

    /// Replaces the bytes in `range` with `text` and drops cached lines from
    /// the first line the edit touches.
    pub fn edit(&mut self, range: Range<usize>, text: &str) {
        let len = self.rope.len();
        let start = range.start.min(len);
        let end = range.end.clamp(start, len);
        let first_line = self.rope.line_of_offset(start);
        self.rope.edit(start..end, text);
        log::debug!("edit {start}..{end} invalidates from line {first_line}");
        self.invalidate_from(first_line);
    }

    /// Drops cached tokens and states from `line` onward.
    pub fn invalidate_from(&mut self, line: usize) {
        if line < self.lines.len() {
            self.lines.truncate(line);
            self.states.truncate(line + 1);
        }
    }

    /// Drops everything, e.g. after the spellcheck cache changed.
    pub fn invalidate_all(&mut self) {
        self.invalidate_from(0);
    }

    /// An independent copy sharing the grammar, for tokenizing a snapshot
    /// while the original keeps being edited.
    pub fn fork(&self) -> Self {
        self.clone()
    }

    /// Tokenizes until `end` lines are cached. Returns `false` if cancelled.
    fn advance_to(&mut self, end: usize, cancel: Option<&AtomicBool>) -> bool {
        let end = end.min(self.line_count());
        if self.lines.len() >= end {
            return true;
        }

        let first = self.lines.len();
        for line in rope::lines_from(&self.rope, first) {
            if line.index >= end {
                break;
            }
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                log::debug!("highlighting cancelled at line {}", line.index);
                return false;
            }
            let mut state = self.states[line.index].clone();
            let out = tokenize_line_in_place(&*self.grammar, &line.text, &mut state);
            if !out.stalls.is_empty() {
                log::warn!("line {} stalled at {:?}", line.index, out.stalls);
            }
            self.lines.push(out.tokens);
            self.states.push(state);
        }
        true
    }
}
