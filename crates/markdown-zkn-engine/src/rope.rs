//! Line access over an [`xi_rope::Rope`].

use xi_rope::Rope;

/// A byte range `[start, end)` into the rope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub fn len(self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }
}

/// A single line of the rope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRef {
    pub index: usize,
    /// Byte span of the line including its terminator.
    pub span: Span,
    /// The line text without its terminator.
    pub text: String,
}

/// Number of lines, counting the empty line after a trailing newline.
pub fn line_count(rope: &Rope) -> usize {
    rope.line_of_offset(rope.len()) + 1
}

/// Line `index`, or `None` past the end.
pub fn line_at(rope: &Rope, index: usize) -> Option<LineRef> {
    let total = line_count(rope);
    if index >= total {
        return None;
    }
    let start = rope.offset_of_line(index);
    let end = if index + 1 < total {
        rope.offset_of_line(index + 1)
    } else {
        rope.len()
    };
    let raw = rope.slice_to_cow(start..end);
    let text = raw.strip_suffix('\n').unwrap_or(&raw[..]);
    let text = text.strip_suffix('\r').unwrap_or(text);
    Some(LineRef {
        index,
        span: Span { start, end },
        text: text.to_string(),
    })
}

/// Lines from `first` to the end of the rope.
pub fn lines_from(rope: &Rope, first: usize) -> impl Iterator<Item = LineRef> + '_ {
    (first..line_count(rope)).filter_map(move |index| line_at(rope, index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn counts_trailing_empty_line() {
        assert_eq!(line_count(&Rope::from("")), 1);
        assert_eq!(line_count(&Rope::from("a")), 1);
        assert_eq!(line_count(&Rope::from("a\n")), 2);
        assert_eq!(line_count(&Rope::from("a\nb")), 2);
    }

    #[test]
    fn lines_strip_terminators_but_spans_keep_them() {
        let rope = Rope::from("one\r\ntwo\n\nfour");
        let lines: Vec<_> = lines_from(&rope, 0).collect();
        let texts: Vec<_> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two", "", "four"]);
        assert_eq!(lines[0].span, Span { start: 0, end: 5 });
        assert_eq!(lines[3].span, Span { start: 10, end: 14 });
    }

    #[test]
    fn lines_from_skips_earlier_lines() {
        let rope = Rope::from("a\nb\nc");
        let texts: Vec<_> = lines_from(&rope, 1).map(|l| l.text).collect();
        assert_eq!(texts, vec!["b".to_string(), "c".to_string()]);
        assert!(line_at(&rope, 3).is_none());
    }

    #[test]
    fn span_len() {
        let span = Span { start: 3, end: 7 };
        assert_eq!(span.len(), 4);
        assert!(!span.is_empty());
        assert!(Span { start: 5, end: 5 }.is_empty());
    }
}
