use crate::grammar::{InnerMode, Mode, Style, join_styles};
use crate::stream::StringStream;

/// Runs a secondary grammar over the same text as a base grammar and merges
/// their classes.
///
/// Base and overlay each keep their own read position within the line. On
/// every call the side whose position equals the token start is advanced,
/// and the emitted token ends at the nearer of the two positions. The base
/// therefore only ever sees its own token boundaries and its state evolves
/// exactly as it would without the overlay.
#[derive(Debug, Clone)]
pub struct Overlay<B, O> {
    base: B,
    overlay: O,
    combine: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayState<BS, OS> {
    pub base: BS,
    pub overlay: OS,
    base_pos: usize,
    overlay_pos: usize,
    base_cur: Option<Style>,
    overlay_cur: Option<Style>,
}

impl<BS, OS> OverlayState<BS, OS> {
    fn reset_positions(&mut self, at: usize) {
        self.base_pos = at;
        self.overlay_pos = at;
    }
}

impl<B: Mode, O: Mode> Overlay<B, O> {
    /// With `combine`, an overlay class is appended to the base class;
    /// otherwise it replaces it.
    pub fn new(base: B, overlay: O, combine: bool) -> Self {
        Self {
            base,
            overlay,
            combine,
        }
    }

    pub fn base(&self) -> &B {
        &self.base
    }

    pub fn overlay(&self) -> &O {
        &self.overlay
    }
}

impl<B: Mode, O: Mode> Mode for Overlay<B, O> {
    type State = OverlayState<B::State, O::State>;

    fn name(&self) -> &str {
        self.base.name()
    }

    fn start_state(&self) -> Self::State {
        OverlayState {
            base: self.base.start_state(),
            overlay: self.overlay.start_state(),
            base_pos: 0,
            overlay_pos: 0,
            base_cur: None,
            overlay_cur: None,
        }
    }

    fn token(&self, stream: &mut StringStream<'_>, state: &mut Self::State) -> Option<Style> {
        let start = stream.start();
        if start == 0 || state.base_pos.min(state.overlay_pos) < start {
            state.reset_positions(start);
        }

        if state.base_pos == start {
            stream.set_pos(start);
            state.base_cur = self.base.token(stream, &mut state.base);
            state.base_pos = stream.pos();
        }
        if state.overlay_pos == start {
            stream.set_pos(start);
            state.overlay_cur = self.overlay.token(stream, &mut state.overlay);
            state.overlay_pos = stream.pos();
        }

        // A side that made no progress waits for the other one.
        if state.base_pos <= start && state.overlay_pos > start {
            log::debug!("overlay: base grammar {} stalled at {start}", self.base.name());
            state.base_pos = state.overlay_pos;
        } else if state.overlay_pos <= start && state.base_pos > start {
            log::debug!("overlay: overlay grammar {} stalled at {start}", self.overlay.name());
            state.overlay_pos = state.base_pos;
        }
        stream.set_pos(state.base_pos.min(state.overlay_pos));

        let style = match (&state.overlay_cur, self.combine) {
            (None, _) => state.base_cur.clone(),
            (Some(overlay), true) => join_styles(state.base_cur.clone(), Some(overlay.clone())),
            (Some(overlay), false) => Some(overlay.clone()),
        };

        if stream.eol() {
            state.reset_positions(0);
            state.base_cur = None;
            state.overlay_cur = None;
        }
        style
    }

    fn blank_line(&self, state: &mut Self::State) {
        self.base.blank_line(&mut state.base);
        self.overlay.blank_line(&mut state.overlay);
    }

    fn inner_mode<'a>(&'a self, state: &'a Self::State) -> Option<InnerMode<'a>> {
        Some(InnerMode {
            grammar: &self.base,
            state: &state.base,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::borrow::Cow;

    /// Emits whole words, counting how many it has seen.
    struct Words;

    impl Mode for Words {
        type State = usize;

        fn name(&self) -> &str {
            "words"
        }

        fn start_state(&self) -> usize {
            0
        }

        fn token(&self, stream: &mut StringStream<'_>, state: &mut usize) -> Option<Style> {
            if stream.eat_while(|c| c == ' ') {
                return None;
            }
            stream.eat_while(|c| c != ' ');
            *state += 1;
            Some(Cow::Borrowed("word"))
        }
    }

    /// Marks every `x` and skips everything else in runs.
    struct MarkX;

    impl Mode for MarkX {
        type State = ();

        fn name(&self) -> &str {
            "mark-x"
        }

        fn start_state(&self) {}

        fn token(&self, stream: &mut StringStream<'_>, _: &mut ()) -> Option<Style> {
            if stream.eat('x') {
                return Some(Cow::Borrowed("marked"));
            }
            stream.eat_while(|c| c != 'x');
            None
        }
    }

    fn run<M: Mode>(mode: &M, line: &str, state: &mut M::State) -> Vec<(String, Option<String>)> {
        let mut stream = StringStream::new(line);
        let mut out = Vec::new();
        while !stream.eol() {
            stream.begin_token();
            let style = mode.token(&mut stream, state);
            out.push((stream.current().to_string(), style.map(|s| s.into_owned())));
        }
        out
    }

    fn tok(text: &str, style: Option<&str>) -> (String, Option<String>) {
        (text.to_string(), style.map(str::to_string))
    }

    #[test]
    fn combined_classes_split_at_both_boundaries() {
        let overlay = Overlay::new(Words, MarkX, true);
        let mut state = overlay.start_state();
        let tokens = run(&overlay, "axb c", &mut state);
        assert_eq!(
            tokens,
            vec![
                tok("a", Some("word")),
                tok("x", Some("word marked")),
                tok("b", Some("word")),
                tok(" ", None),
                tok("c", Some("word")),
            ]
        );
    }

    #[test]
    fn overlay_class_replaces_base_without_combine() {
        let overlay = Overlay::new(Words, MarkX, false);
        let mut state = overlay.start_state();
        let tokens = run(&overlay, "axb", &mut state);
        assert_eq!(tokens[1], tok("x", Some("marked")));
        assert_eq!(tokens[2], tok("b", Some("word")));
    }

    #[test]
    fn base_state_is_unaffected_by_overlay() {
        let overlay = Overlay::new(Words, MarkX, true);
        let mut combined = overlay.start_state();
        let mut alone = Words.start_state();
        for line in ["axb c", "xxx", "a b x"] {
            run(&overlay, line, &mut combined);
            run(&Words, line, &mut alone);
            assert_eq!(combined.base, alone);
        }
    }

    #[test]
    fn line_end_clears_positions() {
        let overlay = Overlay::new(Words, MarkX, true);
        let mut state = overlay.start_state();
        run(&overlay, "abc xyz", &mut state);
        assert_eq!(state, OverlayState { base: 2, ..overlay.start_state() });
    }
}
