use std::borrow::Cow;
use std::sync::Arc;

use regex::Regex;

use crate::error::GrammarError;
use crate::grammar::{AnyState, Grammar, InnerMode, Mode, Style, join_styles};
use crate::stream::StringStream;

/// How a region begins.
#[derive(Debug, Clone)]
pub enum RegionOpen {
    /// A delimiter found anywhere in the visible line.
    Pattern(Regex),
    /// An empty line.
    BlankLine,
}

/// How a region ends.
#[derive(Debug, Clone)]
pub enum RegionClose {
    Pattern(Regex),
    BlankLine,
}

/// A span of the document handed to a nested grammar.
///
/// When both patterns have a `run` capture group, a closing match only counts
/// if its `run` is at least as long as the opening one.
#[derive(Clone)]
pub struct Region {
    pub open: RegionOpen,
    pub close: RegionClose,
    /// Literal that must occur in the line for `open` to possibly match.
    /// Lets lines without it skip the regex scan.
    pub marker: Option<String>,
    pub grammar: Arc<dyn Grammar>,
    pub delimiter_class: Option<Style>,
    pub inner_class: Option<Style>,
    /// Hand the delimiters to the nested grammar instead of consuming them.
    pub parse_delimiters: bool,
}

impl std::fmt::Debug for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Region")
            .field("open", &self.open)
            .field("close", &self.close)
            .field("grammar", &self.grammar.grammar_name())
            .field("delimiter_class", &self.delimiter_class)
            .field("inner_class", &self.inner_class)
            .finish()
    }
}

impl Region {
    /// A region between two patterns, with the delimiters styled by
    /// `delimiter_class`.
    pub fn between(
        open: &str,
        close: &str,
        grammar: Arc<dyn Grammar>,
        delimiter_class: Option<&'static str>,
    ) -> Result<Self, GrammarError> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|source| GrammarError::InvalidRegion {
                pattern: pattern.to_string(),
                source,
            })
        };
        Ok(Self {
            open: RegionOpen::Pattern(compile(open)?),
            close: RegionClose::Pattern(compile(close)?),
            marker: None,
            grammar,
            delimiter_class: delimiter_class.map(Cow::Borrowed),
            inner_class: None,
            parse_delimiters: false,
        })
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    pub fn with_inner_class(mut self, class: &'static str) -> Self {
        self.inner_class = Some(Cow::Borrowed(class));
        self
    }

    pub fn with_close(mut self, close: RegionClose) -> Self {
        self.close = close;
        self
    }

    pub fn parsing_delimiters(mut self) -> Self {
        self.parse_delimiters = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveRegion {
    pub index: usize,
    pub state: AnyState,
    /// Length of the opening `run` group, 0 without one.
    pub run: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MultiplexState<S> {
    pub outer: S,
    pub active: Option<ActiveRegion>,
}

/// Switches between an outer grammar and nested grammars for delimited
/// regions of the document.
#[derive(Debug, Clone)]
pub struct Multiplex<O> {
    outer: O,
    regions: Vec<Region>,
    /// Distinct markers when every pattern region has one.
    markers: Option<Vec<String>>,
}

impl<O: Mode> Multiplex<O> {
    pub fn new(outer: O, regions: Vec<Region>) -> Self {
        let mut markers = Some(Vec::new());
        for region in &regions {
            if !matches!(region.open, RegionOpen::Pattern(_)) {
                continue;
            }
            match (&region.marker, markers.as_mut()) {
                (Some(marker), Some(list)) if !list.contains(marker) => list.push(marker.clone()),
                (Some(_), _) => {}
                (None, _) => markers = None,
            }
        }
        Self {
            outer,
            regions,
            markers,
        }
    }

    pub fn outer(&self) -> &O {
        &self.outer
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// True when no region can start in `rest`, judged by markers alone.
    fn no_marker_in(&self, rest: &str) -> bool {
        self.markers
            .as_ref()
            .is_some_and(|markers| !markers.iter().any(|m| rest.contains(m.as_str())))
    }

    fn token_inside(
        &self,
        stream: &mut StringStream<'_>,
        active: &mut ActiveRegion,
    ) -> (Option<Style>, bool) {
        let region = &self.regions[active.index];
        let pos = stream.pos();
        let close_at = match &region.close {
            RegionClose::Pattern(close) => find_close(close, stream.text(), pos, active.run),
            RegionClose::BlankLine => None,
        };

        if let Some((start, end)) = close_at
            && start == pos
            && !region.parse_delimiters
        {
            stream.set_pos(end);
            return (region.delimiter_class.clone(), true);
        }

        let style = match close_at {
            Some((start, _)) if start > pos => {
                stream.with_limit(start, |s| region.grammar.token_any(s, &mut active.state))
            }
            _ => region.grammar.token_any(stream, &mut active.state),
        };
        let closed = region.parse_delimiters
            && close_at.is_some_and(|(start, end)| start == pos && stream.pos() >= end);
        (join_styles(region.inner_class.clone(), style), closed)
    }
}

/// First non-empty match of `close` at or after `pos` whose `run` group is
/// at least `run` bytes long.
fn find_close(close: &Regex, text: &str, pos: usize, run: usize) -> Option<(usize, usize)> {
    let mut from = pos;
    while let Some(caps) = close.captures_at(text, from) {
        let m = caps.get(0)?;
        let long_enough = caps.name("run").is_none_or(|r| r.len() >= run);
        if long_enough && m.end() > m.start() {
            return Some((m.start(), m.end()));
        }
        from = m.start() + text[m.start()..].chars().next()?.len_utf8();
    }
    None
}

impl<O: Mode> Mode for Multiplex<O> {
    type State = MultiplexState<O::State>;

    fn name(&self) -> &str {
        self.outer.name()
    }

    fn start_state(&self) -> Self::State {
        MultiplexState {
            outer: self.outer.start_state(),
            active: None,
        }
    }

    fn token(&self, stream: &mut StringStream<'_>, state: &mut Self::State) -> Option<Style> {
        if let Some(active) = state.active.as_mut() {
            let (style, closed) = self.token_inside(stream, active);
            if closed {
                state.active = None;
            }
            return style;
        }

        if self.no_marker_in(stream.rest()) {
            return self.outer.token(stream, &mut state.outer);
        }

        let pos = stream.pos();
        let mut cut = None::<usize>;
        for (index, region) in self.regions.iter().enumerate() {
            let RegionOpen::Pattern(open) = &region.open else {
                continue;
            };
            let Some(caps) = open.captures_at(stream.text(), pos) else {
                continue;
            };
            let Some(m) = caps.get(0) else {
                continue;
            };
            if m.start() > pos {
                cut = Some(cut.map_or(m.start(), |c| c.min(m.start())));
                continue;
            }
            if m.end() == m.start() {
                continue;
            }

            let mut active = ActiveRegion {
                index,
                state: region.grammar.start_any(),
                run: caps.name("run").map_or(0, |r| r.len()),
            };
            let style = if region.parse_delimiters {
                let style = region.grammar.token_any(stream, &mut active.state);
                join_styles(region.inner_class.clone(), style)
            } else {
                stream.set_pos(m.end());
                region.delimiter_class.clone()
            };
            state.active = Some(active);
            return style;
        }

        match cut {
            Some(limit) => stream.with_limit(limit, |s| self.outer.token(s, &mut state.outer)),
            None => self.outer.token(stream, &mut state.outer),
        }
    }

    fn blank_line(&self, state: &mut Self::State) {
        match state.active.as_mut() {
            Some(active) => {
                let region = &self.regions[active.index];
                if matches!(region.close, RegionClose::BlankLine) {
                    state.active = None;
                } else {
                    region.grammar.blank_line_any(&mut active.state);
                }
            }
            None => {
                self.outer.blank_line(&mut state.outer);
                let opener = self
                    .regions
                    .iter()
                    .position(|r| matches!(r.open, RegionOpen::BlankLine));
                if let Some(index) = opener {
                    state.active = Some(ActiveRegion {
                        index,
                        state: self.regions[index].grammar.start_any(),
                        run: 0,
                    });
                }
            }
        }
    }

    fn inner_mode<'a>(&'a self, state: &'a Self::State) -> Option<InnerMode<'a>> {
        Some(match &state.active {
            Some(active) => InnerMode {
                grammar: &*self.regions[active.index].grammar,
                state: active.state.as_dyn(),
            },
            None => InnerMode {
                grammar: &self.outer,
                state: &state.outer,
            },
        })
    }
}
