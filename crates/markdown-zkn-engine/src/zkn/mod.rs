//! The Zettelkasten Markdown grammar.
//!
//! Layers YAML frontmatter, wiki links, tags, identifiers, highlights and
//! inline math over the Markdown base grammar, delegating to YAML and TeX
//! for the regions they own.

mod css;
mod options;
mod rules;

use std::borrow::Cow;

use crate::grammar::{InnerMode, Mode, Style};
use crate::modes::{MarkdownMode, MarkdownState, TexMode, TexState, YamlMode, YamlState};
use crate::stream::StringStream;

pub use css::css_escape;
pub use options::ZknOptions;
pub use rules::{
    ESCAPE_CHAR, FOOTNOTE_FORMATTING, HIGHLIGHT, IDENTIFIER, LINK, LINK_FORMATTING, MATH,
    MATH_FORMATTING, RuleKind, TABLE,
};

pub const FRONTMATTER_START: &str = "hr yaml-frontmatter-start";
pub const FRONTMATTER_END: &str = "hr yaml-frontmatter-end";

/// Where in the document the tokenizer is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// No line has been seen yet.
    #[default]
    StartOfFile,
    Frontmatter,
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathDelimiter {
    Single,
    Double,
}

impl MathDelimiter {
    pub fn token(self) -> &'static str {
        match self {
            MathDelimiter::Single => "$",
            MathDelimiter::Double => "$$",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MathState {
    pub delimiter: MathDelimiter,
    pub tex: TexState,
}

impl MathState {
    pub fn new(delimiter: MathDelimiter) -> Self {
        Self {
            delimiter,
            tex: TexState::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ZknState {
    pub phase: Phase,
    pub yaml: YamlState,
    pub markdown: MarkdownState,
    /// The open equation, if any.
    pub math: Option<MathState>,
    pub in_link: bool,
    /// The previous token was a backslash escaping the next character.
    pub escaped: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ZknMode {
    pub(crate) options: ZknOptions,
    pub(crate) markdown: MarkdownMode,
    pub(crate) yaml: YamlMode,
    pub(crate) tex: TexMode,
}

impl ZknMode {
    pub fn new(options: ZknOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> &ZknOptions {
        &self.options
    }
}

impl Mode for ZknMode {
    type State = ZknState;

    fn name(&self) -> &str {
        "markdown-zkn"
    }

    fn start_state(&self) -> ZknState {
        ZknState::default()
    }

    fn token(&self, stream: &mut StringStream<'_>, state: &mut ZknState) -> Option<Style> {
        match state.phase {
            Phase::StartOfFile => {
                state.phase = Phase::Normal;
                if stream.sol() && stream.text() == "---" {
                    stream.skip_to_end();
                    state.phase = Phase::Frontmatter;
                    return Some(Cow::Borrowed(FRONTMATTER_START));
                }
            }
            Phase::Frontmatter => {
                if stream.sol() && matches!(stream.text(), "---" | "...") {
                    stream.skip_to_end();
                    state.phase = Phase::Normal;
                    return Some(Cow::Borrowed(FRONTMATTER_END));
                }
                return self.yaml.token(stream, &mut state.yaml);
            }
            Phase::Normal => {}
        }

        if stream.sol() {
            state.markdown.start_line();
        }
        rules::run(self, stream, state)
    }

    fn blank_line(&self, state: &mut ZknState) {
        match state.phase {
            Phase::StartOfFile => {
                state.phase = Phase::Normal;
                self.markdown.blank_line(&mut state.markdown);
            }
            Phase::Frontmatter => self.yaml.blank_line(&mut state.yaml),
            Phase::Normal => {
                state.in_link = false;
                state.escaped = false;
                self.markdown.blank_line(&mut state.markdown);
            }
        }
    }

    fn inner_mode<'a>(&'a self, state: &'a ZknState) -> Option<InnerMode<'a>> {
        let inner = match (&state.phase, &state.math) {
            (Phase::Frontmatter, _) => InnerMode {
                grammar: &self.yaml,
                state: &state.yaml,
            },
            (_, Some(math)) => InnerMode {
                grammar: &self.tex,
                state: &math.tex,
            },
            _ => InnerMode {
                grammar: &self.markdown,
                state: &state.markdown,
            },
        };
        Some(inner)
    }
}
