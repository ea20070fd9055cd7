//! The grammar contract shared by every tokenizer in the crate.
//!
//! A grammar is written against the typed [`Mode`] trait. Every `Mode` is
//! also usable as a [`Grammar`], the object-safe form the driver, the
//! registry and the combinators work with. Erased state travels as an
//! [`AnyState`].

pub mod registry;

use std::any::Any;
use std::borrow::Cow;
use std::fmt::{self, Debug};

use crate::stream::StringStream;

pub use registry::{GrammarId, GrammarRegistry};

/// A space-separated list of style class names.
pub type Style = Cow<'static, str>;

/// Concatenates two optional class lists.
pub fn join_styles(a: Option<Style>, b: Option<Style>) -> Option<Style> {
    match (a, b) {
        (Some(a), Some(b)) if a.is_empty() => Some(b),
        (Some(a), Some(b)) if b.is_empty() => Some(a),
        (Some(a), Some(b)) => Some(Cow::Owned(format!("{a} {b}"))),
        (a, None) => a,
        (None, b) => b,
    }
}

/// Tokenizer state that can be stored behind a trait object.
///
/// Implemented for every `Clone + PartialEq + Debug` type, so grammars never
/// implement it by hand.
pub trait ModeState: Any + Debug + Send + Sync {
    fn clone_boxed(&self) -> Box<dyn ModeState>;
    fn eq_dyn(&self, other: &dyn ModeState) -> bool;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T> ModeState for T
where
    T: Any + Clone + PartialEq + Debug + Send + Sync,
{
    fn clone_boxed(&self) -> Box<dyn ModeState> {
        Box::new(self.clone())
    }

    fn eq_dyn(&self, other: &dyn ModeState) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| other == self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// An owned, type-erased grammar state.
///
/// Cloning deep-copies the state, so a snapshot taken at a line boundary is
/// never affected by tokenizing further lines.
pub struct AnyState(Box<dyn ModeState>);

impl AnyState {
    pub fn new<T: ModeState>(state: T) -> Self {
        Self(Box::new(state))
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.0.as_any_mut().downcast_mut::<T>()
    }

    pub fn as_dyn(&self) -> &dyn ModeState {
        &*self.0
    }
}

impl Clone for AnyState {
    fn clone(&self) -> Self {
        Self(self.0.clone_boxed())
    }
}

impl PartialEq for AnyState {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_dyn(&*other.0)
    }
}

impl Debug for AnyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Debug::fmt(&*self.0, f)
    }
}

/// The grammar (and its state) currently responsible for a position.
#[derive(Clone, Copy)]
pub struct InnerMode<'a> {
    pub grammar: &'a dyn Grammar,
    pub state: &'a dyn ModeState,
}

/// A line-oriented tokenizer with explicit, copyable state.
///
/// `token` must consume at least one character unless the stream is already
/// at end of line. It may only read the visible part of the stream.
pub trait Mode: Send + Sync + 'static {
    type State: Clone + PartialEq + Debug + Send + Sync + 'static;

    fn name(&self) -> &str;

    fn start_state(&self) -> Self::State;

    fn token(&self, stream: &mut StringStream<'_>, state: &mut Self::State) -> Option<Style>;

    /// Called instead of `token` for an empty line.
    fn blank_line(&self, _state: &mut Self::State) {}

    /// The nested grammar active for `state`, or `None` when this grammar is
    /// itself the innermost one.
    fn inner_mode<'a>(&'a self, _state: &'a Self::State) -> Option<InnerMode<'a>> {
        None
    }
}

/// Object-safe form of [`Mode`].
pub trait Grammar: Send + Sync {
    fn grammar_name(&self) -> &str;
    fn start_any(&self) -> AnyState;
    fn token_any(&self, stream: &mut StringStream<'_>, state: &mut AnyState) -> Option<Style>;
    fn blank_line_any(&self, state: &mut AnyState);
    fn inner_mode_any<'a>(&'a self, state: &'a dyn ModeState) -> Option<InnerMode<'a>>;
}

impl<M: Mode> Grammar for M {
    fn grammar_name(&self) -> &str {
        Mode::name(self)
    }

    fn start_any(&self) -> AnyState {
        AnyState::new(Mode::start_state(self))
    }

    fn token_any(&self, stream: &mut StringStream<'_>, state: &mut AnyState) -> Option<Style> {
        Mode::token(self, stream, typed_state(self, state))
    }

    fn blank_line_any(&self, state: &mut AnyState) {
        Mode::blank_line(self, typed_state(self, state))
    }

    fn inner_mode_any<'a>(&'a self, state: &'a dyn ModeState) -> Option<InnerMode<'a>> {
        let state = state.as_any().downcast_ref::<M::State>()?;
        Mode::inner_mode(self, state)
    }
}

/// Borrows the typed state out of `state`, replacing a foreign state with
/// this grammar's start state.
fn typed_state<'s, M: Mode>(mode: &M, state: &'s mut AnyState) -> &'s mut M::State {
    if state.downcast_ref::<M::State>().is_none() {
        log::warn!(
            "grammar {} received a foreign state {:?}, resetting",
            mode.name(),
            state
        );
        *state = AnyState::new(mode.start_state());
    }
    match state.downcast_mut::<M::State>() {
        Some(typed) => typed,
        None => unreachable!("state was replaced with the grammar's own type"),
    }
}

/// Name of the innermost grammar active for `state`.
pub fn effective_mode<'a>(grammar: &'a dyn Grammar, state: &'a AnyState) -> &'a str {
    let mut current = InnerMode {
        grammar,
        state: state.as_dyn(),
    };
    while let Some(inner) = current.grammar.inner_mode_any(current.state) {
        current = inner;
    }
    current.grammar.grammar_name()
}
