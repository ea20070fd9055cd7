pub mod combinators;
pub mod document;
pub mod driver;
pub mod error;
pub mod grammar;
pub mod modes;
pub mod rope;
pub mod spellcheck;
pub mod stream;
pub mod zkn;

// Re-export key types for easier usage
pub use combinators::{Multiplex, Overlay, Region, RegionClose, RegionOpen};
pub use document::{build_document_grammar, fenced_regions};
pub use driver::{
    Highlighter, LineTokens, TokenSpan, TokenizedLine, state_at, tokenize_line,
    tokenize_line_in_place,
};
pub use error::GrammarError;
pub use grammar::{
    AnyState, Grammar, GrammarId, GrammarRegistry, InnerMode, Mode, Style, effective_mode,
    join_styles,
};
pub use spellcheck::{
    HunspellOracle, OracleError, SpellOracle, SpellcheckCache, SpellcheckOverlay,
};
pub use stream::StringStream;
pub use zkn::{ZknMode, ZknOptions, ZknState};
