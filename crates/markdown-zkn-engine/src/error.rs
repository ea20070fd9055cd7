use thiserror::Error;

/// Errors raised while assembling grammars. Tokenizing itself never fails.
#[derive(Debug, Error)]
pub enum GrammarError {
    #[error("the {which} link token must not be empty")]
    EmptyLinkToken { which: &'static str },

    #[error("invalid formatting characters: {0}")]
    InvalidFormattingChars(#[source] regex::Error),

    #[error("no grammar registered as {0:?}")]
    UnknownGrammar(String),

    #[error("invalid region pattern {pattern:?}: {source}")]
    InvalidRegion {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
