use spellbook::Dictionary;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("dictionary unavailable: {0}")]
    Unavailable(String),
    #[error("lookup failed for {word:?}: {reason}")]
    Lookup { word: String, reason: String },
}

/// Decides whether a word is spelled correctly.
///
/// Oracles may be slow or remote. The tokenizer never calls one directly;
/// verdicts reach it through a [`SpellcheckCache`](super::SpellcheckCache).
pub trait SpellOracle {
    fn check(&self, word: &str) -> Result<bool, OracleError>;
}

/// A Hunspell dictionary, with affix rules applied by `spellbook`.
pub struct HunspellOracle {
    dictionary: Dictionary,
}

impl std::fmt::Debug for HunspellOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HunspellOracle").finish_non_exhaustive()
    }
}

impl HunspellOracle {
    /// Parses the contents of a `.aff` and a `.dic` file.
    pub fn new(aff: &str, dic: &str) -> Result<Self, OracleError> {
        let dictionary =
            Dictionary::new(aff, dic).map_err(|err| OracleError::Unavailable(err.to_string()))?;
        Ok(Self { dictionary })
    }
}

impl SpellOracle for HunspellOracle {
    fn check(&self, word: &str) -> Result<bool, OracleError> {
        Ok(self.dictionary.check(word))
    }
}
