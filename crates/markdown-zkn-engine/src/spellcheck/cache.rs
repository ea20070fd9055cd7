use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError, RwLock};

use super::oracle::SpellOracle;

/// The cache key for `word`: lowercase, with typographic apostrophes made
/// plain.
pub(crate) fn normalize(word: &str) -> String {
    word.replace('’', "'").to_lowercase()
}

/// Spelling verdicts shared between the tokenizer and whoever feeds it.
///
/// Verdicts are keyed by the [normalized](normalize) word, so `Teh`, `TEH`
/// and `teh` share one entry. Lookups never block on an oracle. A word
/// without a verdict is reported as correct and remembered as a miss, so a
/// caller can resolve the misses asynchronously,
/// [`prewarm`](Self::prewarm) them and re-highlight.
#[derive(Debug, Default)]
pub struct SpellcheckCache {
    verdicts: RwLock<HashMap<String, bool>>,
    /// Normalized word to the first spelling seen.
    misses: Mutex<BTreeMap<String, String>>,
}

impl SpellcheckCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached verdict for `word`, if any.
    pub fn lookup(&self, word: &str) -> Option<bool> {
        self.verdicts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&normalize(word))
            .copied()
    }

    pub fn insert(&self, word: impl Into<String>, correct: bool) {
        let key = normalize(&word.into());
        self.misses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);
        self.verdicts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, correct);
    }

    /// Asks `oracle` about every word not yet cached, in the spelling given so
    /// the oracle can apply its own case rules. Words the oracle fails
    /// on stay uncached and are counted as correct until a later attempt.
    /// Returns the number of new verdicts.
    pub fn prewarm<O, I, S>(&self, oracle: &O, words: I) -> usize
    where
        O: SpellOracle + ?Sized,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added = 0;
        for word in words {
            let word = word.as_ref();
            if word.is_empty() || self.lookup(word).is_some() {
                continue;
            }
            match oracle.check(&word.replace('’', "'")) {
                Ok(correct) => {
                    self.insert(word, correct);
                    added += 1;
                }
                Err(err) => log::warn!("spellcheck oracle failed for {word:?}: {err}"),
            }
        }
        log::debug!("spellcheck cache prewarmed with {added} words");
        added
    }

    /// Called by the tokenizer for a word it could not judge.
    pub(crate) fn record_miss(&self, word: &str) {
        self.misses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(normalize(word))
            .or_insert_with(|| word.to_string());
    }

    /// Drains the words seen without a verdict, one spelling per normalized
    /// word, ordered by normalized word.
    pub fn take_misses(&self) -> Vec<String> {
        let mut misses = self.misses.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *misses).into_values().collect()
    }

    /// Forgets every verdict, e.g. after the dictionary changed.
    pub fn invalidate(&self) {
        self.verdicts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.misses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.verdicts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
