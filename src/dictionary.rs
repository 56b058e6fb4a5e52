//! Dictionary lookup used to judge completed words.
//!
//! Lookup is exact and case-preserving: `"Rust"` and `"rust"` are different
//! entries. Callers trim words before asking.

use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Errors a dictionary can report for a single lookup.
#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error("dictionary unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Capability for checking whether a word is spelled correctly.
pub trait Dictionary: Send {
    fn contains(&self, word: &str) -> Result<bool, DictionaryError>;
}

/// In-memory word list.
#[derive(Debug, Clone, Default)]
pub struct WordList {
    words: HashSet<String>,
}

impl WordList {
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            words: words.into_iter().map(Into::into).collect(),
        }
    }

    /// Load a newline-separated word list (e.g. `/usr/share/dict/words`).
    pub fn from_path(path: &Path) -> Result<Self, DictionaryError> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_words(
            content
                .lines()
                .map(str::trim)
                .filter(|w| !w.is_empty())
                .map(str::to_owned),
        ))
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Dictionary for WordList {
    fn contains(&self, word: &str) -> Result<bool, DictionaryError> {
        Ok(self.words.contains(word))
    }
}

/// Stand-in used when no word list could be loaded; every lookup fails.
#[derive(Debug, Clone)]
pub struct Unavailable {
    reason: String,
}

impl Unavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Dictionary for Unavailable {
    fn contains(&self, _word: &str) -> Result<bool, DictionaryError> {
        Err(DictionaryError::Unavailable(self.reason.clone()))
    }
}
