//! Word boundary detection.
//!
//! Characters accumulate in a buffer until a boundary key arrives. The
//! trimmed buffer is then judged once against the dictionary and reported as
//! a completed word.

use crate::config::DictionaryFailurePolicy;
use crate::dictionary::Dictionary;
use serde::Serialize;
use std::time::Instant;

/// A completed, non-empty word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordEvent {
    pub timestamp: Instant,
    pub is_correct: bool,
}

/// Session-cumulative word counters. Never reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WordCounts {
    pub total: u64,
    pub correct: u64,
}

impl WordCounts {
    /// Percentage of correct words; 100 when nothing has been typed.
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.correct as f64 / self.total as f64 * 100.0
        }
    }
}

/// Turns char/backspace/boundary input into [`WordEvent`]s.
#[derive(Debug, Default)]
pub struct WordBoundaryDetector {
    buffer: String,
    counts: WordCounts,
}

impl WordBoundaryDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_char(&mut self, ch: char) {
        self.buffer.push(ch);
    }

    pub fn on_backspace(&mut self) {
        self.buffer.pop();
    }

    /// Finish the buffered word. The buffer is cleared whether or not a word
    /// is emitted.
    pub fn on_boundary(
        &mut self,
        now: Instant,
        dictionary: &dyn Dictionary,
        on_failure: DictionaryFailurePolicy,
    ) -> Option<WordEvent> {
        let event = self.judge(now, dictionary, on_failure);
        self.buffer.clear();

        if let Some(ref word) = event {
            self.counts.total += 1;
            if word.is_correct {
                self.counts.correct += 1;
            }
        }
        event
    }

    fn judge(
        &self,
        now: Instant,
        dictionary: &dyn Dictionary,
        on_failure: DictionaryFailurePolicy,
    ) -> Option<WordEvent> {
        let word = self.buffer.trim();
        if word.is_empty() {
            return None;
        }

        let is_correct = match dictionary.contains(word) {
            Ok(found) => found,
            Err(e) => match on_failure {
                DictionaryFailurePolicy::CountAsIncorrect => {
                    tracing::warn!("Dictionary lookup failed, counting word as incorrect: {}", e);
                    false
                }
                DictionaryFailurePolicy::SkipWord => {
                    tracing::warn!("Dictionary lookup failed, skipping word: {}", e);
                    return None;
                }
            },
        };

        Some(WordEvent {
            timestamp: now,
            is_correct,
        })
    }

    pub fn counts(&self) -> WordCounts {
        self.counts
    }

    /// The word currently being typed.
    pub fn buffered(&self) -> &str {
        &self.buffer
    }
}
