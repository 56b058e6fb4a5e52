//! The metrics payload pushed to display clients.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Whether the user is currently in a typing burst.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Idle,
    Typing,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Idle => "idle",
            Mode::Typing => "typing",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One point-in-time view of the session. Rates and times are rounded to one
/// decimal place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub mode: Mode,
    pub wpm: f64,
    pub accuracy: f64,
    /// Active seconds
    pub active_time: f64,
    pub total_words: u64,
    pub correct_words: u64,
    pub peak_wpm: f64,
    /// Set once after a mode transition so displays can redraw fully
    pub refresh: bool,
}

/// Raw values handed over by the engine.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SnapshotParts {
    pub mode: Mode,
    pub wpm: f64,
    pub accuracy: f64,
    pub active_time: Duration,
    pub total_words: u64,
    pub correct_words: u64,
    pub peak_wpm: f64,
    pub refresh: bool,
}

impl MetricsSnapshot {
    /// Build the payload. The engine is its only producer, so a payload that
    /// breaks an invariant is a bug and panics.
    pub(crate) fn from_parts(parts: SnapshotParts) -> Self {
        assert!(
            parts.correct_words <= parts.total_words,
            "correct_words ({}) exceeds total_words ({})",
            parts.correct_words,
            parts.total_words
        );
        assert!(
            parts.wpm.is_finite() && parts.wpm >= 0.0,
            "wpm must be finite and non-negative, got {}",
            parts.wpm
        );
        assert!(
            (0.0..=100.0).contains(&parts.accuracy),
            "accuracy out of range: {}",
            parts.accuracy
        );

        Self {
            mode: parts.mode,
            wpm: round1(parts.wpm),
            accuracy: round1(parts.accuracy),
            active_time: round1(parts.active_time.as_secs_f64()),
            total_words: parts.total_words,
            correct_words: parts.correct_words,
            peak_wpm: round1(parts.peak_wpm),
            refresh: parts.refresh,
        }
    }

    pub fn to_json(&self) -> String {
        // All fields are plain numbers, bools and a unit enum
        serde_json::to_string(self).expect("metrics snapshot always serializes")
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts() -> SnapshotParts {
        SnapshotParts {
            mode: Mode::Typing,
            wpm: 42.345,
            accuracy: 66.666,
            active_time: Duration::from_millis(12_345),
            total_words: 3,
            correct_words: 2,
            peak_wpm: 50.05,
            refresh: true,
        }
    }

    #[test]
    fn test_rounding() {
        let snapshot = MetricsSnapshot::from_parts(parts());
        assert_eq!(snapshot.wpm, 42.3);
        assert_eq!(snapshot.accuracy, 66.7);
        assert_eq!(snapshot.active_time, 12.3);
    }

    #[test]
    fn test_json_field_names() {
        let json: serde_json::Value =
            serde_json::from_str(&MetricsSnapshot::from_parts(parts()).to_json()).unwrap();
        assert_eq!(json["mode"], "typing");
        assert_eq!(json["total_words"], 3);
        assert_eq!(json["correct_words"], 2);
        assert_eq!(json["refresh"], true);
        for key in ["wpm", "accuracy", "active_time", "peak_wpm"] {
            assert!(json[key].is_f64(), "{key} should be a float");
        }
    }

    #[test]
    #[should_panic(expected = "exceeds total_words")]
    fn test_inconsistent_counts_panic() {
        let mut bad = parts();
        bad.correct_words = 4;
        MetricsSnapshot::from_parts(bad);
    }
}
