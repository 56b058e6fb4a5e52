//! Core metrics computation.
//!
//! This module contains:
//! - Word boundary detection and correctness judging
//! - Active-time accounting with idle gap exclusion
//! - The bounded word timestamp window
//! - The metrics engine and the snapshot payload it produces

pub mod activity;
pub mod engine;
pub mod snapshot;
pub mod window;
pub mod words;

// Re-export commonly used types
pub use activity::ActivityClock;
pub use engine::{MetricsEngine, SharedEngine};
pub use snapshot::{MetricsSnapshot, Mode};
pub use window::{RecentWords, SlidingWordWindow};
pub use words::{WordBoundaryDetector, WordCounts, WordEvent};
