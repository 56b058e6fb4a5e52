//! Process-lifetime counters for the event and publish paths.
//!
//! Nothing here is persisted; a restart starts from zero like the session
//! itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug)]
pub struct StreamStats {
    /// Keystrokes handed to the engine
    keystrokes: AtomicU64,
    /// Words the engine reported complete
    words_completed: AtomicU64,
    /// Snapshots delivered to a subscriber queue
    snapshots_published: AtomicU64,
    subscribers_joined: AtomicU64,
    /// Subscribers removed after a failed send
    subscribers_dropped: AtomicU64,
    started_at: DateTime<Utc>,
}

impl StreamStats {
    pub fn new() -> Self {
        Self {
            keystrokes: AtomicU64::new(0),
            words_completed: AtomicU64::new(0),
            snapshots_published: AtomicU64::new(0),
            subscribers_joined: AtomicU64::new(0),
            subscribers_dropped: AtomicU64::new(0),
            started_at: Utc::now(),
        }
    }

    pub fn record_keystroke(&self) {
        self.keystrokes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_word(&self) {
        self.words_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_published(&self, count: u64) {
        self.snapshots_published.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_subscriber_joined(&self) {
        self.subscribers_joined.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_subscriber_dropped(&self) {
        self.subscribers_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn stats(&self) -> StreamStatsSnapshot {
        StreamStatsSnapshot {
            keystrokes: self.keystrokes.load(Ordering::Relaxed),
            words_completed: self.words_completed.load(Ordering::Relaxed),
            snapshots_published: self.snapshots_published.load(Ordering::Relaxed),
            subscribers_joined: self.subscribers_joined.load(Ordering::Relaxed),
            subscribers_dropped: self.subscribers_dropped.load(Ordering::Relaxed),
            started_at: self.started_at,
            uptime_secs: (Utc::now() - self.started_at).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Stream Statistics:\n\
             - Started: {}\n\
             - Keystrokes processed: {}\n\
             - Words completed: {}\n\
             - Snapshots published: {}\n\
             - Subscribers joined: {}\n\
             - Subscribers dropped: {}\n\
             - Uptime: {} seconds",
            stats.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
            stats.keystrokes,
            stats.words_completed,
            stats.snapshots_published,
            stats.subscribers_joined,
            stats.subscribers_dropped,
            stats.uptime_secs
        )
    }
}

impl Default for StreamStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy of the counters at one moment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamStatsSnapshot {
    pub keystrokes: u64,
    pub words_completed: u64,
    pub snapshots_published: u64,
    pub subscribers_joined: u64,
    pub subscribers_dropped: u64,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
}

/// Thread-safe shared stream statistics.
pub type SharedStreamStats = Arc<StreamStats>;

pub fn create_shared_stats() -> SharedStreamStats {
    Arc::new(StreamStats::new())
}
