//! Bounded ring of word completion timestamps.
//!
//! Capacity bounds storage; the sliding duration bounds what counts. Entries
//! older than the window stay stored until pushed out by capacity but are
//! ignored by [`SlidingWordWindow::recent`].

use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct SlidingWordWindow {
    capacity: usize,
    timestamps: VecDeque<Instant>,
}

/// Words completed within the sliding window, as seen at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecentWords {
    pub count: usize,
    pub oldest: Instant,
    pub newest: Instant,
}

impl RecentWords {
    pub fn span(&self) -> Duration {
        self.newest.saturating_duration_since(self.oldest)
    }
}

impl SlidingWordWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            timestamps: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a timestamp, evicting the oldest entries beyond capacity.
    pub fn push(&mut self, timestamp: Instant) {
        self.timestamps.push_back(timestamp);
        while self.timestamps.len() > self.capacity {
            self.timestamps.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.timestamps.clear();
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Stored timestamps, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Instant> {
        self.timestamps.iter()
    }

    /// Summarize entries no older than `window` at `now`.
    pub fn recent(&self, now: Instant, window: Duration) -> Option<RecentWords> {
        self.timestamps
            .iter()
            .copied()
            .filter(|ts| now.saturating_duration_since(*ts) <= window)
            .fold(None, |acc: Option<RecentWords>, ts| {
                Some(match acc {
                    None => RecentWords {
                        count: 1,
                        oldest: ts,
                        newest: ts,
                    },
                    Some(r) => RecentWords {
                        count: r.count + 1,
                        oldest: r.oldest.min(ts),
                        newest: r.newest.max(ts),
                    },
                })
            })
    }
}
