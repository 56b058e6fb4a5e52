//! The metrics engine: word rate, accuracy and idle/typing mode.
//!
//! All session state lives in one [`MetricsEngine`]. Writers (the keystroke
//! intake) and readers (the broadcaster) reach it through a [`SharedEngine`],
//! so each event or snapshot is a single critical section.

use crate::collector::types::{KeyEvent, KeyInput};
use crate::config::{DictionaryFailurePolicy, MetricsConfig};
use crate::core::activity::ActivityClock;
use crate::core::snapshot::{MetricsSnapshot, Mode, SnapshotParts};
use crate::core::window::SlidingWordWindow;
use crate::core::words::{WordBoundaryDetector, WordCounts, WordEvent};
use crate::dictionary::Dictionary;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

pub struct MetricsEngine {
    config: MetricsConfig,
    dictionary: Box<dyn Dictionary>,
    on_dictionary_failure: DictionaryFailurePolicy,
    detector: WordBoundaryDetector,
    clock: ActivityClock,
    window: SlidingWordWindow,
    mode: Mode,
    /// Highest WPM seen in the current burst
    peak_wpm: f64,
    /// Last WPM actually computed from the window
    last_wpm: f64,
    refresh_requested: bool,
}

impl MetricsEngine {
    pub fn new(
        config: MetricsConfig,
        dictionary: Box<dyn Dictionary>,
        on_dictionary_failure: DictionaryFailurePolicy,
    ) -> Self {
        Self {
            clock: ActivityClock::new(config.idle_threshold),
            window: SlidingWordWindow::new(config.max_word_events),
            config,
            dictionary,
            on_dictionary_failure,
            detector: WordBoundaryDetector::new(),
            mode: Mode::Idle,
            peak_wpm: 0.0,
            last_wpm: 0.0,
            refresh_requested: false,
        }
    }

    /// Dispatch a captured key event.
    pub fn apply(&mut self, event: &KeyEvent) -> Option<WordEvent> {
        match event.input {
            KeyInput::Char(ch) => {
                self.on_char(ch, event.at);
                None
            }
            KeyInput::Backspace => {
                self.on_backspace(event.at);
                None
            }
            KeyInput::Boundary => self.on_boundary(event.at),
        }
    }

    pub fn on_char(&mut self, ch: char, now: Instant) {
        self.on_keystroke(now);
        self.detector.on_char(ch);
    }

    pub fn on_backspace(&mut self, now: Instant) {
        self.on_keystroke(now);
        self.detector.on_backspace();
    }

    /// Space or enter. Returns the completed word, if the buffer held one.
    pub fn on_boundary(&mut self, now: Instant) -> Option<WordEvent> {
        self.on_keystroke(now);
        self.flush_word(now)
    }

    /// Complete the buffered word without treating it as a keystroke.
    pub fn flush_word(&mut self, now: Instant) -> Option<WordEvent> {
        let word = self
            .detector
            .on_boundary(now, self.dictionary.as_ref(), self.on_dictionary_failure)?;
        self.on_word_completed(word);
        Some(word)
    }

    /// Record a completed word in the rate window. A word always ends an
    /// idle period, with or without a preceding keystroke gap.
    pub fn on_word_completed(&mut self, word: WordEvent) {
        if self.mode == Mode::Idle {
            self.enter_typing();
        }
        self.window.push(word.timestamp);
    }

    fn on_keystroke(&mut self, now: Instant) {
        let gap = self.clock.record_event(now);
        let starts_burst = match gap {
            None => true,
            Some(gap) => gap > self.config.idle_threshold,
        };
        if starts_burst {
            self.enter_typing();
        }
    }

    fn enter_typing(&mut self) {
        if self.mode == Mode::Idle {
            tracing::debug!("Entering typing mode");
        } else {
            tracing::debug!("Starting a new typing burst after an unobserved idle gap");
        }
        self.mode = Mode::Typing;
        self.peak_wpm = 0.0;
        self.last_wpm = 0.0;
        self.window.clear();
        self.refresh_requested = true;
    }

    /// Compute a snapshot and consume the pending refresh request.
    pub fn compute_snapshot(&mut self, now: Instant) -> MetricsSnapshot {
        let snapshot = self.snapshot_at(now);
        self.refresh_requested = false;
        snapshot
    }

    /// Compute a snapshot but leave any refresh request for the next tick.
    pub fn peek_snapshot(&mut self, now: Instant) -> MetricsSnapshot {
        self.snapshot_at(now)
    }

    fn snapshot_at(&mut self, now: Instant) -> MetricsSnapshot {
        let active_time = self.clock.active_time(now);
        let wpm = self.current_wpm(now);

        if wpm > 0.0 {
            self.peak_wpm = self.peak_wpm.max(wpm);
        }

        let counts = self.detector.counts();

        if self.mode == Mode::Typing && self.idle_elapsed(now) {
            tracing::debug!("Entering idle mode");
            self.mode = Mode::Idle;
            self.refresh_requested = true;
        }

        MetricsSnapshot::from_parts(SnapshotParts {
            mode: self.mode,
            wpm,
            accuracy: counts.accuracy(),
            active_time,
            total_words: counts.total,
            correct_words: counts.correct,
            peak_wpm: self.peak_wpm,
            refresh: self.refresh_requested,
        })
    }

    fn current_wpm(&mut self, now: Instant) -> f64 {
        let recent = match self.window.recent(now, self.config.sliding_window) {
            Some(recent) if recent.count >= 2 => recent,
            _ => return 0.0,
        };

        // Hold the rate through short pauses instead of letting it decay
        // as the window ages.
        if now.saturating_duration_since(recent.newest) > self.config.inactive_wpm_freeze {
            return self.last_wpm;
        }

        let span = recent.span();
        if span.is_zero() {
            return self.last_wpm;
        }

        self.last_wpm = recent.count as f64 / span.as_secs_f64() * 60.0;
        self.last_wpm
    }

    fn idle_elapsed(&self, now: Instant) -> bool {
        self.clock
            .since_last_event(now)
            .map_or(true, |since| since > self.config.idle_threshold)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn counts(&self) -> WordCounts {
        self.detector.counts()
    }

    pub fn peak_wpm(&self) -> f64 {
        self.peak_wpm
    }

    pub fn window(&self) -> &SlidingWordWindow {
        &self.window
    }
}

/// Cloneable handle that serializes all access to one engine.
#[derive(Clone)]
pub struct SharedEngine {
    inner: Arc<Mutex<MetricsEngine>>,
}

impl SharedEngine {
    pub fn new(engine: MetricsEngine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    /// Run `f` with exclusive access to the engine.
    pub fn with<R>(&self, f: impl FnOnce(&mut MetricsEngine) -> R) -> R {
        let mut engine = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut engine)
    }
}
