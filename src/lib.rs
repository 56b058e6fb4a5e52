//! keytempo - live typing metrics for remote displays.
//!
//! This library turns a stream of keystrokes into words-per-minute,
//! accuracy, active time and an idle/typing mode, and pushes snapshots of
//! those metrics to any number of subscribed display clients.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                             keytempo                              │
//! ├───────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────────────────┐  │
//! │  │  Collector  │──▶│   Intake    │──▶│      MetricsEngine      │  │
//! │  │  (reader)   │   │  (thread)   │   │ words · clock · window  │  │
//! │  └─────────────┘   └─────────────┘   └─────────────────────────┘  │
//! │                                                   │               │
//! │                                                   ▼ every tick    │
//! │                    ┌─────────────┐   ┌─────────────────────────┐  │
//! │                    │   Server    │◀──│   MetricsBroadcaster    │  │
//! │                    │ /ws /metrics│   │     (subscriber set)    │  │
//! │                    └─────────────┘   └─────────────────────────┘  │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use keytempo::{
//!     DictionaryFailurePolicy, MetricsBroadcaster, MetricsConfig, MetricsEngine, SharedEngine,
//!     WordList,
//! };
//! use std::time::Instant;
//!
//! let engine = SharedEngine::new(MetricsEngine::new(
//!     MetricsConfig::default(),
//!     Box::new(WordList::from_words(["hello", "world"])),
//!     DictionaryFailurePolicy::CountAsIncorrect,
//! ));
//!
//! engine.with(|e| {
//!     let now = Instant::now();
//!     for ch in "hello".chars() {
//!         e.on_char(ch, now);
//!     }
//!     e.on_boundary(now);
//! });
//!
//! let broadcaster = MetricsBroadcaster::new(
//!     engine,
//!     std::time::Duration::from_secs(1),
//!     16,
//!     keytempo::stats::create_shared_stats(),
//! );
//! let mut subscription = broadcaster.subscribe();
//! let snapshot = subscription.try_recv().expect("initial snapshot");
//! assert_eq!(snapshot.total_words, 1);
//! ```

pub mod broadcast;
pub mod collector;
pub mod config;
pub mod core;
pub mod dictionary;
pub mod intake;
pub mod server;
pub mod stats;

// Re-export key types at crate root for convenience
pub use broadcast::{MetricsBroadcaster, SubscriberId, Subscription};
pub use collector::{CollectorError, KeyEvent, KeyInput, ReaderCollector};
pub use config::{
    Config, ConfigError, DictionaryFailurePolicy, InputFormat, MetricsConfig, ServerSettings,
};
pub use core::{MetricsEngine, MetricsSnapshot, Mode, SharedEngine};
pub use dictionary::{Dictionary, DictionaryError, Unavailable, WordList};
pub use intake::Intake;
pub use stats::{SharedStreamStats, StreamStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
