use crate::broadcast::subscriber::{PublishOutcome, SubscriberId, SubscriberSet, Subscription};
use crate::core::{MetricsSnapshot, SharedEngine};
use crate::stats::SharedStreamStats;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

/// Periodically snapshots the engine and fans the result out to subscribers.
pub struct MetricsBroadcaster {
    engine: SharedEngine,
    subscribers: SubscriberSet,
    interval: Duration,
    stats: SharedStreamStats,
}

impl MetricsBroadcaster {
    pub fn new(
        engine: SharedEngine,
        interval: Duration,
        subscriber_buffer: usize,
        stats: SharedStreamStats,
    ) -> Self {
        Self {
            engine,
            subscribers: SubscriberSet::new(subscriber_buffer),
            interval,
            stats,
        }
    }

    /// Join the stream. The returned subscription already holds a snapshot of
    /// the current state.
    pub fn subscribe(&self) -> Subscription {
        let initial = self.current_snapshot();
        self.stats.record_subscriber_joined();
        self.subscribers.join(initial)
    }

    /// Leave the stream. Safe to call more than once.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.subscribers.leave(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Current metrics without consuming a pending refresh request, so the
    /// next tick still carries it to every subscriber.
    pub fn current_snapshot(&self) -> MetricsSnapshot {
        self.engine
            .with(|engine| engine.peek_snapshot(Instant::now()))
    }

    /// Run one broadcast round.
    ///
    /// The snapshot is computed once under the engine lock; sends happen
    /// after the lock is released. With nobody subscribed nothing is
    /// computed, which keeps a pending refresh for the next listener.
    pub fn tick(&self) -> PublishOutcome {
        if self.subscribers.is_empty() {
            return PublishOutcome::default();
        }

        let snapshot = self
            .engine
            .with(|engine| engine.compute_snapshot(Instant::now()));
        let outcome = self.subscribers.publish(&snapshot);

        self.stats.record_published(outcome.delivered as u64);
        for _ in 0..outcome.dropped {
            self.stats.record_subscriber_dropped();
        }
        outcome
    }

    /// Tick until `shutdown` flips to `true` or its sender goes away.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            "Metrics broadcaster started (interval: {:.1}s)",
            self.interval.as_secs_f64()
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick();
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Metrics broadcaster stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DictionaryFailurePolicy, MetricsConfig};
    use crate::core::{MetricsEngine, Mode};
    use crate::dictionary::WordList;
    use crate::stats::create_shared_stats;
    use std::sync::Arc;

    fn broadcaster(buffer: usize) -> (MetricsBroadcaster, SharedEngine) {
        let engine = SharedEngine::new(MetricsEngine::new(
            MetricsConfig::default(),
            Box::new(WordList::from_words(["go"])),
            DictionaryFailurePolicy::CountAsIncorrect,
        ));
        let broadcaster = MetricsBroadcaster::new(
            engine.clone(),
            Duration::from_millis(20),
            buffer,
            create_shared_stats(),
        );
        (broadcaster, engine)
    }

    #[test]
    fn test_subscribe_gets_immediate_snapshot() {
        let (broadcaster, _) = broadcaster(4);
        let mut sub = broadcaster.subscribe();

        let snapshot = sub.try_recv().unwrap();
        assert_eq!(snapshot.mode, Mode::Idle);
        assert_eq!(snapshot.total_words, 0);
        assert_eq!(broadcaster.subscriber_count(), 1);
    }

    #[test]
    fn test_refresh_survives_subscribe_and_reaches_tick() {
        let (broadcaster, engine) = broadcaster(4);
        engine.with(|e| e.on_char('g', Instant::now()));

        let mut first = broadcaster.subscribe();
        assert!(first.try_recv().unwrap().refresh);
        let mut second = broadcaster.subscribe();
        assert!(second.try_recv().unwrap().refresh);

        broadcaster.tick();
        assert!(first.try_recv().unwrap().refresh);
        assert!(second.try_recv().unwrap().refresh);

        broadcaster.tick();
        assert!(!first.try_recv().unwrap().refresh);
    }

    #[test]
    fn test_tick_without_subscribers_is_noop() {
        let (broadcaster, _) = broadcaster(4);
        assert_eq!(broadcaster.tick(), PublishOutcome::default());
    }

    #[test]
    fn test_dropped_subscriber_does_not_affect_others() {
        let (broadcaster, _) = broadcaster(4);
        let mut keep = broadcaster.subscribe();
        let gone = broadcaster.subscribe();
        drop(gone);

        let outcome = broadcaster.tick();
        assert_eq!(outcome.delivered, 1);
        assert_eq!(outcome.dropped, 1);

        keep.try_recv().unwrap();
        assert!(keep.try_recv().is_some());
        assert_eq!(broadcaster.stats.stats().subscribers_dropped, 1);
    }

    #[tokio::test]
    async fn test_run_ticks_until_shutdown() {
        let (broadcaster, _) = broadcaster(64);
        let broadcaster = Arc::new(broadcaster);
        let mut sub = broadcaster.subscribe();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = {
            let broadcaster = broadcaster.clone();
            tokio::spawn(async move { broadcaster.run(shutdown_rx).await })
        };

        // initial + at least two ticks
        for _ in 0..3 {
            tokio::time::timeout(Duration::from_secs(2), sub.recv())
                .await
                .expect("snapshot within timeout")
                .expect("subscription open");
        }

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("broadcaster stops")
            .unwrap();
    }
}
