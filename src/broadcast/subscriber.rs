use crate::core::MetricsSnapshot;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

/// Identifies one subscriber for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Receiving end of a subscription.
///
/// Dropping it is enough to leave; the next publish notices the closed
/// queue and removes the entry.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::Receiver<MetricsSnapshot>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next snapshot. `None` once the subscriber was removed
    /// and its queue drained.
    pub async fn recv(&mut self) -> Option<MetricsSnapshot> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<MetricsSnapshot> {
        self.receiver.try_recv().ok()
    }
}

/// Result of pushing one snapshot to every subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishOutcome {
    pub delivered: usize,
    pub dropped: usize,
}

/// Thread-safe set of subscriber queues.
///
/// Each subscriber owns a bounded queue. Publishing never waits: a full or
/// closed queue means the subscriber is gone.
pub struct SubscriberSet {
    subscribers: Mutex<HashMap<SubscriberId, mpsc::Sender<MetricsSnapshot>>>,
    buffer: usize,
}

impl SubscriberSet {
    pub fn new(buffer: usize) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            // tokio rejects zero-capacity channels
            buffer: buffer.max(1),
        }
    }

    /// Register a new subscriber, seeding its queue with `initial`.
    pub fn join(&self, initial: MetricsSnapshot) -> Subscription {
        let (sender, receiver) = mpsc::channel(self.buffer);
        // Fresh queue with capacity >= 1
        let _ = sender.try_send(initial);

        let id = SubscriberId::new();
        let mut subscribers = self.lock();
        subscribers.insert(id, sender);
        tracing::info!("Subscriber {} joined. Total: {}", id, subscribers.len());

        Subscription { id, receiver }
    }

    /// Remove a subscriber. Returns whether it was still present.
    pub fn leave(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.lock();
        let removed = subscribers.remove(&id).is_some();
        if removed {
            tracing::info!("Subscriber {} left. Remaining: {}", id, subscribers.len());
        }
        removed
    }

    /// Push `snapshot` to every subscriber, removing those that cannot take it.
    ///
    /// The set is only locked to copy the senders and to remove dead entries,
    /// so joins and leaves can proceed while sends are in flight.
    pub fn publish(&self, snapshot: &MetricsSnapshot) -> PublishOutcome {
        let targets: Vec<(SubscriberId, mpsc::Sender<MetricsSnapshot>)> = self
            .lock()
            .iter()
            .map(|(id, sender)| (*id, sender.clone()))
            .collect();

        let mut outcome = PublishOutcome::default();
        let mut dead = Vec::new();

        for (id, sender) in targets {
            match sender.try_send(snapshot.clone()) {
                Ok(()) => outcome.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!("Subscriber {} is not keeping up, dropping it", id);
                    dead.push(id);
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!("Subscriber {} disconnected", id);
                    dead.push(id);
                }
            }
        }

        if !dead.is_empty() {
            let mut subscribers = self.lock();
            for id in &dead {
                if subscribers.remove(id).is_some() {
                    outcome.dropped += 1;
                }
            }
            tracing::info!(
                "Removed {} dead subscriber(s). Remaining: {}",
                outcome.dropped,
                subscribers.len()
            );
        }

        outcome
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<SubscriberId, mpsc::Sender<MetricsSnapshot>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
