use crate::types::{ProcessedAgentData, SubscriberState};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Opaque handle of a live observer connection
pub type SubscriberId = Uuid;

/// Serialized batch shared by every subscriber queue
pub type Payload = Arc<str>;

/// Default per-subscriber queue depth
const DEFAULT_QUEUE_CAPACITY: usize = 64;

struct Subscriber {
    sender: mpsc::Sender<Payload>,
    last_seen: DateTime<Utc>,
}

/// Outcome of a single broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub dropped: usize,
}

/// In-memory registry of open observer connections
///
/// Membership is the set of Open subscribers; anything else is Closed.
/// Each subscriber drains its own bounded queue, so a slow one never
/// holds up delivery to the rest.
#[derive(Clone)]
pub struct SubscriberRegistry {
    subscribers: Arc<RwLock<HashMap<SubscriberId, Subscriber>>>,
    queue_capacity: usize,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    /// Create registry with a custom per-subscriber queue depth
    pub fn with_capacity(queue_capacity: usize) -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(HashMap::new())),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Register a connection that completed its handshake
    ///
    /// Returns the new id and the receiving end of its delivery queue.
    pub fn subscribe(&self) -> (SubscriberId, mpsc::Receiver<Payload>) {
        let (sender, receiver) = mpsc::channel(self.queue_capacity);
        let id = Uuid::new_v4();

        self.subscribers.write().insert(
            id,
            Subscriber {
                sender,
                last_seen: Utc::now(),
            },
        );

        info!("Subscriber {} open", id);
        (id, receiver)
    }

    /// Remove a subscriber. Returns false if it was already closed.
    pub fn unsubscribe(&self, id: &SubscriberId) -> bool {
        let removed = self.subscribers.write().remove(id).is_some();
        if removed {
            info!("Subscriber {} closed", id);
        }
        removed
    }

    /// Record inbound traffic from a subscriber
    pub fn touch(&self, id: &SubscriberId) -> bool {
        if let Some(sub) = self.subscribers.write().get_mut(id) {
            sub.last_seen = Utc::now();
            true
        } else {
            false
        }
    }

    /// Current lifecycle state of a subscriber
    pub fn state(&self, id: &SubscriberId) -> SubscriberState {
        if self.subscribers.read().contains_key(id) {
            SubscriberState::Open
        } else {
            SubscriberState::Closed
        }
    }

    /// Get the count of open subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Deliver a batch to every open subscriber
    pub fn broadcast(&self, batch: &[ProcessedAgentData]) -> serde_json::Result<BroadcastReport> {
        let payload: Payload = serde_json::to_string(batch)?.into();
        Ok(self.broadcast_payload(payload))
    }

    /// Queue an already serialized payload on every open subscriber
    ///
    /// A full or closed queue counts as a failed send and closes only that
    /// subscriber.
    pub fn broadcast_payload(&self, payload: Payload) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        let mut subscribers = self.subscribers.write();

        subscribers.retain(|id, sub| match sub.sender.try_send(payload.clone()) {
            Ok(()) => {
                report.delivered += 1;
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Subscriber {} is not keeping up, closing", id);
                report.dropped += 1;
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("Subscriber {} queue closed, removing", id);
                report.dropped += 1;
                false
            }
        });

        report
    }

    /// Remove subscribers with no inbound traffic in the last N seconds
    pub fn cleanup_stale(&self, timeout_seconds: i64) -> usize {
        let now = Utc::now();
        let mut removed = 0;
        self.subscribers.write().retain(|_, sub| {
            let is_stale = (now - sub.last_seen).num_seconds() >= timeout_seconds;
            if is_stale {
                removed += 1;
            }
            !is_stale
        });
        removed
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_and_unsubscribe() {
        let registry = SubscriberRegistry::new();
        let (id, _rx) = registry.subscribe();

        assert_eq!(registry.state(&id), SubscriberState::Open);
        assert_eq!(registry.subscriber_count(), 1);

        assert!(registry.unsubscribe(&id));
        assert!(!registry.unsubscribe(&id));
        assert_eq!(registry.state(&id), SubscriberState::Closed);
        assert_eq!(registry.subscriber_count(), 0);
    }

    #[test]
    fn test_touch() {
        let registry = SubscriberRegistry::new();

        assert!(!registry.touch(&Uuid::new_v4()));

        let (id, _rx) = registry.subscribe();
        assert!(registry.touch(&id));
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_subscriber() {
        let registry = SubscriberRegistry::new();
        let (_a, mut rx_a) = registry.subscribe();
        let (_b, mut rx_b) = registry.subscribe();

        let report = registry.broadcast_payload("[1]".into());
        assert_eq!(report, BroadcastReport { delivered: 2, dropped: 0 });

        assert_eq!(&*rx_a.recv().await.unwrap(), "[1]");
        assert_eq!(&*rx_b.recv().await.unwrap(), "[1]");
    }

    #[tokio::test]
    async fn test_failed_send_closes_only_that_subscriber() {
        let registry = SubscriberRegistry::new();
        let (alive, mut rx_alive) = registry.subscribe();
        let (gone, rx_gone) = registry.subscribe();
        drop(rx_gone);

        let report = registry.broadcast_payload("[]".into());

        assert_eq!(report, BroadcastReport { delivered: 1, dropped: 1 });
        assert_eq!(registry.state(&alive), SubscriberState::Open);
        assert_eq!(registry.state(&gone), SubscriberState::Closed);
        assert_eq!(&*rx_alive.recv().await.unwrap(), "[]");
    }

    #[tokio::test]
    async fn test_slow_subscriber_is_dropped_without_blocking() {
        let registry = SubscriberRegistry::with_capacity(2);
        let (slow, _rx_slow) = registry.subscribe();
        let (fast, mut rx_fast) = registry.subscribe();

        for i in 0..3 {
            registry.broadcast_payload(format!("[{}]", i).into());
            assert_eq!(&*rx_fast.recv().await.unwrap(), format!("[{}]", i));
        }

        assert_eq!(registry.state(&slow), SubscriberState::Closed);
        assert_eq!(registry.state(&fast), SubscriberState::Open);
    }

    #[tokio::test]
    async fn test_per_subscriber_order_matches_broadcast_order() {
        let registry = SubscriberRegistry::new();
        let (_id, mut rx) = registry.subscribe();

        for i in 0..5 {
            registry.broadcast_payload(i.to_string().into());
        }

        for i in 0..5 {
            assert_eq!(&*rx.recv().await.unwrap(), i.to_string());
        }
    }

    #[test]
    fn test_cleanup_stale() {
        let registry = SubscriberRegistry::new();
        let (_id, _rx) = registry.subscribe();

        assert_eq!(registry.cleanup_stale(300), 0);
        assert_eq!(registry.cleanup_stale(0), 1);
        assert_eq!(registry.subscriber_count(), 0);
    }
}
