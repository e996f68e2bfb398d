use common::model::notification::NotificationEvent;
use dashmap::DashMap;
use log::{debug, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Channel that receives the terminal event of every task.
pub const RESULTS_CHANNEL: &str = "results";

/// Channel key for the events of a single task.
pub fn task_channel(task_id: &str) -> String {
    format!("task:{task_id}")
}

struct Subscriber {
    id: u64,
    tx: mpsc::Sender<NotificationEvent>,
}

struct HubInner {
    channels: DashMap<String, Vec<Subscriber>>,
    buffer: usize,
    next_id: AtomicU64,
}

/// Publish/subscribe registry keyed by channel name.
///
/// Each subscriber owns a bounded queue. Publishing never waits: when a
/// queue is full the event is dropped for that subscriber only, and closed
/// queues are pruned. There is no history, so events published while nobody
/// listens are lost.
#[derive(Clone)]
pub struct NotificationHub {
    inner: Arc<HubInner>,
}

/// Receiving end of one subscription. Events arrive in publish order.
pub struct Subscription {
    id: u64,
    key: String,
    rx: mpsc::Receiver<NotificationEvent>,
}

impl Subscription {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Next event, or `None` once the hub dropped this subscriber.
    pub async fn recv(&mut self) -> Option<NotificationEvent> {
        self.rx.recv().await
    }

    #[cfg(test)]
    pub fn try_recv(&mut self) -> Option<NotificationEvent> {
        self.rx.try_recv().ok()
    }
}

impl NotificationHub {
    pub fn new(buffer: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                channels: DashMap::new(),
                buffer: buffer.max(1),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn subscribe(&self, key: impl Into<String>) -> Subscription {
        let key = key.into();
        let (tx, rx) = mpsc::channel(self.inner.buffer);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        self.inner
            .channels
            .entry(key.clone())
            .or_default()
            .push(Subscriber { id, tx });

        Subscription { id, key, rx }
    }

    pub fn unsubscribe(&self, subscription: Subscription) {
        if let Some(mut subscribers) = self.inner.channels.get_mut(&subscription.key) {
            subscribers.retain(|s| s.id != subscription.id);
        }
        self.remove_if_empty(&subscription.key);
    }

    /// Delivers `event` to everyone currently subscribed to `key` and returns
    /// how many subscribers accepted it.
    pub fn publish(&self, key: &str, event: &NotificationEvent) -> usize {
        let mut delivered = 0;

        if let Some(mut subscribers) = self.inner.channels.get_mut(key) {
            subscribers.retain(|subscriber| match subscriber.tx.try_send(event.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    warn!(
                        "Subscriber {} on '{}' is full, dropping {} event",
                        subscriber.id,
                        key,
                        event.status.as_str()
                    );
                    true
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("Pruning closed subscriber {} on '{}'", subscriber.id, key);
                    false
                }
            });
        }

        self.remove_if_empty(key);
        delivered
    }

    pub fn subscriber_count(&self, key: &str) -> usize {
        self.inner
            .channels
            .get(key)
            .map(|subscribers| subscribers.len())
            .unwrap_or(0)
    }

    fn remove_if_empty(&self, key: &str) {
        self.inner
            .channels
            .remove_if(key, |_, subscribers| subscribers.is_empty());
    }
}
