//! In-process fanout of change notifications.

use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::subscriptions::Topic;

/// Callback run for every notification on a subscribed topic.
pub type Handler = Arc<dyn Fn(Topic) + Send + Sync>;

/// Fire-and-forget change notifications.
///
/// `publish` never blocks and never fails: a notification nobody receives is
/// simply dropped.
pub trait Notifier: Send + Sync {
    fn publish(&self, topic: Topic);

    fn subscribe(&self, topic: Topic, handler: Handler) -> Subscription;
}

/// Keeps a handler registered. Dropping it unregisters the handler.
#[derive(Debug, Default)]
pub struct Subscription {
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn from_task(task: JoinHandle<()>) -> Self {
        Self { task: Some(task) }
    }

    /// A subscription with nothing to tear down.
    pub fn inert() -> Self {
        Self::default()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// One broadcast channel per topic.
pub struct FanoutHub {
    votes_tx: broadcast::Sender<Topic>,
    lifecycle_tx: broadcast::Sender<Topic>,
}

impl FanoutHub {
    pub fn new(channel_capacity: usize) -> Self {
        let (votes_tx, _) = broadcast::channel(channel_capacity);
        let (lifecycle_tx, _) = broadcast::channel(channel_capacity);
        Self {
            votes_tx,
            lifecycle_tx,
        }
    }

    pub fn sender_for(&self, topic: Topic) -> &broadcast::Sender<Topic> {
        match topic {
            Topic::Votes => &self.votes_tx,
            Topic::Lifecycle => &self.lifecycle_tx,
        }
    }

    pub fn receiver(&self, topic: Topic) -> broadcast::Receiver<Topic> {
        self.sender_for(topic).subscribe()
    }

    pub fn receiver_count(&self, topic: Topic) -> usize {
        self.sender_for(topic).receiver_count()
    }
}

impl Default for FanoutHub {
    fn default() -> Self {
        Self::new(256)
    }
}

impl Notifier for FanoutHub {
    fn publish(&self, topic: Topic) {
        // Err only means no receiver is listening right now.
        let delivered = self.sender_for(topic).send(topic).unwrap_or(0);
        debug!(%topic, delivered, "notification published");
    }

    /// Spawns a task on the current tokio runtime that runs `handler` for
    /// each notification. A lagging handler sees one call for the whole gap.
    fn subscribe(&self, topic: Topic, handler: Handler) -> Subscription {
        let mut rx = self.receiver(topic);
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(t) => handler(t),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(%topic, skipped = n, "notification handler lagged");
                        handler(topic);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Subscription::from_task(task)
    }
}
