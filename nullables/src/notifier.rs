//! Nullable notifier: record topics and call handlers inline.

use agora_websocket::{Handler, Notifier, Subscription, Topic};
use std::sync::Mutex;

use crate::lock;

#[derive(Default)]
pub struct NullNotifier {
    published: Mutex<Vec<Topic>>,
    handlers: Mutex<Vec<(Topic, Handler)>>,
}

impl NullNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every topic published so far, in order.
    pub fn published(&self) -> Vec<Topic> {
        lock(&self.published).clone()
    }

    pub fn count(&self, topic: Topic) -> usize {
        lock(&self.published).iter().filter(|t| **t == topic).count()
    }
}

impl Notifier for NullNotifier {
    fn publish(&self, topic: Topic) {
        lock(&self.published).push(topic);
        let handlers: Vec<Handler> = lock(&self.handlers)
            .iter()
            .filter(|(t, _)| *t == topic)
            .map(|(_, h)| h.clone())
            .collect();
        for handler in handlers {
            handler(topic);
        }
    }

    /// Handlers stay registered for the notifier's lifetime.
    fn subscribe(&self, topic: Topic, handler: Handler) -> Subscription {
        lock(&self.handlers).push((topic, handler));
        Subscription::inert()
    }
}
