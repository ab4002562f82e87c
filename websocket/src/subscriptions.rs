//! Topics and the messages exchanged with websocket clients.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// What changed. Notifications carry nothing else; receivers re-fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    /// A vote was published.
    Votes,
    /// Voting closed.
    Lifecycle,
}

impl Topic {
    pub const ALL: [Topic; 2] = [Topic::Votes, Topic::Lifecycle];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Votes => "votes",
            Topic::Lifecycle => "lifecycle",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The frame pushed to subscribed clients, e.g. `{"topic":"votes"}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub topic: Topic,
}

/// Client requests, e.g. `{"action":"subscribe","topic":"votes"}`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ClientMessage {
    Subscribe { topic: Topic },
    Unsubscribe { topic: Topic },
    Ping,
}

/// Replies to client requests.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    Ack { action: String, topic: Topic },
    Error { message: String },
    Pong,
}

/// Topics one connection is subscribed to.
#[derive(Debug, Default)]
pub struct ClientSubscriptions {
    topics: HashSet<Topic>,
}

impl ClientSubscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the topic was already subscribed.
    pub fn subscribe(&mut self, topic: Topic) -> bool {
        self.topics.insert(topic)
    }

    /// Returns `false` if the topic was not subscribed.
    pub fn unsubscribe(&mut self, topic: &Topic) -> bool {
        self.topics.remove(topic)
    }

    pub fn is_subscribed(&self, topic: &Topic) -> bool {
        self.topics.contains(topic)
    }
}
