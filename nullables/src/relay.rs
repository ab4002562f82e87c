//! Nullable relay: an in-memory event store with scriptable outages.

use agora_events::{RawEvent, SignedEvent};
use agora_relay::{Ack, Relay, RelayError};
use agora_types::PublicKey;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::lock;

/// Serves stored events, records publishes, and fails on demand.
///
/// Accepted publishes are stored, so a later fetch sees them the way a real
/// relay would.
#[derive(Default)]
pub struct NullRelay {
    events: Mutex<Vec<RawEvent>>,
    published: Mutex<Vec<SignedEvent>>,
    outage: Mutex<Option<String>>,
    rejection: Mutex<Option<String>>,
    fetches: AtomicUsize,
}

impl NullRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(events: Vec<RawEvent>) -> Self {
        Self {
            events: Mutex::new(events),
            ..Self::default()
        }
    }

    /// Store an event as if another client had published it.
    pub fn insert(&self, event: RawEvent) {
        lock(&self.events).push(event);
    }

    /// Fail every call with `RelayError::Unavailable(reason)` until [`restore`](Self::restore).
    pub fn go_down(&self, reason: impl Into<String>) {
        *lock(&self.outage) = Some(reason.into());
    }

    pub fn restore(&self) {
        *lock(&self.outage) = None;
    }

    /// Answer publishes with `OK false` and this message.
    pub fn reject_publishes(&self, reason: impl Into<String>) {
        *lock(&self.rejection) = Some(reason.into());
    }

    /// Every event handed to `publish`, accepted or not.
    pub fn published(&self) -> Vec<SignedEvent> {
        lock(&self.published).clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn check_up(&self) -> Result<(), RelayError> {
        match lock(&self.outage).as_ref() {
            Some(reason) => Err(RelayError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Relay for NullRelay {
    async fn fetch(
        &self,
        kinds: &[u16],
        authors: Option<&[PublicKey]>,
    ) -> Result<Vec<RawEvent>, RelayError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.check_up()?;
        Ok(lock(&self.events)
            .iter()
            .filter(|e| kinds.contains(&e.kind))
            .filter(|e| authors.map_or(true, |a| a.contains(&e.pubkey)))
            .cloned()
            .collect())
    }

    async fn publish(&self, event: &SignedEvent) -> Result<Ack, RelayError> {
        self.check_up()?;
        lock(&self.published).push(event.clone());
        if let Some(reason) = lock(&self.rejection).clone() {
            return Err(RelayError::Rejected {
                id: event.id,
                reason,
            });
        }
        lock(&self.events).push(event.clone());
        Ok(Ack {
            id: event.id,
            message: String::new(),
        })
    }
}
