//! Nullable signer: signs, declines, or tampers on demand.

use agora_events::{SignedEvent, Signer, UnsignedEvent};
use async_trait::async_trait;
use std::sync::Mutex;

use crate::lock;

/// How [`NullSigner`] answers the next requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SignerMode {
    /// Sign the draft as given.
    #[default]
    Sign,
    /// The voter declined.
    Cancel,
    /// Sign a different content than was asked for.
    Tamper,
}

/// A signer that records every draft it is handed.
#[derive(Default)]
pub struct NullSigner {
    mode: Mutex<SignerMode>,
    requests: Mutex<Vec<UnsignedEvent>>,
}

impl NullSigner {
    pub fn new(mode: SignerMode) -> Self {
        Self {
            mode: Mutex::new(mode),
            requests: Mutex::default(),
        }
    }

    pub fn set_mode(&self, mode: SignerMode) {
        *lock(&self.mode) = mode;
    }

    pub fn requests(&self) -> Vec<UnsignedEvent> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl Signer for NullSigner {
    async fn sign(&self, draft: UnsignedEvent) -> Option<SignedEvent> {
        lock(&self.requests).push(draft.clone());
        let mode = *lock(&self.mode);
        match mode {
            SignerMode::Sign => Some(draft.into_signed("00".repeat(64))),
            SignerMode::Cancel => None,
            SignerMode::Tamper => {
                let mut altered = draft;
                altered.content.push_str("-altered");
                Some(altered.into_signed("00".repeat(64)))
            }
        }
    }
}
