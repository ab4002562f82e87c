//! The external signing seam.

use async_trait::async_trait;

use crate::event::{SignedEvent, UnsignedEvent};

/// Whatever holds the voter's key: a browser extension, a remote signer, a
/// test double. The engine never sees private keys.
#[async_trait]
pub trait Signer: Send + Sync {
    /// `None` when the voter declines to sign.
    async fn sign(&self, draft: UnsignedEvent) -> Option<SignedEvent>;
}
