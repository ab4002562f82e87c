//! Wire events and unsigned drafts.

use agora_types::{EventId, PublicKey, Timestamp};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::EventError;

/// One event tag, e.g. `["d", "<voter>,<year>,<position>"]`.
pub type Tag = Vec<String>;

/// An event draft awaiting a signature from an external signer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedEvent {
    pub pubkey: PublicKey,
    pub created_at: Timestamp,
    pub kind: u16,
    pub tags: Vec<Tag>,
    pub content: String,
}

impl UnsignedEvent {
    /// The id a correctly signed copy of this draft must carry.
    pub fn compute_id(&self) -> EventId {
        canonical_id(
            &self.pubkey,
            self.created_at,
            self.kind,
            &self.tags,
            &self.content,
        )
    }

    /// Attach a signature produced elsewhere, filling in the computed id.
    pub fn into_signed(self, sig: impl Into<String>) -> SignedEvent {
        let id = self.compute_id();
        SignedEvent {
            id,
            pubkey: self.pubkey,
            created_at: self.created_at,
            kind: self.kind,
            tags: self.tags,
            content: self.content,
            sig: sig.into(),
        }
    }

    pub fn tag_value(&self, name: &str) -> Option<&str> {
        find_tag(&self.tags, name)
    }
}

/// A signed event exactly as it travels to and from the relay.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedEvent {
    pub id: EventId,
    pub pubkey: PublicKey,
    pub created_at: Timestamp,
    pub kind: u16,
    #[serde(default)]
    pub tags: Vec<Tag>,
    pub content: String,
    pub sig: String,
}

/// Events as returned by a relay subscription. Same shape as a
/// [`SignedEvent`]; the alias marks data that has not been interpreted yet.
pub type RawEvent = SignedEvent;

impl SignedEvent {
    /// Check that `id` is the hash of the event's canonical serialization.
    ///
    /// Signature verification is left to the relay.
    pub fn verify_id(&self) -> Result<(), EventError> {
        let computed = canonical_id(
            &self.pubkey,
            self.created_at,
            self.kind,
            &self.tags,
            &self.content,
        );
        if computed == self.id {
            Ok(())
        } else {
            Err(EventError::IdMismatch {
                computed,
                claimed: self.id,
            })
        }
    }

    /// Strip the id and signature, e.g. to compare against the draft that
    /// was handed to the signer.
    pub fn to_unsigned(&self) -> UnsignedEvent {
        UnsignedEvent {
            pubkey: self.pubkey,
            created_at: self.created_at,
            kind: self.kind,
            tags: self.tags.clone(),
            content: self.content.clone(),
        }
    }

    pub fn tag_value(&self, name: &str) -> Option<&str> {
        find_tag(&self.tags, name)
    }
}

/// Value of the first tag named `name` that carries a value.
fn find_tag<'a>(tags: &'a [Tag], name: &str) -> Option<&'a str> {
    tags.iter()
        .find(|tag| tag.len() >= 2 && tag[0] == name)
        .map(|tag| tag[1].as_str())
}

/// SHA-256 over `[0, pubkey, created_at, kind, tags, content]` serialized as
/// compact JSON.
fn canonical_id(
    pubkey: &PublicKey,
    created_at: Timestamp,
    kind: u16,
    tags: &[Tag],
    content: &str,
) -> EventId {
    let serialized = serde_json::json!([
        0,
        pubkey.to_hex(),
        created_at.as_secs(),
        kind,
        tags,
        content
    ])
    .to_string();
    let digest = Sha256::digest(serialized.as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&digest);
    EventId::new(bytes)
}
