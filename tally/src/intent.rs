//! Turn a voter's choice into an unsigned draft event.

use agora_events::{UniquenessTag, UnsignedEvent, VoteChoice};
use agora_types::{Cardinality, EventKinds, PublicKey, Timestamp};

/// A voter's choice, before it becomes an event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteIntent {
    pub voter: PublicKey,
    pub year: u32,
    pub candidate: PublicKey,
    pub position: String,
    pub cardinality: Cardinality,
}

/// Build the draft a signer will sign.
///
/// Single-seat drafts carry the uniqueness tag so a later vote for the same
/// position replaces this one; multi-seat drafts carry no tags.
pub fn build_draft(intent: &VoteIntent, kinds: &EventKinds, created_at: Timestamp) -> UnsignedEvent {
    let tags = match intent.cardinality {
        Cardinality::Single => {
            vec![UniquenessTag::new(intent.voter, intent.year, intent.position.as_str()).to_tag()]
        }
        Cardinality::Multi => Vec::new(),
    };
    UnsignedEvent {
        pubkey: intent.voter,
        created_at,
        kind: kinds.kind_for(intent.cardinality),
        tags,
        content: VoteChoice::new(intent.candidate, intent.position.as_str()).encode(),
    }
}
