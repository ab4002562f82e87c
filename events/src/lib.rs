//! Vote event model.
//!
//! Relay events are signed, immutable JSON objects. This crate holds their
//! serde mirror ([`SignedEvent`] / [`RawEvent`]), the unsigned drafts handed
//! to an external signer ([`UnsignedEvent`]), and the parsed vote view
//! ([`VoteEvent`]) that confines the comma-joined wire payload to this crate.

pub mod error;
pub mod event;
pub mod signer;
pub mod vote;

pub use error::EventError;
pub use event::{RawEvent, SignedEvent, Tag, UnsignedEvent};
pub use signer::Signer;
pub use vote::{parse_votes, ParsedVotes, UniquenessTag, VoteChoice, VoteEvent};
