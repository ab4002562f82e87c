//! Parsed vote events.
//!
//! The relay carries a vote as `content = "<candidate>,<position>"` and, for
//! single-seat votes, a `["d", "<voter>,<year>,<position>"]` tag. Both are
//! parsed here, once, into structured values.

use agora_types::{EventId, PublicKey, Timestamp};
use serde::Serialize;
use std::fmt;
use tracing::debug;

use crate::error::EventError;
use crate::event::{RawEvent, Tag};

/// Name of the tag that scopes last-write-wins replacement.
pub const UNIQUENESS_TAG: &str = "d";

/// Who a vote is for, and for which position.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct VoteChoice {
    pub candidate: PublicKey,
    pub position: String,
}

impl VoteChoice {
    pub fn new(candidate: PublicKey, position: impl Into<String>) -> Self {
        Self {
            candidate,
            position: position.into(),
        }
    }

    /// Parse `"<candidate>,<position>"`, splitting on the first comma.
    pub fn parse(content: &str) -> Result<Self, EventError> {
        let (candidate, position) = content
            .split_once(',')
            .ok_or_else(|| EventError::MalformedContent(content.to_string()))?;
        if position.is_empty() {
            return Err(EventError::MalformedContent(content.to_string()));
        }
        let candidate = PublicKey::from_hex(candidate.trim())
            .map_err(|e| EventError::InvalidCandidate(e.to_string()))?;
        Ok(Self {
            candidate,
            position: position.to_string(),
        })
    }

    /// The wire form carried in an event's content.
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for VoteChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.candidate, self.position)
    }
}

/// The `(voter, year, position)` triple a single-seat vote replaces within.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct UniquenessTag {
    pub voter: PublicKey,
    pub year: u32,
    pub position: String,
}

impl UniquenessTag {
    pub fn new(voter: PublicKey, year: u32, position: impl Into<String>) -> Self {
        Self {
            voter,
            year,
            position: position.into(),
        }
    }

    pub fn parse(value: &str) -> Result<Self, EventError> {
        let malformed = || EventError::MalformedTag(value.to_string());
        let mut parts = value.splitn(3, ',');
        let (Some(voter), Some(year), Some(position)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };
        let voter = PublicKey::from_hex(voter).map_err(|_| malformed())?;
        let year = year.parse::<u32>().map_err(|_| malformed())?;
        if position.is_empty() {
            return Err(malformed());
        }
        Ok(Self::new(voter, year, position))
    }

    /// The comma-joined tag value.
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// The full tag, ready to be placed on a draft.
    pub fn to_tag(&self) -> Tag {
        vec![UNIQUENESS_TAG.to_string(), self.encode()]
    }
}

impl fmt::Display for UniquenessTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.voter, self.year, self.position)
    }
}

/// A relay event interpreted as a vote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VoteEvent {
    pub id: EventId,
    pub kind: u16,
    pub voter: PublicKey,
    pub choice: VoteChoice,
    /// Present on single-seat votes.
    pub tag: Option<UniquenessTag>,
    pub created_at: Timestamp,
}

impl VoteEvent {
    pub fn from_raw(event: &RawEvent) -> Result<Self, EventError> {
        let choice = VoteChoice::parse(&event.content)?;
        let tag = event
            .tag_value(UNIQUENESS_TAG)
            .map(UniquenessTag::parse)
            .transpose()?;
        Ok(Self {
            id: event.id,
            kind: event.kind,
            voter: event.pubkey,
            choice,
            tag,
            created_at: event.created_at,
        })
    }

    pub fn position(&self) -> &str {
        &self.choice.position
    }

    pub fn candidate(&self) -> &PublicKey {
        &self.choice.candidate
    }
}

/// Outcome of parsing a batch of relay events.
#[derive(Debug, Default)]
pub struct ParsedVotes {
    pub votes: Vec<VoteEvent>,
    /// Events that could not be read as votes, with the reason.
    pub rejected: Vec<(EventId, EventError)>,
}

/// Parse every event that reads as a vote. A malformed event, or one whose id
/// is not the hash of its contents, is set aside without failing the batch.
pub fn parse_votes(events: &[RawEvent]) -> ParsedVotes {
    let mut parsed = ParsedVotes::default();
    for event in events {
        match event.verify_id().and_then(|()| VoteEvent::from_raw(event)) {
            Ok(vote) => parsed.votes.push(vote),
            Err(e) => {
                debug!(id = %event.id, error = %e, "skipping malformed vote event");
                parsed.rejected.push((event.id, e));
            }
        }
    }
    parsed
}
