//! The election model: contested positions, their cardinality, and the
//! event kinds votes are published under.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::TypesError;
use crate::keys::PublicKey;
use crate::time::Timestamp;

/// Default kind for single-seat votes (parameterized replaceable range, the
/// relay keeps only the latest event per uniqueness tag).
pub const DEFAULT_SINGLE_SEAT_KIND: u16 = 30_009;

/// Default kind for multi-seat votes (regular range, every event is kept).
pub const DEFAULT_MULTI_SEAT_KIND: u16 = 9_009;

/// How many seats a position fills, which decides replace-vs-add semantics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    /// One winner. A resubmission replaces the voter's prior vote.
    Single,
    /// Unbounded seats. One vote per voter-candidate pair, additive.
    Multi,
}

/// The pair of event kinds votes are published under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventKinds {
    pub single_seat: u16,
    pub multi_seat: u16,
}

impl EventKinds {
    pub fn kind_for(&self, cardinality: Cardinality) -> u16 {
        match cardinality {
            Cardinality::Single => self.single_seat,
            Cardinality::Multi => self.multi_seat,
        }
    }

    /// Which cardinality an event kind encodes, if it is a vote kind at all.
    pub fn cardinality_of(&self, kind: u16) -> Option<Cardinality> {
        if kind == self.single_seat {
            Some(Cardinality::Single)
        } else if kind == self.multi_seat {
            Some(Cardinality::Multi)
        } else {
            None
        }
    }

    /// Both kinds, for building a relay filter.
    pub fn all(&self) -> [u16; 2] {
        [self.single_seat, self.multi_seat]
    }
}

impl Default for EventKinds {
    fn default() -> Self {
        Self {
            single_seat: DEFAULT_SINGLE_SEAT_KIND,
            multi_seat: DEFAULT_MULTI_SEAT_KIND,
        }
    }
}

/// A contested position on the ballot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Stable identifier used in vote content and uniqueness tags
    /// (e.g. `presidency`).
    #[serde(rename = "type")]
    pub position_type: String,
    pub title: String,
    #[serde(default)]
    pub icon: String,
    pub cardinality: Cardinality,
    /// Candidates in ballot order.
    #[serde(default)]
    pub candidates: Vec<PublicKey>,
}

impl Position {
    pub fn has_candidate(&self, candidate: &PublicKey) -> bool {
        self.candidates.contains(candidate)
    }
}

/// One year's election.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Election {
    pub year: u32,
    /// Events created before this belong to an earlier election.
    #[serde(default)]
    pub start_time: Option<Timestamp>,
    /// Voting closes once `now >= end_time`.
    pub end_time: Timestamp,
    /// Positions in ballot order.
    pub positions: Vec<Position>,
}

impl Election {
    pub fn position(&self, position_type: &str) -> Option<&Position> {
        self.positions
            .iter()
            .find(|p| p.position_type == position_type)
    }

    /// Whether an event created at `created_at` falls inside this election's
    /// voting window. The window closes at `end_time`: an event stamped at
    /// or after the deadline is never counted, matching when the gate shuts.
    pub fn in_window(&self, created_at: Timestamp) -> bool {
        let after_start = self.start_time.map_or(true, |start| created_at >= start);
        after_start && created_at < self.end_time
    }

    /// Check structural invariants: unique, comma-free position types and a
    /// sane time window.
    pub fn validate(&self) -> Result<(), TypesError> {
        if let Some(start) = self.start_time {
            if start > self.end_time {
                return Err(TypesError::InvalidWindow {
                    start: start.as_secs(),
                    end: self.end_time.as_secs(),
                });
            }
        }
        let mut seen = HashSet::new();
        for position in &self.positions {
            let ty = &position.position_type;
            if ty.is_empty() || ty.contains(',') {
                return Err(TypesError::InvalidPositionType(ty.clone()));
            }
            if !seen.insert(ty.as_str()) {
                return Err(TypesError::DuplicatePosition(ty.clone()));
            }
        }
        Ok(())
    }
}
