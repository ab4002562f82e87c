//! Per-position, per-candidate view of the resolved ballots.

use agora_types::{Cardinality, Election, PublicKey};
use serde::Serialize;
use std::collections::HashMap;

use crate::directory::Directory;
use crate::resolve::ResolvedBallots;

/// One candidate's line on the board.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CandidateStanding {
    pub pubkey: PublicKey,
    /// Directory name, or the raw hex key when the directory has no entry.
    pub display_name: String,
    pub avatar: Option<String>,
    pub votes: u32,
    /// The viewer's resolved ballot includes this candidate. For multi-seat
    /// positions a client uses this to suppress a repeat submission.
    pub voted_by_viewer: bool,
}

/// One position's line on the board.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PositionStanding {
    pub position_type: String,
    pub title: String,
    pub icon: String,
    pub cardinality: Cardinality,
    pub viewer_voted: bool,
    pub total_votes: u32,
    pub candidates: Vec<CandidateStanding>,
}

/// Project `ballots` onto every position of `election`, in ballot order.
///
/// Votes for candidates not listed on a position are not counted.
pub fn standings(
    ballots: &ResolvedBallots,
    directory: &dyn Directory,
    election: &Election,
    viewer: Option<&PublicKey>,
) -> Vec<PositionStanding> {
    let mut counts: HashMap<(&str, PublicKey), u32> = HashMap::new();
    for (key, ballot) in ballots.iter() {
        for event in ballot.events() {
            *counts
                .entry((key.position.as_str(), *event.candidate()))
                .or_default() += 1;
        }
    }

    election
        .positions
        .iter()
        .map(|position| {
            let viewer_ballot =
                viewer.and_then(|v| ballots.get(v, &position.position_type));
            let candidates: Vec<CandidateStanding> = position
                .candidates
                .iter()
                .map(|candidate| {
                    let profile = directory.profile(candidate);
                    CandidateStanding {
                        pubkey: *candidate,
                        display_name: profile
                            .as_ref()
                            .map(|p| p.name.clone())
                            .unwrap_or_else(|| candidate.to_hex()),
                        avatar: profile.and_then(|p| p.avatar),
                        votes: counts
                            .get(&(position.position_type.as_str(), *candidate))
                            .copied()
                            .unwrap_or(0),
                        voted_by_viewer: viewer_ballot
                            .map_or(false, |b| b.contains(candidate)),
                    }
                })
                .collect();
            PositionStanding {
                position_type: position.position_type.clone(),
                title: position.title.clone(),
                icon: position.icon.clone(),
                cardinality: position.cardinality,
                viewer_voted: candidates.iter().any(|c| c.voted_by_viewer),
                total_votes: candidates.iter().map(|c| c.votes).sum(),
                candidates,
            }
        })
        .collect()
}
