//! Reduce raw vote events to the authoritative ballot per voter and position.
//!
//! Single-seat positions keep the newest event (ties go to the lowest event
//! id). Multi-seat positions keep one event per candidate, so a duplicate
//! event id or a repeated vote for the same candidate never counts twice.
//!
//! Running [`resolve`] over the events of its own output reproduces that
//! output exactly.

use agora_events::{UniquenessTag, VoteEvent};
use agora_types::{Cardinality, Election, EventKinds, PublicKey};
use serde::Serialize;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::debug;

/// Identifies one ballot: a voter's votes for one position.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct BallotKey {
    pub voter: PublicKey,
    pub position: String,
}

/// The counted votes of one voter for one position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "cardinality", content = "votes", rename_all = "lowercase")]
pub enum Ballot {
    Single(VoteEvent),
    /// One event per candidate, ordered by candidate key.
    Multi(Vec<VoteEvent>),
}

impl Ballot {
    pub fn events(&self) -> &[VoteEvent] {
        match self {
            Ballot::Single(event) => std::slice::from_ref(event),
            Ballot::Multi(events) => events,
        }
    }

    pub fn contains(&self, candidate: &PublicKey) -> bool {
        self.events().iter().any(|e| e.candidate() == candidate)
    }
}

/// Every ballot derived from an event set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedBallots {
    ballots: BTreeMap<BallotKey, Ballot>,
}

impl ResolvedBallots {
    pub fn get(&self, voter: &PublicKey, position: &str) -> Option<&Ballot> {
        self.ballots.get(&BallotKey {
            voter: *voter,
            position: position.to_string(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BallotKey, &Ballot)> {
        self.ballots.iter()
    }

    /// All counted events, in ballot order.
    pub fn events(&self) -> Vec<VoteEvent> {
        self.ballots
            .values()
            .flat_map(|b| b.events().iter().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.ballots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ballots.is_empty()
    }
}

/// Why an event was left out of resolution.
#[derive(Debug, PartialEq, Eq)]
enum Exclusion {
    UnknownPosition,
    NotAVoteKind,
    KindMismatch,
    MissingTag,
    TagMismatch,
    OutsideWindow,
}

/// Reduce `events` to the authoritative ballots for `election`.
pub fn resolve(events: &[VoteEvent], election: &Election, kinds: &EventKinds) -> ResolvedBallots {
    let mut singles: BTreeMap<BallotKey, VoteEvent> = BTreeMap::new();
    let mut multis: BTreeMap<BallotKey, BTreeMap<PublicKey, VoteEvent>> = BTreeMap::new();

    for event in events {
        let cardinality = match admissible(event, election, kinds) {
            Ok(c) => c,
            Err(reason) => {
                debug!(id = %event.id, ?reason, "excluding vote event");
                continue;
            }
        };
        let key = BallotKey {
            voter: event.voter,
            position: event.position().to_string(),
        };
        match cardinality {
            Cardinality::Single => match singles.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(event.clone());
                }
                Entry::Occupied(mut slot) => {
                    if supersedes(event, slot.get()) {
                        slot.insert(event.clone());
                    }
                }
            },
            Cardinality::Multi => {
                let per_candidate = multis.entry(key).or_default();
                match per_candidate.entry(*event.candidate()) {
                    Entry::Vacant(slot) => {
                        slot.insert(event.clone());
                    }
                    Entry::Occupied(mut slot) => {
                        if precedes(event, slot.get()) {
                            slot.insert(event.clone());
                        }
                    }
                }
            }
        }
    }

    let mut ballots: BTreeMap<BallotKey, Ballot> = singles
        .into_iter()
        .map(|(k, e)| (k, Ballot::Single(e)))
        .collect();
    for (key, per_candidate) in multis {
        ballots.insert(key, Ballot::Multi(per_candidate.into_values().collect()));
    }
    ResolvedBallots { ballots }
}

fn admissible(
    event: &VoteEvent,
    election: &Election,
    kinds: &EventKinds,
) -> Result<Cardinality, Exclusion> {
    let position = election
        .position(event.position())
        .ok_or(Exclusion::UnknownPosition)?;
    let cardinality = kinds
        .cardinality_of(event.kind)
        .ok_or(Exclusion::NotAVoteKind)?;
    if cardinality != position.cardinality {
        return Err(Exclusion::KindMismatch);
    }
    if !election.in_window(event.created_at) {
        return Err(Exclusion::OutsideWindow);
    }
    if cardinality == Cardinality::Single {
        let expected = UniquenessTag::new(event.voter, election.year, event.position());
        match &event.tag {
            None => return Err(Exclusion::MissingTag),
            Some(tag) if *tag != expected => return Err(Exclusion::TagMismatch),
            Some(_) => {}
        }
    }
    Ok(cardinality)
}

/// Last-write-wins: newer `created_at`, then lower id.
fn supersedes(candidate: &VoteEvent, current: &VoteEvent) -> bool {
    (candidate.created_at, std::cmp::Reverse(candidate.id))
        > (current.created_at, std::cmp::Reverse(current.id))
}

/// First-write-wins for repeated multi-seat votes: older, then lower id.
fn precedes(candidate: &VoteEvent, current: &VoteEvent) -> bool {
    (candidate.created_at, candidate.id) < (current.created_at, current.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_events::VoteChoice;
    use agora_types::{EventId, Position, Timestamp};

    const YEAR: u32 = 2025;

    fn key(b: u8) -> PublicKey {
        PublicKey::new([b; 32])
    }

    fn election() -> Election {
        Election {
            year: YEAR,
            start_time: None,
            end_time: Timestamp::new(10_000),
            positions: vec![
                Position {
                    position_type: "presidency".into(),
                    title: "President".into(),
                    icon: String::new(),
                    cardinality: Cardinality::Single,
                    candidates: vec![key(0xA), key(0xB)],
                },
                Position {
                    position_type: "board".into(),
                    title: "Board".into(),
                    icon: String::new(),
                    cardinality: Cardinality::Multi,
                    candidates: vec![key(0xC1), key(0xC2), key(0xC3)],
                },
            ],
        }
    }

    fn single(id: u8, voter: PublicKey, candidate: PublicKey, at: u64) -> VoteEvent {
        VoteEvent {
            id: EventId::new([id; 32]),
            kind: EventKinds::default().single_seat,
            voter,
            choice: VoteChoice::new(candidate, "presidency"),
            tag: Some(UniquenessTag::new(voter, YEAR, "presidency")),
            created_at: Timestamp::new(at),
        }
    }

    fn multi(id: u8, voter: PublicKey, candidate: PublicKey, at: u64) -> VoteEvent {
        VoteEvent {
            id: EventId::new([id; 32]),
            kind: EventKinds::default().multi_seat,
            voter,
            choice: VoteChoice::new(candidate, "board"),
            tag: None,
            created_at: Timestamp::new(at),
        }
    }

    fn run(events: &[VoteEvent]) -> ResolvedBallots {
        resolve(events, &election(), &EventKinds::default())
    }

    #[test]
    fn newest_single_seat_vote_wins() {
        let v1 = key(1);
        let first = single(1, v1, key(0xA), 100);
        let second = single(2, v1, key(0xB), 200);
        let ballots = run(&[first, second.clone()]);
        assert_eq!(ballots.get(&v1, "presidency"), Some(&Ballot::Single(second)));
    }

    #[test]
    fn latest_wins_regardless_of_order() {
        let v1 = key(1);
        let first = single(1, v1, key(0xA), 100);
        let second = single(2, v1, key(0xB), 200);
        assert_eq!(
            run(&[first.clone(), second.clone()]),
            run(&[second, first])
        );
    }

    #[test]
    fn timestamp_tie_goes_to_lowest_id() {
        let v1 = key(1);
        let low = single(3, v1, key(0xA), 100);
        let high = single(9, v1, key(0xB), 100);
        for events in [[low.clone(), high.clone()], [high.clone(), low.clone()]] {
            let ballots = run(&events);
            assert_eq!(
                ballots.get(&v1, "presidency"),
                Some(&Ballot::Single(low.clone()))
            );
        }
    }

    #[test]
    fn multi_seat_votes_are_additive() {
        let v2 = key(2);
        let events = [
            multi(1, v2, key(0xC1), 100),
            multi(2, v2, key(0xC2), 110),
            multi(3, v2, key(0xC3), 120),
        ];
        let ballots = run(&events);
        let ballot = ballots.get(&v2, "board").unwrap();
        assert_eq!(ballot.events().len(), 3);
        assert!(ballot.contains(&key(0xC2)));
    }

    #[test]
    fn duplicate_id_does_not_double_count() {
        let v2 = key(2);
        let c1 = multi(1, v2, key(0xC1), 100);
        let ballots = run(&[c1.clone(), multi(2, v2, key(0xC2), 110), c1]);
        assert_eq!(ballots.get(&v2, "board").unwrap().events().len(), 2);
    }

    #[test]
    fn repeated_candidate_keeps_earliest_event() {
        let v2 = key(2);
        let early = multi(5, v2, key(0xC1), 100);
        let late = multi(1, v2, key(0xC1), 300);
        let ballots = run(&[late, early.clone()]);
        assert_eq!(
            ballots.get(&v2, "board"),
            Some(&Ballot::Multi(vec![early]))
        );
    }

    #[test]
    fn voters_are_resolved_independently() {
        let a = single(1, key(1), key(0xA), 100);
        let b = single(2, key(2), key(0xB), 50);
        let ballots = run(&[a, b]);
        assert_eq!(ballots.len(), 2);
    }

    #[test]
    fn unknown_position_is_excluded() {
        let mut event = multi(1, key(2), key(0xC1), 100);
        event.choice.position = "treasurer".into();
        assert!(run(&[event]).is_empty());
    }

    #[test]
    fn kind_mismatch_is_excluded() {
        let mut event = multi(1, key(2), key(0xC1), 100);
        event.kind = EventKinds::default().single_seat;
        assert!(run(&[event]).is_empty());
    }

    #[test]
    fn single_seat_without_tag_is_excluded() {
        let mut event = single(1, key(1), key(0xA), 100);
        event.tag = None;
        assert!(run(&[event]).is_empty());
    }

    #[test]
    fn tag_from_another_year_is_excluded() {
        let mut event = single(1, key(1), key(0xA), 100);
        event.tag = Some(UniquenessTag::new(key(1), YEAR - 1, "presidency"));
        assert!(run(&[event]).is_empty());
    }

    #[test]
    fn tag_for_another_voter_is_excluded() {
        let mut event = single(1, key(1), key(0xA), 100);
        event.tag = Some(UniquenessTag::new(key(9), YEAR, "presidency"));
        assert!(run(&[event]).is_empty());
    }

    #[test]
    fn events_at_or_after_deadline_are_excluded() {
        let v1 = key(1);
        let on_time = single(1, v1, key(0xA), 9_999);
        let late = single(2, v1, key(0xB), 10_000);
        let ballots = run(&[on_time.clone(), late]);
        assert_eq!(
            ballots.get(&v1, "presidency"),
            Some(&Ballot::Single(on_time))
        );
    }

    #[test]
    fn resolve_is_a_fixed_point() {
        let events = [
            single(1, key(1), key(0xA), 100),
            single(2, key(1), key(0xB), 200),
            multi(3, key(2), key(0xC1), 100),
            multi(3, key(2), key(0xC1), 100),
            multi(4, key(2), key(0xC2), 150),
        ];
        let once = run(&events);
        let twice = run(&once.events());
        assert_eq!(once, twice);
    }
}
