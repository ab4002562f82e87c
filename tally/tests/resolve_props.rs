use proptest::prelude::*;

use agora_events::{UnsignedEvent, VoteEvent};
use agora_tally::{build_draft, resolve, Ballot, VoteIntent};
use agora_types::{Cardinality, Election, EventKinds, Position, PublicKey, Timestamp};

const YEAR: u32 = 2025;

fn key(b: u8) -> PublicKey {
    PublicKey::new([b; 32])
}

fn election() -> Election {
    Election {
        year: YEAR,
        start_time: None,
        end_time: Timestamp::new(1_000),
        positions: vec![
            Position {
                position_type: "presidency".into(),
                title: "President".into(),
                icon: String::new(),
                cardinality: Cardinality::Single,
                candidates: (10..14).map(key).collect(),
            },
            Position {
                position_type: "board".into(),
                title: "Board".into(),
                icon: String::new(),
                cardinality: Cardinality::Multi,
                candidates: (10..14).map(key).collect(),
            },
        ],
    }
}

/// A vote with a real content-derived id, built through the draft path.
fn vote(voter: u8, candidate: u8, multi: bool, created_at: u64) -> VoteEvent {
    let (position, cardinality) = if multi {
        ("board", Cardinality::Multi)
    } else {
        ("presidency", Cardinality::Single)
    };
    let draft: UnsignedEvent = build_draft(
        &VoteIntent {
            voter: key(voter),
            year: YEAR,
            candidate: key(candidate),
            position: position.into(),
            cardinality,
        },
        &EventKinds::default(),
        Timestamp::new(created_at),
    );
    VoteEvent::from_raw(&draft.into_signed("sig")).expect("drafts parse as votes")
}

fn vote_strategy() -> impl Strategy<Value = VoteEvent> {
    (1u8..4, 10u8..14, any::<bool>(), 0u64..1_200)
        .prop_map(|(voter, candidate, multi, at)| vote(voter, candidate, multi, at))
}

proptest! {
    /// Resolving the events of a resolution reproduces it.
    #[test]
    fn resolve_is_idempotent(events in prop::collection::vec(vote_strategy(), 0..40)) {
        let e = election();
        let kinds = EventKinds::default();
        let once = resolve(&events, &e, &kinds);
        let twice = resolve(&once.events(), &e, &kinds);
        prop_assert_eq!(once, twice);
    }

    /// Input order never changes the outcome.
    #[test]
    fn resolve_ignores_input_order(
        (events, shuffled) in prop::collection::vec(vote_strategy(), 0..40)
            .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
    ) {
        let e = election();
        let kinds = EventKinds::default();
        prop_assert_eq!(resolve(&events, &e, &kinds), resolve(&shuffled, &e, &kinds));
    }

    /// Each single-seat ballot holds the newest in-window event for that voter.
    #[test]
    fn single_seat_ballot_is_newest(events in prop::collection::vec(vote_strategy(), 1..40)) {
        let e = election();
        let ballots = resolve(&events, &e, &EventKinds::default());
        for (key, ballot) in ballots.iter() {
            if let Ballot::Single(chosen) = ballot {
                let newest = events
                    .iter()
                    .filter(|v| v.voter == key.voter && v.position() == "presidency")
                    .filter(|v| e.in_window(v.created_at))
                    .map(|v| v.created_at)
                    .max();
                prop_assert_eq!(Some(chosen.created_at), newest);
            }
        }
    }

    /// Every distinct candidate a voter picked for a multi-seat position survives once.
    #[test]
    fn multi_seat_keeps_each_candidate_once(events in prop::collection::vec(vote_strategy(), 1..40)) {
        let e = election();
        let ballots = resolve(&events, &e, &EventKinds::default());
        for (key, ballot) in ballots.iter() {
            if let Ballot::Multi(kept) = ballot {
                let mut expected: Vec<PublicKey> = events
                    .iter()
                    .filter(|v| v.voter == key.voter && v.position() == "board")
                    .filter(|v| e.in_window(v.created_at))
                    .map(|v| *v.candidate())
                    .collect();
                expected.sort();
                expected.dedup();
                let got: Vec<PublicKey> = kept.iter().map(|v| *v.candidate()).collect();
                prop_assert_eq!(got, expected);
            }
        }
    }
}
