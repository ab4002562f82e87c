//! Read-time tally over relay vote events.
//!
//! Everything in this crate is pure: the same event set always yields the
//! same ballots and the same standings.
//!
//! - [`resolve`] reduces raw votes to one authoritative ballot per
//!   `(voter, position)`.
//! - [`standings`] joins ballots with the candidate [`Directory`].
//! - [`build_draft`] turns a user's choice into an unsigned event.

pub mod directory;
pub mod intent;
pub mod resolve;
pub mod standings;

pub use directory::{Directory, Member, Profile, StaticDirectory};
pub use intent::{build_draft, VoteIntent};
pub use resolve::{resolve, Ballot, BallotKey, ResolvedBallots};
pub use standings::{standings, CandidateStanding, PositionStanding};
