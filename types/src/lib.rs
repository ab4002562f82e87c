//! Fundamental types for the Agora election engine.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! public keys, event ids, timestamps and the clock seam, and the election model
//! (positions, cardinality, event kinds).

pub mod election;
pub mod error;
pub mod hash;
pub mod keys;
pub mod time;

pub use election::{
    Cardinality, Election, EventKinds, Position, DEFAULT_MULTI_SEAT_KIND, DEFAULT_SINGLE_SEAT_KIND,
};
pub use error::TypesError;
pub use hash::EventId;
pub use keys::PublicKey;
pub use time::{Clock, SystemClock, Timestamp};
