//! Client for the event relay.
//!
//! The engine talks to the relay through the [`Relay`] trait: `fetch` opens a
//! subscription and returns everything stored before `EOSE`, `publish` sends
//! one signed event and waits for the relay's `OK`. [`WsRelay`] is the
//! websocket implementation; tests use a scripted stand-in.

pub mod client;
pub mod error;
pub mod frame;

pub use client::{Ack, Relay, WsRelay};
pub use error::{FrameError, RelayError};
pub use frame::{ClientFrame, Filter, RelayFrame};
