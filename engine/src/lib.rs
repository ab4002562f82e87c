//! Agora election engine.
//!
//! Wires the tally rules to the outside world: a [`Relay`](agora_relay::Relay)
//! for storage, a [`Notifier`](agora_websocket::Notifier) for change pushes,
//! a [`Clock`](agora_types::Clock) and a member
//! [`Directory`](agora_tally::Directory). On top of those it runs:
//!
//! - the submission flow ([`Engine::submit_vote`], [`Engine::prepare_vote`],
//!   [`Engine::publish_signed`]),
//! - the Open → Closed [`LifecycleGate`],
//! - roles, eligibility and per-origin attempt budgets ([`access`]),
//! - per-viewer refresh with last-known-good standings ([`ViewerSession`]).

pub mod access;
pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod pipeline;
pub mod shutdown;

pub use access::{AccessControl, RateLimiter, Role};
pub use config::{ElectionFile, EngineConfig, LimitConfig};
pub use coordinator::Submission;
pub use engine::{ElectionSummary, Engine, EngineParts, VoterLogEntry};
pub use error::EngineError;
pub use lifecycle::{spawn_periodic_check, LifecycleGate, VotingState};
pub use logging::{init_logging, LogFormat};
pub use pipeline::{Board, StandingsView, ViewerSession};
pub use shutdown::ShutdownController;
