//! HTTP API for the Agora engine.
//!
//! Provides endpoints for:
//! - The election summary and its Open/Closed state
//! - Per-viewer standings
//! - Vote drafting and publishing of externally signed votes
//! - Login and role lookup
//! - Admin voter logs and the voting switch

pub mod error;
pub mod handlers;
pub mod server;

pub use error::RpcError;
pub use handlers::CALLER_HEADER;
pub use server::{router, RpcServer, RpcState, SharedState};
