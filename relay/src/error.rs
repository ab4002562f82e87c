use agora_types::EventId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// Unreachable, timed out, closed the subscription, or sent an `ERROR`
    /// frame. Callers treat this as "retry later".
    #[error("relay unavailable: {0}")]
    Unavailable(String),

    #[error("relay rejected event {id}: {reason}")]
    Rejected { id: EventId, reason: String },
}

/// A text frame the relay sent that could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame is not a JSON array: {0}")]
    NotAnArray(String),

    #[error("frame has no label")]
    MissingLabel,

    #[error("malformed {label} frame: {reason}")]
    Malformed { label: String, reason: String },
}
