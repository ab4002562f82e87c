use agora_events::EventError;
use agora_relay::RelayError;
use agora_types::PublicKey;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The relay could not be reached or refused to answer. Non-fatal.
    #[error("relay unavailable, retry later: {0}")]
    RelayUnavailable(String),

    #[error("voting is closed")]
    VotingClosed,

    #[error("not authorized")]
    Unauthorized,

    #[error("membership tier does not qualify to vote")]
    Ineligible,

    #[error("too many attempts, retry in {retry_after_secs}s")]
    TooManyAttempts { retry_after_secs: u64 },

    #[error("unknown position: {0}")]
    UnknownPosition(String),

    #[error("{candidate} is not standing for {position}")]
    UnknownCandidate {
        position: String,
        candidate: PublicKey,
    },

    #[error("relay rejected the vote: {0}")]
    Rejected(String),

    #[error("signed event does not match the draft")]
    SignerMismatch,

    #[error("invalid event: {0}")]
    InvalidEvent(String),

    #[error("config error: {0}")]
    Config(String),
}

impl From<RelayError> for EngineError {
    fn from(e: RelayError) -> Self {
        match e {
            RelayError::Unavailable(reason) => EngineError::RelayUnavailable(reason),
            RelayError::Rejected { reason, .. } => EngineError::Rejected(reason),
        }
    }
}

impl From<EventError> for EngineError {
    fn from(e: EventError) -> Self {
        EngineError::InvalidEvent(e.to_string())
    }
}
