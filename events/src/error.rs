use agora_types::EventId;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventError {
    #[error("malformed vote content {0:?}: expected \"<candidate>,<position>\"")]
    MalformedContent(String),

    #[error("invalid candidate key in vote content: {0}")]
    InvalidCandidate(String),

    #[error("malformed uniqueness tag {0:?}: expected \"<voter>,<year>,<position>\"")]
    MalformedTag(String),

    #[error("event id mismatch: computed {computed}, claimed {claimed}")]
    IdMismatch { computed: EventId, claimed: EventId },
}
