use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("expected 64 hex characters, got {0}")]
    InvalidLength(usize),

    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("duplicate position type: {0}")]
    DuplicatePosition(String),

    #[error("position type must not be empty or contain a comma: {0:?}")]
    InvalidPositionType(String),

    #[error("election ends at {end} before it starts at {start}")]
    InvalidWindow { start: u64, end: u64 },
}
