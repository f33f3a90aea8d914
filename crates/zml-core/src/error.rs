//! Error types for the core crate.

use thiserror::Error;

/// Why an inbound frame was rejected. Frames that fail to decode are
/// dropped by the caller; this never reaches a consumer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed frame: {0}")]
    Malformed(String),

    #[error("non-finite value in field `{field}`")]
    NonFinite { field: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("unknown consumer identity: {0}")]
    InvalidIdentity(String),

    #[error("invalid upstream endpoint: {0}")]
    InvalidEndpoint(String),
}
