//! Transport errors. All of these are recoverable: they are reported as a
//! `disconnected` status and drive the reconnect backoff.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    #[error("handshake timed out after {0:?}")]
    Timeout(Duration),

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("connection error: {0}")]
    Io(String),
}
