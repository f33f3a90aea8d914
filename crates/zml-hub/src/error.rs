use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HubError {
    /// Caller input was rejected, e.g. an unknown consumer identity.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unknown routing mode: {0} (expected `preferred` or `broadcast`)")]
    InvalidRouting(String),

    /// The control task is no longer running.
    #[error("hub is closed")]
    Closed,
}
