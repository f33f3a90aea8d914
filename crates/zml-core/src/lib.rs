//! zml-core: domain types and pure logic for the position relay.
//! Wire decoding, snapshot/envelope types, endpoint derivation and
//! reconnect backoff math. No IO and no async runtime.

pub mod backoff;
pub mod endpoint;
pub mod error;
pub mod types;
pub mod wire;

pub use backoff::{Backoff, BackoffPolicy};
pub use endpoint::{POSITION_STREAM_PATH, position_stream_url};
pub use error::{CoreError, DecodeError};
pub use types::{
    CanonicalSnapshot, ConnectionStatus, ConsumerId, IPC_VERSION, PositionDto, PositionEvent,
    StreamsState, WorldPosition,
};
pub use wire::decode;
