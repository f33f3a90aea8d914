//! Snapshot request handling.

use zml_core::{CanonicalSnapshot, ConsumerId};

use crate::error::HubError;
use crate::store::StateStore;

/// Snapshot for the consumer named `identity`. Unknown identities are
/// rejected with [`HubError::InvalidArgument`]. Reads the store only.
pub fn get_snapshot(store: &StateStore, identity: &str) -> Result<CanonicalSnapshot, HubError> {
    let window_type: ConsumerId = identity
        .parse()
        .map_err(|e: zml_core::CoreError| HubError::InvalidArgument(e.to_string()))?;
    Ok(store.snapshot(window_type))
}
