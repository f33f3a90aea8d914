//! zml-hub: the single control context of the relay.
//!
//! Owns the canonical state store and the consumer registry, applies
//! stream notifications to them and fans position events out to
//! registered consumers. Other tasks talk to it through [`HubHandle`].

pub mod error;
pub mod fanout;
pub mod hub;
pub mod registry;
pub mod snapshot;
pub mod store;

pub use error::HubError;
pub use fanout::{Fanout, RoutingMode};
pub use hub::{Hub, HubCommand, HubHandle, command_channel};
pub use registry::{ChannelPushHandle, ConsumerRegistry, PushHandle, RegistrationToken};
pub use snapshot::get_snapshot;
pub use store::StateStore;
