//! zml-stream: self-healing streaming client for the upstream position agent.
//!
//! One worker task owns one logical connection, decodes frames with
//! `zml_core::decode` and reports status changes and position events to
//! the control context over a channel.

pub mod client;
pub mod connector;
pub mod error;

pub use client::{
    ClientState, StreamClient, StreamConfig, StreamEvents, StreamHandle, StreamNotification,
};
pub use connector::{Connector, FrameStream, WsConnector};
pub use error::ConnectionError;
