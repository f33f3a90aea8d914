use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Version of the consumer-facing snapshot/push contract.
pub const IPC_VERSION: u32 = 1;

// ─── Position ─────────────────────────────────────────────────────

/// A point in a planet's world coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldPosition {
    pub planet_name: String,
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
}

/// Validated position sample. Only the wire decoder builds these from
/// untrusted input; `timestamp_ms`, `x` and `y` are always finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionDto {
    pub timestamp_ms: i64,
    pub position: WorldPosition,
}

/// Sequenced envelope delivered to consumers.
///
/// `sequence` is strictly increasing within one stream client lifetime
/// and may have gaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "position", rename_all = "camelCase")]
pub struct PositionEvent {
    pub sequence: u64,
    pub timestamp_ms: i64,
    pub payload: PositionDto,
}

impl PositionEvent {
    pub fn new(sequence: u64, payload: PositionDto) -> Self {
        Self {
            sequence,
            timestamp_ms: payload.timestamp_ms,
            payload,
        }
    }
}

// ─── Connection status ────────────────────────────────────────────

/// Upstream connection status as reported to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
}

impl ConnectionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Consumers ────────────────────────────────────────────────────

/// Kind tag of a display surface. At most one push handle is
/// registered per identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsumerId {
    #[serde(alias = "main")]
    Primary,
    Map,
    Hud,
}

impl ConsumerId {
    pub const ALL: [Self; 3] = [Self::Primary, Self::Map, Self::Hud];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Map => "map",
            Self::Hud => "hud",
        }
    }
}

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsumerId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary" | "main" => Ok(Self::Primary),
            "map" => Ok(Self::Map),
            "hud" => Ok(Self::Hud),
            _ => Err(CoreError::InvalidIdentity(s.to_string())),
        }
    }
}

// ─── Snapshot ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreamsState {
    pub streaming: bool,
}

/// Latest-known state of the relay, as handed to a consumer on request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalSnapshot {
    pub ipc_version: u32,
    pub window_type: ConsumerId,
    pub now_ts_ms: i64,
    pub agent_status: ConnectionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub streams: StreamsState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_position: Option<PositionDto>,
}
