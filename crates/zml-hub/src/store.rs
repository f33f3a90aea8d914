//! Canonical state store: what the relay currently believes.
//!
//! Every mutation overwrites one field. Nothing here fails or blocks.

use zml_core::{
    CanonicalSnapshot, ConnectionStatus, ConsumerId, IPC_VERSION, PositionDto, StreamsState,
};

#[derive(Debug, Clone)]
pub struct StateStore {
    agent_status: ConnectionStatus,
    last_error: Option<String>,
    streams: StreamsState,
    last_position: Option<PositionDto>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    /// Fresh store: disconnected, not streaming, no position.
    pub fn new() -> Self {
        Self {
            agent_status: ConnectionStatus::Disconnected,
            last_error: None,
            streams: StreamsState::default(),
            last_position: None,
        }
    }

    /// Replace status and error together; `None` clears a previous error.
    pub fn update_agent_status(&mut self, status: ConnectionStatus, error: Option<String>) {
        self.agent_status = status;
        self.last_error = error;
    }

    pub fn set_streaming_flag(&mut self, streaming: bool) {
        self.streams.streaming = streaming;
    }

    pub fn update_last_position(&mut self, dto: PositionDto) {
        self.last_position = Some(dto);
    }

    pub fn agent_status(&self) -> ConnectionStatus {
        self.agent_status
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn last_position(&self) -> Option<&PositionDto> {
        self.last_position.as_ref()
    }

    /// Snapshot stamped with the current wall-clock time.
    pub fn snapshot(&self, window_type: ConsumerId) -> CanonicalSnapshot {
        self.snapshot_at(window_type, chrono::Utc::now().timestamp_millis())
    }

    pub fn snapshot_at(&self, window_type: ConsumerId, now_ts_ms: i64) -> CanonicalSnapshot {
        CanonicalSnapshot {
            ipc_version: IPC_VERSION,
            window_type,
            now_ts_ms,
            agent_status: self.agent_status,
            last_error: self.last_error.clone(),
            streams: self.streams,
            last_position: self.last_position.clone(),
        }
    }
}
