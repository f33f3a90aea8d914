//! Transport seam between the stream client and the network.

use std::future::Future;

use futures_util::future;
use futures_util::stream::{BoxStream, StreamExt};
use tokio_tungstenite::tungstenite::{self, Message};

use crate::error::ConnectionError;

/// Inbound data frames of one live connection. The stream ending means
/// the peer closed the connection.
pub type FrameStream = BoxStream<'static, Result<Vec<u8>, ConnectionError>>;

/// Opens one connection to the upstream agent.
///
/// Implementations only establish the connection; timeouts, retries and
/// decoding belong to the stream client.
pub trait Connector: Send + Sync + 'static {
    fn connect(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<FrameStream, ConnectionError>> + Send;
}

/// WebSocket connector over tokio-tungstenite.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl WsConnector {
    pub fn new() -> Self {
        Self
    }
}

impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<FrameStream, ConnectionError> {
        let (ws_stream, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| ConnectionError::Handshake(e.to_string()))?;
        tracing::debug!(url = %url, "ws connector: handshake complete");

        Ok(ws_stream
            .filter_map(|msg| future::ready(data_frame(msg)))
            .boxed())
    }
}

/// Keep data frames, drop control frames. Binary frames are passed on as
/// bytes and decoded as UTF-8 JSON like text frames.
fn data_frame(
    msg: Result<Message, tungstenite::Error>,
) -> Option<Result<Vec<u8>, ConnectionError>> {
    match msg {
        Ok(Message::Text(text)) => Some(Ok(text.into_bytes())),
        Ok(Message::Binary(data)) => Some(Ok(data)),
        Ok(Message::Ping(_) | Message::Pong(_) | Message::Close(_) | Message::Frame(_)) => None,
        Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => None,
        Err(e) => Some(Err(ConnectionError::Io(e.to_string()))),
    }
}
