//! WebSocket JSON-RPC client for CLI subcommands.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

pub(crate) type SurfaceWs = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub(crate) async fn connect(addr: SocketAddr) -> anyhow::Result<SurfaceWs> {
    let url = format!("ws://{addr}");
    let (ws, _) = tokio_tungstenite::connect_async(&url)
        .await
        .map_err(|e| anyhow::anyhow!("cannot connect to relay at {addr}: {e}"))?;
    Ok(ws)
}

/// Send one request on `ws` and wait for the response with the same id.
/// Notifications received meanwhile are skipped.
pub(crate) async fn request(
    ws: &mut SurfaceWs,
    id: u64,
    method: &str,
    params: serde_json::Value,
) -> anyhow::Result<serde_json::Value> {
    let request = serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params,
    });
    ws.send(Message::Text(serde_json::to_string(&request)?)).await?;

    while let Some(msg) = ws.next().await {
        let Message::Text(text) = msg? else {
            continue;
        };
        let response: serde_json::Value = serde_json::from_str(&text)?;
        if response["id"].as_u64() != Some(id) {
            continue;
        }
        if let Some(error) = response.get("error") {
            anyhow::bail!("RPC error: {error}");
        }
        return Ok(response["result"].clone());
    }
    anyhow::bail!("connection closed before response to {method}")
}

/// One-shot call on a fresh connection.
pub(crate) async fn rpc_call(
    addr: SocketAddr,
    method: &str,
    params: serde_json::Value,
) -> anyhow::Result<serde_json::Value> {
    let mut ws = connect(addr).await?;
    let result = request(&mut ws, 1, method, params).await;
    let _ = ws.close(None).await;
    result
}
