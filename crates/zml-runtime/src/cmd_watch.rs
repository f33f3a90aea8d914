//! `zml watch`: subscribe as a surface and print live positions.

use std::net::SocketAddr;

use futures_util::StreamExt;
use tokio_tungstenite::tungstenite::Message;

use crate::client::{connect, request};
use crate::rpc::POSITION_METHOD;

/// Entry point for `zml watch`.
pub async fn cmd_watch(addr: SocketAddr, identity: &str) -> anyhow::Result<()> {
    let mut ws = connect(addr).await?;
    let params = serde_json::json!({ "identity": identity });

    let snapshot = request(&mut ws, 1, "get_snapshot", params.clone()).await?;
    println!("{}", format_snapshot(&snapshot));
    request(&mut ws, 2, "subscribe", params).await?;
    println!("zml watch ({identity}) - Ctrl-C to quit");

    loop {
        tokio::select! {
            msg = ws.next() => {
                let Some(msg) = msg else {
                    anyhow::bail!("relay closed the connection");
                };
                let Message::Text(text) = msg? else {
                    continue;
                };
                let frame: serde_json::Value = match serde_json::from_str(&text) {
                    Ok(v) => v,
                    Err(e) => {
                        tracing::debug!(error = %e, "watch: ignoring unparsable frame");
                        continue;
                    }
                };
                if frame["method"] == POSITION_METHOD {
                    println!("{}", format_event(&frame["params"]["event"]));
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    let _ = ws.close(None).await;
    Ok(())
}

fn format_position(position: &serde_json::Value) -> String {
    let planet = match position["planetName"].as_str() {
        Some("") | None => "?",
        Some(name) => name,
    };
    let z = position["z"]
        .as_f64()
        .map_or_else(|| "-".to_string(), |z| z.to_string());
    format!(
        "{planet} x={} y={} z={z}",
        position["x"].as_f64().unwrap_or_default(),
        position["y"].as_f64().unwrap_or_default(),
    )
}

/// One summary line for a canonical snapshot.
pub(crate) fn format_snapshot(snapshot: &serde_json::Value) -> String {
    let status = snapshot["agentStatus"].as_str().unwrap_or("unknown");
    let streaming = snapshot["streams"]["streaming"].as_bool().unwrap_or(false);
    let mut line = format!("agent {status}, streaming={streaming}");
    if let Some(error) = snapshot["lastError"].as_str() {
        line.push_str(&format!(" ({error})"));
    }
    match snapshot.get("lastPosition") {
        Some(last) if last.is_object() => {
            line.push_str(&format!(
                ", last {} @{}",
                format_position(&last["position"]),
                last["timestampMs"]
            ));
        }
        _ => line.push_str(", no position yet"),
    }
    line
}

/// One line per pushed event.
pub(crate) fn format_event(event: &serde_json::Value) -> String {
    format!(
        "#{} {} {}",
        event["sequence"],
        event["timestampMs"],
        format_position(&event["payload"]["position"])
    )
}
