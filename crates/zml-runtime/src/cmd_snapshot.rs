//! `zml snapshot`: print one canonical snapshot.

use std::net::SocketAddr;

use crate::client::rpc_call;

pub async fn cmd_snapshot(addr: SocketAddr, identity: &str) -> anyhow::Result<()> {
    let snapshot = rpc_call(addr, "get_snapshot", serde_json::json!({ "identity": identity })).await?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
