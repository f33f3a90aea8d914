//! CLI definition using clap derive.

use std::net::SocketAddr;

use clap::{Parser, Subcommand};

/// Default upstream agent endpoint.
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:17171";

#[derive(Parser)]
#[command(name = "zml", about = "Position telemetry relay")]
pub struct Cli {
    /// Surface server address
    #[arg(long, global = true, env = "ZML_LISTEN", default_value = "127.0.0.1:17172")]
    pub listen: SocketAddr,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the relay (upstream stream client + hub + surface server)
    Daemon(DaemonOpts),
    /// Print one canonical snapshot as JSON
    Snapshot(SnapshotOpts),
    /// Print live position events until Ctrl-C
    Watch(WatchOpts),
}

#[derive(clap::Args)]
pub struct DaemonOpts {
    /// Base URL of the upstream position agent
    #[arg(long, env = "ZML_BACKEND_URL", default_value = DEFAULT_BACKEND_URL)]
    pub backend_url: String,

    /// Fanout routing: `preferred` (map, else primary) or `broadcast`
    #[arg(long, env = "ZML_ROUTING", default_value = "preferred")]
    pub routing: String,

    /// Upstream handshake timeout in milliseconds
    #[arg(long, default_value = "5000")]
    pub handshake_timeout_ms: u64,

    /// Maximum concurrent surface connections
    #[arg(long, env = "ZML_MAX_CONNECTIONS", default_value = "64")]
    pub max_connections: usize,
}

#[derive(clap::Args)]
pub struct SnapshotOpts {
    /// Consumer identity: primary, map or hud
    #[arg(long, default_value = "primary")]
    pub identity: String,
}

#[derive(clap::Args)]
pub struct WatchOpts {
    /// Consumer identity to subscribe as
    #[arg(long, default_value = "primary")]
    pub identity: String,
}
