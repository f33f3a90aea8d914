//! `zml daemon`: wires the stream client, the hub and the surface server.

use std::net::SocketAddr;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use zml_hub::{Hub, RoutingMode, command_channel};
use zml_stream::{StreamClient, StreamConfig, WsConnector};

use crate::cli::DaemonOpts;
use crate::server::SurfaceServer;

/// Resolve daemon options into a stream configuration and routing mode.
fn resolve(opts: &DaemonOpts) -> anyhow::Result<(StreamConfig, RoutingMode)> {
    anyhow::ensure!(opts.max_connections > 0, "--max-connections must be at least 1");
    let url = zml_core::position_stream_url(&opts.backend_url)?;
    let routing: RoutingMode = opts.routing.parse()?;
    let mut config = StreamConfig::new(url);
    config.handshake_timeout = Duration::from_millis(opts.handshake_timeout_ms);
    Ok((config, routing))
}

/// Run the relay until ctrl-c or SIGTERM.
pub async fn run_daemon(opts: DaemonOpts, listen: SocketAddr) -> anyhow::Result<()> {
    let (config, routing) = resolve(&opts)?;
    tracing::info!(backend = %opts.backend_url, upstream = %config.url, routing = %routing, "daemon: configured");

    let cancel = CancellationToken::new();

    let (client, events) = StreamClient::new(config, WsConnector::new()).spawn();
    let (hub, commands) = command_channel();
    let hub_task = tokio::spawn(Hub::new(routing).run(events, commands, cancel.clone()));

    let server = SurfaceServer::new(listen, hub, cancel.clone())
        .with_max_connections(opts.max_connections);
    let (listener, addr) = server.bind().await?;
    tracing::info!(addr = %addr, "daemon: surface server listening");
    let mut server_task = tokio::spawn(async move { server.serve(listener).await });

    tokio::select! {
        result = shutdown_signal() => result?,
        result = &mut server_task => {
            tracing::warn!("daemon: surface server exited unexpectedly");
            result??;
        }
    }

    client.shutdown();
    client.join().await;
    cancel.cancel();
    if let Err(e) = hub_task.await {
        tracing::warn!(error = %e, "daemon: hub task failed");
    }
    if !server_task.is_finished() {
        let _ = server_task.await;
    }
    tracing::info!("daemon stopped");
    Ok(())
}

async fn shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                tracing::info!("received ctrl-c, shutting down");
            }
            _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        tracing::info!("received ctrl-c, shutting down");
    }

    Ok(())
}
