//! zml: position telemetry relay binary.
//! Embeds the upstream stream client, the hub and the surface server in one process.

use clap::Parser;

mod cli;
mod client;
mod cmd_snapshot;
mod cmd_watch;
mod daemon;
mod rpc;
mod server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    let filter = std::env::var("ZML_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        cli::Command::Daemon(opts) => {
            tracing::info!("zml daemon starting");
            daemon::run_daemon(opts, args.listen).await?;
        }
        cli::Command::Snapshot(opts) => {
            cmd_snapshot::cmd_snapshot(args.listen, &opts.identity).await?;
        }
        cli::Command::Watch(opts) => {
            cmd_watch::cmd_watch(args.listen, &opts.identity).await?;
        }
    }

    Ok(())
}
