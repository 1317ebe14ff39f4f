//! Lobby daemon - multiplayer session coordinator
//!
//! This binary runs as a foreground server, accepting player connections
//! over TCP and coordinating game session membership.
//!
//! # Usage
//!
//! ```bash
//! # Start on the default address
//! lobbyd
//!
//! # Start on a custom address
//! lobbyd --bind 0.0.0.0:7878
//! LOBBYD_BIND=0.0.0.0:7878 lobbyd
//!
//! # Enable debug logging
//! RUST_LOG=lobbyd=debug lobbyd
//! ```
//!
//! # Signal Handling
//!
//! - SIGTERM/SIGINT: Graceful shutdown

use std::process;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use lobbyd::coordinator::spawn_coordinator;
use lobbyd::server::{LobbyServer, DEFAULT_BIND_ADDR};

/// Lobby daemon - multiplayer session coordinator
#[derive(Parser, Debug)]
#[command(name = "lobbyd", version, about)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "LOBBYD_BIND", default_value = DEFAULT_BIND_ADDR)]
    bind: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("lobbyd=info".parse()?)
                .add_directive("lobby_core=info".parse()?)
                .add_directive("lobby_protocol=info".parse()?),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = process::id(),
        "Lobby daemon starting"
    );

    // Create cancellation token for graceful shutdown
    let cancel_token = CancellationToken::new();

    // Setup signal handlers
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    // Spawn the coordinator actor
    let coordinator = spawn_coordinator();
    info!("Coordinator started");

    // Bind and run the server
    let server = LobbyServer::bind(&args.bind, coordinator, cancel_token).await?;

    info!(bind = %args.bind, "Starting server");

    if let Err(e) = server.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Lobby daemon stopped");
    Ok(())
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
