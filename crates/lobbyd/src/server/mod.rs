//! TCP server for the lobby daemon.
//!
//! The server:
//! - Listens on a TCP socket for player connections
//! - Spawns a ConnectionHandler for each player
//! - Supports graceful shutdown via CancellationToken
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   LobbyServer   │
//! │                 │
//! │   TcpListener   │
//! └───────┬─────────┘
//!         │ accept()
//!         ▼
//! ┌─────────────────┐     ┌───────────────────┐
//! │ConnectionHandler│────▶│ CoordinatorHandle │
//! │  (per player)   │     │                   │
//! └─────────────────┘     └───────────────────┘
//!         ▲
//!         │ mailbox notices
//!         │
//! ┌─────────────────┐
//! │CoordinatorActor │
//! └─────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations use `?`, pattern matching, or `unwrap_or`
//! - Accept errors are logged and allow continued operation

mod connection;

pub use connection::{ConnectionError, ConnectionHandler};

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::coordinator::CoordinatorHandle;

/// Default listen address
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:7878";

/// TCP server for the lobby daemon.
///
/// Accepts player connections until cancelled.
pub struct LobbyServer {
    /// Bound TCP listener
    listener: TcpListener,

    /// Handle to the lobby coordinator
    coordinator: CoordinatorHandle,

    /// Cancellation token for graceful shutdown
    cancel_token: CancellationToken,

    /// Connection counter for log correlation
    connection_counter: AtomicU64,
}

impl LobbyServer {
    /// Binds the listener and creates a server.
    ///
    /// Binding eagerly (rather than in `run`) lets callers read the bound
    /// address first, which matters when `addr` uses port 0.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] when the address cannot be bound.
    pub async fn bind(
        addr: &str,
        coordinator: CoordinatorHandle,
        cancel_token: CancellationToken,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr).await.map_err(|e| ServerError::Bind {
            addr: addr.to_string(),
            error: e.to_string(),
        })?;

        Ok(Self {
            listener,
            coordinator,
            cancel_token,
            connection_counter: AtomicU64::new(0),
        })
    }

    /// Returns the address the listener is bound to.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] when the socket cannot report its
    /// own address.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener.local_addr().map_err(|e| ServerError::Bind {
            addr: "local".to_string(),
            error: e.to_string(),
        })
    }

    /// Runs the server.
    ///
    /// Accepts connections until the cancellation token is triggered.
    /// This method does not return until shutdown.
    pub async fn run(&self) -> Result<(), ServerError> {
        info!(addr = ?self.listener.local_addr().ok(), "Lobby server listening");

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!("Server shutdown requested");
                    break;
                }

                result = self.listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let conn_num = self.connection_counter.fetch_add(1, Ordering::Relaxed);
                            info!(connection = conn_num, peer = %addr, "Accepted connection");
                            self.handle_connection(stream, conn_num);
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                            // Continue accepting other connections
                        }
                    }
                }
            }
        }

        info!("Server stopped accepting connections");
        Ok(())
    }

    /// Handles a new player connection by spawning a handler task.
    fn handle_connection(&self, stream: TcpStream, connection_number: u64) {
        let (reader, writer) = stream.into_split();
        let coordinator = self.coordinator.clone();

        tokio::spawn(async move {
            ConnectionHandler::new(reader, writer, coordinator, connection_number)
                .run()
                .await;
        });
    }
}

/// Errors that can occur in server operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {error}")]
    Bind { addr: String, error: String },

    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::spawn_coordinator;

    #[test]
    fn test_default_bind_addr() {
        assert_eq!(DEFAULT_BIND_ADDR, "127.0.0.1:7878");
    }

    #[test]
    fn test_server_error_display() {
        let err = ServerError::Bind {
            addr: "127.0.0.1:7878".to_string(),
            error: "address in use".to_string(),
        };
        assert!(err.to_string().contains("127.0.0.1:7878"));
        assert!(err.to_string().contains("address in use"));
    }

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let handle = spawn_coordinator();
        let server = LobbyServer::bind("127.0.0.1:0", handle, CancellationToken::new())
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_server_returns() {
        let handle = spawn_coordinator();
        let token = CancellationToken::new();
        let server = LobbyServer::bind("127.0.0.1:0", handle, token.clone())
            .await
            .unwrap();
        token.cancel();
        server.run().await.unwrap();
    }
}
