//! Connection handler for individual player connections.
//!
//! Each player connection gets its own `ConnectionHandler` that:
//! - Performs the login handshake and protocol version check
//! - Parses incoming requests and routes them to the coordinator
//! - Drains the player's mailbox and forwards notices to the socket
//!
//! The handler task has exclusive ownership of the socket write half and
//! the mailbox consumer, so responses and notices interleave cleanly on
//! the wire without locking. Inbound framing uses `FramedRead` with
//! `LinesCodec`: partially read lines stay buffered inside the codec, so
//! a mailbox notice winning the event-loop race never discards bytes of
//! an in-flight request.
//!
//! The handler is generic over its I/O halves so tests can drive it with
//! in-memory duplex streams.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations use `?`, pattern matching, or `unwrap_or`
//! - Connection errors are logged and result in graceful disconnect

use std::time::Duration;

use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tracing::{debug, info, warn};

use lobby_core::PlayerId;
use lobby_protocol::{ClientMessage, ProtocolVersion, Request, ServerMessage};

use crate::coordinator::{CoordinatorHandle, CreateOutcome, LeaveOutcome, Notice};

/// Maximum request line size (64 KB)
const MAX_MESSAGE_SIZE: usize = 65_536;

/// Read timeout for idle connections (5 minutes)
const READ_TIMEOUT: Duration = Duration::from_secs(300);

/// Write timeout (10 seconds)
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// One turn of the connection event loop.
///
/// `select!` branches produce a `Step` so the loop body can use the
/// handler mutably after the competing futures are dropped.
enum Step {
    Inbound(Result<ClientMessage, ConnectionError>),
    Notice(Option<Notice>),
    IdleTimeout,
}

/// Connection handler for a single player.
///
/// Manages the lifecycle of a player connection including:
/// - Login handshake
/// - Request processing loop interleaved with mailbox drains
/// - Coordinator detachment on every exit path
pub struct ConnectionHandler<R, W> {
    /// Line-framed reader; retains partial lines across cancelled polls
    reader: FramedRead<R, LinesCodec>,

    /// Buffered writer for responses and notices
    writer: BufWriter<W>,

    /// Handle to the lobby coordinator
    coordinator: CoordinatorHandle,

    /// Identity of the logged-in player (set after handshake)
    player: Option<PlayerId>,

    /// Unique number for this connection
    connection_number: u64,
}

impl<R, W> ConnectionHandler<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a new connection handler.
    pub fn new(reader: R, writer: W, coordinator: CoordinatorHandle, connection_number: u64) -> Self {
        Self {
            reader: FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_MESSAGE_SIZE)),
            writer: BufWriter::new(writer),
            coordinator,
            player: None,
            connection_number,
        }
    }

    /// Runs the connection handler.
    ///
    /// Performs the login handshake then enters the request loop. Every
    /// exit, including a handshake that failed after the coordinator
    /// registered the player, funnels through the disconnect cleanup so
    /// a dropped connection can never leave a stale player record behind.
    pub async fn run(mut self) {
        debug!(connection = self.connection_number, "New connection");

        match self.handle_handshake().await {
            Ok(mut mailbox) => {
                info!(
                    connection = self.connection_number,
                    player = ?self.player,
                    "Player logged in"
                );

                if let Err(e) = self.process_requests(&mut mailbox).await {
                    debug!(player = ?self.player, error = %e, "Connection closed");
                }
            }
            Err(e) => {
                warn!(
                    connection = self.connection_number,
                    error = %e,
                    "Handshake failed"
                );
            }
        }

        // On the handshake-error path the player may already be
        // registered (connect succeeded, reply write failed).
        if let Some(player) = self.player.take() {
            self.coordinator.disconnect(player.clone()).await;
            info!(%player, "Player connection ended");
        }
    }

    /// Handles the login handshake.
    ///
    /// Expects a `Login` request, validates the protocol version, and
    /// registers the player with the coordinator. Returns the consumer
    /// end of the player's mailbox on success.
    async fn handle_handshake(
        &mut self,
    ) -> Result<mpsc::UnboundedReceiver<Notice>, ConnectionError> {
        let msg = Self::read_request(&mut self.reader).await?;

        let client_version = msg.protocol_version;
        if !client_version.is_compatible_with(&ProtocolVersion::CURRENT) {
            warn!(
                client_version = %client_version,
                server_version = %ProtocolVersion::CURRENT,
                "Protocol version mismatch"
            );

            self.send_message(ServerMessage::rejected(&format!(
                "Protocol version {} not compatible with server version {}",
                client_version,
                ProtocolVersion::CURRENT
            )))
            .await?;

            return Err(ConnectionError::VersionMismatch {
                client: client_version,
                server: ProtocolVersion::CURRENT,
            });
        }

        match msg.request {
            Request::Login { player } => {
                let (mail_tx, mail_rx) = mpsc::unbounded_channel();

                match self.coordinator.connect(player.clone(), mail_tx).await {
                    Ok(()) => {
                        self.player = Some(player.clone());
                        self.send_message(ServerMessage::logged_in(player)).await?;
                        Ok(mail_rx)
                    }
                    Err(e) => {
                        self.send_message(ServerMessage::rejected(&e.to_string()))
                            .await?;
                        Err(ConnectionError::LoginRefused(e.to_string()))
                    }
                }
            }
            other => {
                self.send_message(ServerMessage::rejected("Expected login request"))
                    .await?;
                Err(ConnectionError::UnexpectedMessage(format!("{other:?}")))
            }
        }
    }

    /// Main event loop: interleaves client requests with mailbox notices.
    ///
    /// Both select branches are cancellation safe: `FramedRead` keeps
    /// partially read lines in its own buffer, and `mpsc::recv` loses
    /// nothing when cancelled, so a notice arriving mid-request leaves
    /// the request intact for the next iteration.
    ///
    /// Returns `Ok(())` on a clean EOF or logout; any other exit is an
    /// error the caller logs at debug level.
    async fn process_requests(
        &mut self,
        mailbox: &mut mpsc::UnboundedReceiver<Notice>,
    ) -> Result<(), ConnectionError> {
        loop {
            let step = tokio::select! {
                inbound = timeout(READ_TIMEOUT, Self::read_request(&mut self.reader)) => {
                    match inbound {
                        Ok(result) => Step::Inbound(result),
                        Err(_) => Step::IdleTimeout,
                    }
                }
                notice = mailbox.recv() => Step::Notice(notice),
            };

            match step {
                Step::Inbound(Ok(msg)) => {
                    if let Err(e) = self.handle_request(msg.request).await {
                        if matches!(e, ConnectionError::Eof) {
                            return Ok(());
                        }
                        return Err(e);
                    }
                }
                Step::Inbound(Err(ConnectionError::Eof)) => {
                    debug!(player = ?self.player, "Client sent EOF");
                    return Ok(());
                }
                Step::Inbound(Err(ConnectionError::ParseError(reason))) => {
                    // Malformed line: report and keep the connection alive
                    self.send_message(ServerMessage::error("protocol", &reason))
                        .await?;
                }
                Step::Inbound(Err(e)) => return Err(e),
                Step::Notice(Some(notice)) => {
                    self.forward_notice(notice).await?;
                }
                Step::Notice(None) => {
                    // Coordinator gone; nothing more will ever arrive
                    debug!(player = ?self.player, "Mailbox closed");
                    return Ok(());
                }
                Step::IdleTimeout => {
                    debug!(player = ?self.player, "Connection idle timeout");
                    return Err(ConnectionError::Timeout);
                }
            }
        }
    }

    /// Dispatches a single client request.
    async fn handle_request(&mut self, request: Request) -> Result<(), ConnectionError> {
        let player = match &self.player {
            Some(p) => p.clone(),
            None => return Err(ConnectionError::UnexpectedMessage("not logged in".into())),
        };

        match request {
            Request::Login { .. } => {
                self.send_message(ServerMessage::error("protocol", "Already logged in"))
                    .await?;
            }

            Request::CreateSession {
                name,
                map_selection,
                capacity,
            } => {
                match self
                    .coordinator
                    .create_session(player, name.clone(), map_selection, capacity)
                    .await
                {
                    Ok(CreateOutcome::Created(view)) => {
                        self.send_message(ServerMessage::session_created(*view))
                            .await?;
                    }
                    Ok(CreateOutcome::NameTaken) => {
                        self.send_message(ServerMessage::error(
                            "name_taken",
                            &format!("Session name '{name}' is already in use"),
                        ))
                        .await?;
                    }
                    Err(e) => {
                        self.send_message(ServerMessage::error(e.code(), &e.to_string()))
                            .await?;
                    }
                }
            }

            Request::JoinSession { name } => {
                match self.coordinator.join_session(player, name).await {
                    Ok(view) => {
                        self.send_message(ServerMessage::session_joined(*view))
                            .await?;
                    }
                    Err(e) => {
                        self.send_message(ServerMessage::error(e.code(), &e.to_string()))
                            .await?;
                    }
                }
            }

            Request::UpdateParticipant {
                civilization,
                team,
                ready,
            } => {
                match self
                    .coordinator
                    .update_participant(player, civilization, team, ready)
                    .await
                {
                    Ok(()) => {
                        self.send_message(ServerMessage::ack("Participant updated"))
                            .await?;
                    }
                    Err(e) => {
                        self.send_message(ServerMessage::error(e.code(), &e.to_string()))
                            .await?;
                    }
                }
            }

            Request::LeaveSession { name } => {
                match self.coordinator.leave_session(player, name).await {
                    Ok(LeaveOutcome::Left) => {
                        self.send_message(ServerMessage::ack("Left session")).await?;
                    }
                    Ok(LeaveOutcome::Closed) => {
                        // The host's own close notice arrives via its mailbox
                        self.send_message(ServerMessage::ack("Session closed"))
                            .await?;
                    }
                    Err(e) => {
                        self.send_message(ServerMessage::error(e.code(), &e.to_string()))
                            .await?;
                    }
                }
            }

            Request::ListSessions => {
                match self.coordinator.list_sessions().await {
                    Ok(sessions) => {
                        self.send_message(ServerMessage::session_list(sessions))
                            .await?;
                    }
                    Err(e) => {
                        self.send_message(ServerMessage::error(e.code(), &e.to_string()))
                            .await?;
                    }
                }
            }

            Request::Logout => {
                debug!(player = ?self.player, "Player requested logout");
                self.send_message(ServerMessage::ack("Goodbye")).await?;
                return Err(ConnectionError::Eof);
            }
        }

        Ok(())
    }

    /// Forwards a mailbox notice to the client.
    async fn forward_notice(&mut self, notice: Notice) -> Result<(), ConnectionError> {
        let msg = match notice {
            Notice::SessionClosedByHost { session } => {
                ServerMessage::session_closed_by_host(session)
            }
        };
        self.send_message(msg).await
    }

    /// Reads a single request line from the client.
    ///
    /// Associated function (rather than a method) so the event loop can
    /// borrow only the reader while the mailbox is polled alongside.
    async fn read_request(
        reader: &mut FramedRead<R, LinesCodec>,
    ) -> Result<ClientMessage, ConnectionError> {
        match reader.next().await {
            None => Err(ConnectionError::Eof),
            Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                Err(ConnectionError::MessageTooLarge {
                    max: MAX_MESSAGE_SIZE,
                })
            }
            Some(Err(LinesCodecError::Io(e))) => Err(ConnectionError::Io(e.to_string())),
            Some(Ok(line)) => {
                serde_json::from_str(&line).map_err(|e| ConnectionError::ParseError(e.to_string()))
            }
        }
    }

    /// Sends a message to the client as one JSON line.
    async fn send_message(&mut self, msg: ServerMessage) -> Result<(), ConnectionError> {
        let json =
            serde_json::to_string(&msg).map_err(|e| ConnectionError::ParseError(e.to_string()))?;

        let writer = &mut self.writer;
        match timeout(WRITE_TIMEOUT, async {
            writer.write_all(json.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
            Ok::<(), std::io::Error>(())
        })
        .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ConnectionError::Io(e.to_string())),
            Err(_) => Err(ConnectionError::Timeout),
        }
    }
}

/// Errors that can occur while handling a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Client closed the connection")]
    Eof,

    #[error("Connection timed out")]
    Timeout,

    #[error("Failed to parse message: {0}")]
    ParseError(String),

    #[error("Message too large (max: {max} bytes)")]
    MessageTooLarge { max: usize },

    #[error("Protocol version mismatch: client {client}, server {server}")]
    VersionMismatch {
        client: ProtocolVersion,
        server: ProtocolVersion,
    },

    #[error("Login refused: {0}")]
    LoginRefused(String),

    #[error("Unexpected message: {0}")]
    UnexpectedMessage(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::spawn_coordinator;

    #[test]
    fn test_error_display() {
        let err = ConnectionError::MessageTooLarge {
            max: MAX_MESSAGE_SIZE,
        };
        assert!(err.to_string().contains(&MAX_MESSAGE_SIZE.to_string()));

        let err = ConnectionError::VersionMismatch {
            client: ProtocolVersion::new(2, 0),
            server: ProtocolVersion::CURRENT,
        };
        assert!(err.to_string().contains("2.0"));
    }

    #[test]
    fn test_limits_are_sane() {
        assert!(MAX_MESSAGE_SIZE >= 4096);
        assert!(READ_TIMEOUT > WRITE_TIMEOUT);
    }

    /// A login whose reply can never be delivered must still release the
    /// identity: the coordinator registered the player before the write
    /// failed, so the handler has to disconnect on its way out.
    #[tokio::test]
    async fn test_undeliverable_login_reply_releases_identity() {
        let handle = spawn_coordinator();

        // Tiny duplex buffer: the LoggedIn reply cannot fit, so its
        // write pends until the client end is dropped, then fails.
        let (mut client, server_io) = tokio::io::duplex(16);
        let (read_half, write_half) = tokio::io::split(server_io);

        let handler = ConnectionHandler::new(read_half, write_half, handle.clone(), 0);
        let task = tokio::spawn(handler.run());

        let line = serde_json::to_string(&ClientMessage::login("Alice")).unwrap();
        client.write_all(line.as_bytes()).await.unwrap();
        client.write_all(b"\n").await.unwrap();
        drop(client);

        task.await.unwrap();

        // The identity is free again
        let (tx, _rx) = mpsc::unbounded_channel();
        handle
            .connect(PlayerId::new("Alice"), tx)
            .await
            .expect("identity should be released after failed handshake");
    }

    /// A handler dropped mid-session (task abort, transport gone) is the
    /// other exit path that must detach the player.
    #[tokio::test]
    async fn test_client_eof_releases_identity() {
        let handle = spawn_coordinator();

        let (mut client, server_io) = tokio::io::duplex(4096);
        let (read_half, write_half) = tokio::io::split(server_io);

        let handler = ConnectionHandler::new(read_half, write_half, handle.clone(), 0);
        let task = tokio::spawn(handler.run());

        let line = serde_json::to_string(&ClientMessage::login("Bob")).unwrap();
        client.write_all(line.as_bytes()).await.unwrap();
        client.write_all(b"\n").await.unwrap();
        // Half-close: stop sending, let the reply sit in the buffer
        client.shutdown().await.unwrap();

        task.await.unwrap();

        let (tx, _rx) = mpsc::unbounded_channel();
        handle
            .connect(PlayerId::new("Bob"), tx)
            .await
            .expect("identity should be released after EOF");
    }
}
