//! Coordinator actor commands, outcomes, and mailbox notices.
//!
//! This module defines the message types for communicating with the
//! `CoordinatorActor`:
//! - `CoordinatorCommand`: Commands sent to the actor
//! - `CreateOutcome` / `LeaveOutcome`: Tagged results of the lifecycle
//!   operations that distinguish more than success/failure
//! - `Notice`: Events delivered through per-player mailboxes
//!
//! All types are designed for async message passing and follow the
//! panic-free policy.

use lobby_core::{LobbyError, PlayerId, SessionName, SessionView};
use tokio::sync::{mpsc, oneshot};

// ============================================================================
// Mailbox Notices
// ============================================================================

/// Events delivered to participants through their mailboxes.
///
/// A closed sum type: the connection handler matches exhaustively, so a
/// new notice kind is caught by the compiler in every consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The session the player was in was closed by its host leaving.
    SessionClosedByHost {
        /// Name of the closed session
        session: SessionName,
    },
}

// ============================================================================
// Operation Outcomes
// ============================================================================

/// Result of a create operation.
///
/// A name collision is a normal outcome rather than an error: the
/// coordinator simply created nothing, and the caller must tell the
/// requester the name is taken.
#[derive(Debug, Clone)]
pub enum CreateOutcome {
    /// The session was created with the requester as host.
    /// The snapshot is boxed to reduce enum size variance.
    Created(Box<SessionView>),

    /// Another live session already uses this name; nothing was created.
    NameTaken,
}

/// Result of a successful leave operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The requester departed; the session stays alive.
    Left,

    /// The requester was the host: the session was closed and every
    /// participant notified.
    Closed,
}

// ============================================================================
// Coordinator Commands
// ============================================================================

/// Commands sent to the coordinator actor.
///
/// Each request-response command carries a oneshot responder, enabling
/// request-response patterns in async code without blocking.
///
/// # Usage
///
/// ```ignore
/// let (tx, rx) = oneshot::channel();
/// coordinator_tx.send(CoordinatorCommand::ListSessions {
///     respond_to: tx,
/// }).await?;
/// let sessions = rx.await?;
/// ```
#[derive(Debug)]
pub enum CoordinatorCommand {
    /// Register a connected player and its mailbox.
    ///
    /// # Errors
    /// - `LobbyError::PlayerTaken` if the identity is already connected
    Connect {
        /// Identity established by the connection layer
        player: PlayerId,
        /// Producer end of the player's mailbox
        mailbox: mpsc::UnboundedSender<Notice>,
        /// Channel to send the result
        respond_to: oneshot::Sender<Result<(), LobbyError>>,
    },

    /// Create a new session hosted by the requester.
    ///
    /// # Errors
    /// - `LobbyError::NotConnected` if the requester is unknown
    /// - `LobbyError::AlreadyInSession` if the requester is in a session
    CreateSession {
        /// Identity of the creating player
        requester: PlayerId,
        /// Requested session name
        name: SessionName,
        /// Opaque map configuration
        map_selection: String,
        /// Maximum participant count, host included
        capacity: usize,
        /// Channel to send the result
        respond_to: oneshot::Sender<Result<CreateOutcome, LobbyError>>,
    },

    /// Join an existing session as a non-host participant.
    ///
    /// # Errors
    /// - `LobbyError::NotConnected` if the requester is unknown
    /// - `LobbyError::AlreadyInSession` if the requester is in a session
    /// - `LobbyError::SessionNotFound` if the name matches no live session
    /// - `LobbyError::SessionFull` if the session is at capacity
    JoinSession {
        /// Identity of the joining player
        requester: PlayerId,
        /// Name of the session to join
        name: SessionName,
        /// Channel to send the result (snapshot boxed for size variance)
        respond_to: oneshot::Sender<Result<Box<SessionView>, LobbyError>>,
    },

    /// Update the requester's own participant config in its current session.
    ///
    /// # Errors
    /// - `LobbyError::NotConnected` if the requester is unknown
    /// - `LobbyError::NotInSession` if the requester has no current session
    UpdateParticipant {
        /// Identity of the player updating itself
        requester: PlayerId,
        /// Chosen civilization
        civilization: String,
        /// Team number
        team: u8,
        /// Ready flag
        ready: bool,
        /// Channel to send the result
        respond_to: oneshot::Sender<Result<(), LobbyError>>,
    },

    /// Leave a session; closes it when the requester is the host.
    ///
    /// # Errors
    /// - `LobbyError::NotConnected` if the requester is unknown
    /// - `LobbyError::SessionNotFound` if the name matches no live session
    /// - `LobbyError::NotInSession` if the requester is not a member
    LeaveSession {
        /// Identity of the departing player
        requester: PlayerId,
        /// Name of the session to leave
        name: SessionName,
        /// Channel to send the result
        respond_to: oneshot::Sender<Result<LeaveOutcome, LobbyError>>,
    },

    /// Get snapshots of all live sessions.
    ///
    /// Never fails; returns an empty vector when no sessions exist.
    ListSessions {
        /// Channel to send the results
        respond_to: oneshot::Sender<Vec<SessionView>>,
    },

    /// Detach a player whose connection terminated.
    ///
    /// Fire-and-forget housekeeping: applies the same host-vs-participant
    /// branching as LeaveSession for whatever session the player is in,
    /// then drops the player record (and with it, undelivered notices).
    /// Unknown identities are ignored.
    Disconnect {
        /// Identity of the departed player
        player: PlayerId,
    },
}
