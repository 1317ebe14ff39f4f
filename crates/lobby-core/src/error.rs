//! Business-rule error type following panic-free policy.

use crate::player::PlayerId;
use crate::session::SessionName;
use thiserror::Error;

/// Recoverable rejections of lobby operations.
///
/// All variants are business-rule rejections reported to the requesting
/// player as a protocol error message; none of them tears down a
/// connection or the coordinator. `CoordinatorClosed` is the one
/// infrastructure variant, produced by a handle talking to a coordinator
/// that has shut down.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LobbyError {
    /// A player with this identity is already connected.
    #[error("player already connected: {player}")]
    PlayerTaken { player: PlayerId },

    /// The requester is not a connected player.
    #[error("player not connected: {player}")]
    NotConnected { player: PlayerId },

    /// The named session does not exist.
    #[error("session not found: {session}")]
    SessionNotFound { session: SessionName },

    /// The session is at capacity.
    #[error("session is full: {session} ({capacity} players)")]
    SessionFull {
        session: SessionName,
        capacity: usize,
    },

    /// The requester does not belong to the session it addressed.
    #[error("player {player} is not in a session")]
    NotInSession { player: PlayerId },

    /// The requester already belongs to a session.
    #[error("player {player} is already in session {session}")]
    AlreadyInSession {
        player: PlayerId,
        session: SessionName,
    },

    /// The coordinator actor has shut down.
    #[error("coordinator closed")]
    CoordinatorClosed,
}

impl LobbyError {
    /// Stable machine-readable code, carried in protocol error messages.
    pub fn code(&self) -> &'static str {
        match self {
            Self::PlayerTaken { .. } => "player_taken",
            Self::NotConnected { .. } => "not_connected",
            Self::SessionNotFound { .. } => "session_not_found",
            Self::SessionFull { .. } => "session_full",
            Self::NotInSession { .. } => "not_in_session",
            Self::AlreadyInSession { .. } => "already_in_session",
            Self::CoordinatorClosed => "coordinator_closed",
        }
    }
}

/// Result type for lobby operations.
pub type LobbyResult<T> = Result<T, LobbyError>;
