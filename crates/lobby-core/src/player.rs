//! Player identity and session membership records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Type-Safe Identifiers
// ============================================================================

/// Unique identifier for a connected player.
///
/// Wraps the player name established at login. The connection layer owns
/// authentication; by the time a `PlayerId` reaches the coordinator it is
/// trusted to identify one live connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    /// Creates a new PlayerId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the underlying string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PlayerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for PlayerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Participant
// ============================================================================

/// A player's membership record within one session.
///
/// Holds the per-player gameplay configuration chosen in the lobby.
/// `is_host` is true for exactly one participant per session: the player
/// named in the session's `host` field. It is set only by
/// [`crate::Session::new`] and never flips afterward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// Identity of the member.
    pub player: PlayerId,

    /// Whether this member created (and owns) the session.
    pub is_host: bool,

    /// Chosen civilization; opaque to the coordinator.
    pub civilization: String,

    /// Team number.
    pub team: u8,

    /// Whether the player has marked itself ready.
    pub ready: bool,

    /// When the player joined the session.
    pub joined_at: DateTime<Utc>,
}

impl Participant {
    /// Creates a membership record with default gameplay config.
    pub fn new(player: PlayerId, is_host: bool) -> Self {
        Self {
            player,
            is_host,
            civilization: String::new(),
            team: 0,
            ready: false,
            joined_at: Utc::now(),
        }
    }

    /// Applies a config update from the owning player.
    pub fn update(&mut self, civilization: String, team: u8, ready: bool) {
        self.civilization = civilization;
        self.team = team;
        self.ready = ready;
    }
}

// ============================================================================
// Participant View
// ============================================================================

/// Owned snapshot of a [`Participant`], used in session-list answers and
/// wire messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantView {
    pub player: PlayerId,
    pub is_host: bool,
    pub civilization: String,
    pub team: u8,
    pub ready: bool,
    pub joined_at: DateTime<Utc>,
}

impl ParticipantView {
    /// Creates a view from a live membership record.
    pub fn from_participant(p: &Participant) -> Self {
        Self {
            player: p.player.clone(),
            is_host: p.is_host,
            civilization: p.civilization.clone(),
            team: p.team,
            ready: p.ready,
            joined_at: p.joined_at,
        }
    }
}
