//! Session domain entity and snapshot views.

use crate::player::{Participant, ParticipantView, PlayerId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// Type-Safe Identifiers
// ============================================================================

/// Unique name of a game session (lobby).
///
/// Chosen by the creating player and immutable for the session's lifetime.
/// Uniqueness among live sessions is enforced by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionName(String);

impl SessionName {
    /// Creates a new SessionName from a string.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the underlying string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for SessionName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Session
// ============================================================================

/// A single game lobby: name, capacity, map selection, host, and the set
/// of joined participants.
///
/// Owned exclusively by the coordinator actor; everything outside the actor
/// sees only [`SessionView`] snapshots.
///
/// # Host invariant
///
/// The host participant is seeded by [`Session::new`] with `is_host = true`
/// and matches the `host` field for the session's entire lifetime.
/// [`Session::insert_participant`] only ever inserts non-host members, so
/// the invariant holds by construction.
#[derive(Debug, Clone)]
pub struct Session {
    /// Unique name, assigned at creation.
    pub name: SessionName,

    /// Identity of the creating player.
    pub host: PlayerId,

    /// Opaque map configuration chosen at creation.
    pub map_selection: String,

    /// Maximum participant count, host included.
    pub capacity: usize,

    /// Membership records keyed by player identity.
    participants: HashMap<PlayerId, Participant>,

    /// When the session was created.
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Creates a new session with the host as its only participant.
    pub fn new(
        name: SessionName,
        host: PlayerId,
        map_selection: String,
        capacity: usize,
    ) -> Self {
        let mut participants = HashMap::new();
        participants.insert(host.clone(), Participant::new(host.clone(), true));

        Self {
            name,
            host,
            map_selection,
            capacity,
            participants,
            created_at: Utc::now(),
        }
    }

    /// Returns the current participant count.
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    /// Returns true if the session has no participants.
    ///
    /// Cannot happen for a live session (the host is always a member),
    /// but keeps the `len`/`is_empty` pair complete.
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Returns true if no further joins are possible.
    pub fn is_full(&self) -> bool {
        self.participants.len() >= self.capacity
    }

    /// Returns true if the player is a member of this session.
    pub fn contains(&self, player: &PlayerId) -> bool {
        self.participants.contains_key(player)
    }

    /// Inserts a non-host participant.
    ///
    /// Returns false (and leaves the session untouched) if the session is
    /// full or the player is already a member. The returned flag is the
    /// capacity check and the membership insertion fused into one step, so
    /// callers cannot race a separate "has room" read against the write.
    pub fn insert_participant(&mut self, player: PlayerId) -> bool {
        if self.is_full() || self.participants.contains_key(&player) {
            return false;
        }
        self.participants
            .insert(player.clone(), Participant::new(player, false));
        true
    }

    /// Removes a participant, returning its record if it was a member.
    pub fn remove_participant(&mut self, player: &PlayerId) -> Option<Participant> {
        self.participants.remove(player)
    }

    /// Returns a mutable reference to a member's record.
    pub fn participant_mut(&mut self, player: &PlayerId) -> Option<&mut Participant> {
        self.participants.get_mut(player)
    }

    /// Iterates over member identities.
    pub fn member_ids(&self) -> impl Iterator<Item = &PlayerId> {
        self.participants.keys()
    }

    /// Produces an owned snapshot of this session.
    pub fn snapshot(&self) -> SessionView {
        let mut participants: Vec<ParticipantView> = self
            .participants
            .values()
            .map(ParticipantView::from_participant)
            .collect();
        // Deterministic snapshots: order by join time, then identity
        participants.sort_by(|a, b| {
            a.joined_at
                .cmp(&b.joined_at)
                .then_with(|| a.player.as_str().cmp(b.player.as_str()))
        });

        SessionView {
            name: self.name.clone(),
            host: self.host.clone(),
            map_selection: self.map_selection.clone(),
            capacity: self.capacity,
            participants,
            created_at: self.created_at,
        }
    }
}

// ============================================================================
// Session View
// ============================================================================

/// Owned snapshot of a [`Session`].
///
/// This is what `list()` answers and session-change messages carry over
/// the wire. Participants are ordered by join time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionView {
    pub name: SessionName,
    pub host: PlayerId,
    pub map_selection: String,
    pub capacity: usize,
    pub participants: Vec<ParticipantView>,
    pub created_at: DateTime<Utc>,
}

impl SessionView {
    /// Returns the participant count.
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    /// Returns true if the snapshot has no participants.
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Returns the view of a specific member, if present.
    pub fn participant(&self, player: &PlayerId) -> Option<&ParticipantView> {
        self.participants.iter().find(|p| &p.player == player)
    }
}
