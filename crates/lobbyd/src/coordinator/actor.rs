//! Coordinator actor - owns all lobby state and processes commands.
//!
//! The CoordinatorActor is the single owner of the two shared maps in the
//! system: sessions by name and connected players by identity. It receives
//! commands via an mpsc channel and processes them sequentially, so every
//! handler is one atomic transaction across both maps.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations use `?`, pattern matching, or `unwrap_or`
//! - Mailbox send failures are ignored (dead connections are detached
//!   by their own handlers)

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use lobby_core::{LobbyError, PlayerId, Session, SessionName, SessionView};

use super::commands::{CoordinatorCommand, CreateOutcome, LeaveOutcome, Notice};

// ============================================================================
// Player Record
// ============================================================================

/// The coordinator's half of a connected player's state.
///
/// The connection handler owns the other half: the mailbox receiver and
/// the exclusive write side of the socket.
struct PlayerRecord {
    /// Producer end of the player's unbounded FIFO mailbox.
    mailbox: mpsc::UnboundedSender<Notice>,

    /// The session the player currently belongs to, if any.
    ///
    /// Invariant: `Some(s)` iff this player's identity appears in the
    /// participant set of the live session named `s`.
    current_session: Option<SessionName>,
}

// ============================================================================
// Coordinator Actor
// ============================================================================

/// The coordinator actor - owns all lobby state.
///
/// Implements the actor pattern: receives commands via mpsc channel,
/// processes them sequentially, and pushes notices into participants'
/// mailboxes.
///
/// # Ownership
///
/// The actor owns:
/// - `sessions`: live sessions keyed by unique name
/// - `players`: connected players keyed by unique identity
///
/// # Thread Safety
///
/// The actor runs in a single task and processes commands sequentially.
/// All state mutations happen within this single task, which makes the
/// net effect of any set of concurrent callers equivalent to a sequential
/// interleaving of their operations.
pub struct CoordinatorActor {
    /// Command receiver
    receiver: mpsc::Receiver<CoordinatorCommand>,

    /// Live sessions keyed by name.
    sessions: HashMap<SessionName, Session>,

    /// Connected players keyed by identity.
    players: HashMap<PlayerId, PlayerRecord>,
}

impl CoordinatorActor {
    /// Creates a new coordinator actor.
    pub fn new(receiver: mpsc::Receiver<CoordinatorCommand>) -> Self {
        Self {
            receiver,
            sessions: HashMap::new(),
            players: HashMap::new(),
        }
    }

    /// Runs the actor event loop.
    ///
    /// Processes commands until the channel closes (all senders dropped).
    /// This is the main entry point - call this in a spawned task.
    pub async fn run(mut self) {
        info!("Coordinator actor starting");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!(
            sessions = self.sessions.len(),
            players = self.players.len(),
            "Coordinator actor stopped"
        );
    }

    /// Dispatches a command to the appropriate handler.
    ///
    /// Responder send failures are ignored - the caller may have dropped
    /// the receiver (e.g. its connection died mid-request).
    fn handle_command(&mut self, cmd: CoordinatorCommand) {
        match cmd {
            CoordinatorCommand::Connect {
                player,
                mailbox,
                respond_to,
            } => {
                let result = self.handle_connect(player, mailbox);
                let _ = respond_to.send(result);
            }
            CoordinatorCommand::CreateSession {
                requester,
                name,
                map_selection,
                capacity,
                respond_to,
            } => {
                let result = self.handle_create(requester, name, map_selection, capacity);
                let _ = respond_to.send(result);
            }
            CoordinatorCommand::JoinSession {
                requester,
                name,
                respond_to,
            } => {
                let result = self.handle_join(requester, name);
                let _ = respond_to.send(result);
            }
            CoordinatorCommand::UpdateParticipant {
                requester,
                civilization,
                team,
                ready,
                respond_to,
            } => {
                let result = self.handle_update(requester, civilization, team, ready);
                let _ = respond_to.send(result);
            }
            CoordinatorCommand::LeaveSession {
                requester,
                name,
                respond_to,
            } => {
                let result = self.handle_leave(requester, name);
                let _ = respond_to.send(result);
            }
            CoordinatorCommand::ListSessions { respond_to } => {
                let _ = respond_to.send(self.handle_list());
            }
            CoordinatorCommand::Disconnect { player } => {
                self.handle_disconnect(player);
            }
        }
    }

    // ========================================================================
    // Command Handlers
    // ========================================================================

    /// Registers a connected player and its mailbox.
    fn handle_connect(
        &mut self,
        player: PlayerId,
        mailbox: mpsc::UnboundedSender<Notice>,
    ) -> Result<(), LobbyError> {
        if self.players.contains_key(&player) {
            warn!(%player, "Identity already connected, rejecting");
            return Err(LobbyError::PlayerTaken { player });
        }

        self.players.insert(
            player.clone(),
            PlayerRecord {
                mailbox,
                current_session: None,
            },
        );

        info!(
            %player,
            connected_players = self.players.len(),
            "Player connected"
        );

        Ok(())
    }

    /// Handles session creation.
    ///
    /// A taken name is a normal `CreateOutcome::NameTaken` outcome, not an
    /// error; the session map is left untouched in that case.
    fn handle_create(
        &mut self,
        requester: PlayerId,
        name: SessionName,
        map_selection: String,
        capacity: usize,
    ) -> Result<CreateOutcome, LobbyError> {
        let record = self
            .players
            .get_mut(&requester)
            .ok_or_else(|| LobbyError::NotConnected {
                player: requester.clone(),
            })?;

        if let Some(session) = &record.current_session {
            return Err(LobbyError::AlreadyInSession {
                player: requester,
                session: session.clone(),
            });
        }

        if self.sessions.contains_key(&name) {
            debug!(%requester, session = %name, "Session name taken, nothing created");
            return Ok(CreateOutcome::NameTaken);
        }

        // The host counts toward capacity, so a session holds at least one.
        let capacity = capacity.max(1);

        record.current_session = Some(name.clone());
        let session = Session::new(name.clone(), requester.clone(), map_selection, capacity);
        let view = session.snapshot();
        self.sessions.insert(name.clone(), session);

        info!(
            host = %requester,
            session = %name,
            capacity,
            total_sessions = self.sessions.len(),
            "Session created"
        );

        Ok(CreateOutcome::Created(Box::new(view)))
    }

    /// Handles a join request.
    ///
    /// The capacity check, the membership insertion, and the requester's
    /// `current_session` update all happen here, in one transaction.
    /// On success only the requester is notified (via the returned
    /// snapshot); see [`Self::announce_join`].
    fn handle_join(
        &mut self,
        requester: PlayerId,
        name: SessionName,
    ) -> Result<Box<SessionView>, LobbyError> {
        let record = self
            .players
            .get_mut(&requester)
            .ok_or_else(|| LobbyError::NotConnected {
                player: requester.clone(),
            })?;

        if let Some(session) = &record.current_session {
            return Err(LobbyError::AlreadyInSession {
                player: requester,
                session: session.clone(),
            });
        }

        let session = self
            .sessions
            .get_mut(&name)
            .ok_or_else(|| LobbyError::SessionNotFound {
                session: name.clone(),
            })?;

        // insert_participant refuses when full; requester can't already be
        // a member because its current_session was None.
        if !session.insert_participant(requester.clone()) {
            debug!(%requester, session = %name, "Join refused, session full");
            return Err(LobbyError::SessionFull {
                session: name,
                capacity: session.capacity,
            });
        }

        record.current_session = Some(name.clone());
        let view = session.snapshot();

        self.announce_join(&name, &requester);

        Ok(Box::new(view))
    }

    /// Single call site for join announcements.
    ///
    /// The contract is requester-only: the snapshot returned on the
    /// command's responder is the notification, and sitting participants
    /// are not told. If join broadcasts are ever wanted, the mailbox
    /// pushes go here and nowhere else.
    fn announce_join(&mut self, name: &SessionName, joiner: &PlayerId) {
        info!(player = %joiner, session = %name, "Player joined session");
    }

    /// Updates the requester's own participant record in its current
    /// session. Only the requester's fields are touched.
    fn handle_update(
        &mut self,
        requester: PlayerId,
        civilization: String,
        team: u8,
        ready: bool,
    ) -> Result<(), LobbyError> {
        let record = self
            .players
            .get(&requester)
            .ok_or_else(|| LobbyError::NotConnected {
                player: requester.clone(),
            })?;

        let name = record
            .current_session
            .clone()
            .ok_or_else(|| LobbyError::NotInSession {
                player: requester.clone(),
            })?;

        let participant = self
            .sessions
            .get_mut(&name)
            .and_then(|session| session.participant_mut(&requester));

        match participant {
            Some(p) => {
                p.update(civilization, team, ready);
                debug!(player = %requester, session = %name, team, ready, "Participant updated");
                Ok(())
            }
            None => {
                // current_session pointing at a missing membership would be
                // an invariant violation; degrade to a rejection.
                warn!(player = %requester, session = %name, "Stale current_session during update");
                Err(LobbyError::NotInSession { player: requester })
            }
        }
    }

    /// Handles a leave request.
    ///
    /// The host leaving closes the whole session; anyone else departs
    /// quietly and the session stays alive.
    fn handle_leave(
        &mut self,
        requester: PlayerId,
        name: SessionName,
    ) -> Result<LeaveOutcome, LobbyError> {
        if !self.players.contains_key(&requester) {
            return Err(LobbyError::NotConnected { player: requester });
        }

        let session = self
            .sessions
            .get_mut(&name)
            .ok_or_else(|| LobbyError::SessionNotFound {
                session: name.clone(),
            })?;

        if !session.contains(&requester) {
            return Err(LobbyError::NotInSession { player: requester });
        }

        if session.host == requester {
            self.close_session(&name);
            Ok(LeaveOutcome::Closed)
        } else {
            session.remove_participant(&requester);
            if let Some(record) = self.players.get_mut(&requester) {
                record.current_session = None;
            }

            info!(
                player = %requester,
                session = %name,
                remaining = self.sessions.get(&name).map(Session::len).unwrap_or(0),
                "Player left session"
            );

            Ok(LeaveOutcome::Left)
        }
    }

    /// Returns snapshots of all live sessions, ordered by name.
    fn handle_list(&self) -> Vec<SessionView> {
        let mut views: Vec<SessionView> = self.sessions.values().map(Session::snapshot).collect();
        views.sort_by(|a, b| a.name.as_str().cmp(b.name.as_str()));
        views
    }

    /// Detaches a player whose connection terminated.
    ///
    /// Applies the same host-vs-participant branching as a leave so the
    /// session side is cleaned up too, then drops the player record.
    fn handle_disconnect(&mut self, player: PlayerId) {
        let record = match self.players.remove(&player) {
            Some(r) => r,
            None => {
                debug!(%player, "Disconnect for unknown player, ignoring");
                return;
            }
        };

        if let Some(name) = record.current_session {
            let is_host = self
                .sessions
                .get(&name)
                .map(|s| s.host == player)
                .unwrap_or(false);

            if is_host {
                self.close_session(&name);
            } else if let Some(session) = self.sessions.get_mut(&name) {
                session.remove_participant(&player);
                debug!(%player, session = %name, "Removed disconnected participant");
            }
        }

        info!(
            %player,
            connected_players = self.players.len(),
            "Player disconnected"
        );
    }

    // ========================================================================
    // Broadcast
    // ========================================================================

    /// Closes a session: notifies every current participant through its
    /// mailbox, clears their `current_session`, and removes the session.
    ///
    /// Membership is read and the notices sent within this one handler
    /// step, so the broadcast can never be based on stale membership.
    /// Sends are fire-and-forget: a closed mailbox belongs to a connection
    /// that is already on its way out.
    fn close_session(&mut self, name: &SessionName) {
        let session = match self.sessions.remove(name) {
            Some(s) => s,
            None => return,
        };

        let notice = Notice::SessionClosedByHost {
            session: name.clone(),
        };

        let mut notified = 0usize;
        for member in session.member_ids() {
            if let Some(record) = self.players.get_mut(member) {
                record.current_session = None;
                if record.mailbox.send(notice.clone()).is_ok() {
                    notified += 1;
                }
            }
        }

        info!(
            session = %name,
            host = %session.host,
            participants = session.len(),
            notified,
            remaining_sessions = self.sessions.len(),
            "Session closed by host"
        );
    }

    // ========================================================================
    // Accessors (for testing)
    // ========================================================================

    /// Returns the number of live sessions.
    #[cfg(test)]
    fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Returns the number of connected players.
    #[cfg(test)]
    fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Checks invariant 4 for every connected player: `current_session`
    /// is `Some(s)` iff the player appears in the participants of `s`.
    #[cfg(test)]
    fn membership_consistent(&self) -> bool {
        let forward = self.players.iter().all(|(player, record)| {
            match &record.current_session {
                Some(name) => self
                    .sessions
                    .get(name)
                    .map(|s| s.contains(player))
                    .unwrap_or(false),
                None => !self.sessions.values().any(|s| s.contains(player)),
            }
        });

        let backward = self.sessions.iter().all(|(name, session)| {
            session.member_ids().all(|member| {
                self.players
                    .get(member)
                    .map(|r| r.current_session.as_ref() == Some(name))
                    // A member with no player record only occurs transiently
                    // inside close_session; never after a commit.
                    .unwrap_or(false)
            })
        });

        forward && backward
    }
}
