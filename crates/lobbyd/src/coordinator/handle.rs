//! Coordinator handle - the interface connection handlers use to reach
//! the actor.
//!
//! The handle is cheap to clone (it wraps an mpsc sender) and every
//! connection task holds its own copy. Each method packages a command
//! with a oneshot responder, sends it to the actor, and awaits the reply.
//!
//! # Panic-Free Guarantees
//!
//! A closed command channel (actor gone during shutdown) surfaces as
//! [`LobbyError::CoordinatorClosed`], never as a panic.

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use lobby_core::{LobbyError, PlayerId, SessionName, SessionView};

use super::commands::{CoordinatorCommand, CreateOutcome, LeaveOutcome, Notice};

/// Handle for communicating with the coordinator actor.
///
/// Clone freely - all clones feed the same actor.
#[derive(Clone)]
pub struct CoordinatorHandle {
    sender: mpsc::Sender<CoordinatorCommand>,
}

impl CoordinatorHandle {
    /// Creates a new handle wrapping the actor's command sender.
    pub fn new(sender: mpsc::Sender<CoordinatorCommand>) -> Self {
        Self { sender }
    }

    /// Registers a player and hands the actor the producer end of the
    /// player's mailbox.
    ///
    /// # Errors
    ///
    /// Returns [`LobbyError::PlayerTaken`] when the identity is already
    /// connected, or [`LobbyError::CoordinatorClosed`] when the actor is
    /// gone.
    pub async fn connect(
        &self,
        player: PlayerId,
        mailbox: mpsc::UnboundedSender<Notice>,
    ) -> Result<(), LobbyError> {
        let (tx, rx) = oneshot::channel();
        self.send(CoordinatorCommand::Connect {
            player,
            mailbox,
            respond_to: tx,
        })
        .await?;
        rx.await.map_err(|_| LobbyError::CoordinatorClosed)?
    }

    /// Creates a session hosted by `requester`.
    ///
    /// A name collision is reported as [`CreateOutcome::NameTaken`], not
    /// as an error.
    ///
    /// # Errors
    ///
    /// Returns [`LobbyError::NotConnected`] or
    /// [`LobbyError::AlreadyInSession`] on precondition failures, or
    /// [`LobbyError::CoordinatorClosed`] when the actor is gone.
    pub async fn create_session(
        &self,
        requester: PlayerId,
        name: SessionName,
        map_selection: String,
        capacity: usize,
    ) -> Result<CreateOutcome, LobbyError> {
        let (tx, rx) = oneshot::channel();
        self.send(CoordinatorCommand::CreateSession {
            requester,
            name,
            map_selection,
            capacity,
            respond_to: tx,
        })
        .await?;
        rx.await.map_err(|_| LobbyError::CoordinatorClosed)?
    }

    /// Joins `requester` into the named session, returning the post-join
    /// snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`LobbyError::SessionNotFound`], [`LobbyError::SessionFull`],
    /// [`LobbyError::AlreadyInSession`], [`LobbyError::NotConnected`], or
    /// [`LobbyError::CoordinatorClosed`].
    pub async fn join_session(
        &self,
        requester: PlayerId,
        name: SessionName,
    ) -> Result<Box<SessionView>, LobbyError> {
        let (tx, rx) = oneshot::channel();
        self.send(CoordinatorCommand::JoinSession {
            requester,
            name,
            respond_to: tx,
        })
        .await?;
        rx.await.map_err(|_| LobbyError::CoordinatorClosed)?
    }

    /// Updates the requester's own participant fields in its current
    /// session.
    ///
    /// # Errors
    ///
    /// Returns [`LobbyError::NotInSession`] when the requester sits in no
    /// session, [`LobbyError::NotConnected`], or
    /// [`LobbyError::CoordinatorClosed`].
    pub async fn update_participant(
        &self,
        requester: PlayerId,
        civilization: String,
        team: u8,
        ready: bool,
    ) -> Result<(), LobbyError> {
        let (tx, rx) = oneshot::channel();
        self.send(CoordinatorCommand::UpdateParticipant {
            requester,
            civilization,
            team,
            ready,
            respond_to: tx,
        })
        .await?;
        rx.await.map_err(|_| LobbyError::CoordinatorClosed)?
    }

    /// Removes `requester` from the named session. A departing host
    /// closes the session ([`LeaveOutcome::Closed`]).
    ///
    /// # Errors
    ///
    /// Returns [`LobbyError::SessionNotFound`], [`LobbyError::NotInSession`],
    /// [`LobbyError::NotConnected`], or [`LobbyError::CoordinatorClosed`].
    pub async fn leave_session(
        &self,
        requester: PlayerId,
        name: SessionName,
    ) -> Result<LeaveOutcome, LobbyError> {
        let (tx, rx) = oneshot::channel();
        self.send(CoordinatorCommand::LeaveSession {
            requester,
            name,
            respond_to: tx,
        })
        .await?;
        rx.await.map_err(|_| LobbyError::CoordinatorClosed)?
    }

    /// Returns snapshots of all live sessions, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`LobbyError::CoordinatorClosed`] when the actor is gone.
    pub async fn list_sessions(&self) -> Result<Vec<SessionView>, LobbyError> {
        let (tx, rx) = oneshot::channel();
        self.send(CoordinatorCommand::ListSessions { respond_to: tx })
            .await?;
        rx.await.map_err(|_| LobbyError::CoordinatorClosed)
    }

    /// Detaches a player whose connection terminated. Fire-and-forget
    /// and idempotent; safe to call on every exit path.
    pub async fn disconnect(&self, player: PlayerId) {
        if self
            .sender
            .send(CoordinatorCommand::Disconnect { player })
            .await
            .is_err()
        {
            debug!("Coordinator gone, disconnect dropped");
        }
    }

    async fn send(&self, cmd: CoordinatorCommand) -> Result<(), LobbyError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| LobbyError::CoordinatorClosed)
    }
}
