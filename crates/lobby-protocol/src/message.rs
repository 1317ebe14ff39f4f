//! Protocol message types for lobby communication.

use crate::version::ProtocolVersion;
use lobby_core::{PlayerId, SessionName, SessionView};
use serde::{Deserialize, Serialize};

/// Request kinds that can be sent by game clients to the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Client handshake: authenticate as a player
    Login {
        /// Identity the client wants to play as
        player: PlayerId,
    },

    /// Create a new session with the requester as host
    CreateSession {
        /// Unique session name
        name: SessionName,
        /// Opaque map configuration
        map_selection: String,
        /// Maximum participant count, host included
        capacity: usize,
    },

    /// Join an existing session
    JoinSession {
        /// Name of the session to join
        name: SessionName,
    },

    /// Update the requester's own participant config
    UpdateParticipant {
        /// Chosen civilization
        civilization: String,
        /// Team number
        team: u8,
        /// Ready flag
        ready: bool,
    },

    /// Leave a session (closes it when the requester is the host)
    LeaveSession {
        /// Name of the session to leave
        name: SessionName,
    },

    /// Request the current session list
    ListSessions,

    /// Client disconnecting gracefully
    Logout,
}

/// Messages sent from client to daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientMessage {
    /// Protocol version
    pub protocol_version: ProtocolVersion,

    /// Request payload
    #[serde(flatten)]
    pub request: Request,
}

impl ClientMessage {
    /// Creates a new client message with current protocol version.
    pub fn new(request: Request) -> Self {
        Self {
            protocol_version: ProtocolVersion::CURRENT,
            request,
        }
    }

    /// Creates a login message.
    pub fn login(player: impl Into<PlayerId>) -> Self {
        Self::new(Request::Login {
            player: player.into(),
        })
    }

    /// Creates a create-session request.
    pub fn create_session(
        name: impl Into<SessionName>,
        map_selection: impl Into<String>,
        capacity: usize,
    ) -> Self {
        Self::new(Request::CreateSession {
            name: name.into(),
            map_selection: map_selection.into(),
            capacity,
        })
    }

    /// Creates a join-session request.
    pub fn join_session(name: impl Into<SessionName>) -> Self {
        Self::new(Request::JoinSession { name: name.into() })
    }

    /// Creates an update-participant request.
    pub fn update_participant(civilization: impl Into<String>, team: u8, ready: bool) -> Self {
        Self::new(Request::UpdateParticipant {
            civilization: civilization.into(),
            team,
            ready,
        })
    }

    /// Creates a leave-session request.
    pub fn leave_session(name: impl Into<SessionName>) -> Self {
        Self::new(Request::LeaveSession { name: name.into() })
    }

    /// Creates a list-sessions request.
    pub fn list_sessions() -> Self {
        Self::new(Request::ListSessions)
    }

    /// Creates a logout message.
    pub fn logout() -> Self {
        Self::new(Request::Logout)
    }
}

/// Messages sent from daemon to clients.
///
/// Acknowledgements and errors go to the requester only;
/// `SessionClosedByHost` is broadcast to every participant of the
/// affected session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Login accepted
    LoggedIn {
        /// Daemon's protocol version
        protocol_version: ProtocolVersion,
        /// Confirmed player identity
        player: PlayerId,
    },

    /// Login rejected (version mismatch, identity taken, etc.)
    Rejected {
        /// Reason for rejection
        reason: String,
        /// Daemon's protocol version (for client to upgrade)
        protocol_version: ProtocolVersion,
    },

    /// Plain text acknowledgement/result message
    Ack {
        /// Human-readable result ("Left.", "Closed.", ...)
        message: String,
    },

    /// Full session list response
    SessionList {
        /// Snapshots of all live sessions
        sessions: Vec<SessionView>,
    },

    /// The requester's create succeeded
    SessionCreated {
        /// Snapshot of the created session (boxed for size variance)
        session: Box<SessionView>,
    },

    /// The requester's join succeeded
    SessionJoined {
        /// Snapshot of the joined session
        session: Box<SessionView>,
    },

    /// The session was closed because its host left
    SessionClosedByHost {
        /// Name of the closed session
        session: SessionName,
    },

    /// Structured error response
    Error {
        /// Machine-readable error code (e.g. "session_full")
        code: String,
        /// Human-readable error message
        message: String,
    },
}

impl ServerMessage {
    /// Creates a logged-in response.
    pub fn logged_in(player: PlayerId) -> Self {
        Self::LoggedIn {
            protocol_version: ProtocolVersion::CURRENT,
            player,
        }
    }

    /// Creates a rejected response.
    pub fn rejected(reason: &str) -> Self {
        Self::Rejected {
            reason: reason.to_string(),
            protocol_version: ProtocolVersion::CURRENT,
        }
    }

    /// Creates a plain acknowledgement.
    pub fn ack(message: &str) -> Self {
        Self::Ack {
            message: message.to_string(),
        }
    }

    /// Creates a session list response.
    pub fn session_list(sessions: Vec<SessionView>) -> Self {
        Self::SessionList { sessions }
    }

    /// Creates a session-created response.
    pub fn session_created(session: SessionView) -> Self {
        Self::SessionCreated {
            session: Box::new(session),
        }
    }

    /// Creates a session-joined response.
    pub fn session_joined(session: SessionView) -> Self {
        Self::SessionJoined {
            session: Box::new(session),
        }
    }

    /// Creates a session-closed notification.
    pub fn session_closed_by_host(session: SessionName) -> Self {
        Self::SessionClosedByHost { session }
    }

    /// Creates a structured error response.
    pub fn error(code: &str, message: &str) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_serialization() {
        let msg = ClientMessage::join_session("Arena");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"join_session\""));
        assert!(json.contains("\"name\":\"Arena\""));
    }

    #[test]
    fn test_server_message_serialization() {
        let msg = ServerMessage::session_closed_by_host(SessionName::new("Arena"));
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"session_closed_by_host\""));
        assert!(json.contains("\"session\":\"Arena\""));
    }

    #[test]
    fn test_error_message_carries_code() {
        let msg = ServerMessage::error("session_full", "session is full: Arena (2 players)");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"code\":\"session_full\""));
    }

    #[test]
    fn test_message_roundtrip() {
        let original = ClientMessage::create_session("Arena", "highlands", 4);
        let json = serde_json::to_string(&original).unwrap();
        let parsed: ClientMessage = serde_json::from_str(&json).unwrap();

        match parsed.request {
            Request::CreateSession {
                name,
                map_selection,
                capacity,
            } => {
                assert_eq!(name.as_str(), "Arena");
                assert_eq!(map_selection, "highlands");
                assert_eq!(capacity, 4);
            }
            _ => panic!("Expected CreateSession request"),
        }
    }

    #[test]
    fn test_unknown_request_kind_fails_parse() {
        let json = r#"{"protocol_version":{"major":1,"minor":0},"type":"launch_missiles"}"#;
        assert!(serde_json::from_str::<ClientMessage>(json).is_err());
    }

    #[test]
    fn test_login_roundtrip_preserves_version() {
        let msg = ClientMessage::login("Alice");
        let json = serde_json::to_string(&msg).unwrap();
        let parsed: ClientMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.protocol_version, ProtocolVersion::CURRENT);
        match parsed.request {
            Request::Login { player } => assert_eq!(player.as_str(), "Alice"),
            _ => panic!("Expected Login request"),
        }
    }
}
