//! Lobby Core - Shared domain types for the lobby coordinator
//!
//! This crate provides the core domain types shared between the
//! coordinator daemon (lobbyd) and the wire protocol (lobby-protocol):
//! sessions, participants, player identities, and the business-rule
//! error type.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod error;
pub mod player;
pub mod session;

// Re-exports for convenience
pub use error::{LobbyError, LobbyResult};
pub use player::{Participant, ParticipantView, PlayerId};
pub use session::{Session, SessionName, SessionView};
