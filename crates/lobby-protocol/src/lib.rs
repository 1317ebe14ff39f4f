//! Lobby Protocol - Wire protocol for lobbyd client communication
//!
//! This crate provides the message types exchanged between game clients
//! and the lobby coordinator daemon: requests that drive session
//! lifecycle operations, and the acknowledgements, errors, and
//! notifications the daemon sends back.
//!
//! Messages travel as line-delimited JSON; the schema is a closed sum
//! type per direction so unknown message kinds fail at parse time rather
//! than being silently ignored.

pub mod message;
pub mod version;

pub use message::{ClientMessage, Request, ServerMessage};
pub use version::ProtocolVersion;
