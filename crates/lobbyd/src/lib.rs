//! lobbyd - Game-lobby coordinator daemon
//!
//! This crate provides the core infrastructure for the lobby daemon:
//! - `coordinator` - State-owning actor tracking sessions and connected players
//! - `server` - TCP server handing each game client its own connection task
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     lobbyd daemon                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌─────────────────┐     ┌─────────────────────────────┐   │
//! │  │   LobbyServer   │────▶│     CoordinatorActor        │   │
//! │  │  (TCP listener) │     │ (sessions + players owner)  │   │
//! │  └────────┬────────┘     └──────────────┬──────────────┘   │
//! │           │                             │                   │
//! │           │ connections                 │ notices           │
//! │           ▼                             ▼                   │
//! │  ┌─────────────────┐     ┌─────────────────────────────┐   │
//! │  │ConnectionHandler│◀────│   per-player mailboxes      │   │
//! │  │  (per client)   │     │   (unbounded mpsc, FIFO)    │   │
//! │  └─────────────────┘     └─────────────────────────────┘   │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The coordinator actor is the single owner of both shared maps
//! (sessions by name, players by identity) and processes commands
//! sequentially, so every lifecycle operation is one atomic transaction
//! across both maps. Connection handlers talk to it through a
//! cheap-to-clone [`coordinator::CoordinatorHandle`] and drain their
//! player's mailbox to the socket.
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

pub mod coordinator;
pub mod server;
