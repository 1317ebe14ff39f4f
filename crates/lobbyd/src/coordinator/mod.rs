//! Lobby coordinator using the Actor pattern.
//!
//! The coordinator is the central state manager for all live sessions and
//! connected players. It receives commands via a tokio mpsc channel and is
//! the canonical source of truth for both shared maps.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐     ┌──────────────────┐
//! │ConnectionHandler│────▶│ CoordinatorActor │────▶│ player mailboxes │
//! └─────────────────┘     └──────────────────┘     └──────────────────┘
//!         │                        │                        │
//!         │  CoordinatorCommand    │  Notice                │
//!         │  (mpsc channel)        │  (unbounded mpsc)      │
//!         ▼                        ▼                        ▼
//!    create/join/leave      sessions by name,        each participant's
//!    /update/list           players by identity      connection drains
//! ```
//!
//! Because the actor processes commands one at a time, every lifecycle
//! operation reads and mutates both maps as a single indivisible step:
//! capacity checks, membership changes, and the owning player's
//! `current_session` can never be observed half-applied, and broadcasts
//! read the participant set in the same step that decided it.
//!
//! # Panic-Free Guarantees
//!
//! All operations in this module follow the panic-free policy:
//! - No `.unwrap()` or `.expect()` in production code
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

use tokio::sync::mpsc;

mod actor;
mod commands;
mod handle;

pub use actor::CoordinatorActor;
pub use commands::{CoordinatorCommand, CreateOutcome, LeaveOutcome, Notice};
pub use handle::CoordinatorHandle;

/// Command channel buffer size.
const COMMAND_BUFFER: usize = 100;

/// Spawn the coordinator actor and return a handle for interaction.
///
/// This function:
/// 1. Creates the command channel
/// 2. Spawns the CoordinatorActor on a tokio task
/// 3. Returns a CoordinatorHandle for client use
///
/// Each call builds a fresh, isolated coordinator; tests get their own
/// instance instead of sharing process-wide state.
///
/// # Example
///
/// ```no_run
/// use lobbyd::coordinator::spawn_coordinator;
///
/// #[tokio::main]
/// async fn main() {
///     let handle = spawn_coordinator();
///
///     // Use handle to interact with the lobby
///     let sessions = handle.list_sessions().await;
/// }
/// ```
pub fn spawn_coordinator() -> CoordinatorHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);

    let actor = CoordinatorActor::new(cmd_rx);
    tokio::spawn(actor.run());

    CoordinatorHandle::new(cmd_tx)
}
