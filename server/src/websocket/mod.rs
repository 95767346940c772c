//! WebSocket support for live inventory updates.
//!
//! Clients connect via WebSocket, send intents and search text, and receive
//! the inventory again whenever anyone's change refreshes it.

mod manager;
mod protocol;

pub use manager::ConnectionManager;
pub use protocol::*;
