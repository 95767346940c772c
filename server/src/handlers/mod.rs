//! Request handlers for inventory operations.

mod inventory;
mod websocket;

pub use inventory::*;
pub use websocket::*;
