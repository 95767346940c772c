//! WebSocket connection manager.
//!
//! Tracks active WebSocket connections and fans inventory snapshots out to
//! them.

use std::sync::Arc;

use dashmap::DashMap;
use stockroom_engine::InventoryItem;
use tokio::sync::mpsc;

use super::Outbound;

/// Sender for WebSocket messages.
pub type MessageSender = mpsc::UnboundedSender<Outbound>;

/// Manages active WebSocket connections.
///
/// Thread-safe and can be shared across handlers via `Arc`.
#[derive(Debug, Default)]
pub struct ConnectionManager {
    /// Outgoing channel of every active connection, keyed by connection ID.
    connections: DashMap<String, MessageSender>,
}

impl ConnectionManager {
    /// Create a new connection manager.
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Create a new connection manager wrapped in Arc for sharing.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a new connection.
    ///
    /// Returns the connection ID.
    pub fn register(&self, sender: MessageSender) -> String {
        let conn_id = uuid::Uuid::new_v4().to_string();

        self.connections.insert(conn_id.clone(), sender);

        tracing::info!(conn_id = %conn_id, "WebSocket connection registered");

        conn_id
    }

    /// Unregister a connection.
    pub fn unregister(&self, conn_id: &str) {
        if self.connections.remove(conn_id).is_some() {
            tracing::info!(conn_id = %conn_id, "WebSocket connection unregistered");
        }
    }

    /// Push a refreshed snapshot to every connection.
    ///
    /// Returns the number of connections that received it.
    pub fn broadcast_snapshot(&self, items: &[InventoryItem]) -> usize {
        let snapshot = Arc::new(items.to_vec());
        let mut sent_count = 0;

        for entry in self.connections.iter() {
            if entry
                .value()
                .send(Outbound::Snapshot(Arc::clone(&snapshot)))
                .is_ok()
            {
                sent_count += 1;
            }
        }

        tracing::debug!(
            recipients = sent_count,
            items = items.len(),
            "Broadcast inventory snapshot"
        );

        sent_count
    }

    /// Queue an outbound item for a specific connection.
    pub fn send_outbound(&self, conn_id: &str, outbound: Outbound) -> bool {
        if let Some(sender) = self.connections.get(conn_id) {
            sender.send(outbound).is_ok()
        } else {
            false
        }
    }

    /// Get the number of active connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}
