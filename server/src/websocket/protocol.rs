//! WebSocket message protocol definitions.
//!
//! All messages are JSON-encoded and use snake_case for field names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stockroom_engine::{Intent, InventoryItem, Outcome};
use std::sync::Arc;

use crate::handlers::ItemView;

/// Messages sent from client to server.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Apply a user intent (add, increment, decrement, delete).
    Intent {
        intent: Intent,
        /// Request ID for correlating responses
        #[serde(default)]
        request_id: Option<String>,
    },

    /// The search box changed. Applies to this connection only.
    Search { query: String },

    /// Re-read the inventory from the store.
    Refresh {
        #[serde(default)]
        request_id: Option<String>,
    },

    /// Keep-alive ping.
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The inventory as this connection should display it.
    Inventory {
        /// Items matching the connection's search query, best first
        items: Vec<ItemView>,
        /// The query the items were filtered by
        query: String,
        /// Size of the unfiltered inventory
        total: usize,
        /// When this view was produced
        generated_at: DateTime<Utc>,
    },

    /// Result of an intent.
    Outcome {
        outcome: Outcome,
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },

    /// Response to ping.
    Pong,

    /// Error message.
    Error {
        /// Error description
        message: String,
        /// Request ID from the original request (if applicable)
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },
}

impl ServerMessage {
    /// Create an error message.
    pub fn error(message: impl Into<String>, request_id: Option<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
            request_id,
        }
    }

    /// Build the inventory view of `items` filtered by `query`.
    pub fn inventory(items: &[InventoryItem], query: &str) -> Self {
        ServerMessage::Inventory {
            items: stockroom_engine::search(items, query)
                .iter()
                .map(ItemView::from)
                .collect(),
            query: query.to_string(),
            total: items.len(),
            generated_at: Utc::now(),
        }
    }
}

/// What the connection manager pushes to each connection.
///
/// Snapshots are shared and filtered per connection before being sent.
#[derive(Debug, Clone)]
pub enum Outbound {
    /// A fresh inventory snapshot from the synchronizer.
    Snapshot(Arc<Vec<InventoryItem>>),
    /// A message sent as is.
    Message(ServerMessage),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_message_deserialization() {
        let json = r#"{"type": "intent", "intent": {"type": "add", "name": "apple", "quantity": "2"}, "request_id": "r1"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::Intent { intent, request_id } => {
                assert_eq!(intent, Intent::add("apple", Some("2")));
                assert_eq!(request_id, Some("r1".to_string()));
            }
            _ => panic!("Expected Intent message"),
        }

        let json = r#"{"type": "search", "query": "aple"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, ClientMessage::Search { query } if query == "aple"));

        let json = r#"{"type": "refresh"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, ClientMessage::Refresh { request_id: None }));

        let json = r#"{"type": "ping"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));
    }

    #[test]
    fn test_server_message_serialization() {
        let msg = ServerMessage::Pong;
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"pong"}"#);

        let msg = ServerMessage::error("test error", Some("req-1".to_string()));
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"error""#));
        assert!(json.contains(r#""message":"test error""#));
        assert!(json.contains(r#""request_id":"req-1""#));
    }

    #[test]
    fn test_inventory_message_is_filtered() {
        let items = vec![InventoryItem::new("apple", 1), InventoryItem::new("banana", 0)];

        let value = serde_json::to_value(ServerMessage::inventory(&items, "aple")).unwrap();
        assert_eq!(value["type"], "inventory");
        assert_eq!(value["total"], 2);
        assert_eq!(value["query"], "aple");
        assert_eq!(
            value["items"],
            json!([{"name": "apple", "displayName": "Apple", "quantity": 1, "canDecrement": true}])
        );

        let value = serde_json::to_value(ServerMessage::inventory(&items, "")).unwrap();
        assert_eq!(value["items"][1]["canDecrement"], false);
    }
}
