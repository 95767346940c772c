//! WebSocket handler for live inventory.
//!
//! Each connection keeps its own search text. Snapshots pushed by the
//! connection manager are filtered with it just before they go out.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use stockroom_engine::Synchronizer;
use tokio::sync::{mpsc, watch};

use crate::websocket::{ClientMessage, ConnectionManager, Outbound, ServerMessage};

/// Handle an established WebSocket connection.
///
/// This function:
/// 1. Registers the connection with the manager
/// 2. Spawns a task that filters and forwards outgoing messages
/// 3. Sends the current inventory
/// 4. Processes incoming messages in a loop
/// 5. Cleans up on disconnect
pub async fn handle_websocket_connection(
    socket: WebSocket,
    sync: Arc<Synchronizer>,
    conn_manager: Arc<ConnectionManager>,
) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();
    let (query_tx, query_rx) = watch::channel(String::new());

    let conn_id = conn_manager.register(tx);

    tracing::info!(conn_id = %conn_id, "WebSocket client connected");

    // Forward messages from the channel to the socket
    let send_task = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            let msg = render(outbound, &query_rx);
            match serde_json::to_string(&msg) {
                Ok(text) => {
                    if let Err(e) = ws_sender.send(Message::Text(text.into())).await {
                        tracing::warn!("Failed to send WebSocket message: {}", e);
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to serialize WebSocket message: {}", e);
                }
            }
        }
    });

    conn_manager.send_outbound(&conn_id, Outbound::Snapshot(Arc::new(sync.items())));

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if let Some(reply) = process_message(&text, &sync, &query_tx).await {
                    conn_manager.send_outbound(&conn_id, reply);
                }
            }
            Ok(Message::Binary(_)) => {
                tracing::warn!("Binary messages not supported");
            }
            Ok(Message::Ping(data)) => {
                tracing::trace!("Received ping: {} bytes", data.len());
            }
            Ok(Message::Pong(_)) => {
                tracing::trace!("Received pong");
            }
            Ok(Message::Close(_)) => {
                tracing::info!(conn_id = %conn_id, "WebSocket close frame received");
                break;
            }
            Err(e) => {
                tracing::warn!(conn_id = %conn_id, "WebSocket error: {}", e);
                break;
            }
        }
    }

    conn_manager.unregister(&conn_id);
    send_task.abort();

    tracing::info!(
        conn_id = %conn_id,
        active_connections = conn_manager.connection_count(),
        "WebSocket client disconnected"
    );
}

/// Turn an outbound item into the message this connection should see.
fn render(outbound: Outbound, query: &watch::Receiver<String>) -> ServerMessage {
    match outbound {
        Outbound::Snapshot(items) => {
            let query = query.borrow().clone();
            ServerMessage::inventory(&items, &query)
        }
        Outbound::Message(msg) => msg,
    }
}

/// Process a client message and return the reply, if any.
async fn process_message(
    text: &str,
    sync: &Synchronizer,
    query_tx: &watch::Sender<String>,
) -> Option<Outbound> {
    let client_msg: ClientMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            return Some(Outbound::Message(ServerMessage::error(
                format!("Invalid message format: {}", e),
                None,
            )));
        }
    };

    match client_msg {
        ClientMessage::Intent { intent, request_id } => {
            // The refreshed inventory reaches every connection through the
            // synchronizer subscription; only the outcome is answered here.
            let msg = match sync.dispatch(intent).await {
                Ok(outcome) => ServerMessage::Outcome {
                    outcome,
                    request_id,
                },
                Err(e) => ServerMessage::error(e.to_string(), request_id),
            };
            Some(Outbound::Message(msg))
        }

        ClientMessage::Search { query } => {
            tracing::debug!(query = %query, "Search text changed");
            query_tx.send_replace(query);
            Some(Outbound::Snapshot(Arc::new(sync.items())))
        }

        ClientMessage::Refresh { request_id } => match sync.refresh().await {
            Ok(_) => None,
            Err(e) => Some(Outbound::Message(ServerMessage::error(
                e.to_string(),
                request_id,
            ))),
        },

        ClientMessage::Ping => Some(Outbound::Message(ServerMessage::Pong)),
    }
}
