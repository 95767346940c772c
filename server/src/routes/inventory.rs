//! Inventory endpoint routes.

use axum::{
    extract::{rejection::JsonRejection, ws::WebSocketUpgrade, Path, Query, State},
    response::Response,
    routing::{delete, get, post},
    Json, Router,
};
use stockroom_engine::Intent;

use crate::error::{AppError, Result};
use crate::handlers::{
    handle_intent, handle_list, handle_refresh, handle_websocket_connection, AddItemRequest,
    ListQuery, ListResponse, MutationResponse,
};
use crate::AppState;

/// Create inventory routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/items", get(list_handler).post(add_handler))
        .route("/items/refresh", post(refresh_handler))
        .route("/items/{name}", delete(delete_handler))
        .route("/items/{name}/increment", post(increment_handler))
        .route("/items/{name}/decrement", post(decrement_handler))
        .route("/ws", get(ws_handler))
}

/// GET /items - List the inventory, optionally filtered by `q`.
async fn list_handler(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<ListResponse> {
    Json(handle_list(&state.sync, query))
}

/// POST /items/refresh - Re-read the inventory from the store.
async fn refresh_handler(State(state): State<AppState>) -> Result<Json<ListResponse>> {
    let response = handle_refresh(&state.sync).await?;
    Ok(Json(response))
}

/// POST /items - Add an item or restock an existing one.
async fn add_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<AddItemRequest>, JsonRejection>,
) -> Result<Json<MutationResponse>> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let response = handle_intent(&state.sync, request.into_intent()).await?;
    Ok(Json(response))
}

/// POST /items/{name}/increment
async fn increment_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<MutationResponse>> {
    let response = handle_intent(&state.sync, Intent::Increment { name }).await?;
    Ok(Json(response))
}

/// POST /items/{name}/decrement
async fn decrement_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<MutationResponse>> {
    let response = handle_intent(&state.sync, Intent::Decrement { name }).await?;
    Ok(Json(response))
}

/// DELETE /items/{name}
async fn delete_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<MutationResponse>> {
    let response = handle_intent(&state.sync, Intent::Delete { name }).await?;
    Ok(Json(response))
}

/// GET /ws - Upgrade to the live inventory channel.
async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| {
        handle_websocket_connection(socket, state.sync, state.conn_manager)
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use stockroom_engine::{MemoryGateway, Synchronizer};
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::{build_router, AppState};

    fn test_config() -> Config {
        Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            database_url: "postgres://unused".to_string(),
            max_connections: 1,
            collection: "inventory".to_string(),
        }
    }

    async fn test_state(seed: Value) -> AppState {
        let documents = seed.as_object().cloned().unwrap_or_default();
        let gateway = MemoryGateway::with_documents("inventory", documents);
        let sync = Synchronizer::new_shared(Arc::new(gateway), "inventory");
        sync.refresh().await.unwrap();
        AppState::new(sync, test_config())
    }

    async fn call(
        state: &AppState,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = build_router(state.clone())
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    #[tokio::test]
    async fn list_and_search() {
        let state = test_state(json!({
            "apple": {"quantity": 2},
            "banana": {"quantity": 0},
        }))
        .await;

        let (status, body) = call(&state, Method::GET, "/items", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        assert_eq!(body["items"][0]["displayName"], "Apple");
        assert_eq!(body["items"][1]["canDecrement"], false);

        let (status, body) = call(&state, Method::GET, "/items?q=aple", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        assert_eq!(body["items"].as_array().unwrap().len(), 1);
        assert_eq!(body["items"][0]["name"], "apple");
    }

    #[tokio::test]
    async fn add_then_decrement_to_removal() {
        let state = test_state(json!({})).await;

        let (status, body) = call(
            &state,
            Method::POST,
            "/items",
            Some(json!({"name": "  pear ", "quantity": "1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"]["kind"], "created");
        assert_eq!(body["outcome"]["item"], json!({"name": "pear", "quantity": 1}));
        assert_eq!(body["items"][0]["name"], "pear");

        let (status, body) = call(&state, Method::POST, "/items/pear/decrement", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], json!({"kind": "removed", "name": "pear"}));
        assert_eq!(body["items"], json!([]));
    }

    #[tokio::test]
    async fn increment_reports_previous_quantity() {
        let state = test_state(json!({"apple": {"quantity": 2}})).await;

        let (status, body) = call(&state, Method::POST, "/items/apple/increment", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"]["kind"], "updated");
        assert_eq!(body["outcome"]["previousQuantity"], 2);
        assert_eq!(body["items"][0]["quantity"], 3);
    }

    #[tokio::test]
    async fn delete_missing_is_not_found_outcome() {
        let state = test_state(json!({"apple": {"quantity": 2}})).await;

        let (status, body) = call(&state, Method::DELETE, "/items/kiwi", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], json!({"kind": "notFound", "name": "kiwi"}));

        let (status, body) = call(&state, Method::DELETE, "/items/apple", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"]["kind"], "removed");
        assert_eq!(state.sync.len(), 0);
    }

    #[tokio::test]
    async fn invalid_add_is_bad_request() {
        let state = test_state(json!({})).await;

        let (status, body) = call(&state, Method::POST, "/items", Some(json!({"name": "   "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, _) = call(
            &state,
            Method::POST,
            "/items",
            Some(json!({"name": "apple", "quantity": "-3"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(&state, Method::POST, "/items", Some(json!({"quantity": 1}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        assert_eq!(state.sync.len(), 0);
    }

    #[tokio::test]
    async fn refresh_skips_malformed_documents() {
        let state = test_state(json!({
            "apple": {"quantity": 2},
            "broken": {"quantity": "many"},
        }))
        .await;

        let (status, body) = call(&state, Method::POST, "/items/refresh", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);
        assert_eq!(body["items"][0]["name"], "apple");
    }

    #[tokio::test]
    async fn health_reports_item_count() {
        let state = test_state(json!({"apple": {"quantity": 2}})).await;

        let (status, body) = call(&state, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["collection"], "inventory");
        assert_eq!(body["items"], 1);
    }

    #[tokio::test]
    async fn end_to_end_over_socket() {
        let state = test_state(json!({})).await;
        let app = build_router(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = reqwest::Client::new();
        let base = format!("http://{addr}");

        let response = client
            .post(format!("{base}/items"))
            .json(&json!({"name": "apple", "quantity": 2}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        let body: Value = client
            .get(format!("{base}/items"))
            .query(&[("q", "appl")])
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["items"][0], json!({
            "name": "apple",
            "displayName": "Apple",
            "quantity": 2,
            "canDecrement": true
        }));

        let banner = client.get(&base).send().await.unwrap().text().await.unwrap();
        assert_eq!(banner, "Stockroom Inventory Server");

        server.abort();
    }
}
