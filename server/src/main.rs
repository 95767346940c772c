//! Stockroom Server - live inventory over HTTP and WebSocket.
//!
//! This server keeps one inventory snapshot per process, backed by PostgreSQL
//! through the stockroom-engine synchronizer, and pushes every refreshed
//! snapshot to connected WebSocket clients.

mod config;
mod db;
mod error;
mod handlers;
mod routes;
mod websocket;

use crate::config::Config;
use crate::websocket::ConnectionManager;
use axum::Router;
use std::sync::Arc;
use stockroom_engine::Synchronizer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub sync: Arc<Synchronizer>,
    pub config: Arc<Config>,
    pub conn_manager: Arc<ConnectionManager>,
}

impl AppState {
    /// Wire a synchronizer to a fresh connection manager.
    ///
    /// Every refreshed snapshot is broadcast to all WebSocket connections.
    pub fn new(sync: Arc<Synchronizer>, config: Config) -> Self {
        let conn_manager = ConnectionManager::new_shared();

        let broadcaster = Arc::clone(&conn_manager);
        sync.subscribe(move |items| {
            broadcaster.broadcast_snapshot(items);
        });

        Self {
            sync,
            config: Arc::new(config),
            conn_manager,
        }
    }
}

/// Build the application router with its middleware.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "stockroom_server=debug,stockroom_engine=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!(
        "Starting Stockroom Server on {}:{}",
        config.host,
        config.port
    );

    // Create database pool
    let pool = db::create_pool(&config.database_url, config.max_connections).await?;

    // Run migrations
    tracing::info!("Running database migrations...");
    db::run_migrations(&pool).await?;

    let sync = Synchronizer::new_shared(
        Arc::new(db::PgGateway::new(pool)),
        config.collection.clone(),
    );
    let state = AppState::new(sync, config.clone());

    // Load the initial snapshot; a failure leaves it empty until the next refresh
    match state.sync.refresh().await {
        Ok(items) => tracing::info!(items = items.len(), "Initial inventory loaded"),
        Err(e) => tracing::warn!("Initial inventory load failed: {}", e),
    }

    let app = build_router(state);

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
