//! Unified error handling for the server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use stockroom_engine::Error as EngineError;

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Invalid request: {0}")]
    BadRequest(String),
}

/// Error response body.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl AppError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Engine(e) => match e {
                EngineError::Validation(_) => StatusCode::BAD_REQUEST,
                EngineError::InvalidDocument { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                EngineError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                EngineError::StoreWriteRejected { .. } => StatusCode::BAD_GATEWAY,
            },
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_message, details) = match &self {
            AppError::Engine(e @ EngineError::Validation(msg)) => {
                tracing::debug!("Rejected request: {}", e);
                (msg.clone(), None)
            }
            AppError::Engine(e @ EngineError::InvalidDocument { .. }) => {
                tracing::error!("Corrupt inventory document: {:?}", e);
                ("Corrupt inventory document".to_string(), Some(e.to_string()))
            }
            AppError::Engine(e) => {
                tracing::error!("Store error: {:?}", e);
                ("Store error".to_string(), Some(e.to_string()))
            }
            AppError::BadRequest(msg) => (msg.clone(), None),
        };

        let body = Json(ErrorResponse {
            error: error_message,
            details,
        });

        (status, body).into_response()
    }
}

/// Result type alias for handlers.
pub type Result<T> = std::result::Result<T, AppError>;
