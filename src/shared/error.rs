//! Application Error Types
//!
//! Centralized error handling with Axum integration.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Handler error: {0}")]
    Handler(String),

    #[error("Delivery failed for session {session_id}: {reason}")]
    Delivery { session_id: String, reason: String },

    #[error("Server pool error: {0}")]
    Pool(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, 10001, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, 10002, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, 10003, msg.clone()),
            AppError::Handler(msg) => {
                tracing::error!("Handler error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, 10004, msg.clone())
            }
            AppError::Delivery { session_id, reason } => {
                tracing::error!(session_id = %session_id, "Delivery error: {}", reason);
                (StatusCode::INTERNAL_SERVER_ERROR, 10005, reason.clone())
            }
            AppError::Pool(msg) => {
                tracing::error!("Server pool error: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, 10006, msg.clone())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    10000,
                    "Internal server error".into(),
                )
            }
        };

        let body = ErrorResponse { code, message };

        (status, Json(body)).into_response()
    }
}
