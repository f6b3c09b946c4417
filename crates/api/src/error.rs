//! API error types and handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use chatdesk_shared::StoreError;

use crate::lifecycle::LifecycleError;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // Resource errors
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Resource already exists: {0}")]
    Conflict(String),

    // Business conditions
    #[error("No agents available")]
    NoAgentAvailable,

    // Validation errors
    #[error("Invalid request: {0}")]
    BadRequest(String),

    // Internal errors
    #[error("Database error: {0}")]
    Database(String),
    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            // Retryable business condition, not a fault: the client should
            // offer "try again", so it gets a distinct status.
            ApiError::NoAgentAvailable => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            // Never leak database internals to the client.
            ApiError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            ),
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = Json(json!({ "error": message }));

        (status, body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => ApiError::NotFound(what),
            StoreError::Conflict(what) => ApiError::Conflict(what),
            StoreError::Database(msg) => {
                tracing::error!(error = %msg, "Store failure");
                ApiError::Database(msg)
            }
        }
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::SessionNotFound(code) => {
                ApiError::NotFound(format!("session {}", code))
            }
            LifecycleError::AgentNotFound(id) => ApiError::NotFound(format!("agent {}", id)),
            LifecycleError::NoAgentAvailable => ApiError::NoAgentAvailable,
            LifecycleError::Validation(msg) => ApiError::BadRequest(msg),
            LifecycleError::Store(err) => err.into(),
        }
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
