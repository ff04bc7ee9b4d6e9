//! Error types for relay-api

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use relay_schedule::ScheduleError;
use serde_json::json;
use thiserror::Error;

/// relay-api error type, rendered as `{"error": "..."}`
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Tenant not found: {0}")]
    TenantNotFound(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Core error: {0}")]
    Core(#[from] relay_core::Error),
}

impl From<ScheduleError> for ApiError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::Validation(msg) => ApiError::InvalidRequest(msg),
            ScheduleError::UnknownEvent(event) => ApiError::NotFound(format!("unknown event {}", event)),
            ScheduleError::TenantNotFound(id) => ApiError::TenantNotFound(id),
            ScheduleError::Core(e) => ApiError::Core(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::TenantNotFound(_) | ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Core(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ApiError>;
