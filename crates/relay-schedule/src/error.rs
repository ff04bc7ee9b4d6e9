//! Error types for relay-schedule

use thiserror::Error;

/// relay-schedule error type
#[derive(Error, Debug)]
pub enum ScheduleError {
    /// Malformed lifecycle event, rejected before anything is armed
    #[error("Invalid event: {0}")]
    Validation(String),

    #[error("Unknown event type: {0}")]
    UnknownEvent(String),

    #[error("Tenant not found: {0}")]
    TenantNotFound(String),

    #[error("Core error: {0}")]
    Core(#[from] relay_core::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ScheduleError>;
