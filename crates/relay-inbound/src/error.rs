//! Error types for relay-inbound

use thiserror::Error;

/// relay-inbound error type
#[derive(Error, Debug)]
pub enum InboundError {
    /// Payload without the structure the provider always sends
    #[error("Malformed {provider} payload: {message}")]
    Malformed {
        provider: &'static str,
        message: String,
    },

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Store error: {0}")]
    Store(#[from] relay_core::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, InboundError>;
