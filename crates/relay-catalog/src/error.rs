//! Error types for relay-catalog

use thiserror::Error;

/// Failure while fetching a tenant's product API
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Product API not configured: {0}")]
    Configuration(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Product API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse product data: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        CatalogError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Parse(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, CatalogError>;
