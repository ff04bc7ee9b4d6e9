//! Error types for relay-whatsapp

use relay_core::ProviderKind;
use thiserror::Error;

/// relay-whatsapp error type
#[derive(Error, Debug)]
pub enum WhatsAppError {
    /// Missing or blank credentials; raised before any network call
    #[error("{provider} is not configured: {message}")]
    Configuration {
        provider: ProviderKind,
        message: String,
    },

    /// Transport failure, non-2xx status or malformed response
    #[error("{provider} API error (status {status:?}): {raw_body}")]
    Provider {
        provider: ProviderKind,
        status: Option<u16>,
        raw_body: String,
    },

    #[error("Store error: {0}")]
    Store(#[from] relay_core::Error),
}

impl WhatsAppError {
    pub fn configuration(provider: ProviderKind, message: impl Into<String>) -> Self {
        WhatsAppError::Configuration {
            provider,
            message: message.into(),
        }
    }

    pub(crate) fn transport(provider: ProviderKind, err: reqwest::Error) -> Self {
        WhatsAppError::Provider {
            provider,
            status: err.status().map(|s| s.as_u16()),
            raw_body: err.to_string(),
        }
    }

    /// HTTP status reported by the provider, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            WhatsAppError::Provider { status, .. } => *status,
            _ => None,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, WhatsAppError>;
