//! Error types for the registration proxy.

use registration_store::StoreError;
use thiserror::Error;

/// Errors raised synchronously by the proxy before any background work.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Environment error: {detail}")]
    Environment {
        detail: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Failures of the messaging backend.
///
/// These are never returned from the proxy entry point; they are delivered
/// through the registration callback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Backend API error: {status} - {body}")]
    Api { status: u16, body: String },

    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),
}

impl From<config::ConfigError> for ProxyError {
    fn from(e: config::ConfigError) -> Self {
        ProxyError::Configuration(e.to_string())
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        BackendError::Http(e.to_string())
    }
}
