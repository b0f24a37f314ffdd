//! Error types shared across the RBAC crates

use thiserror::Error;

/// Result type alias for RBAC operations
pub type Result<T> = std::result::Result<T, RbacError>;

/// Errors raised outside a specific request flow (startup, configuration, serialization)
#[derive(Error, Debug)]
pub enum RbacError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl RbacError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
