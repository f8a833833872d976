//! Error types for the IRR gateway
//!
//! Registry-level rejections (authentication, authorisation, partial
//! failures, ...) are not errors of this system: they are classified
//! outcomes, see [`crate::classifier::OutcomeKind`]. The variants below
//! cover failures of the gateway itself.

use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the IRR gateway
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed caller input, raised before any subprocess runs
    #[error("Validation error: {0}")]
    Validation(String),

    /// Server alias not present in the configured alias table
    #[error("Invalid server: {0}")]
    InvalidServer(String),

    /// Requested object or file does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Subprocess, filesystem or network failure while talking to a registry
    #[error("Transport error: {0}")]
    Transport(String),

    /// Object record store errors
    #[error("Object store error: {0}")]
    Store(String),

    /// Audit log errors
    #[error("Audit log error: {0}")]
    Audit(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an invalid server error
    pub fn invalid_server(alias: impl Into<String>) -> Self {
        Self::InvalidServer(alias.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create an object store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create an audit log error
    pub fn audit(msg: impl Into<String>) -> Self {
        Self::Audit(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Stable machine-readable name of the error, surfaced to HTTP callers
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation_error",
            Error::InvalidServer(_) => "invalid_server",
            Error::NotFound(_) => "not_found",
            Error::Transport(_) => "transport_error",
            Error::Store(_) => "store_error",
            Error::Audit(_) => "audit_error",
            Error::Config(_) => "config_error",
            Error::Io(_) => "io_error",
            Error::Json(_) => "json_error",
            Error::Other(_) => "internal_error",
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
