//! Error types for the permission resolution engine

use std::sync::Arc;
use thiserror::Error;

/// Permission resolution errors
///
/// Cloneable so one failed build can be reported to every caller waiting on it.
#[derive(Debug, Clone, Error)]
pub enum AuthzError {
    /// Resource name does not have exactly three colon-delimited parts
    #[error("Improperly formatted resource name: {0}")]
    MalformedResourceName(String),

    /// Resource id segment has no `/` separating type and id
    #[error("Improperly formatted resource ID: {0}")]
    MalformedResourceId(String),

    /// Role source error
    #[error("Role source error: {0}")]
    Store(String),

    /// Database error
    #[cfg(feature = "postgres")]
    #[error("Database error: {0}")]
    Database(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[source] Arc<std::io::Error>),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[source] Arc<serde_json::Error>),
}

impl From<std::io::Error> for AuthzError {
    fn from(e: std::io::Error) -> Self {
        AuthzError::Io(Arc::new(e))
    }
}

impl From<serde_json::Error> for AuthzError {
    fn from(e: serde_json::Error) -> Self {
        AuthzError::Json(Arc::new(e))
    }
}

/// Result type for permission resolution operations
pub type Result<T> = std::result::Result<T, AuthzError>;
