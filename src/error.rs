//! Error handling for table loading operations.
//!
//! Separates fatal lookup and parse failures, which are returned to the
//! caller, from collaborator failures ([`ServiceError`]), which the loader
//! catches and reports as a failed outcome.

use thiserror::Error;

/// Failure reported by an external collaborator (file store, warehouse or
/// statistics API).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{service} service error: {message}")]
pub struct ServiceError {
    pub service: String,
    pub message: String,
}

impl ServiceError {
    pub fn new(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Error raised by a file-storage backend
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new("storage", message)
    }

    /// Error raised by a warehouse backend
    pub fn warehouse(message: impl Into<String>) -> Self {
        Self::new("warehouse", message)
    }

    /// Error raised by the statistics HTTP API
    pub fn statistics(message: impl Into<String>) -> Self {
        Self::new("statistics", message)
    }
}

#[derive(Error, Debug)]
pub enum TabloadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("'{name}' not found in folder '{folder_id}'")]
    NotFound { name: String, folder_id: String },

    #[error("Failed to parse {source_name}: {reason}")]
    Parse { source_name: String, reason: String },

    #[error("Entry '{entry_id}' is missing attribute '{attribute}'")]
    Lookup { entry_id: String, attribute: String },

    #[error("Folder traversal exceeded max depth {max_depth} at folder '{folder_id}'")]
    TraversalLimit { folder_id: String, max_depth: usize },

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl TabloadError {
    pub fn parse(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TabloadError>;
