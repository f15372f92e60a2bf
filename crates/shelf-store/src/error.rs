//! Error types for shelf-store

use std::path::PathBuf;

/// Result type for shelf-store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading or writing field bindings
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse binding file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Lock acquisition failed for {path}")]
    LockFailed { path: PathBuf },

    /// Binding rejected before persistence
    #[error("Invalid field binding: {message}")]
    InvalidBinding { message: String },

    /// Schema vocabulary error while decoding a persisted binding
    #[error(transparent)]
    Schema(#[from] shelf_schema::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Backend-specific failure not covered above
    #[error("Binding backend error: {0}")]
    Backend(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidBinding {
            message: message.into(),
        }
    }
}
