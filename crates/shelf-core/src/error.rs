//! Error types for shelf-core

use std::path::PathBuf;

use shelf_schema::ContentCategory;
use shelf_store::TableRef;

use crate::destination::DestinationError;
use crate::source::SourceError;

/// Result type for shelf-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a reconciliation batch or a sync run.
///
/// Per-item failures (one template, one batch of records, one delete) are
/// never raised as errors; they are accumulated in the outcome instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bootstrapping did not resolve the subject id column
    #[error("Field binding for {table} has no subject id column")]
    SubjectFieldUnresolved { table: TableRef },

    /// Stored binding belongs to another category
    #[error("Binding for {table} is for {bound} content, but the run targets {requested}")]
    CategoryMismatch {
        table: TableRef,
        bound: ContentCategory,
        requested: ContentCategory,
    },

    /// Guard against unbounded fan-out of column mutations
    #[error("Too many field templates: {requested} requested, at most {max} per batch")]
    BatchLimitExceeded { requested: usize, max: usize },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Configuration not found at {path}")]
    ConfigNotFound { path: PathBuf },

    /// Paging through destination records failed
    #[error("Failed to index destination {table}: {source}")]
    Indexing {
        table: TableRef,
        #[source]
        source: DestinationError,
    },

    #[error(transparent)]
    Destination(#[from] DestinationError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Schema(#[from] shelf_schema::Error),

    #[error(transparent)]
    Store(#[from] shelf_store::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),
}

impl Error {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Configuration errors are surfaced verbatim and never retried.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::SubjectFieldUnresolved { .. }
                | Error::CategoryMismatch { .. }
                | Error::BatchLimitExceeded { .. }
                | Error::InvalidConfig { .. }
                | Error::ConfigNotFound { .. }
                | Error::Schema(_)
                | Error::Store(shelf_store::Error::InvalidBinding { .. })
        )
    }
}
