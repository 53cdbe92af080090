//! Error types for hydrolog-store.

use std::path::PathBuf;

/// Result type for hydrolog-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in hydrolog-store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Point lookup on an id that is not in the collection.
    ///
    /// The store never synthesizes placeholder records for unknown ids;
    /// callers decide how to react to a miss.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Database error from SQLite.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A collection name unusable as a SQL identifier.
    #[error("Invalid collection name: {0:?}")]
    InvalidCollection(String),

    /// Failed to create database directory.
    #[error("Failed to create database directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Domain validation failure at a store boundary.
    #[error(transparent)]
    Validation(#[from] hydrolog_types::ValidationError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
