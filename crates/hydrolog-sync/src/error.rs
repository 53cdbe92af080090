//! Error types for hydrolog-sync.

use thiserror::Error;

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors that can occur while synchronizing with the remote authority.
///
/// A remote uniqueness fold is deliberately NOT an error: the transport
/// reports it as [`PushOutcome::Folded`](crate::PushOutcome::Folded) and the
/// engine treats it as a completed push.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Base URL missing an http/https scheme.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Transport-level failure; local state is left untouched and the next
    /// cycle retries cleanly.
    #[error("Remote not reachable at {url}: {source}")]
    Connectivity {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// HTTP request failed after reaching the remote.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Local store failure during merge or outbox bookkeeping.
    #[error(transparent)]
    Store(#[from] hydrolog_store::Error),

    /// Wire data failed domain validation (e.g. unknown ppm scale).
    #[error(transparent)]
    Validation(#[from] hydrolog_types::ValidationError),
}
