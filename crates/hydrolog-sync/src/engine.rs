//! The push/pull synchronization engine.
//!
//! One engine per device replica, holding the shared record store and a
//! transport. Scheduling is the caller's job (background timer,
//! connectivity-regained trigger); the engine only guarantees the protocol
//! semantics: at-least-once push with per-record independence, and a pull
//! cursor that advances only after the whole response has been merged.

use std::sync::Arc;

use tracing::{debug, info, warn};

use hydrolog_store::{RecordStore, Result as StoreResult};
use hydrolog_types::SensorReading;

use crate::cursor::SyncCursor;
use crate::error::Result;
use crate::transport::{PushOutcome, ReadingTransport};
use crate::wire::ReadingUpload;

/// Outcome of one push pass over the outbox.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushReport {
    /// Records the remote stored as sent.
    pub pushed: usize,
    /// Records the remote folded into an existing row (uniqueness
    /// constraint); completed from the client's point of view.
    pub folded: usize,
    /// Records still queued after the pass.
    pub remaining: usize,
    /// Whether a transport failure cut the pass short. Queued records are
    /// untouched and eligible for the next attempt.
    pub interrupted: bool,
}

/// Outcome of one pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullReport {
    /// Readings merged into the local store.
    pub fetched: usize,
    /// The cursor to persist; already advanced past the merged window.
    pub cursor: SyncCursor,
}

/// Outcome of a full sync cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub push: PushReport,
    pub pulled: usize,
    pub cursor: SyncCursor,
}

/// Bidirectional synchronizer for the readings collection.
pub struct SyncEngine<S, T> {
    store: Arc<S>,
    transport: T,
}

impl<S, T> SyncEngine<S, T>
where
    S: RecordStore<SensorReading>,
    T: ReadingTransport,
{
    /// Create an engine over a shared store and a transport.
    pub fn new(store: Arc<S>, transport: T) -> Self {
        Self { store, transport }
    }

    /// Push every queued local record, oldest first.
    ///
    /// Each push is independent: a failure on record B does not roll back
    /// an already-accepted record A, and B simply stays queued. A transport
    /// failure ends the pass early (the remote is unreachable anyway);
    /// store failures propagate.
    pub async fn push_pending(&self) -> Result<PushReport> {
        let pending = self.store.pending_push().await?;
        let total = pending.len();
        let mut report = PushReport::default();

        for reading in pending {
            let upload = ReadingUpload::from_reading(&reading);
            match self.transport.push(&upload).await {
                Ok(PushOutcome::Accepted) => {
                    self.store.mark_pushed(&reading.id).await?;
                    report.pushed += 1;
                }
                Ok(PushOutcome::Folded) => {
                    warn!(id = %reading.id, "remote folded push into an existing row");
                    self.store.mark_pushed(&reading.id).await?;
                    report.folded += 1;
                }
                Err(error) => {
                    warn!(id = %reading.id, %error, "push failed; record stays queued");
                    report.interrupted = true;
                    break;
                }
            }
        }

        report.remaining = total - report.pushed - report.folded;
        Ok(report)
    }

    /// Pull the window after `cursor` and merge it into the store.
    ///
    /// The returned cursor is advanced only when every reading in the
    /// response merged successfully; on any failure the caller keeps its
    /// cursor and the retry re-requests the same window, which is safe
    /// because pull is idempotent for a fixed cursor value.
    pub async fn pull(&self, cursor: SyncCursor, limit: u32) -> Result<PullReport> {
        let response = self.transport.pull(cursor.window_start(), limit).await?;
        let fetched = response.readings.len();

        for server_reading in response.readings {
            let reading = server_reading.into_reading()?;
            self.store.merge_remote(reading).await?;
        }

        debug!(fetched, server_timestamp = response.server_timestamp, "pull merged");
        Ok(PullReport {
            fetched,
            cursor: cursor.advanced(response.server_timestamp),
        })
    }

    /// Run one full cycle: push the outbox, then pull from the persisted
    /// cursor and persist the advanced cursor.
    ///
    /// A push interruption is logged and does not block the pull. A pull
    /// failure propagates with the cursor untouched; the interrupted cycle
    /// is a recoverable state and the next run retries cleanly.
    pub async fn run_cycle(&self, limit: u32) -> Result<CycleReport> {
        let push = self.push_pending().await?;

        let cursor = SyncCursor::from_ms(self.store.load_cursor().await?);
        let pull = self.pull(cursor, limit).await?;
        if let Some(last_pulled_at) = pull.cursor.last_pulled_at {
            self.store.save_cursor(last_pulled_at).await?;
        }

        info!(
            pushed = push.pushed,
            folded = push.folded,
            remaining = push.remaining,
            pulled = pull.fetched,
            "sync cycle complete"
        );
        Ok(CycleReport {
            push,
            pulled: pull.fetched,
            cursor: pull.cursor,
        })
    }

    /// The persisted cursor, for callers that surface sync status.
    pub async fn current_cursor(&self) -> StoreResult<SyncCursor> {
        Ok(SyncCursor::from_ms(self.store.load_cursor().await?))
    }
}
