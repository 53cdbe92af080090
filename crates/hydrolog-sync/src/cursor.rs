//! The pull cursor value object.

/// Marker for "everything the remote observed after this point".
///
/// The timestamp is server-issued, never the client clock. The cursor is
/// passed into and returned from pull explicitly, so the protocol stays
/// testable without process-wide state; persistence lives in the record
/// store and the engine only writes it back after a fully merged pull.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncCursor {
    /// Server timestamp of the last successfully merged pull, if any.
    pub last_pulled_at: Option<i64>,
}

impl SyncCursor {
    /// The cursor of a replica that has never pulled.
    #[must_use]
    pub fn initial() -> Self {
        Self::default()
    }

    /// Rehydrate from the persisted value.
    #[must_use]
    pub fn from_ms(last_pulled_at: Option<i64>) -> Self {
        Self { last_pulled_at }
    }

    /// The window parameter sent to the remote; a never-pulled replica
    /// requests from the epoch.
    #[must_use]
    pub fn window_start(&self) -> i64 {
        self.last_pulled_at.unwrap_or(0)
    }

    /// The cursor to persist after merging a pull that returned
    /// `server_timestamp`.
    #[must_use]
    pub fn advanced(&self, server_timestamp: i64) -> Self {
        Self {
            last_pulled_at: Some(server_timestamp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_cursor_requests_from_epoch() {
        let cursor = SyncCursor::initial();
        assert_eq!(cursor.window_start(), 0);
        assert_eq!(cursor.last_pulled_at, None);
    }

    #[test]
    fn test_advance_is_pure() {
        let cursor = SyncCursor::initial();
        let advanced = cursor.advanced(9_000);

        // The original is untouched; a failed merge can keep using it.
        assert_eq!(cursor.last_pulled_at, None);
        assert_eq!(advanced.last_pulled_at, Some(9_000));
        assert_eq!(advanced.window_start(), 9_000);
    }
}
