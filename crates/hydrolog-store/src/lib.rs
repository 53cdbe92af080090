//! Local record store and reactive query cache for hydrolog readings.
//!
//! This crate is the offline-first persistence layer: a generic, per-entity
//! record collection behind an async contract, so the backing engine
//! (in-memory or SQLite) is swappable without changing call sites. On top of
//! it sits a small cache keyed by operation + parameters that gives UI
//! consumers read-after-write consistency without polling.
//!
//! # Features
//!
//! - Create/find/update with store-owned ids and bookkeeping timestamps
//! - Conjunctive filter DSL (equality, membership, negation, range, LIKE)
//!   with a single sort key and a result-size cap
//! - Derived quality flags kept in lockstep with the measurement fields
//! - Implicit push outbox and sync-cursor persistence for the sync engine
//! - Cached, invalidation-aware query surface for UI screens
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use hydrolog_store::{MemoryStore, ReadingService, NewReading};
//! use hydrolog_types::SensorReading;
//!
//! # async fn example() -> hydrolog_store::Result<()> {
//! let store = Arc::new(MemoryStore::<SensorReading>::new());
//! let readings = ReadingService::new(store);
//!
//! let created = readings
//!     .create(NewReading {
//!         ph: 5.9,
//!         ec_raw: 1.8,
//!         temp_c: 21.5,
//!         atc_on: true,
//!         ppm_scale: "500".to_string(),
//!         reservoir_id: Some("res-1".to_string()),
//!         ..Default::default()
//!     })
//!     .await?;
//!
//! let found = readings.get(&created.id).await?;
//! assert_eq!(found.ph, 5.9);
//! # Ok(())
//! # }
//! ```

mod cache;
mod error;
mod memory;
mod query;
mod record;
mod sqlite;
mod store;
mod surface;

pub use cache::QueryCache;
pub use error::{Error, Result};
pub use memory::MemoryStore;
pub use query::{Query, QueryHandle, SortDirection};
pub use record::{READINGS_COLLECTION, Record};
pub use sqlite::SqliteStore;
pub use store::{RecordStore, RecordStoreExt};
pub use surface::{NewReading, ReadingListFilter, ReadingPatch, ReadingService};

/// Default database path following platform conventions.
///
/// - Linux: `~/.local/share/hydrolog/data.db`
/// - macOS: `~/Library/Application Support/hydrolog/data.db`
/// - Windows: `C:\Users\<user>\AppData\Local\hydrolog\data.db`
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("hydrolog")
        .join("data.db")
}
