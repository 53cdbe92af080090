//! Offline-first synchronization for pH/EC sensor readings.
//!
//! This crate connects a local record store to the remote authority:
//!
//! - [`SyncEngine`] runs the push/pull protocol (at-least-once push of the
//!   local outbox, cursor-windowed pull with merge-then-advance semantics)
//! - [`ReadingTransport`] is the network seam, implemented over HTTP by
//!   [`HttpTransport`] and by in-process fakes in tests
//! - [`wire`] holds the snake_case request/response shapes
//! - [`Config`] carries endpoint and storage settings from a TOML file
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use hydrolog_store::SqliteStore;
//! use hydrolog_sync::{Config, HttpTransport, SyncEngine};
//! use hydrolog_types::SensorReading;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_default()?;
//! let store: Arc<SqliteStore<SensorReading>> =
//!     Arc::new(SqliteStore::open(&config.storage.path)?);
//! let transport = HttpTransport::new(&config.sync.base_url)?;
//!
//! let engine = SyncEngine::new(store, transport);
//! let report = engine.run_cycle(config.sync.pull_limit).await?;
//! println!("pushed {}, pulled {}", report.push.pushed, report.pulled);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod cursor;
pub mod engine;
pub mod error;
pub mod transport;
pub mod wire;

pub use config::{Config, ConfigError, StorageSettings, SyncSettings};
pub use cursor::SyncCursor;
pub use engine::{CycleReport, PullReport, PushReport, SyncEngine};
pub use error::{Result, SyncError};
pub use transport::{HttpTransport, PushOutcome, ReadingTransport};
pub use wire::{PullResponse, ReadingUpload, ServerReading};
