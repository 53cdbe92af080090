//! SQLite store backend.
//!
//! Persists each collection as a JSON-document table plus a push outbox,
//! with a shared cursor table for pull bookkeeping. Query evaluation stays
//! in-process over the deserialized bodies (the store is index-free by
//! design), so the DSL behaves identically to the in-memory backend.

use std::marker::PhantomData;
use std::path::Path;

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension};
use tokio::sync::Mutex;
use tracing::{debug, info};

use hydrolog_types::now_ms;

use crate::error::{Error, Result};
use crate::query::Query;
use crate::record::Record;
use crate::store::{Mutator, RecordStore, apply_update, build_new_record, prepare_merge};

/// SQLite-based [`RecordStore`] backend.
///
/// The connection sits behind an async mutex; every write runs load-mutate-
/// persist under it, which serializes writes against the same id.
pub struct SqliteStore<R: Record> {
    conn: Mutex<Connection>,
    _entity: PhantomData<fn() -> R>,
}

impl<R: Record> SqliteStore<R> {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        info!(collection = R::COLLECTION, "Opening database at {}", path.display());
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        Self::initialize(conn)
    }

    /// Open the default database location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::default_db_path())
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(conn: Connection) -> Result<Self> {
        // Collection names end up in SQL text, so they are restricted to
        // identifier characters up front.
        let collection = R::COLLECTION;
        let valid = !collection.is_empty()
            && !collection.starts_with(|c: char| c.is_ascii_digit())
            && collection
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(Error::InvalidCollection(collection.to_string()));
        }

        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {collection} (
                id TEXT PRIMARY KEY,
                body TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS {collection}_outbox (
                id TEXT PRIMARY KEY,
                queued_at INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS sync_cursors (
                collection TEXT PRIMARY KEY,
                last_pulled_at INTEGER NOT NULL
            );"
        ))?;

        Ok(Self {
            conn: Mutex::new(conn),
            _entity: PhantomData,
        })
    }

    fn row_to_record(body: &str) -> Result<R> {
        Ok(serde_json::from_str(body)?)
    }

    fn persist(conn: &Connection, record: &R) -> Result<()> {
        let body = serde_json::to_string(record)?;
        conn.execute(
            &format!(
                "INSERT INTO {} (id, body, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET body = ?2, updated_at = ?4",
                R::COLLECTION
            ),
            rusqlite::params![record.id(), body, record.created_at(), record.updated_at()],
        )?;
        Ok(())
    }

    fn enqueue(conn: &Connection, id: &str) -> Result<()> {
        conn.execute(
            &format!(
                "INSERT OR IGNORE INTO {}_outbox (id, queued_at) VALUES (?1, ?2)",
                R::COLLECTION
            ),
            rusqlite::params![id, now_ms()],
        )?;
        Ok(())
    }

    fn load(conn: &Connection, id: &str) -> Result<R> {
        let body: Option<String> = conn
            .query_row(
                &format!("SELECT body FROM {} WHERE id = ?", R::COLLECTION),
                [id],
                |row| row.get(0),
            )
            .optional()?;

        match body {
            Some(body) => Self::row_to_record(&body),
            None => Err(Error::NotFound(id.to_string())),
        }
    }

    fn all_rows(conn: &Connection) -> Result<Vec<(serde_json::Value, R)>> {
        let mut stmt =
            conn.prepare(&format!("SELECT body FROM {} ORDER BY rowid", R::COLLECTION))?;
        let bodies = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        bodies
            .iter()
            .map(|body| {
                let record = Self::row_to_record(body)?;
                Ok((serde_json::to_value(&record)?, record))
            })
            .collect()
    }
}

#[async_trait]
impl<R: Record> RecordStore<R> for SqliteStore<R> {
    async fn create(&self, init: Mutator<R>) -> Result<R> {
        let record = build_new_record(init);
        let conn = self.conn.lock().await;
        Self::persist(&conn, &record)?;
        Self::enqueue(&conn, record.id())?;
        Ok(record)
    }

    async fn find(&self, id: &str) -> Result<R> {
        let conn = self.conn.lock().await;
        Self::load(&conn, id)
    }

    async fn update(&self, id: &str, mutate: Mutator<R>) -> Result<R> {
        let conn = self.conn.lock().await;
        let mut record = Self::load(&conn, id)?;
        apply_update(&mut record, mutate);
        Self::persist(&conn, &record)?;
        Self::enqueue(&conn, id)?;
        Ok(record)
    }

    async fn fetch(&self, query: &Query<R>) -> Result<Vec<R>> {
        let conn = self.conn.lock().await;
        let rows = Self::all_rows(&conn)?;
        debug!(
            collection = R::COLLECTION,
            clauses = query.clauses.len(),
            rows = rows.len(),
            "evaluating query"
        );
        Ok(query.apply(rows))
    }

    async fn fetch_count(&self, query: &Query<R>) -> Result<u64> {
        let conn = self.conn.lock().await;
        let rows = Self::all_rows(&conn)?;
        Ok(query.apply(rows).len() as u64)
    }

    async fn pending_push(&self) -> Result<Vec<R>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT r.body FROM {c}_outbox o
             JOIN {c} r ON r.id = o.id
             ORDER BY o.queued_at, o.rowid",
            c = R::COLLECTION
        ))?;
        let bodies = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        bodies.iter().map(|body| Self::row_to_record(body)).collect()
    }

    async fn mark_pushed(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            &format!("DELETE FROM {}_outbox WHERE id = ?", R::COLLECTION),
            [id],
        )?;
        Ok(())
    }

    async fn merge_remote(&self, mut record: R) -> Result<R> {
        prepare_merge(&mut record);
        let conn = self.conn.lock().await;
        Self::persist(&conn, &record)?;
        Ok(record)
    }

    async fn load_cursor(&self) -> Result<Option<i64>> {
        let conn = self.conn.lock().await;
        let cursor = conn
            .query_row(
                "SELECT last_pulled_at FROM sync_cursors WHERE collection = ?",
                [R::COLLECTION],
                |row| row.get(0),
            )
            .optional()?;
        Ok(cursor)
    }

    async fn save_cursor(&self, last_pulled_at: i64) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO sync_cursors (collection, last_pulled_at) VALUES (?1, ?2)
             ON CONFLICT(collection) DO UPDATE SET last_pulled_at = ?2",
            rusqlite::params![R::COLLECTION, last_pulled_at],
        )?;
        debug!(
            collection = R::COLLECTION,
            last_pulled_at, "advanced sync cursor"
        );
        Ok(())
    }
}
