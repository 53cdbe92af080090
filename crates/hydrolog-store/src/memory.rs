//! In-memory store backend.
//!
//! Reference backend for tests and for callers that have not opted into
//! persistence yet. Same contract and write-serialization behavior as the
//! SQLite backend: a single write lock orders all mutations, so concurrent
//! updates against one id never interleave field writes.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{Error, Result};
use crate::query::Query;
use crate::record::Record;
use crate::store::{Mutator, RecordStore, apply_update, build_new_record, prepare_merge};

/// Non-persistent [`RecordStore`] backend.
pub struct MemoryStore<R: Record> {
    inner: RwLock<Inner<R>>,
}

struct Inner<R> {
    records: HashMap<String, R>,
    /// Insertion order, so unsorted queries are deterministic.
    order: Vec<String>,
    /// Ids awaiting push, oldest first.
    outbox: VecDeque<String>,
    cursor: Option<i64>,
}

impl<R: Record> MemoryStore<R> {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                records: HashMap::new(),
                order: Vec::new(),
                outbox: VecDeque::new(),
                cursor: None,
            }),
        }
    }
}

impl<R: Record> Default for MemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Inner<R> {
    fn enqueue(&mut self, id: &str) {
        if !self.outbox.iter().any(|queued| queued == id) {
            self.outbox.push_back(id.to_string());
        }
    }
}

#[async_trait]
impl<R: Record> RecordStore<R> for MemoryStore<R> {
    async fn create(&self, init: Mutator<R>) -> Result<R> {
        let record = build_new_record(init);
        let mut inner = self.inner.write().await;
        inner.order.push(record.id().to_string());
        inner.enqueue(record.id());
        inner.records.insert(record.id().to_string(), record.clone());
        Ok(record)
    }

    async fn find(&self, id: &str) -> Result<R> {
        let inner = self.inner.read().await;
        inner
            .records
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    async fn update(&self, id: &str, mutate: Mutator<R>) -> Result<R> {
        let mut inner = self.inner.write().await;
        let mut record = inner
            .records
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        apply_update(&mut record, mutate);
        inner.enqueue(id);
        inner.records.insert(id.to_string(), record.clone());
        Ok(record)
    }

    async fn fetch(&self, query: &Query<R>) -> Result<Vec<R>> {
        let rows = self.rows().await?;
        debug!(
            collection = R::COLLECTION,
            clauses = query.clauses.len(),
            rows = rows.len(),
            "evaluating query"
        );
        Ok(query.apply(rows))
    }

    async fn fetch_count(&self, query: &Query<R>) -> Result<u64> {
        let rows = self.rows().await?;
        Ok(query.apply(rows).len() as u64)
    }

    async fn pending_push(&self) -> Result<Vec<R>> {
        let inner = self.inner.read().await;
        Ok(inner
            .outbox
            .iter()
            .filter_map(|id| inner.records.get(id).cloned())
            .collect())
    }

    async fn mark_pushed(&self, id: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.outbox.retain(|queued| queued != id);
        Ok(())
    }

    async fn merge_remote(&self, mut record: R) -> Result<R> {
        prepare_merge(&mut record);
        let mut inner = self.inner.write().await;
        if !inner.records.contains_key(record.id()) {
            inner.order.push(record.id().to_string());
        }
        inner.records.insert(record.id().to_string(), record.clone());
        Ok(record)
    }

    async fn load_cursor(&self) -> Result<Option<i64>> {
        Ok(self.inner.read().await.cursor)
    }

    async fn save_cursor(&self, last_pulled_at: i64) -> Result<()> {
        self.inner.write().await.cursor = Some(last_pulled_at);
        Ok(())
    }
}

impl<R: Record> MemoryStore<R> {
    async fn rows(&self) -> Result<Vec<(serde_json::Value, R)>> {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .filter_map(|id| inner.records.get(id))
            .map(|record| Ok((serde_json::to_value(record)?, record.clone())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::SortDirection;
    use crate::store::RecordStoreExt;
    use hydrolog_types::{QualityFlag, SensorReading};

    fn store() -> MemoryStore<SensorReading> {
        MemoryStore::new()
    }

    async fn seed(
        store: &MemoryStore<SensorReading>,
        reservoir: Option<&str>,
        measured_at: i64,
    ) -> SensorReading {
        let reservoir = reservoir.map(str::to_string);
        store
            .create_with(move |r| {
                r.ph = 6.0;
                r.ec_raw = 1.5;
                r.ec_25c = 1.5;
                r.temp_c = 21.0;
                r.atc_on = true;
                r.reservoir_id = reservoir;
                r.measured_at = measured_at;
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_then_find_round_trip() {
        let store = store();
        let created = seed(&store, Some("res-1"), 1_000).await;

        assert!(!created.id.is_empty());
        assert!(created.created_at > 0);
        assert_eq!(created.updated_at, created.created_at);

        let found = store.find(&created.id).await.unwrap();
        assert_eq!(found, created);
    }

    #[tokio::test]
    async fn test_find_unknown_id_is_not_found() {
        let store = store();
        let err = store.find("ghost").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(ref id) if id == "ghost"));
    }

    #[tokio::test]
    async fn test_create_computes_quality_flags() {
        let store = store();
        let created = store
            .create_with(|r| {
                r.ph = 6.0;
                r.temp_c = 30.0;
                r.atc_on = false;
            })
            .await
            .unwrap();
        assert!(created.quality_flags.contains(&QualityFlag::NoAtc));
        assert!(created.quality_flags.contains(&QualityFlag::TempHigh));
    }

    #[tokio::test]
    async fn test_update_recomputes_flags_only_for_measurement_changes() {
        let store = store();
        let created = seed(&store, None, 1_000).await;
        assert!(created.quality_flags.is_empty());

        // Annotation-only update: flags untouched, updated_at stamped.
        let annotated = store
            .update_with(&created.id, |r| r.note = Some("pre-flush".to_string()))
            .await
            .unwrap();
        assert!(annotated.quality_flags.is_empty());
        assert!(annotated.updated_at >= created.updated_at);

        let heated = store
            .update_with(&created.id, |r| r.temp_c = 31.0)
            .await
            .unwrap();
        assert!(heated.quality_flags.contains(&QualityFlag::TempHigh));
    }

    #[tokio::test]
    async fn test_update_preserves_id() {
        let store = store();
        let created = seed(&store, None, 1_000).await;
        let id = created.id.clone();

        let updated = store
            .update_with(&id, |r| r.id = "hijacked".to_string())
            .await
            .unwrap();
        assert_eq!(updated.id, id);
        assert!(store.find(&id).await.is_ok());
    }

    #[tokio::test]
    async fn test_filter_by_reservoir() {
        let store = store();
        seed(&store, Some("res-1"), 1_000).await;
        seed(&store, Some("res-2"), 2_000).await;
        seed(&store, None, 3_000).await;

        let matched = store
            .fetch(&Query::new().where_eq("reservoirId", "res-1"))
            .await
            .unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].reservoir_id.as_deref(), Some("res-1"));

        let none = store
            .fetch(&Query::new().where_eq("reservoirId", "res-9"))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_sort_descending_is_non_increasing() {
        let store = store();
        for measured_at in [5_000, 1_000, 3_000, 4_000, 2_000] {
            seed(&store, None, measured_at).await;
        }

        let sorted = store
            .fetch(&Query::new().sort_by("measuredAt", SortDirection::Desc))
            .await
            .unwrap();
        let stamps: Vec<i64> = sorted.iter().map(|r| r.measured_at).collect();
        assert_eq!(stamps, vec![5_000, 4_000, 3_000, 2_000, 1_000]);
    }

    #[tokio::test]
    async fn test_take_caps_results() {
        let store = store();
        for measured_at in 0..10 {
            seed(&store, None, measured_at + 1).await;
        }

        let page = store.fetch(&Query::new().take(3)).await.unwrap();
        assert_eq!(page.len(), 3);

        let count = store.fetch_count(&Query::new().take(3)).await.unwrap();
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn test_lazy_handle_fetch_and_count_agree() {
        let store = store();
        seed(&store, Some("res-1"), 1_000).await;
        seed(&store, Some("res-1"), 2_000).await;

        let handle = store.query(Query::new().where_eq("reservoirId", "res-1"));
        assert_eq!(handle.fetch().await.unwrap().len(), 2);
        assert_eq!(handle.fetch_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_outbox_tracks_local_writes_once() {
        let store = store();
        let created = seed(&store, None, 1_000).await;
        store
            .update_with(&created.id, |r| r.note = Some("x".to_string()))
            .await
            .unwrap();

        let pending = store.pending_push().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, created.id);

        store.mark_pushed(&created.id).await.unwrap();
        assert!(store.pending_push().await.unwrap().is_empty());

        // A later update re-queues it.
        store
            .update_with(&created.id, |r| r.note = Some("y".to_string()))
            .await
            .unwrap();
        assert_eq!(store.pending_push().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_merge_remote_inserts_and_updates_without_queueing() {
        let store = store();
        let remote = SensorReading {
            id: "srv-1".to_string(),
            ph: 5.8,
            ec_raw: 2.0,
            ec_25c: 2.0,
            temp_c: 19.0,
            atc_on: false,
            measured_at: 1_000,
            created_at: 900,
            ..Default::default()
        };

        let merged = store.merge_remote(remote.clone()).await.unwrap();
        assert_eq!(merged.created_at, 900);
        assert!(merged.quality_flags.contains(&QualityFlag::NoAtc));
        assert!(store.pending_push().await.unwrap().is_empty());

        // Update-if-present: same id replaces, still no queueing.
        let mut newer = remote;
        newer.ph = 6.2;
        store.merge_remote(newer).await.unwrap();
        let found = store.find("srv-1").await.unwrap();
        assert_eq!(found.ph, 6.2);
        assert!(store.pending_push().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cursor_round_trip() {
        let store = store();
        assert_eq!(store.load_cursor().await.unwrap(), None);
        store.save_cursor(1_234).await.unwrap();
        assert_eq!(store.load_cursor().await.unwrap(), Some(1_234));
    }

    #[tokio::test]
    async fn test_store_is_generic_over_entities() {
        use serde::{Deserialize, Serialize};

        #[derive(Debug, Clone, Default, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct TaskRecord {
            id: String,
            title: String,
            done: bool,
            created_at: i64,
            updated_at: i64,
        }

        impl Record for TaskRecord {
            const COLLECTION: &'static str = "tasks_v1";

            fn id(&self) -> &str {
                &self.id
            }
            fn assign_id(&mut self, id: String) {
                self.id = id;
            }
            fn created_at(&self) -> i64 {
                self.created_at
            }
            fn updated_at(&self) -> i64 {
                self.updated_at
            }
            fn apply_create_defaults(&mut self, now_ms: i64) {
                if self.created_at == 0 {
                    self.created_at = now_ms;
                }
                if self.updated_at == 0 {
                    self.updated_at = now_ms;
                }
            }
            fn touch(&mut self, now_ms: i64) {
                self.updated_at = now_ms;
            }
            fn refresh_derived(&mut self, _before: Option<&Self>) {}
        }

        let store: MemoryStore<TaskRecord> = MemoryStore::new();
        let task = store
            .create_with(|t| t.title = "check res-1 ph".to_string())
            .await
            .unwrap();

        let open = store
            .fetch(&Query::new().where_eq("done", false))
            .await
            .unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, task.id);
    }
}
