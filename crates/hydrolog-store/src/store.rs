//! The async store contract and its call-site conveniences.

use async_trait::async_trait;
use uuid::Uuid;

use hydrolog_types::now_ms;

use crate::error::Result;
use crate::query::{Query, QueryHandle};
use crate::record::Record;

/// Boxed creation initializer / update mutator.
///
/// Boxing keeps the trait object-safe; [`RecordStoreExt`] provides the
/// unboxed-closure entry points call sites actually use.
pub type Mutator<R> = Box<dyn FnOnce(&mut R) + Send>;

/// Async persistence contract for one record collection.
///
/// All operations are async even for the in-memory backend, so a persistent
/// engine can be swapped in without touching call sites. Writes against the
/// same id are serialized by the backend; there is no field-level version
/// check, so the last writer the store observes wins.
///
/// Beyond CRUD the contract carries two pieces of sync bookkeeping: the
/// implicit push outbox (`create`/`update` enqueue, a successful push
/// dequeues) and the per-collection pull cursor.
#[async_trait]
pub trait RecordStore<R: Record>: Send + Sync {
    /// Create a record: allocate an id, run the initializer, fill defaults
    /// for whatever the initializer left unset, refresh derived fields,
    /// persist, and enqueue for push. Returns the stored record.
    async fn create(&self, init: Mutator<R>) -> Result<R>;

    /// Point lookup by id. Fails with [`Error::NotFound`](crate::Error::NotFound)
    /// on a miss; no placeholder record is ever synthesized.
    async fn find(&self, id: &str) -> Result<R>;

    /// Load, mutate, stamp `updated_at`, refresh derived fields, persist,
    /// enqueue for push. The id is immutable across the mutation.
    async fn update(&self, id: &str, mutate: Mutator<R>) -> Result<R>;

    /// Materialize the records matching `query`.
    async fn fetch(&self, query: &Query<R>) -> Result<Vec<R>>;

    /// Materialize only the match count. Honors the query's result cap, so
    /// it always agrees with `fetch(...).len()`.
    async fn fetch_count(&self, query: &Query<R>) -> Result<u64>;

    /// Records awaiting push, in enqueue order.
    async fn pending_push(&self) -> Result<Vec<R>>;

    /// Drop a record from the push outbox after a successful transmit.
    async fn mark_pushed(&self, id: &str) -> Result<()>;

    /// Absorb a remote-originated record: insert-if-absent or
    /// update-if-present by id, refresh derived fields, stamp `updated_at`.
    /// Does not enqueue for push.
    async fn merge_remote(&self, record: R) -> Result<R>;

    /// Last successfully-pulled server timestamp for this collection, if a
    /// pull ever completed.
    async fn load_cursor(&self) -> Result<Option<i64>>;

    /// Persist the pull cursor. Callers advance it only after a fully
    /// merged pull.
    async fn save_cursor(&self, last_pulled_at: i64) -> Result<()>;
}

/// Ergonomic entry points over [`RecordStore`].
#[async_trait]
pub trait RecordStoreExt<R: Record>: RecordStore<R> {
    /// [`RecordStore::create`] with an unboxed initializer.
    async fn create_with<F>(&self, init: F) -> Result<R>
    where
        F: FnOnce(&mut R) + Send + 'static,
    {
        self.create(Box::new(init)).await
    }

    /// [`RecordStore::update`] with an unboxed mutator.
    async fn update_with<F>(&self, id: &str, mutate: F) -> Result<R>
    where
        F: FnOnce(&mut R) + Send + 'static,
    {
        self.update(id, Box::new(mutate)).await
    }

    /// Build a lazily-evaluated handle over `query`.
    fn query(&self, query: Query<R>) -> QueryHandle<'_, R>
    where
        Self: Sized,
    {
        QueryHandle::new(self, query)
    }
}

#[async_trait]
impl<R: Record, S: RecordStore<R> + ?Sized> RecordStoreExt<R> for S {}

/// Shared creation path: blank record, initializer, store-owned id,
/// defaults, derived fields. Used by every backend.
pub(crate) fn build_new_record<R: Record>(init: Mutator<R>) -> R {
    let mut record = R::default();
    init(&mut record);
    // The store allocates ids; an initializer-set id does not survive.
    record.assign_id(Uuid::new_v4().to_string());
    record.apply_create_defaults(now_ms());
    record.refresh_derived(None);
    record
}

/// Shared update path: mutate against a snapshot, restore the id, stamp,
/// refresh derived fields.
pub(crate) fn apply_update<R: Record>(record: &mut R, mutate: Mutator<R>) {
    let before = record.clone();
    mutate(record);
    record.assign_id(before.id().to_string());
    record.touch(now_ms());
    record.refresh_derived(Some(&before));
}

/// Shared merge path: fill any unset bookkeeping stamps, stamp the local
/// update time, recompute derived fields from the merged values.
pub(crate) fn prepare_merge<R: Record>(record: &mut R) {
    let now = now_ms();
    record.apply_create_defaults(now);
    record.touch(now);
    record.refresh_derived(None);
}
