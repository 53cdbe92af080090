//! Operation-keyed cache behind the reactive query surface.
//!
//! Entries are keyed by operation name plus the canonical JSON of the
//! parameters, so two parameterizations of one operation never collide.
//! Mutations invalidate by key or by predicate over the parameters; the
//! surface layer decides which parameter scopes a write could have touched.

use std::collections::HashMap;
use std::future::Future;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    op: String,
    params: String,
}

impl CacheKey {
    fn new(op: &str, params: &Value) -> Self {
        // serde_json maps are sorted by key, so the serialized form is
        // canonical for equal parameter sets.
        Self {
            op: op.to_string(),
            params: params.to_string(),
        }
    }
}

/// Cache of fetch results keyed by operation + parameters.
#[derive(Default)]
pub struct QueryCache {
    entries: RwLock<HashMap<CacheKey, Value>>,
}

impl QueryCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `(op, params)`, or run `fetch`, cache
    /// its result, and return it.
    ///
    /// Concurrent misses on the same key may each run `fetch`; the last
    /// result wins the cache slot, which is harmless for read operations.
    pub async fn get_or_fetch<T, F, Fut>(&self, op: &str, params: &Value, fetch: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let key = CacheKey::new(op, params);

        if let Some(hit) = self.entries.read().await.get(&key) {
            debug!(op, params = %key.params, "query cache hit");
            return Ok(serde_json::from_value(hit.clone())?);
        }

        debug!(op, params = %key.params, "query cache miss");
        let fetched = fetch().await?;
        let value = serde_json::to_value(&fetched)?;
        self.entries.write().await.insert(key, value);
        Ok(fetched)
    }

    /// Drop the entry for one exact parameterization.
    pub async fn invalidate(&self, op: &str, params: &Value) {
        self.entries.write().await.remove(&CacheKey::new(op, params));
    }

    /// Drop every entry for `op` whose parameters satisfy `affected`.
    pub async fn invalidate_matching<P>(&self, op: &str, affected: P)
    where
        P: Fn(&Value) -> bool,
    {
        let mut entries = self.entries.write().await;
        entries.retain(|key, _| {
            if key.op != op {
                return true;
            }
            let params: Value = serde_json::from_str(&key.params).unwrap_or(Value::Null);
            !affected(&params)
        });
    }

    /// Drop every entry for `op`, regardless of parameters.
    pub async fn invalidate_op(&self, op: &str) {
        self.entries.write().await.retain(|key, _| key.op != op);
    }

    /// Number of live entries (test visibility).
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
