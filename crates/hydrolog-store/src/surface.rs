//! Cached read/write surface consumed by UI screens.
//!
//! Wraps a [`RecordStore`] of readings with the [`QueryCache`]: reads are
//! keyed by operation + parameters, and every mutation invalidates exactly
//! the scopes it could have changed (the unfiltered list, the lists for the
//! touched reservoir/plant, and the single-record entry), giving screens a
//! read-after-write view without polling and without flushing unrelated
//! caches.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use hydrolog_types::{PpmScale, SensorReading};

use crate::cache::QueryCache;
use crate::error::Result;
use crate::query::{Query, SortDirection};
use crate::store::{RecordStore, RecordStoreExt};

const OP_LIST: &str = "readings";
const OP_GET: &str = "reading";

/// Caller-facing creation payload for a reading.
///
/// `ppm_scale` arrives in its wire/display form and is validated here;
/// unsupported scales are rejected, not coerced. A missing `ec_25c` means
/// no correction was available and the raw value is stored for both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewReading {
    pub ph: f64,
    pub ec_raw: f64,
    pub ec_25c: Option<f64>,
    pub temp_c: f64,
    pub atc_on: bool,
    pub ppm_scale: String,
    pub reservoir_id: Option<String>,
    pub plant_id: Option<String>,
    pub meter_id: Option<String>,
    pub note: Option<String>,
    /// Sensor observation time, epoch ms; defaults to "now" when absent.
    pub measured_at: Option<i64>,
}

/// Partial update payload; only present fields are written.
///
/// Quality flags are derived state and deliberately have no field here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReadingPatch {
    pub ph: Option<f64>,
    pub ec_raw: Option<f64>,
    pub ec_25c: Option<f64>,
    pub temp_c: Option<f64>,
    pub atc_on: Option<bool>,
    pub ppm_scale: Option<String>,
    pub reservoir_id: Option<String>,
    pub plant_id: Option<String>,
    pub meter_id: Option<String>,
    pub note: Option<String>,
    pub measured_at: Option<i64>,
}

/// Filter for the cached list operation. Conditions are AND-combined;
/// results come back newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadingListFilter {
    pub reservoir_id: Option<String>,
    pub plant_id: Option<String>,
    pub limit: Option<usize>,
}

impl ReadingListFilter {
    fn params(&self) -> Value {
        json!({
            "limit": self.limit,
            "plantId": self.plant_id,
            "reservoirId": self.reservoir_id,
        })
    }
}

/// The reactive query surface over pH/EC readings.
pub struct ReadingService<S> {
    store: Arc<S>,
    cache: QueryCache,
}

impl<S: RecordStore<SensorReading>> ReadingService<S> {
    /// Wrap a record store with a fresh cache.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            cache: QueryCache::new(),
        }
    }

    /// The underlying store, shared with the sync engine.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Cached point lookup.
    pub async fn get(&self, id: &str) -> Result<SensorReading> {
        self.cache
            .get_or_fetch(OP_GET, &json!({ "id": id }), || self.store.find(id))
            .await
    }

    /// Cached list, newest first.
    pub async fn list(&self, filter: &ReadingListFilter) -> Result<Vec<SensorReading>> {
        self.cache
            .get_or_fetch(OP_LIST, &filter.params(), || {
                let mut query =
                    Query::<SensorReading>::new().sort_by("measuredAt", SortDirection::Desc);
                if let Some(reservoir_id) = &filter.reservoir_id {
                    query = query.where_eq("reservoirId", reservoir_id.as_str());
                }
                if let Some(plant_id) = &filter.plant_id {
                    query = query.where_eq("plantId", plant_id.as_str());
                }
                if let Some(limit) = filter.limit {
                    query = query.take(limit);
                }
                async move { self.store.fetch(&query).await }
            })
            .await
    }

    /// Create a reading and invalidate the scopes it appears in.
    pub async fn create(&self, input: NewReading) -> Result<SensorReading> {
        let ppm_scale = PpmScale::from_str(&input.ppm_scale)?;

        let created = self
            .store
            .create_with(move |r| {
                r.ph = input.ph;
                r.ec_raw = input.ec_raw;
                r.ec_25c = input.ec_25c.unwrap_or(input.ec_raw);
                r.temp_c = input.temp_c;
                r.atc_on = input.atc_on;
                r.ppm_scale = ppm_scale;
                r.reservoir_id = input.reservoir_id;
                r.plant_id = input.plant_id;
                r.meter_id = input.meter_id;
                r.note = input.note;
                if let Some(measured_at) = input.measured_at {
                    r.measured_at = measured_at;
                }
            })
            .await?;

        self.invalidate_for(None, &created).await;
        Ok(created)
    }

    /// Apply a partial update and invalidate every scope the record sat in
    /// before or after the write.
    pub async fn update(&self, id: &str, patch: ReadingPatch) -> Result<SensorReading> {
        // Validate at the boundary before touching the store.
        let ppm_scale = patch
            .ppm_scale
            .as_deref()
            .map(PpmScale::from_str)
            .transpose()?;

        let before = self.store.find(id).await?;
        let updated = self
            .store
            .update_with(id, move |r| {
                if let Some(ph) = patch.ph {
                    r.ph = ph;
                }
                if let Some(ec_raw) = patch.ec_raw {
                    r.ec_raw = ec_raw;
                }
                if let Some(ec_25c) = patch.ec_25c {
                    r.ec_25c = ec_25c;
                }
                if let Some(temp_c) = patch.temp_c {
                    r.temp_c = temp_c;
                }
                if let Some(atc_on) = patch.atc_on {
                    r.atc_on = atc_on;
                }
                if let Some(scale) = ppm_scale {
                    r.ppm_scale = scale;
                }
                if let Some(reservoir_id) = patch.reservoir_id {
                    r.reservoir_id = Some(reservoir_id);
                }
                if let Some(plant_id) = patch.plant_id {
                    r.plant_id = Some(plant_id);
                }
                if let Some(meter_id) = patch.meter_id {
                    r.meter_id = Some(meter_id);
                }
                if let Some(note) = patch.note {
                    r.note = Some(note);
                }
                if let Some(measured_at) = patch.measured_at {
                    r.measured_at = measured_at;
                }
            })
            .await?;

        self.invalidate_for(Some(&before), &updated).await;
        Ok(updated)
    }

    /// Drop the cache entries a write could have affected: the record's own
    /// entry, the unfiltered list, and any list filtered to a reservoir or
    /// plant the record referenced before or after the write.
    async fn invalidate_for(&self, before: Option<&SensorReading>, after: &SensorReading) {
        self.cache
            .invalidate(OP_GET, &json!({ "id": after.id }))
            .await;

        let mut reservoirs: Vec<&str> = Vec::new();
        let mut plants: Vec<&str> = Vec::new();
        for record in before.into_iter().chain(std::iter::once(after)) {
            reservoirs.extend(record.reservoir_id.as_deref());
            plants.extend(record.plant_id.as_deref());
        }

        self.cache
            .invalidate_matching(OP_LIST, |params| {
                scope_affected(params.get("reservoirId"), &reservoirs)
                    && scope_affected(params.get("plantId"), &plants)
            })
            .await;
    }
}

/// A list dimension is affected when it is unfiltered (matches everything)
/// or filtered to a value the write touched.
fn scope_affected(param: Option<&Value>, touched: &[&str]) -> bool {
    match param.and_then(Value::as_str) {
        None => true,
        Some(filtered) => touched.contains(&filtered),
    }
}
