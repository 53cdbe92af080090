//! The record contract shared by every stored entity type.

use serde::Serialize;
use serde::de::DeserializeOwned;

use hydrolog_types::{QualityThresholds, SensorReading, compute_quality_flags};

/// Local collection name for pH/EC readings.
pub const READINGS_COLLECTION: &str = "ph_ec_readings_v2";

/// A record storable in a [`RecordStore`](crate::RecordStore) collection.
///
/// The same store machinery serves several entity types (readings, tasks,
/// harvests, reservoir events); each implements this trait to tell the store
/// its collection name, how to reach its bookkeeping fields, and how to keep
/// derived fields current.
///
/// Timestamps are epoch milliseconds with `0` meaning "not yet stamped";
/// the store owns stamping via [`apply_create_defaults`](Record::apply_create_defaults)
/// and [`touch`](Record::touch).
pub trait Record:
    Clone + Default + Send + Sync + Serialize + DeserializeOwned + 'static
{
    /// Name of the backing collection, usable as a SQL identifier.
    const COLLECTION: &'static str;

    /// The record's opaque stable identifier.
    fn id(&self) -> &str;

    /// Overwrite the identifier. Called by the store at creation and to
    /// restore the id should a mutator have touched it.
    fn assign_id(&mut self, id: String);

    /// Creation stamp, epoch ms (0 = unset).
    fn created_at(&self) -> i64;

    /// Last-mutation stamp, epoch ms (0 = unset).
    fn updated_at(&self) -> i64;

    /// Fill defaults for fields the creation initializer left unset.
    /// Initializer-supplied values must survive untouched.
    fn apply_create_defaults(&mut self, now_ms: i64);

    /// Stamp `updated_at`.
    fn touch(&mut self, now_ms: i64);

    /// Recompute derived fields after a write.
    ///
    /// `before` is the pre-mutation record for updates and `None` for
    /// creation and remote merges. Implementations decide from the diff
    /// whether derived state must change; the store calls this on every
    /// write so derived fields can never go stale.
    fn refresh_derived(&mut self, before: Option<&Self>);
}

impl Record for SensorReading {
    const COLLECTION: &'static str = READINGS_COLLECTION;

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
        if self.measured_at == 0 {
            self.measured_at = now_ms;
        }
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

    fn refresh_derived(&mut self, before: Option<&Self>) {
        // Flags follow the measurement fields only; a note- or
        // reference-only update leaves them untouched.
        let measurement_changed =
            before.is_none_or(|prev| prev.measurement() != self.measurement());
        if measurement_changed {
            self.quality_flags =
                compute_quality_flags(&self.measurement(), &QualityThresholds::default());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydrolog_types::QualityFlag;

    #[test]
    fn test_create_defaults_fill_only_unset_fields() {
        let mut reading = SensorReading {
            measured_at: 1_700_000_000_000,
            ..Default::default()
        };
        reading.apply_create_defaults(1_800_000_000_000);

        // Initializer-supplied observation time wins.
        assert_eq!(reading.measured_at, 1_700_000_000_000);
        assert_eq!(reading.created_at, 1_800_000_000_000);
        assert_eq!(reading.updated_at, 1_800_000_000_000);
    }

    #[test]
    fn test_refresh_derived_on_create() {
        let mut reading = SensorReading {
            ph: 6.0,
            temp_c: 30.0,
            atc_on: true,
            ..Default::default()
        };
        reading.refresh_derived(None);
        assert!(reading.quality_flags.contains(&QualityFlag::TempHigh));
    }

    #[test]
    fn test_refresh_derived_skips_annotation_updates() {
        let mut reading = SensorReading {
            ph: 6.0,
            temp_c: 22.0,
            atc_on: false,
            ..Default::default()
        };
        reading.refresh_derived(None);
        let before = reading.clone();

        reading.note = Some("topped off with 2L".to_string());
        // Simulate a stale hand-edit that must not be corrected here.
        reading.quality_flags.clear();
        reading.refresh_derived(Some(&before));
        assert!(reading.quality_flags.is_empty());

        // A measurement change does trigger recomputation.
        reading.atc_on = false;
        reading.temp_c = 31.0;
        reading.refresh_derived(Some(&before));
        assert!(reading.quality_flags.contains(&QualityFlag::TempHigh));
        assert!(reading.quality_flags.contains(&QualityFlag::NoAtc));
    }
}
