//! Core domain types for hydrolog pH/EC sensor readings.
//!
//! This crate is platform-agnostic and contains no I/O: the reading record
//! shape, the ppm display scales, and the pure quality-classification
//! engine that tags readings with advisory flags.
//!
//! # Example
//!
//! ```
//! use hydrolog_types::{MeasurementSnapshot, QualityFlag, QualityThresholds, compute_quality_flags};
//!
//! let snapshot = MeasurementSnapshot {
//!     ph: 5.9,
//!     ec_raw: 1.8,
//!     ec_25c: 1.8,
//!     temp_c: 22.0,
//!     atc_on: false,
//! };
//!
//! let flags = compute_quality_flags(&snapshot, &QualityThresholds::default());
//! assert!(flags.contains(&QualityFlag::NoAtc));
//! ```

mod error;
mod quality;
mod reading;

pub use error::ValidationError;
pub use quality::{QualityFlag, QualityThresholds, compute_quality_flags};
pub use reading::{MeasurementSnapshot, PpmScale, SensorReading};

/// Current wall-clock time as epoch milliseconds.
///
/// Reading timestamps are stored as epoch ms end to end, matching the sync
/// wire format, so this is the single clock helper the other crates use.
pub fn now_ms() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_ms_is_plausible() {
        // Anything after 2020-01-01 and before 2100-01-01.
        let now = now_ms();
        assert!(now > 1_577_836_800_000);
        assert!(now < 4_102_444_800_000);
    }
}
