//! Quality classification for pH/EC measurements.
//!
//! A reading's flags advise the user about reliability; they are not hard
//! validation errors. Classification is a pure function of the measurement
//! snapshot and a threshold set: no clock, no I/O, and it never raises.
//! Out-of-domain numeric input (NaN, infinities) degrades to the empty set.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::reading::MeasurementSnapshot;

/// Advisory tag attached to a reading by the classification engine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum QualityFlag {
    /// The meter did not compensate for temperature itself, so `ec_25c`
    /// rests on a manual or approximate correction.
    NoAtc,
    /// Measured above the high temperature threshold; EC drifts upward.
    TempHigh,
    /// Measured below the low temperature threshold; EC drifts downward.
    TempLow,
    /// pH outside the physically meaningful 0-14 window.
    PhOutOfRange,
}

/// Threshold constants used by [`compute_quality_flags`].
///
/// These are domain configuration, not engine logic: the defaults carry the
/// values used by the stock reading pipeline, and callers with different
/// crop targets can pass their own.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    /// Solution temperatures above this (Celsius) are flagged `TEMP_HIGH`.
    pub temp_high_c: f64,
    /// Solution temperatures below this (Celsius) are flagged `TEMP_LOW`.
    pub temp_low_c: f64,
    /// Lower bound of the valid pH domain.
    pub ph_min: f64,
    /// Upper bound of the valid pH domain.
    pub ph_max: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            temp_high_c: 28.0,
            temp_low_c: 16.0,
            ph_min: 0.0,
            ph_max: 14.0,
        }
    }
}

/// Classify a measurement snapshot into a set of advisory flags.
///
/// Deterministic: identical snapshots always yield identical sets. If any
/// numeric input is non-finite the whole snapshot is considered unjudgeable
/// and the neutral (empty) set is returned instead of partial flags.
#[must_use]
pub fn compute_quality_flags(
    snapshot: &MeasurementSnapshot,
    thresholds: &QualityThresholds,
) -> BTreeSet<QualityFlag> {
    let mut flags = BTreeSet::new();

    let numerics = [snapshot.ph, snapshot.ec_raw, snapshot.ec_25c, snapshot.temp_c];
    if numerics.iter().any(|v| !v.is_finite()) {
        return flags;
    }

    if !snapshot.atc_on {
        flags.insert(QualityFlag::NoAtc);
    }

    if snapshot.temp_c > thresholds.temp_high_c {
        flags.insert(QualityFlag::TempHigh);
    } else if snapshot.temp_c < thresholds.temp_low_c {
        flags.insert(QualityFlag::TempLow);
    }

    if snapshot.ph < thresholds.ph_min || snapshot.ph > thresholds.ph_max {
        flags.insert(QualityFlag::PhOutOfRange);
    }

    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(ph: f64, temp_c: f64, atc_on: bool) -> MeasurementSnapshot {
        MeasurementSnapshot {
            ph,
            ec_raw: 1.6,
            ec_25c: 1.6,
            temp_c,
            atc_on,
        }
    }

    #[test]
    fn test_no_atc_without_temp_high() {
        // Scenario A: cool solution, meter compensation off.
        let flags = compute_quality_flags(&snapshot(6.0, 22.0, false), &QualityThresholds::default());
        assert!(flags.contains(&QualityFlag::NoAtc));
        assert!(!flags.contains(&QualityFlag::TempHigh));
    }

    #[test]
    fn test_temp_high_without_no_atc() {
        // Scenario B: warm solution, meter compensation on.
        let flags = compute_quality_flags(&snapshot(6.0, 30.0, true), &QualityThresholds::default());
        assert!(flags.contains(&QualityFlag::TempHigh));
        assert!(!flags.contains(&QualityFlag::NoAtc));
    }

    #[test]
    fn test_temp_low_flag() {
        let flags = compute_quality_flags(&snapshot(6.0, 12.0, true), &QualityThresholds::default());
        assert!(flags.contains(&QualityFlag::TempLow));
        assert!(!flags.contains(&QualityFlag::TempHigh));
    }

    #[test]
    fn test_ph_out_of_range_flag() {
        let flags = compute_quality_flags(&snapshot(14.6, 20.0, true), &QualityThresholds::default());
        assert!(flags.contains(&QualityFlag::PhOutOfRange));

        let flags = compute_quality_flags(&snapshot(-0.1, 20.0, true), &QualityThresholds::default());
        assert!(flags.contains(&QualityFlag::PhOutOfRange));
    }

    #[test]
    fn test_in_range_reading_is_clean() {
        let flags = compute_quality_flags(&snapshot(5.8, 20.0, true), &QualityThresholds::default());
        assert!(flags.is_empty());
    }

    #[test]
    fn test_nan_input_degrades_to_neutral() {
        let flags = compute_quality_flags(
            &snapshot(f64::NAN, 35.0, false),
            &QualityThresholds::default(),
        );
        assert!(flags.is_empty());

        let mut s = snapshot(6.0, 20.0, false);
        s.ec_25c = f64::INFINITY;
        assert!(compute_quality_flags(&s, &QualityThresholds::default()).is_empty());
    }

    #[test]
    fn test_determinism_across_repeated_calls() {
        let s = snapshot(7.2, 29.5, false);
        let thresholds = QualityThresholds::default();
        let first = compute_quality_flags(&s, &thresholds);
        for _ in 0..10 {
            assert_eq!(compute_quality_flags(&s, &thresholds), first);
        }
    }

    #[test]
    fn test_custom_thresholds_move_the_boundary() {
        let thresholds = QualityThresholds {
            temp_high_c: 24.0,
            ..Default::default()
        };
        let flags = compute_quality_flags(&snapshot(6.0, 25.0, true), &thresholds);
        assert!(flags.contains(&QualityFlag::TempHigh));
    }

    #[test]
    fn test_flag_wire_form() {
        let json = serde_json::to_string(&QualityFlag::NoAtc).unwrap();
        assert_eq!(json, "\"NO_ATC\"");
        let json = serde_json::to_string(&QualityFlag::TempHigh).unwrap();
        assert_eq!(json, "\"TEMP_HIGH\"");
    }
}
