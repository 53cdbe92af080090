//! The sensor reading record and its measurement snapshot.

use core::fmt;
use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::quality::QualityFlag;

/// Community conversion standard for expressing EC as ppm.
///
/// Display-only: the stored EC values are never rescaled. The two scales in
/// common use multiply EC (mS/cm) by 500 (Truncheon/"NaCl") or 700
/// (Hanna/"442"). Anything else is rejected at the boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PpmScale {
    /// 500-scale (EC mS/cm x 500).
    #[default]
    #[serde(rename = "500")]
    Ppm500,
    /// 700-scale (EC mS/cm x 700).
    #[serde(rename = "700")]
    Ppm700,
}

impl PpmScale {
    /// Multiplier applied to EC in mS/cm to get ppm.
    #[must_use]
    pub fn factor(&self) -> f64 {
        match self {
            PpmScale::Ppm500 => 500.0,
            PpmScale::Ppm700 => 700.0,
        }
    }

    /// Convert an EC value in mS/cm to ppm on this scale.
    #[must_use]
    pub fn to_ppm(&self, ec_ms_cm: f64) -> f64 {
        ec_ms_cm * self.factor()
    }

    /// The wire/display form of the scale.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            PpmScale::Ppm500 => "500",
            PpmScale::Ppm700 => "700",
        }
    }
}

impl fmt::Display for PpmScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PpmScale {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "500" => Ok(PpmScale::Ppm500),
            "700" => Ok(PpmScale::Ppm700),
            other => Err(ValidationError::UnsupportedPpmScale(other.to_string())),
        }
    }
}

/// The measurement fields of a reading, as one comparable value.
///
/// Equality on a snapshot is how the store decides whether a mutation
/// touched the measurement (and therefore whether quality flags must be
/// recomputed) or only touched annotations like `note`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasurementSnapshot {
    /// pH value, expected domain 0-14.
    pub ph: f64,
    /// Raw EC as read from the meter, mS/cm.
    pub ec_raw: f64,
    /// EC normalized to 25 C, mS/cm.
    pub ec_25c: f64,
    /// Solution temperature at measurement time, Celsius.
    pub temp_c: f64,
    /// Whether the meter performed automatic temperature compensation.
    pub atc_on: bool,
}

/// A single pH/EC measurement taken against a reservoir, plant, or neither.
///
/// The local/JSON shape is camelCase; the sync wire shape (snake_case) lives
/// in the sync crate. `quality_flags` is derived from the measurement fields
/// and is never hand-edited; the record store recomputes it on every write
/// that touches the measurement.
///
/// Timestamps are epoch milliseconds. `measured_at` is the sensor
/// observation time (caller-supplied, defaulted at creation); `created_at` /
/// `updated_at` are local bookkeeping stamps owned by the store. A zero
/// timestamp means "not yet stamped".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    /// Opaque stable identifier, assigned at creation, immutable.
    #[serde(default)]
    pub id: String,
    /// pH value, expected domain 0-14.
    pub ph: f64,
    /// Raw EC as read from the meter, mS/cm.
    pub ec_raw: f64,
    /// EC normalized to 25 C; equals `ec_raw` when no correction was available.
    pub ec_25c: f64,
    /// Solution temperature, Celsius.
    pub temp_c: f64,
    /// Whether the meter performed automatic temperature compensation.
    pub atc_on: bool,
    /// Display conversion standard for ppm; does not affect stored EC.
    #[serde(default)]
    pub ppm_scale: PpmScale,
    /// Reservoir this reading was taken from, if any.
    #[serde(default)]
    pub reservoir_id: Option<String>,
    /// Plant this reading is attached to, if any.
    #[serde(default)]
    pub plant_id: Option<String>,
    /// Meter that produced the reading, if known.
    #[serde(default)]
    pub meter_id: Option<String>,
    /// Free-text note.
    #[serde(default)]
    pub note: Option<String>,
    /// Advisory classification tags, derived from the measurement fields.
    #[serde(default)]
    pub quality_flags: BTreeSet<QualityFlag>,
    /// Sensor observation time, epoch ms.
    #[serde(default)]
    pub measured_at: i64,
    /// Local record creation stamp, epoch ms.
    #[serde(default)]
    pub created_at: i64,
    /// Local last-mutation stamp, epoch ms.
    #[serde(default)]
    pub updated_at: i64,
    /// Opaque extension fields carried alongside the typed ones.
    ///
    /// Kept explicit so the classification inputs stay statically typed
    /// while callers can still attach loosely-shaped metadata.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl SensorReading {
    /// Extract the measurement fields as a comparable snapshot.
    #[must_use]
    pub fn measurement(&self) -> MeasurementSnapshot {
        MeasurementSnapshot {
            ph: self.ph,
            ec_raw: self.ec_raw,
            ec_25c: self.ec_25c,
            temp_c: self.temp_c,
            atc_on: self.atc_on,
        }
    }

    /// EC at 25 C expressed as ppm on the reading's display scale.
    #[must_use]
    pub fn ppm(&self) -> f64 {
        self.ppm_scale.to_ppm(self.ec_25c)
    }
}
