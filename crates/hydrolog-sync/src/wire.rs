//! Wire-format mapping between local records and the remote schema.
//!
//! The local shape is camelCase; the remote ingestion schema is snake_case.
//! Derived and local-only fields (`quality_flags`, `updated_at`, `metadata`)
//! never cross the wire: flags are recomputed on merge, and the remote owns
//! its own bookkeeping.

use serde::{Deserialize, Serialize};

use hydrolog_types::{PpmScale, SensorReading, ValidationError};

/// Push body for `POST /api/ph-ec-readings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingUpload {
    pub id: String,
    pub ph: f64,
    pub ec_raw: f64,
    pub ec_25c: f64,
    pub temp_c: f64,
    pub atc_on: bool,
    /// Wire form of the display scale ("500" / "700").
    pub ppm_scale: String,
    pub reservoir_id: Option<String>,
    pub plant_id: Option<String>,
    pub meter_id: Option<String>,
    pub note: Option<String>,
    pub measured_at: i64,
    pub created_at: i64,
}

impl ReadingUpload {
    /// Map a local record to the remote schema.
    #[must_use]
    pub fn from_reading(reading: &SensorReading) -> Self {
        Self {
            id: reading.id.clone(),
            ph: reading.ph,
            ec_raw: reading.ec_raw,
            ec_25c: reading.ec_25c,
            temp_c: reading.temp_c,
            atc_on: reading.atc_on,
            ppm_scale: reading.ppm_scale.as_str().to_string(),
            reservoir_id: reading.reservoir_id.clone(),
            plant_id: reading.plant_id.clone(),
            meter_id: reading.meter_id.clone(),
            note: reading.note.clone(),
            measured_at: reading.measured_at,
            created_at: reading.created_at,
        }
    }
}

/// One reading in a pull response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerReading {
    pub id: String,
    pub ph: f64,
    pub ec_raw: f64,
    pub ec_25c: f64,
    pub temp_c: f64,
    pub atc_on: bool,
    pub ppm_scale: String,
    #[serde(default)]
    pub reservoir_id: Option<String>,
    #[serde(default)]
    pub plant_id: Option<String>,
    #[serde(default)]
    pub meter_id: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    pub measured_at: i64,
    #[serde(default)]
    pub created_at: i64,
}

impl ServerReading {
    /// Map to the local record shape.
    ///
    /// Rejects unrecognized ppm scales at this boundary. Quality flags are
    /// left to the store's merge path, which recomputes them from the
    /// measurement fields.
    pub fn into_reading(self) -> Result<SensorReading, ValidationError> {
        let ppm_scale: PpmScale = self.ppm_scale.parse()?;
        Ok(SensorReading {
            id: self.id,
            ph: self.ph,
            ec_raw: self.ec_raw,
            ec_25c: self.ec_25c,
            temp_c: self.temp_c,
            atc_on: self.atc_on,
            ppm_scale,
            reservoir_id: self.reservoir_id,
            plant_id: self.plant_id,
            meter_id: self.meter_id,
            note: self.note,
            measured_at: self.measured_at,
            created_at: self.created_at,
            ..Default::default()
        })
    }
}

/// Response of `GET /api/ph-ec-readings/sync`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullResponse {
    pub readings: Vec<ServerReading>,
    /// Cursor value for the next pull; server-issued, not a client clock.
    pub server_timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading() -> SensorReading {
        SensorReading {
            id: "r-1".to_string(),
            ph: 6.1,
            ec_raw: 1.4,
            ec_25c: 1.5,
            temp_c: 21.0,
            atc_on: true,
            ppm_scale: PpmScale::Ppm700,
            reservoir_id: Some("res-1".to_string()),
            plant_id: Some("plant-2".to_string()),
            meter_id: Some("meter-3".to_string()),
            note: Some("post top-off".to_string()),
            measured_at: 1_700_000_000_000,
            created_at: 1_700_000_000_500,
            updated_at: 1_700_000_000_500,
            ..Default::default()
        }
    }

    #[test]
    fn test_upload_uses_snake_case_wire_names() {
        let upload = ReadingUpload::from_reading(&reading());
        let value = serde_json::to_value(&upload).unwrap();

        assert_eq!(value["ec_raw"], 1.4);
        assert_eq!(value["ec_25c"], 1.5);
        assert_eq!(value["temp_c"], 21.0);
        assert_eq!(value["atc_on"], true);
        assert_eq!(value["ppm_scale"], "700");
        assert_eq!(value["reservoir_id"], "res-1");
        assert_eq!(value["plant_id"], "plant-2");
        assert_eq!(value["meter_id"], "meter-3");
        assert_eq!(value["measured_at"], 1_700_000_000_000_i64);
        assert_eq!(value["created_at"], 1_700_000_000_500_i64);
        // Local-only fields stay local.
        assert!(value.get("quality_flags").is_none());
        assert!(value.get("updated_at").is_none());
    }

    #[test]
    fn test_server_reading_maps_back_to_local_shape() {
        let json = r#"{
            "id": "srv-1",
            "ph": 5.8,
            "ec_raw": 2.0,
            "ec_25c": 2.1,
            "temp_c": 19.5,
            "atc_on": false,
            "ppm_scale": "500",
            "plant_id": "plant-9",
            "measured_at": 1700000001000,
            "created_at": 1700000002000
        }"#;
        let server: ServerReading = serde_json::from_str(json).unwrap();
        let local = server.into_reading().unwrap();

        assert_eq!(local.id, "srv-1");
        assert_eq!(local.ppm_scale, PpmScale::Ppm500);
        assert_eq!(local.plant_id.as_deref(), Some("plant-9"));
        assert_eq!(local.reservoir_id, None);
        assert_eq!(local.measured_at, 1_700_000_001_000);
    }

    #[test]
    fn test_unknown_scale_is_rejected_at_the_boundary() {
        let server = ServerReading {
            id: "srv-2".to_string(),
            ph: 6.0,
            ec_raw: 1.0,
            ec_25c: 1.0,
            temp_c: 20.0,
            atc_on: true,
            ppm_scale: "640".to_string(),
            reservoir_id: None,
            plant_id: None,
            meter_id: None,
            note: None,
            measured_at: 1,
            created_at: 1,
        };
        assert!(matches!(
            server.into_reading(),
            Err(ValidationError::UnsupportedPpmScale(_))
        ));
    }

    #[test]
    fn test_pull_response_shape() {
        let json = r#"{"readings": [], "server_timestamp": 1700000005000}"#;
        let response: PullResponse = serde_json::from_str(json).unwrap();
        assert!(response.readings.is_empty());
        assert_eq!(response.server_timestamp, 1_700_000_005_000);
    }
}
