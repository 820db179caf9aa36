// Data captured by a calibration run and handed to the calibration store

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Supporting data saved alongside a calibration constant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationMetadata {
    pub start_reading: u64,
    pub end_reading: u64,
    /// Reference volume in milliliters
    pub volume_ml: f64,
}

/// End reading and everything derived from it
///
/// Kept as one value so the three fields can only be set or cleared together.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationOutcome {
    pub end_reading: u64,
    pub count_difference: u64,
    pub calibration_constant: f64,
}

/// Persisted calibration row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    pub sensor_id: String,
    pub calibration_constant: f64,
    pub start_reading: u64,
    pub end_reading: u64,
    pub count_difference: u64,
    pub volume_ml: f64,
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: u64,
}

impl CalibrationRecord {
    /// Build a record stamped with the current time
    pub fn new(sensor_id: &str, calibration_constant: f64, metadata: &CalibrationMetadata) -> Self {
        Self {
            sensor_id: sensor_id.to_string(),
            calibration_constant,
            start_reading: metadata.start_reading,
            end_reading: metadata.end_reading,
            count_difference: metadata.end_reading.saturating_sub(metadata.start_reading),
            volume_ml: metadata.volume_ml,
            timestamp_ms: now_timestamp_ms(),
        }
    }
}

fn now_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
