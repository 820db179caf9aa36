//! Calibration store port - persistence of derived constants

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationMetadata;
use crate::error::TransportError;

/// Confirmation returned by a successful save
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveReceipt {
    pub message: String,
}

impl SaveReceipt {
    /// Standard confirmation text
    pub fn saved(sensor_id: &str, calibration_constant: f64) -> Self {
        Self {
            message: format!(
                "Calibration constant {} saved successfully for sensor {}",
                calibration_constant, sensor_id
            ),
        }
    }
}

/// Port for persisting calibration constants
///
/// Saves are not required to be idempotent; a retried submit issues another
/// save.
#[async_trait]
pub trait CalibrationStore: Send + Sync {
    async fn save(
        &self,
        sensor_id: &str,
        calibration_constant: f64,
        metadata: CalibrationMetadata,
    ) -> Result<SaveReceipt, TransportError>;
}
