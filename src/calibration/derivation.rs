// Calibration constant derivation
//
// Pure arithmetic used by the Stop step: the constant is the reference volume
// divided by the number of pulses counted while it flowed, rounded to five
// decimal places. The function is unit-agnostic; callers normalize the volume
// before calling it.

use serde::{Deserialize, Serialize};

use crate::error::CalibrationError;

/// Decimal places kept in the calibration constant
pub const CONSTANT_DECIMALS: i32 = 5;

/// Result of a successful derivation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Derivation {
    /// Pulses counted between the two readings
    pub count_difference: u64,
    /// Volume per pulse, rounded to `CONSTANT_DECIMALS`
    pub calibration_constant: f64,
}

/// Derive the calibration constant from two readings
///
/// # Arguments
/// * `start_reading` - Pulse count captured by Start
/// * `end_reading` - Pulse count captured by Stop
/// * `volume` - Reference volume in the canonical unit
///
/// # Returns
/// * `Ok(Derivation)` - Count difference and rounded constant
/// * `Err(CalibrationError)` - Zero or negative difference, or unusable volume
///
/// # Validation
/// - A counter that went backwards is rejected rather than producing a
///   negative constant; wrap-around handling belongs to the device layer
pub fn derive_constant(
    start_reading: u64,
    end_reading: u64,
    volume: f64,
) -> Result<Derivation, CalibrationError> {
    if !(volume.is_finite() && volume > 0.0) {
        return Err(CalibrationError::InvalidVolume {
            volume: Some(volume),
        });
    }

    if end_reading < start_reading {
        return Err(CalibrationError::NegativeDifference {
            start: start_reading,
            end: end_reading,
        });
    }

    let count_difference = end_reading - start_reading;
    if count_difference == 0 {
        return Err(CalibrationError::ZeroDifference {
            reading: end_reading,
        });
    }

    Ok(Derivation {
        count_difference,
        calibration_constant: round_to_decimals(
            volume / count_difference as f64,
            CONSTANT_DECIMALS,
        ),
    })
}

/// Round half away from zero to `decimals` places
pub fn round_to_decimals(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}
