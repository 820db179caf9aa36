// Calibration error types and constants

use crate::calibration::phase::{Operation, SessionPhase};
use crate::error::{ErrorCode, TransportError};
use log::error;
use std::fmt;

/// Calibration error code constants
///
/// These constants provide a single source of truth for error codes
/// reported by the calibration session and manager.
///
/// Error code range: 2001-2010
pub struct CalibrationErrorCodes {}

impl CalibrationErrorCodes {
    /// Start requested without a selected sensor
    pub const NO_SENSOR_SELECTED: i32 = 2001;

    /// Reference volume missing, zero, negative or not finite
    pub const INVALID_VOLUME: i32 = 2002;

    /// Operation not allowed in the current phase
    pub const INVALID_PHASE: i32 = 2003;

    /// Another sensor read or save is still in flight
    pub const BUSY: i32 = 2004;

    /// Start and end readings are identical
    pub const ZERO_DIFFERENCE: i32 = 2005;

    /// End reading is lower than the start reading
    pub const NEGATIVE_DIFFERENCE: i32 = 2006;

    /// Sensor read failed
    pub const SENSOR_READ_FAILED: i32 = 2007;

    /// Calibration store rejected or failed the save
    pub const SAVE_FAILED: i32 = 2008;

    /// Sensor enumeration failed
    pub const SENSOR_LIST_FAILED: i32 = 2009;

    /// Session lock was poisoned
    pub const STATE_POISONED: i32 = 2010;
}

/// Log a calibration error with structured context
///
/// This function logs calibration errors with structured fields including:
/// - error_code: Numeric error code for programmatic handling
/// - component: The component where the error occurred
/// - message: Human-readable error message
/// - context: Additional contextual information
pub fn log_calibration_error(err: &CalibrationError, context: &str) {
    error!(
        "Calibration error in {}: code={}, component=CalibrationSession, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Calibration-related errors
///
/// These errors cover input validation, state machine misuse, derivation
/// failures and collaborator failures surfaced by the session.
///
/// Error code ranges: 2001-2010
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// Start requested without a selected sensor
    NoSensorSelected,

    /// Reference volume missing, zero, negative or not finite
    InvalidVolume { volume: Option<f64> },

    /// Operation not allowed in the current phase
    InvalidPhase {
        operation: Operation,
        phase: SessionPhase,
    },

    /// A sensor read or save is in flight
    Busy { phase: SessionPhase },

    /// No pulses between start and end; carries the shared reading
    ZeroDifference { reading: u64 },

    /// Counter went backwards between start and end
    NegativeDifference { start: u64, end: u64 },

    /// Sensor read failed
    SensorRead {
        sensor_id: String,
        source: TransportError,
    },

    /// Calibration store failed the save
    SaveFailed {
        sensor_id: String,
        source: TransportError,
    },

    /// Sensor enumeration failed
    SensorList { source: TransportError },

    /// Session lock was poisoned
    StatePoisoned,
}

impl CalibrationError {
    /// True for failures of the user's input rather than of the workflow
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CalibrationError::NoSensorSelected | CalibrationError::InvalidVolume { .. }
        )
    }
}

impl ErrorCode for CalibrationError {
    fn code(&self) -> i32 {
        match self {
            CalibrationError::NoSensorSelected => CalibrationErrorCodes::NO_SENSOR_SELECTED,
            CalibrationError::InvalidVolume { .. } => CalibrationErrorCodes::INVALID_VOLUME,
            CalibrationError::InvalidPhase { .. } => CalibrationErrorCodes::INVALID_PHASE,
            CalibrationError::Busy { .. } => CalibrationErrorCodes::BUSY,
            CalibrationError::ZeroDifference { .. } => CalibrationErrorCodes::ZERO_DIFFERENCE,
            CalibrationError::NegativeDifference { .. } => {
                CalibrationErrorCodes::NEGATIVE_DIFFERENCE
            }
            CalibrationError::SensorRead { .. } => CalibrationErrorCodes::SENSOR_READ_FAILED,
            CalibrationError::SaveFailed { .. } => CalibrationErrorCodes::SAVE_FAILED,
            CalibrationError::SensorList { .. } => CalibrationErrorCodes::SENSOR_LIST_FAILED,
            CalibrationError::StatePoisoned => CalibrationErrorCodes::STATE_POISONED,
        }
    }

    fn message(&self) -> String {
        match self {
            CalibrationError::NoSensorSelected => "Select a sensor first".to_string(),
            CalibrationError::InvalidVolume { volume: Some(v) } => {
                format!("Calibration volume must be greater than 0 (got {})", v)
            }
            CalibrationError::InvalidVolume { volume: None } => {
                "Enter the calibration volume first".to_string()
            }
            CalibrationError::InvalidPhase { operation, phase } => {
                format!("Cannot {} while {}", operation, phase)
            }
            CalibrationError::Busy { phase } => {
                format!("Please wait, session is busy ({})", phase)
            }
            CalibrationError::ZeroDifference { reading } => format!(
                "Count difference is zero (both readings {}). Please ensure water flowed through the sensor.",
                reading
            ),
            CalibrationError::NegativeDifference { start, end } => format!(
                "End count {} is lower than start count {}. The sensor counter may have been reset.",
                end, start
            ),
            CalibrationError::SensorRead { sensor_id, source } => {
                format!("Failed to poll sensor {}: {}", sensor_id, source.message())
            }
            CalibrationError::SaveFailed { sensor_id, source } => format!(
                "Failed to save calibration for sensor {}: {}",
                sensor_id,
                source.message()
            ),
            CalibrationError::SensorList { source } => {
                format!("Failed to load sensors: {}", source.message())
            }
            CalibrationError::StatePoisoned => "Calibration session lock poisoned".to_string(),
        }
    }
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CalibrationError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for CalibrationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CalibrationError::SensorRead { source, .. }
            | CalibrationError::SaveFailed { source, .. }
            | CalibrationError::SensorList { source } => Some(source),
            _ => None,
        }
    }
}
