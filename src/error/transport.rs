// Transport error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Transport error code constants
///
/// Single source of truth for the codes reported when a sensor gateway or
/// calibration backend call fails.
///
/// Error code range: 1001-1006
pub struct TransportErrorCodes {}

impl TransportErrorCodes {
    /// Gateway or backend could not be reached
    pub const UNREACHABLE: i32 = 1001;

    /// Call did not complete in time
    pub const TIMEOUT: i32 = 1002;

    /// Remote side refused the request
    pub const REJECTED: i32 = 1003;

    /// Remote side answered with something we could not interpret
    pub const INVALID_RESPONSE: i32 = 1004;

    /// Sensor identifier is not known to the gateway
    pub const UNKNOWN_SENSOR: i32 = 1005;

    /// Local I/O failure (files, sockets)
    pub const IO: i32 = 1006;
}

/// Log a transport error with structured context
///
/// Logs the numeric code, the component and the human-readable message.
pub fn log_transport_error(err: &TransportError, context: &str) {
    error!(
        "Transport error in {}: code={}, component=Transport, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Failures reported by `SensorSource` and `CalibrationStore` implementations
///
/// Error code range: 1001-1006
#[derive(Debug, Clone, PartialEq)]
pub enum TransportError {
    /// Gateway or backend could not be reached
    Unreachable { endpoint: String },

    /// Call did not complete within the adapter's own deadline
    Timeout { after_ms: u64 },

    /// Remote side refused the request
    Rejected { reason: String },

    /// Remote side answered with an unreadable payload
    InvalidResponse { reason: String },

    /// Sensor identifier is not known to the gateway
    UnknownSensor { sensor_id: String },

    /// Local I/O failure
    Io { details: String },
}

impl ErrorCode for TransportError {
    fn code(&self) -> i32 {
        match self {
            TransportError::Unreachable { .. } => TransportErrorCodes::UNREACHABLE,
            TransportError::Timeout { .. } => TransportErrorCodes::TIMEOUT,
            TransportError::Rejected { .. } => TransportErrorCodes::REJECTED,
            TransportError::InvalidResponse { .. } => TransportErrorCodes::INVALID_RESPONSE,
            TransportError::UnknownSensor { .. } => TransportErrorCodes::UNKNOWN_SENSOR,
            TransportError::Io { .. } => TransportErrorCodes::IO,
        }
    }

    fn message(&self) -> String {
        match self {
            TransportError::Unreachable { endpoint } => {
                format!("Unable to reach {}. Please try again.", endpoint)
            }
            TransportError::Timeout { after_ms } => {
                format!("Request timed out after {} ms", after_ms)
            }
            TransportError::Rejected { reason } => format!("Request rejected: {}", reason),
            TransportError::InvalidResponse { reason } => {
                format!("Invalid response: {}", reason)
            }
            TransportError::UnknownSensor { sensor_id } => {
                format!("Unknown sensor: {}", sensor_id)
            }
            TransportError::Io { details } => format!("I/O error: {}", details),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TransportError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for TransportError {}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::Io {
            details: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::InvalidResponse {
            reason: err.to_string(),
        }
    }
}
