// Error types for the flow calibration workflow
//
// This module defines custom error types for the calibration session and for
// the collaborators it talks to (sensor gateway, calibration backend), with
// numeric codes suitable for surfacing to operators and logs.

mod calibration;
mod transport;

pub use calibration::{log_calibration_error, CalibrationError, CalibrationErrorCodes};
pub use transport::{log_transport_error, TransportError, TransportErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the library and the CLI.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
