// Calibration module - flow sensor calibration workflow
//
// This module provides the pieces of a calibration run:
// 1. CalibrationSession: the workflow state machine and captured data
// 2. derive_constant: volume-per-pulse arithmetic
// 3. Volume/VolumeUnit: operator units normalized to milliliters
//
// The calibration workflow:
// 1. Configure sensor and reference volume
// 2. Start: capture the start pulse count
// 3. Pour the reference volume through the sensor
// 4. Stop: capture the end pulse count and derive the constant
// 5. Submit the constant to the calibration store, or reset

pub mod derivation;
pub mod phase;
pub mod record;
pub mod session;
pub mod units;

pub use derivation::{derive_constant, Derivation, CONSTANT_DECIMALS};
pub use phase::{FailedStep, Operation, SessionControls, SessionPhase};
pub use record::{CalibrationMetadata, CalibrationOutcome, CalibrationRecord};
pub use session::{CalibrationSession, SessionSnapshot, SubmitRequest};
pub use units::{Volume, VolumeUnit, CONSTANT_UNIT};
