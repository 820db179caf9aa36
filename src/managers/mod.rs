// Managers Module
//
// Async drivers around the synchronous calibration session.
//
// - CalibrationManager: runs Start/Stop/Submit against the sensor source and
//   calibration store, enforcing one outstanding call per session

pub mod calibration_manager;

pub use calibration_manager::CalibrationManager;
