// Flow Calibration Core - sensor calibration workflow
// Derives a volume-per-pulse constant from two pulse counts and a known volume

// Module declarations
pub mod adapters;
pub mod calibration;
pub mod config;
pub mod error;
pub mod managers;
pub mod ports;
pub mod telemetry;

// Re-exports for convenience
pub use calibration::{CalibrationSession, SessionPhase, SessionSnapshot, Volume, VolumeUnit};
pub use error::{CalibrationError, TransportError};
pub use managers::CalibrationManager;
