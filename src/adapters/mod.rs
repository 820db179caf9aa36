//! Adapters - concrete implementations of the ports
//!
//! - **SimulatedSensorSource**: in-memory flow meter for demos and bench tests
//! - **JsonFileStore**: calibration constants appended to a JSON file
//! - **LogNotifier**: operator messages written through the `log` facade

pub mod json_store;
pub mod log_notifier;
pub mod simulated_sensor;

pub use json_store::JsonFileStore;
pub use log_notifier::LogNotifier;
pub use simulated_sensor::SimulatedSensorSource;
