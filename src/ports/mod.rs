//! Ports (interfaces) the calibration workflow depends on
//!
//! The session never talks to hardware or servers directly. Everything it
//! needs from the outside world goes through these traits:
//!
//! - **SensorSource**: enumerate sensors and read pulse counts (gateway, mock)
//! - **CalibrationStore**: persist a derived constant (backend, file, mock)
//! - **Notifier**: surface status and errors to the operator (log, UI, none)

pub mod notifier;
pub mod sensor;
pub mod store;

pub use notifier::{Notification, NotificationLevel, Notifier, NullNotifier};
pub use sensor::{Sensor, SensorSource};
pub use store::{CalibrationStore, SaveReceipt};
