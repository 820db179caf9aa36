//! Sensor port - enumeration and point-in-time pulse counts
//!
//! Implementations hide the transport (RS485 gateway, HTTP, simulator).
//! Any settling or debounce logic belongs here, not in the session.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// A physical measurement point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sensor {
    /// Unique identifier, e.g. `Device_001_Sensor_1`
    pub id: String,
    /// Owning device, e.g. `Device_001`
    pub device_id: String,
    /// Port/channel number on the device
    pub port: u8,
    /// Human-readable label, e.g. `Device 001 - Port 1`
    pub label: String,
}

impl Sensor {
    /// Build a sensor using the gateway's naming scheme
    pub fn on_port(device_id: &str, port: u8) -> Self {
        Self {
            id: format!("{}_Sensor_{}", device_id, port),
            device_id: device_id.to_string(),
            port,
            label: format!("{} - Port {}", device_id.replace('_', " "), port),
        }
    }
}

/// Port for reading flow sensors
///
/// # Example Implementation
///
/// ```ignore
/// struct GatewaySensorSource { client: GatewayClient }
///
/// #[async_trait]
/// impl SensorSource for GatewaySensorSource {
///     async fn list(&self) -> Result<Vec<Sensor>, TransportError> {
///         self.client.sensors().await
///     }
///
///     async fn read(&self, sensor_id: &str) -> Result<u64, TransportError> {
///         let sensor = self.client.lookup(sensor_id)?;
///         self.client.poll(&sensor.device_id, sensor.port).await
///     }
/// }
/// ```
#[async_trait]
pub trait SensorSource: Send + Sync {
    /// Currently available sensors
    async fn list(&self) -> Result<Vec<Sensor>, TransportError>;

    /// Instantaneous pulse count of `sensor_id`
    async fn read(&self, sensor_id: &str) -> Result<u64, TransportError>;
}
