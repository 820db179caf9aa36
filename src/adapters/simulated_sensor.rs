//! Simulated flow meter
//!
//! Keeps one pulse counter per sensor. Counters only move when `pour` is
//! called, so every reading is the true simulated count: there is no noise
//! and no adjustment of readings to make a run succeed.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::SimulatorConfig;
use crate::error::{log_transport_error, TransportError};
use crate::ports::{Sensor, SensorSource};

pub struct SimulatedSensorSource {
    sensors: Vec<Sensor>,
    counters: Mutex<HashMap<String, u64>>,
    /// Artificial gateway round-trip applied to every call
    latency: Duration,
}

impl SimulatedSensorSource {
    /// Create a meter whose counters all start at `initial_count`
    pub fn new(sensors: Vec<Sensor>, initial_count: u64) -> Self {
        let counters = sensors
            .iter()
            .map(|sensor| (sensor.id.clone(), initial_count))
            .collect();
        Self {
            sensors,
            counters: Mutex::new(counters),
            latency: Duration::ZERO,
        }
    }

    /// Build `ports_per_device` sensors for each configured device
    pub fn from_config(config: &SimulatorConfig) -> Self {
        let sensors = config
            .devices
            .iter()
            .flat_map(|device| {
                (1..=config.ports_per_device).map(move |port| Sensor::on_port(device, port))
            })
            .collect();
        Self::new(sensors, config.initial_count)
            .with_latency(Duration::from_millis(config.latency_ms))
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Simulate water flowing through `sensor_id`
    ///
    /// # Returns
    /// * `Ok(u64)` - Counter value after the pour
    /// * `Err(TransportError)` - Unknown sensor
    pub fn pour(&self, sensor_id: &str, pulses: u64) -> Result<u64, TransportError> {
        let mut counters = self.lock_counters()?;
        let counter = counters
            .get_mut(sensor_id)
            .ok_or_else(|| TransportError::UnknownSensor {
                sensor_id: sensor_id.to_string(),
            })?;
        *counter = counter.saturating_add(pulses);
        Ok(*counter)
    }

    /// Overwrite a counter, e.g. to simulate a device reset
    pub fn set_count(&self, sensor_id: &str, count: u64) -> Result<(), TransportError> {
        let mut counters = self.lock_counters()?;
        match counters.get_mut(sensor_id) {
            Some(counter) => {
                *counter = count;
                Ok(())
            }
            None => Err(TransportError::UnknownSensor {
                sensor_id: sensor_id.to_string(),
            }),
        }
    }

    fn lock_counters(&self) -> Result<MutexGuard<'_, HashMap<String, u64>>, TransportError> {
        self.counters.lock().map_err(|_| TransportError::Io {
            details: "simulated counter state poisoned".to_string(),
        })
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl SensorSource for SimulatedSensorSource {
    async fn list(&self) -> Result<Vec<Sensor>, TransportError> {
        self.simulate_latency().await;
        Ok(self.sensors.clone())
    }

    async fn read(&self, sensor_id: &str) -> Result<u64, TransportError> {
        self.simulate_latency().await;
        let counters = self.lock_counters()?;
        counters
            .get(sensor_id)
            .copied()
            .ok_or_else(|| TransportError::UnknownSensor {
                sensor_id: sensor_id.to_string(),
            })
            .inspect_err(|err| log_transport_error(err, "simulated_sensor_read"))
    }
}
