//! Integration tests for the calibration workflow
//!
//! These tests drive `CalibrationManager` end to end with deterministic fakes:
//! - ScriptedSensor returns queued readings and records every read
//! - RecordingStore records every save and fails on demand
//! - TelemetryCollector captures operator notifications
//!
//! The gated sensor holds a read open so the in-flight phase can be observed.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use flow_calibration::calibration::{
    CalibrationMetadata, FailedStep, SessionPhase, Volume,
};
use flow_calibration::error::{CalibrationError, TransportError};
use flow_calibration::managers::CalibrationManager;
use flow_calibration::ports::{
    CalibrationStore, NotificationLevel, SaveReceipt, Sensor, SensorSource,
};
use flow_calibration::telemetry::TelemetryCollector;
use tokio::sync::Notify;

const SENSOR: &str = "Device_001_Sensor_1";

/// Sensor fake returning scripted readings in order
#[derive(Default)]
struct ScriptedSensor {
    readings: Mutex<VecDeque<Result<u64, TransportError>>>,
    reads: Mutex<Vec<String>>,
    list_error: Option<TransportError>,
    /// When set, each read signals `entered` and waits for `release`
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
    /// Zero-based index of the first read the gate applies to
    gate_from_read: usize,
}

impl ScriptedSensor {
    fn with_readings(readings: Vec<Result<u64, TransportError>>) -> Self {
        Self {
            readings: Mutex::new(readings.into()),
            ..Default::default()
        }
    }

    fn read_count(&self) -> usize {
        self.reads.lock().unwrap().len()
    }
}

#[async_trait]
impl SensorSource for ScriptedSensor {
    async fn list(&self) -> Result<Vec<Sensor>, TransportError> {
        match &self.list_error {
            Some(err) => Err(err.clone()),
            None => Ok(vec![Sensor::on_port("Device_001", 1)]),
        }
    }

    async fn read(&self, sensor_id: &str) -> Result<u64, TransportError> {
        let index = {
            let mut reads = self.reads.lock().unwrap();
            reads.push(sensor_id.to_string());
            reads.len() - 1
        };
        let gate = self.gate.as_ref().filter(|_| index >= self.gate_from_read);
        if let Some((entered, release)) = gate {
            entered.notify_one();
            release.notified().await;
        }
        self.readings
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(TransportError::Timeout { after_ms: 5_000 }))
    }
}

/// Store fake that records saves; the first `failures` saves are rejected
#[derive(Default)]
struct RecordingStore {
    saves: Mutex<Vec<(String, f64, CalibrationMetadata)>>,
    failures: Mutex<usize>,
}

impl RecordingStore {
    fn failing(failures: usize) -> Self {
        Self {
            failures: Mutex::new(failures),
            ..Default::default()
        }
    }

    fn saves(&self) -> Vec<(String, f64, CalibrationMetadata)> {
        self.saves.lock().unwrap().clone()
    }
}

#[async_trait]
impl CalibrationStore for RecordingStore {
    async fn save(
        &self,
        sensor_id: &str,
        calibration_constant: f64,
        metadata: CalibrationMetadata,
    ) -> Result<SaveReceipt, TransportError> {
        self.saves
            .lock()
            .unwrap()
            .push((sensor_id.to_string(), calibration_constant, metadata));

        let mut failures = self.failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(TransportError::Rejected {
                reason: "database unavailable".to_string(),
            });
        }
        Ok(SaveReceipt::saved(sensor_id, calibration_constant))
    }
}

struct Harness {
    manager: CalibrationManager,
    sensor: Arc<ScriptedSensor>,
    store: Arc<RecordingStore>,
    telemetry: Arc<TelemetryCollector>,
}

fn harness(sensor: ScriptedSensor, store: RecordingStore) -> Harness {
    let sensor = Arc::new(sensor);
    let store = Arc::new(store);
    let telemetry = Arc::new(TelemetryCollector::default());
    let manager = CalibrationManager::new(sensor.clone(), store.clone())
        .with_notifier(telemetry.clone());
    Harness {
        manager,
        sensor,
        store,
        telemetry,
    }
}

/// Volume 500 ml, start 10000, end 15000
#[tokio::test]
async fn test_scenario_a_derives_constant() {
    let h = harness(
        ScriptedSensor::with_readings(vec![Ok(10_000), Ok(15_000)]),
        RecordingStore::default(),
    );
    h.manager
        .configure(SENSOR, Volume::milliliters(500.0))
        .unwrap();

    assert_eq!(h.manager.start().await.unwrap(), 10_000);
    assert_eq!(h.manager.phase().unwrap(), SessionPhase::Running);

    let outcome = h.manager.stop().await.unwrap();
    assert_eq!(outcome.end_reading, 15_000);
    assert_eq!(outcome.count_difference, 5_000);
    assert_eq!(outcome.calibration_constant, 0.1);

    let snapshot = h.manager.snapshot().unwrap();
    assert_eq!(snapshot.phase, SessionPhase::Complete);
    assert_eq!(snapshot.calibration_constant, Some(0.1));
    assert!(snapshot.controls.can_submit);
    assert_eq!(h.sensor.read_count(), 2);
}

/// Volume 1 L, start and end both 20000
#[tokio::test]
async fn test_scenario_b_zero_difference() {
    let h = harness(
        ScriptedSensor::with_readings(vec![Ok(20_000), Ok(20_000)]),
        RecordingStore::default(),
    );
    h.manager.configure(SENSOR, Volume::liters(1.0)).unwrap();
    h.manager.start().await.unwrap();

    let result = h.manager.stop().await;
    assert!(matches!(
        result,
        Err(CalibrationError::ZeroDifference { reading: 20_000 })
    ));

    let snapshot = h.manager.snapshot().unwrap();
    assert_eq!(snapshot.phase, SessionPhase::Error(FailedStep::Stop));
    assert_eq!(snapshot.calibration_constant, None);
    assert_eq!(snapshot.count_difference, None);
    assert_eq!(snapshot.volume_ml, Some(1000.0));
}

/// Scenario A followed by a successful submit
#[tokio::test]
async fn test_scenario_c_submit_saves_once() {
    let h = harness(
        ScriptedSensor::with_readings(vec![Ok(10_000), Ok(15_000)]),
        RecordingStore::default(),
    );
    h.manager
        .configure(SENSOR, Volume::milliliters(500.0))
        .unwrap();
    h.manager.start().await.unwrap();
    h.manager.stop().await.unwrap();

    let receipt = h.manager.submit().await.unwrap();
    assert!(receipt.message.contains(SENSOR));
    assert_eq!(h.manager.phase().unwrap(), SessionPhase::Submitted);

    let saves = h.store.saves();
    assert_eq!(saves.len(), 1);
    assert_eq!(
        saves[0],
        (
            SENSOR.to_string(),
            0.1,
            CalibrationMetadata {
                start_reading: 10_000,
                end_reading: 15_000,
                volume_ml: 500.0,
            }
        )
    );

    let last = h.telemetry.snapshot().recent.pop().unwrap();
    assert_eq!(last.level, NotificationLevel::Success);
}

/// Start with no sensor selected
#[tokio::test]
async fn test_scenario_d_start_without_sensor() {
    let h = harness(
        ScriptedSensor::with_readings(vec![Ok(10_000)]),
        RecordingStore::default(),
    );

    assert!(matches!(
        h.manager.start().await,
        Err(CalibrationError::NoSensorSelected)
    ));
    assert_eq!(h.manager.phase().unwrap(), SessionPhase::Idle);
    assert_eq!(h.sensor.read_count(), 0);

    // Empty id is the same as no selection
    h.manager
        .configure("", Volume::milliliters(500.0))
        .unwrap();
    assert!(h.manager.start().await.is_err());
    assert_eq!(h.sensor.read_count(), 0);
}

#[tokio::test]
async fn test_invalid_volume_never_reads() {
    let h = harness(ScriptedSensor::default(), RecordingStore::default());
    h.manager
        .configure(SENSOR, Volume::milliliters(0.0))
        .unwrap();

    assert!(matches!(
        h.manager.start().await,
        Err(CalibrationError::InvalidVolume { volume: Some(v) }) if v == 0.0
    ));
    assert_eq!(h.manager.phase().unwrap(), SessionPhase::Idle);

    // Finite as typed but infinite in milliliters
    h.manager
        .configure(SENSOR, Volume::liters(f64::MAX))
        .unwrap();
    assert!(matches!(
        h.manager.start().await,
        Err(CalibrationError::InvalidVolume { .. })
    ));
    assert_eq!(h.manager.phase().unwrap(), SessionPhase::Idle);
    assert_eq!(h.sensor.read_count(), 0);
}

#[tokio::test]
async fn test_second_trigger_while_reading_is_busy() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let sensor = ScriptedSensor {
        gate: Some((entered.clone(), release.clone())),
        ..ScriptedSensor::with_readings(vec![Ok(10_000)])
    };
    let h = harness(sensor, RecordingStore::default());
    h.manager
        .configure(SENSOR, Volume::milliliters(500.0))
        .unwrap();

    let manager = Arc::new(h.manager);
    let first = tokio::spawn({
        let manager = manager.clone();
        async move { manager.start().await }
    });

    entered.notified().await;
    assert_eq!(manager.phase().unwrap(), SessionPhase::Starting);
    assert!(matches!(
        manager.start().await,
        Err(CalibrationError::Busy { .. })
    ));
    assert!(matches!(
        manager.stop().await,
        Err(CalibrationError::Busy { .. })
    ));
    assert!(matches!(
        manager.reset(),
        Err(CalibrationError::Busy { .. })
    ));
    assert!(!manager.snapshot().unwrap().controls.can_start);

    release.notify_one();
    assert_eq!(first.await.unwrap().unwrap(), 10_000);
    assert_eq!(manager.phase().unwrap(), SessionPhase::Running);
    assert_eq!(h.sensor.read_count(), 1);
}

#[tokio::test]
async fn test_failed_save_retry_issues_one_more_save() {
    let h = harness(
        ScriptedSensor::with_readings(vec![Ok(0), Ok(4_000)]),
        RecordingStore::failing(1),
    );
    h.manager
        .configure(SENSOR, Volume::milliliters(500.0))
        .unwrap();
    h.manager.start().await.unwrap();
    h.manager.stop().await.unwrap();

    assert!(matches!(
        h.manager.submit().await,
        Err(CalibrationError::SaveFailed { .. })
    ));
    let snapshot = h.manager.snapshot().unwrap();
    assert_eq!(snapshot.phase, SessionPhase::Complete);
    assert_eq!(snapshot.calibration_constant, Some(0.125));
    assert_eq!(h.store.saves().len(), 1);

    h.manager.submit().await.unwrap();
    assert_eq!(h.store.saves().len(), 2);
    assert_eq!(h.manager.phase().unwrap(), SessionPhase::Submitted);

    // Submitted is terminal for submit
    assert!(matches!(
        h.manager.submit().await,
        Err(CalibrationError::InvalidPhase { .. })
    ));
    assert_eq!(h.store.saves().len(), 2);
}

#[tokio::test]
async fn test_failed_stop_read_requires_reset() {
    let h = harness(
        ScriptedSensor::with_readings(vec![
            Ok(100),
            Err(TransportError::Timeout { after_ms: 5_000 }),
            Ok(100),
            Ok(600),
        ]),
        RecordingStore::default(),
    );
    h.manager
        .configure(SENSOR, Volume::milliliters(50.0))
        .unwrap();
    h.manager.start().await.unwrap();

    assert!(matches!(
        h.manager.stop().await,
        Err(CalibrationError::SensorRead { .. })
    ));
    let snapshot = h.manager.snapshot().unwrap();
    assert_eq!(snapshot.phase, SessionPhase::Error(FailedStep::Stop));
    assert!(snapshot.status_message.starts_with("Failed to poll sensor"));
    assert_eq!(snapshot.start_reading, None);
    assert!(!snapshot.controls.can_stop);

    assert!(matches!(
        h.manager.stop().await,
        Err(CalibrationError::InvalidPhase { .. })
    ));
    assert_eq!(h.sensor.read_count(), 2);

    h.manager.reset().unwrap();
    h.manager.start().await.unwrap();
    let outcome = h.manager.stop().await.unwrap();
    assert_eq!(outcome.count_difference, 500);
    assert_eq!(outcome.calibration_constant, 0.1);
}

#[tokio::test]
async fn test_abandoned_start_can_be_reset() {
    let sensor = ScriptedSensor {
        gate: Some((Arc::new(Notify::new()), Arc::new(Notify::new()))),
        ..ScriptedSensor::with_readings(vec![Ok(10_000)])
    };
    let h = harness(sensor, RecordingStore::default());
    h.manager
        .configure(SENSOR, Volume::milliliters(500.0))
        .unwrap();

    let result = tokio::time::timeout(Duration::from_millis(50), h.manager.start()).await;
    assert!(result.is_err());
    assert_eq!(h.sensor.read_count(), 1);

    // The abandoned read is never applied
    let snapshot = h.manager.snapshot().unwrap();
    assert_eq!(snapshot.phase, SessionPhase::Idle);
    assert_eq!(snapshot.start_reading, None);
    assert!(snapshot.controls.can_start);
    h.manager.reset().unwrap();
    assert_eq!(h.manager.phase().unwrap(), SessionPhase::Idle);
}

#[tokio::test]
async fn test_abandoned_stop_returns_to_running() {
    let sensor = ScriptedSensor {
        gate: Some((Arc::new(Notify::new()), Arc::new(Notify::new()))),
        gate_from_read: 1,
        ..ScriptedSensor::with_readings(vec![Ok(10_000), Ok(15_000)])
    };
    let h = harness(sensor, RecordingStore::default());
    h.manager
        .configure(SENSOR, Volume::milliliters(500.0))
        .unwrap();
    h.manager.start().await.unwrap();

    let result = tokio::time::timeout(Duration::from_millis(50), h.manager.stop()).await;
    assert!(result.is_err());

    let snapshot = h.manager.snapshot().unwrap();
    assert_eq!(snapshot.phase, SessionPhase::Running);
    assert_eq!(snapshot.start_reading, Some(10_000));
    assert_eq!(snapshot.end_reading, None);
    assert!(snapshot.controls.can_stop && snapshot.controls.can_reset);
}

#[tokio::test]
async fn test_negative_difference_is_an_error() {
    let h = harness(
        ScriptedSensor::with_readings(vec![Ok(15_000), Ok(10)]),
        RecordingStore::default(),
    );
    h.manager
        .configure(SENSOR, Volume::milliliters(500.0))
        .unwrap();
    h.manager.start().await.unwrap();

    assert!(matches!(
        h.manager.stop().await,
        Err(CalibrationError::NegativeDifference {
            start: 15_000,
            end: 10
        })
    ));
    assert_eq!(
        h.manager.phase().unwrap(),
        SessionPhase::Error(FailedStep::Stop)
    );
}

#[tokio::test]
async fn test_reset_is_idempotent_and_keeps_inputs() {
    let h = harness(
        ScriptedSensor::with_readings(vec![Ok(10_000), Ok(15_000)]),
        RecordingStore::default(),
    );
    h.manager
        .configure(SENSOR, Volume::liters(0.5))
        .unwrap();
    h.manager.start().await.unwrap();
    h.manager.stop().await.unwrap();

    h.manager.reset().unwrap();
    let once = h.manager.snapshot().unwrap();
    h.manager.reset().unwrap();
    let twice = h.manager.snapshot().unwrap();

    assert_eq!(once, twice);
    assert_eq!(once.phase, SessionPhase::Idle);
    assert_eq!(once.sensor_id.as_deref(), Some(SENSOR));
    assert_eq!(once.volume_ml, Some(500.0));
    assert_eq!(once.start_reading, None);
    assert_eq!(once.calibration_constant, None);
    assert_eq!(once.status_message, "Ready");
}

#[tokio::test]
async fn test_list_sensors_failure_is_notified() {
    let sensor = ScriptedSensor {
        list_error: Some(TransportError::Unreachable {
            endpoint: "gateway".to_string(),
        }),
        ..Default::default()
    };
    let h = harness(sensor, RecordingStore::default());

    assert!(matches!(
        h.manager.list_sensors().await,
        Err(CalibrationError::SensorList { .. })
    ));

    let snapshot = h.telemetry.snapshot();
    assert_eq!(snapshot.error_events, 1);
    assert_eq!(snapshot.recent[0].level, NotificationLevel::Error);
}
