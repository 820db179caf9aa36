// CalibrationManager: async driver for the calibration session
//
// Single Responsibility: run each session operation against the injected
// sensor source and calibration store, one call at a time, and report every
// outcome to the operator.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::calibration::{
    CalibrationOutcome, CalibrationSession, SessionPhase, SessionSnapshot, Volume,
};
use crate::error::{log_calibration_error, CalibrationError, ErrorCode};
use crate::ports::{
    CalibrationStore, Notification, Notifier, NullNotifier, SaveReceipt, Sensor, SensorSource,
};

/// Manages one technician's calibration session
///
/// This manager handles:
/// - Sensor enumeration for the selection list
/// - Start/Stop/Submit, each issuing exactly one collaborator call
/// - Single-flight: the session sits in an in-flight phase while the call is
///   awaited, so a second trigger is rejected with `Busy`
/// - Notifications and error logging for every outcome
///
/// The session lock is never held across an `.await`. If a caller drops an
/// operation's future mid-call (timeout, `select!`, task abort) the session
/// rolls back to the phase it was in before the call.
///
/// # Example
/// ```ignore
/// let manager = CalibrationManager::new(sensors, store).with_notifier(notifier);
/// manager.configure("Device_001_Sensor_1", Volume::milliliters(500.0))?;
/// manager.start().await?;
/// // ... pour the reference volume ...
/// manager.stop().await?;
/// manager.submit().await?;
/// ```
pub struct CalibrationManager {
    session: Arc<Mutex<CalibrationSession>>,
    sensors: Arc<dyn SensorSource>,
    store: Arc<dyn CalibrationStore>,
    notifier: Arc<dyn Notifier>,
}

impl CalibrationManager {
    /// Create a manager with a fresh idle session and no notifier
    pub fn new(sensors: Arc<dyn SensorSource>, store: Arc<dyn CalibrationStore>) -> Self {
        Self {
            session: Arc::new(Mutex::new(CalibrationSession::new())),
            sensors,
            store,
            notifier: Arc::new(NullNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// List sensors available for selection
    ///
    /// Failures are surfaced and returned; there is no retry.
    pub async fn list_sensors(&self) -> Result<Vec<Sensor>, CalibrationError> {
        self.sensors
            .list()
            .await
            .map_err(|source| CalibrationError::SensorList { source })
            .inspect_err(|err| self.report(err, "list_sensors"))
    }

    /// Select sensor and reference volume (idle only)
    pub fn configure(
        &self,
        sensor_id: impl Into<String>,
        volume: Volume,
    ) -> Result<(), CalibrationError> {
        let mut session = self.lock_session()?;
        session
            .configure(sensor_id, volume)
            .inspect_err(|err| self.report(err, "configure"))
    }

    /// Capture the start reading
    ///
    /// # Returns
    /// * `Ok(u64)` - Start pulse count
    /// * `Err(CalibrationError)` - Rejected input (no read issued) or failed read
    ///
    /// # Errors
    /// - No sensor selected / invalid volume: session stays idle
    /// - Wrong phase or another call in flight
    /// - Sensor read failure: session enters the error phase
    pub async fn start(&self) -> Result<u64, CalibrationError> {
        let sensor_id = {
            let mut session = self.lock_session()?;
            session
                .begin_start()
                .inspect_err(|err| self.report(err, "start_calibration"))?
        };

        tracing::info!("[CalibrationManager] Polling {} for start count", sensor_id);
        let in_flight = InFlightGuard::new(&self.session);
        let reading = self.sensors.read(&sensor_id).await;
        let result = self.lock_session()?.complete_start(reading);
        in_flight.disarm();

        match result {
            Ok(count) => {
                tracing::info!("[CalibrationManager] Start count for {}: {}", sensor_id, count);
                self.notifier.notify(Notification::success(
                    "Calibration Started",
                    format!("Start count recorded: {}", count),
                ));
                Ok(count)
            }
            Err(err) => {
                self.report(&err, "start_calibration");
                Err(err)
            }
        }
    }

    /// Capture the end reading and derive the constant
    ///
    /// # Errors
    /// - Wrong phase or another call in flight
    /// - Sensor read failure, zero or negative count difference: session
    ///   enters the error phase and must be reset
    pub async fn stop(&self) -> Result<CalibrationOutcome, CalibrationError> {
        let sensor_id = {
            let mut session = self.lock_session()?;
            session
                .begin_stop()
                .inspect_err(|err| self.report(err, "stop_calibration"))?
        };

        tracing::info!("[CalibrationManager] Polling {} for end count", sensor_id);
        let in_flight = InFlightGuard::new(&self.session);
        let reading = self.sensors.read(&sensor_id).await;
        let result = self.lock_session()?.complete_stop(reading);
        in_flight.disarm();

        match result {
            Ok(outcome) => {
                tracing::info!(
                    "[CalibrationManager] {} pulses for {}, constant {}",
                    outcome.count_difference,
                    sensor_id,
                    outcome.calibration_constant
                );
                self.notifier.notify(Notification::success(
                    "Calibration Complete",
                    format!("Calibration constant: {}", outcome.calibration_constant),
                ));
                Ok(outcome)
            }
            Err(err) => {
                self.report(&err, "stop_calibration");
                Err(err)
            }
        }
    }

    /// Persist the derived constant
    ///
    /// A failed save leaves the session complete so it can be retried; each
    /// call issues exactly one save.
    pub async fn submit(&self) -> Result<SaveReceipt, CalibrationError> {
        let request = {
            let mut session = self.lock_session()?;
            session
                .begin_submit()
                .inspect_err(|err| self.report(err, "submit_calibration"))?
        };

        tracing::info!(
            "[CalibrationManager] Saving constant {} for {}",
            request.calibration_constant,
            request.sensor_id
        );
        let in_flight = InFlightGuard::new(&self.session);
        let saved = self
            .store
            .save(
                &request.sensor_id,
                request.calibration_constant,
                request.metadata,
            )
            .await;
        let result = self.lock_session()?.complete_submit(saved);
        in_flight.disarm();

        match result {
            Ok(receipt) => {
                self.notifier
                    .notify(Notification::success("Success", receipt.message.clone()));
                Ok(receipt)
            }
            Err(err) => {
                tracing::warn!("[CalibrationManager] Save failed, submit can be retried");
                self.report(&err, "submit_calibration");
                Err(err)
            }
        }
    }

    /// Return to idle, keeping sensor and volume
    pub fn reset(&self) -> Result<(), CalibrationError> {
        let mut session = self.lock_session()?;
        let previous = session.phase();
        session
            .reset()
            .inspect_err(|err| self.report(err, "reset_calibration"))?;
        if previous != SessionPhase::Idle {
            tracing::info!("[CalibrationManager] Reset from {}", previous);
        }
        Ok(())
    }

    pub fn phase(&self) -> Result<SessionPhase, CalibrationError> {
        Ok(self.lock_session()?.phase())
    }

    /// Copy of the session for display
    pub fn snapshot(&self) -> Result<SessionSnapshot, CalibrationError> {
        Ok(self.lock_session()?.snapshot())
    }

    /// Operator instructions while running
    pub fn instructions(&self) -> Result<Option<String>, CalibrationError> {
        Ok(self.lock_session()?.instructions())
    }

    // ========================================================================
    // HELPER METHODS
    // ========================================================================

    /// Safely acquire lock on the session
    fn lock_session(&self) -> Result<MutexGuard<'_, CalibrationSession>, CalibrationError> {
        self.session
            .lock()
            .map_err(|_| CalibrationError::StatePoisoned)
    }

    /// Log an error and surface it to the operator
    fn report(&self, err: &CalibrationError, context: &str) {
        log_calibration_error(err, context);
        self.notifier.notify(Notification::error(err.message()));
    }
}

/// Rolls the session out of its in-flight phase unless disarmed
///
/// Armed between `begin_*` and `complete_*`; dropping it armed means the
/// collaborator's result will never arrive.
struct InFlightGuard<'a> {
    session: &'a Mutex<CalibrationSession>,
    armed: bool,
}

impl<'a> InFlightGuard<'a> {
    fn new(session: &'a Mutex<CalibrationSession>) -> Self {
        Self {
            session,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Ok(mut session) = self.session.lock() {
            if let Some(abandoned) = session.abandon_in_flight() {
                tracing::warn!(
                    "[CalibrationManager] Call abandoned while {}, rolled back to {}",
                    abandoned,
                    session.phase()
                );
            }
        }
    }
}
