// CalibrationSession - calibration workflow state machine
//
// The session holds everything a technician's calibration run captures and
// is the only place phases change. It performs no I/O: every operation that
// needs a sensor read or a store save is split into a `begin_*` step, which
// validates and moves into an in-flight phase, and a `complete_*` step, which
// applies the collaborator's result. The manager awaits the call in between.
//
// Workflow:
// 1. configure(sensor, volume)       Idle
// 2. begin_start / complete_start    Idle -> Starting -> Running | Error(Start)
// 3. begin_stop / complete_stop      Running -> Stopping -> Complete | Error(Stop)
// 4. begin_submit / complete_submit  Complete -> Submitting -> Submitted | Complete
// 5. reset                           any idle-able phase -> Idle

use serde::Serialize;

use crate::calibration::derivation::derive_constant;
use crate::calibration::phase::{FailedStep, Operation, SessionControls, SessionPhase};
use crate::calibration::record::{CalibrationMetadata, CalibrationOutcome};
use crate::calibration::units::{Volume, CONSTANT_UNIT};
use crate::error::{CalibrationError, ErrorCode, TransportError};
use crate::ports::SaveReceipt;

const STATUS_READY: &str = "Ready";
const STATUS_RUNNING: &str =
    "Calibration started. Pass water through the sensor, then stop the calibration.";
const STATUS_COMPLETE: &str = "Calibration complete. Review results and submit.";

/// Everything the store needs for one save
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitRequest {
    pub sensor_id: String,
    pub calibration_constant: f64,
    pub metadata: CalibrationMetadata,
}

/// Read-only copy of a session for display and serialization
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub sensor_id: Option<String>,
    pub reference_volume: Option<Volume>,
    pub volume_ml: Option<f64>,
    pub start_reading: Option<u64>,
    pub end_reading: Option<u64>,
    pub count_difference: Option<u64>,
    pub calibration_constant: Option<f64>,
    pub constant_unit: String,
    pub status_message: String,
    pub controls: SessionControls,
}

/// One technician's calibration run
#[derive(Debug, Clone)]
pub struct CalibrationSession {
    /// Selected sensor, required before Start
    sensor_id: Option<String>,
    /// Reference volume as entered
    volume: Option<Volume>,
    /// Pulse count captured by Start
    start_reading: Option<u64>,
    /// End reading plus derived values, set atomically by Stop
    outcome: Option<CalibrationOutcome>,
    phase: SessionPhase,
    status_message: String,
}

impl CalibrationSession {
    /// Create an idle session with nothing configured
    pub fn new() -> Self {
        Self {
            sensor_id: None,
            volume: None,
            start_reading: None,
            outcome: None,
            phase: SessionPhase::Idle,
            status_message: STATUS_READY.to_string(),
        }
    }

    // ========================================================================
    // OPERATIONS
    // ========================================================================

    /// Select the sensor and reference volume
    ///
    /// Only valid while idle. An empty sensor id counts as no selection.
    /// The volume is validated by Start, not here.
    pub fn configure(
        &mut self,
        sensor_id: impl Into<String>,
        volume: Volume,
    ) -> Result<(), CalibrationError> {
        self.ensure_allowed(Operation::Configure)?;

        let sensor_id = sensor_id.into();
        self.sensor_id = if sensor_id.trim().is_empty() {
            None
        } else {
            Some(sensor_id)
        };
        self.volume = Some(volume);
        Ok(())
    }

    /// Validate inputs and enter `Starting`
    ///
    /// # Returns
    /// * `Ok(String)` - Sensor id to read the start count from
    /// * `Err(CalibrationError)` - Wrong phase, busy, or invalid input; the
    ///   session is left untouched
    pub fn begin_start(&mut self) -> Result<String, CalibrationError> {
        self.ensure_allowed(Operation::Start)?;

        let sensor_id = self
            .sensor_id
            .clone()
            .ok_or(CalibrationError::NoSensorSelected)?;

        match self.volume {
            Some(volume) if volume.is_valid() => {}
            other => {
                return Err(CalibrationError::InvalidVolume {
                    volume: other.map(|v| v.value),
                })
            }
        }

        self.start_reading = None;
        self.outcome = None;
        self.phase = SessionPhase::Starting;
        self.status_message = "Polling sensor for start count...".to_string();
        Ok(sensor_id)
    }

    /// Apply the start reading
    ///
    /// Success moves to `Running`; a failed read moves to `Error(Start)`.
    pub fn complete_start(
        &mut self,
        reading: Result<u64, TransportError>,
    ) -> Result<u64, CalibrationError> {
        self.expect_in_flight(SessionPhase::Starting, Operation::Start)?;

        match reading {
            Ok(count) => {
                self.start_reading = Some(count);
                self.phase = SessionPhase::Running;
                self.status_message = STATUS_RUNNING.to_string();
                Ok(count)
            }
            Err(source) => {
                self.phase = SessionPhase::Error(FailedStep::Start);
                self.status_message = "Failed to poll sensor".to_string();
                Err(CalibrationError::SensorRead {
                    sensor_id: self.sensor_id.clone().unwrap_or_default(),
                    source,
                })
            }
        }
    }

    /// Enter `Stopping` (from `Running` only)
    pub fn begin_stop(&mut self) -> Result<String, CalibrationError> {
        self.ensure_allowed(Operation::Stop)?;

        let sensor_id = match (&self.sensor_id, self.start_reading) {
            (Some(sensor_id), Some(_)) => sensor_id.clone(),
            _ => return Err(self.invalid(Operation::Stop)),
        };

        self.outcome = None;
        self.phase = SessionPhase::Stopping;
        self.status_message = "Polling sensor for end count...".to_string();
        Ok(sensor_id)
    }

    /// Apply the end reading and derive the constant
    ///
    /// The end reading, count difference and constant are stored together or
    /// not at all. Any failure moves to `Error(Stop)` and clears the start
    /// reading; the returned error carries the readings involved.
    pub fn complete_stop(
        &mut self,
        reading: Result<u64, TransportError>,
    ) -> Result<CalibrationOutcome, CalibrationError> {
        self.expect_in_flight(SessionPhase::Stopping, Operation::Stop)?;

        let start_reading = self.start_reading.unwrap_or_default();
        let volume_ml = self.reference_volume_ml().unwrap_or_default();
        let sensor_id = self.sensor_id.clone().unwrap_or_default();

        let outcome = reading
            .map_err(|source| CalibrationError::SensorRead { sensor_id, source })
            .and_then(|end_reading| {
                derive_constant(start_reading, end_reading, volume_ml).map(|derived| {
                    CalibrationOutcome {
                        end_reading,
                        count_difference: derived.count_difference,
                        calibration_constant: derived.calibration_constant,
                    }
                })
            });

        match outcome {
            Ok(outcome) => {
                self.outcome = Some(outcome);
                self.phase = SessionPhase::Complete;
                self.status_message = STATUS_COMPLETE.to_string();
                Ok(outcome)
            }
            Err(err) => {
                self.start_reading = None;
                self.phase = SessionPhase::Error(FailedStep::Stop);
                self.status_message = err.message();
                Err(err)
            }
        }
    }

    /// Enter `Submitting` and hand back what to save
    pub fn begin_submit(&mut self) -> Result<SubmitRequest, CalibrationError> {
        self.ensure_allowed(Operation::Submit)?;

        let (sensor_id, calibration_constant, metadata) =
            match (&self.sensor_id, self.outcome, self.metadata()) {
                (Some(sensor_id), Some(outcome), Some(metadata)) => {
                    (sensor_id.clone(), outcome.calibration_constant, metadata)
                }
                _ => return Err(self.invalid(Operation::Submit)),
            };

        self.phase = SessionPhase::Submitting;
        self.status_message = "Saving to server...".to_string();
        Ok(SubmitRequest {
            sensor_id,
            calibration_constant,
            metadata,
        })
    }

    /// Apply the store's answer
    ///
    /// A failed save returns to `Complete` so the submit can be retried.
    pub fn complete_submit(
        &mut self,
        result: Result<SaveReceipt, TransportError>,
    ) -> Result<SaveReceipt, CalibrationError> {
        self.expect_in_flight(SessionPhase::Submitting, Operation::Submit)?;

        match result {
            Ok(receipt) => {
                self.phase = SessionPhase::Submitted;
                self.status_message = "Calibration saved successfully!".to_string();
                Ok(receipt)
            }
            Err(source) => {
                let err = CalibrationError::SaveFailed {
                    sensor_id: self.sensor_id.clone().unwrap_or_default(),
                    source,
                };
                self.phase = SessionPhase::Complete;
                self.status_message = err.message();
                Err(err)
            }
        }
    }

    /// Return to `Idle`, clearing readings and derived values
    ///
    /// Sensor and volume are preserved. Rejected only while a call is in
    /// flight.
    pub fn reset(&mut self) -> Result<(), CalibrationError> {
        self.ensure_allowed(Operation::Reset)?;

        self.start_reading = None;
        self.outcome = None;
        self.phase = SessionPhase::Idle;
        self.status_message = STATUS_READY.to_string();
        Ok(())
    }

    /// Roll an in-flight phase back to where its `begin_*` started
    ///
    /// Used when the collaborator call is abandoned before its result can be
    /// applied (caller timeout, task abort). No reading or save result is
    /// recorded.
    ///
    /// # Returns
    /// The phase that was abandoned, or `None` if nothing was in flight
    pub fn abandon_in_flight(&mut self) -> Option<SessionPhase> {
        let abandoned = self.phase;
        match abandoned {
            SessionPhase::Starting => {
                self.start_reading = None;
                self.phase = SessionPhase::Idle;
                self.status_message = STATUS_READY.to_string();
            }
            SessionPhase::Stopping => {
                self.phase = SessionPhase::Running;
                self.status_message = STATUS_RUNNING.to_string();
            }
            SessionPhase::Submitting => {
                self.phase = SessionPhase::Complete;
                self.status_message = STATUS_COMPLETE.to_string();
            }
            _ => return None,
        }
        Some(abandoned)
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn sensor_id(&self) -> Option<&str> {
        self.sensor_id.as_deref()
    }

    pub fn reference_volume(&self) -> Option<Volume> {
        self.volume
    }

    /// Reference volume normalized to milliliters
    pub fn reference_volume_ml(&self) -> Option<f64> {
        self.volume.map(|v| v.to_milliliters())
    }

    pub fn start_reading(&self) -> Option<u64> {
        self.start_reading
    }

    pub fn end_reading(&self) -> Option<u64> {
        self.outcome.map(|o| o.end_reading)
    }

    pub fn count_difference(&self) -> Option<u64> {
        self.outcome.map(|o| o.count_difference)
    }

    pub fn calibration_constant(&self) -> Option<f64> {
        self.outcome.map(|o| o.calibration_constant)
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn controls(&self) -> SessionControls {
        SessionControls::for_phase(self.phase)
    }

    /// Metadata for the store, once both readings exist
    pub fn metadata(&self) -> Option<CalibrationMetadata> {
        match (self.start_reading, self.outcome, self.reference_volume_ml()) {
            (Some(start_reading), Some(outcome), Some(volume_ml)) => Some(CalibrationMetadata {
                start_reading,
                end_reading: outcome.end_reading,
                volume_ml,
            }),
            _ => None,
        }
    }

    /// Operator instructions while water should be flowing
    pub fn instructions(&self) -> Option<String> {
        match (self.phase, self.volume) {
            (SessionPhase::Running, Some(volume)) => Some(format!(
                "Pass exactly {} of water through the sensor using a calibrated container, then stop the calibration.",
                volume
            )),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            sensor_id: self.sensor_id.clone(),
            reference_volume: self.volume,
            volume_ml: self.reference_volume_ml(),
            start_reading: self.start_reading,
            end_reading: self.end_reading(),
            count_difference: self.count_difference(),
            calibration_constant: self.calibration_constant(),
            constant_unit: CONSTANT_UNIT.to_string(),
            status_message: self.status_message.clone(),
            controls: self.controls(),
        }
    }

    // ========================================================================
    // HELPER METHODS
    // ========================================================================

    fn ensure_allowed(&self, operation: Operation) -> Result<(), CalibrationError> {
        if self.phase.is_busy() {
            return Err(CalibrationError::Busy { phase: self.phase });
        }
        if !self.phase.allows(operation) {
            return Err(self.invalid(operation));
        }
        Ok(())
    }

    fn expect_in_flight(
        &self,
        expected: SessionPhase,
        operation: Operation,
    ) -> Result<(), CalibrationError> {
        if self.phase != expected {
            return Err(self.invalid(operation));
        }
        Ok(())
    }

    fn invalid(&self, operation: Operation) -> CalibrationError {
        CalibrationError::InvalidPhase {
            operation,
            phase: self.phase,
        }
    }
}

impl Default for CalibrationSession {
    fn default() -> Self {
        Self::new()
    }
}
