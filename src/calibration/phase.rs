// Session phases and the operations that move between them
//
// The in-flight phases (Starting, Stopping, Submitting) stand in for the
// "loading"/"saving" flags a UI would otherwise track next to the phase.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Step whose failure put the session into the error phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedStep {
    /// Start reading could not be captured
    Start,
    /// End reading could not be captured, or no constant could be derived
    Stop,
}

/// Calibration workflow phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Configuring sensor and volume
    Idle,
    /// Start reading requested from the sensor
    Starting,
    /// Start reading captured, operator is pouring
    Running,
    /// End reading requested from the sensor
    Stopping,
    /// Constant derived, ready to submit
    Complete,
    /// Save requested from the calibration store
    Submitting,
    /// Constant persisted
    Submitted,
    /// Start or Stop failed
    Error(FailedStep),
}

impl SessionPhase {
    /// True while exactly one collaborator call is outstanding
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            SessionPhase::Starting | SessionPhase::Stopping | SessionPhase::Submitting
        )
    }

    /// Whether `operation` may be triggered from this phase
    pub fn allows(&self, operation: Operation) -> bool {
        if self.is_busy() {
            return false;
        }
        match operation {
            Operation::Configure | Operation::Start => *self == SessionPhase::Idle,
            Operation::Stop => *self == SessionPhase::Running,
            Operation::Submit => *self == SessionPhase::Complete,
            Operation::Reset => true,
        }
    }

    /// Short name for status badges
    pub fn display_name(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Starting => "starting",
            SessionPhase::Running => "running",
            SessionPhase::Stopping => "stopping",
            SessionPhase::Complete => "complete",
            SessionPhase::Submitting => "submitting",
            SessionPhase::Submitted => "submitted",
            SessionPhase::Error(_) => "error",
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Operator-triggered operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Configure,
    Start,
    Stop,
    Submit,
    Reset,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Configure,
        Operation::Start,
        Operation::Stop,
        Operation::Submit,
        Operation::Reset,
    ];
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Configure => "configure",
            Operation::Start => "start",
            Operation::Stop => "stop",
            Operation::Submit => "submit",
            Operation::Reset => "reset",
        };
        f.write_str(name)
    }
}

/// Which controls a front end should enable for the current phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionControls {
    pub can_configure: bool,
    pub can_start: bool,
    pub can_stop: bool,
    pub can_submit: bool,
    pub can_reset: bool,
}

impl SessionControls {
    pub fn for_phase(phase: SessionPhase) -> Self {
        Self {
            can_configure: phase.allows(Operation::Configure),
            can_start: phase.allows(Operation::Start),
            can_stop: phase.allows(Operation::Stop),
            can_submit: phase.allows(Operation::Submit),
            // Resetting an idle session is a no-op, so the control stays off
            can_reset: phase.allows(Operation::Reset) && phase != SessionPhase::Idle,
        }
    }
}
