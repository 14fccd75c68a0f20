use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::config::InterpolationConfig;
use crate::executor::{ExecutionReport, ExecutorError};
use crate::pass::SatellitePass;

pub type JobId = Uuid;

/// Everything needed to track one pass.
#[derive(Debug, Clone)]
pub struct TrackRequest {
    pub pass: SatellitePass,
    pub step_seconds: i64,
    pub rounding_digits: u32,
    /// Send `UNSTOW` after the handshake.
    pub unstow_first: bool,
    /// Send `STOW` once the pass has played out.
    pub stow_after: bool,
    /// Compass reading sent as `SAZ` before anything else.
    pub compass_calibration: Option<i32>,
}

impl TrackRequest {
    pub fn new(pass: SatellitePass, interpolation: &InterpolationConfig) -> Self {
        Self {
            pass,
            step_seconds: interpolation.step_seconds,
            rounding_digits: interpolation.rounding_digits,
            unstow_first: false,
            stow_after: false,
            compass_calibration: None,
        }
    }
}

/// How a rotator session ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrackOutcome {
    Completed(ExecutionReport),
    /// The port could not be opened or the controller never answered.
    NoHardware { reason: String },
    /// The controller answered wrongly or went away mid-pass.
    ProtocolFailure { reason: String },
    Cancelled,
}

impl TrackOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TrackOutcome::Completed(_))
    }
}

impl From<ExecutorError> for TrackOutcome {
    fn from(err: ExecutorError) -> Self {
        let reason = err.to_string();
        match err {
            ExecutorError::Cancelled => TrackOutcome::Cancelled,
            ExecutorError::Link(link) if link.is_no_hardware() => TrackOutcome::NoHardware { reason },
            ExecutorError::Link(_) | ExecutorError::LinkClosed | ExecutorError::ReadyTimeout(_) => {
                TrackOutcome::ProtocolFailure { reason }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running { segment: usize, total: usize },
    Completed(TrackOutcome),
    /// Anything but a completed pass, cancellation included.
    Failed(TrackOutcome),
}

impl JobState {
    pub fn finished(outcome: TrackOutcome) -> Self {
        if outcome.is_completed() {
            JobState::Completed(outcome)
        } else {
            JobState::Failed(outcome)
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, JobState::Completed(_) | JobState::Failed(_))
    }

    pub fn outcome(&self) -> Option<&TrackOutcome> {
        match self {
            JobState::Completed(outcome) | JobState::Failed(outcome) => Some(outcome),
            JobState::Pending | JobState::Running { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    pub id: JobId,
    pub state: JobState,
    pub points: usize,
    pub paused: bool,
    pub submitted_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}
