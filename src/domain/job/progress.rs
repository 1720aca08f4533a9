//! Progress event record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::JobId;
use super::state::{JobState, StepKind};

/// One immutable, ordered status update for a job.
///
/// Created once per observable state transition and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub job_id: JobId,
    pub state: JobState,
    pub step: Option<StepKind>,
    pub percent: u8,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    /// Create an event stamped with the current time
    pub fn now(
        job_id: JobId,
        state: JobState,
        step: Option<StepKind>,
        percent: u8,
        message: impl Into<String>,
    ) -> Self {
        Self {
            job_id,
            state,
            step,
            percent,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Whether this event reports a terminal state
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
