//! Job entity and identifier

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::transcription::{ProcessingTier, TranscriptResult, VideoUrl};

use super::failure::JobFailure;
use super::state::{InvalidStateTransition, JobState, StepKind};

/// Opaque job identifier, generated at admission
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Generate a fresh identifier
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One end-to-end transcription request for a given URL and tier.
///
/// Owned by the orchestrator for its lifetime; the registry holds it by
/// reference for snapshots. All transitions move forward:
///
///   QUEUED -> RUNNING(health) -> ... -> RUNNING(submission) -> POLLING
///          -> COMPLETED | FAILED | TIMED_OUT | CANCELLED
///
/// `progress_percent` never decreases while the job is active, and a
/// terminal `Completed`/`Failed` job carries exactly one of
/// `result`/`failure`. `TimedOut` and `Cancelled` carry neither.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    id: JobId,
    source_url: VideoUrl,
    tier: ProcessingTier,
    state: JobState,
    current_step: Option<StepKind>,
    progress_percent: u8,
    created_at: DateTime<Utc>,
    deadline: DateTime<Utc>,
    result: Option<TranscriptResult>,
    failure: Option<JobFailure>,
}

impl Job {
    /// Create a queued job with a deadline `max_duration` from now
    pub fn new(source_url: VideoUrl, tier: ProcessingTier, max_duration: Duration) -> Self {
        let created_at = Utc::now();
        let deadline = created_at
            + chrono::Duration::from_std(max_duration).unwrap_or_else(|_| chrono::Duration::days(365));
        Self {
            id: JobId::new(),
            source_url,
            tier,
            state: JobState::Queued,
            current_step: None,
            progress_percent: 0,
            created_at,
            deadline,
            result: None,
            failure: None,
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn source_url(&self) -> &VideoUrl {
        &self.source_url
    }

    pub fn tier(&self) -> ProcessingTier {
        self.tier
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn current_step(&self) -> Option<StepKind> {
        self.current_step
    }

    pub fn progress_percent(&self) -> u8 {
        self.progress_percent
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    pub fn result(&self) -> Option<&TranscriptResult> {
        self.result.as_ref()
    }

    pub fn failure(&self) -> Option<&JobFailure> {
        self.failure.as_ref()
    }

    /// Whether the job has reached a final state
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Raise progress to `percent`. Values below the current mark are
    /// ignored so progress never moves backwards; values above 100 clamp.
    pub fn advance_progress(&mut self, percent: u8) {
        self.progress_percent = self.progress_percent.max(percent.min(100));
    }

    /// Enter the given pipeline step.
    ///
    /// Valid from `Queued` (first step only) or from the immediately
    /// preceding step. Re-entering the current step is a no-op so retries
    /// do not need a separate transition.
    pub fn begin_step(&mut self, step: StepKind) -> Result<(), InvalidStateTransition> {
        let allowed = match self.state {
            JobState::Queued => step == StepKind::ALL[0],
            JobState::Running(current) => current == step || current.next() == Some(step),
            _ => false,
        };
        if !allowed {
            return Err(InvalidStateTransition {
                current_state: self.state,
                action: "begin step",
            });
        }
        self.state = JobState::Running(step);
        self.current_step = Some(step);
        Ok(())
    }

    /// Hand off to status polling after a successful submission
    pub fn begin_polling(&mut self) -> Result<(), InvalidStateTransition> {
        if self.state != JobState::Running(StepKind::Submission) {
            return Err(InvalidStateTransition {
                current_state: self.state,
                action: "begin polling",
            });
        }
        self.state = JobState::Polling;
        self.current_step = None;
        self.advance_progress(StepKind::Submission.target_percent());
        Ok(())
    }

    /// Finish successfully with a transcript
    pub fn complete(&mut self, result: TranscriptResult) -> Result<(), InvalidStateTransition> {
        if self.state != JobState::Polling {
            return Err(InvalidStateTransition {
                current_state: self.state,
                action: "complete",
            });
        }
        self.state = JobState::Completed;
        self.result = Some(result);
        self.advance_progress(100);
        Ok(())
    }

    /// Finish with a classified failure
    pub fn fail(&mut self, failure: JobFailure) -> Result<(), InvalidStateTransition> {
        if self.state.is_terminal() {
            return Err(InvalidStateTransition {
                current_state: self.state,
                action: "fail",
            });
        }
        self.state = JobState::Failed;
        self.failure = Some(failure);
        Ok(())
    }

    /// Finish because the overall job deadline elapsed.
    ///
    /// Distinct from a step-level timeout failure: the state itself is the
    /// classification and no failure payload is attached.
    pub fn time_out(&mut self) -> Result<(), InvalidStateTransition> {
        if self.state.is_terminal() {
            return Err(InvalidStateTransition {
                current_state: self.state,
                action: "time out",
            });
        }
        self.state = JobState::TimedOut;
        Ok(())
    }

    /// Finish because the host cancelled or superseded the job
    pub fn cancel(&mut self) -> Result<(), InvalidStateTransition> {
        if self.state.is_terminal() {
            return Err(InvalidStateTransition {
                current_state: self.state,
                action: "cancel",
            });
        }
        self.state = JobState::Cancelled;
        Ok(())
    }
}
