//! Job state machine types

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One ordered remote operation within the pre-polling pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepKind {
    HealthCheck,
    BalanceCheck,
    TokenVending,
    Submission,
}

impl StepKind {
    /// Pipeline order
    pub const ALL: [StepKind; 4] = [
        Self::HealthCheck,
        Self::BalanceCheck,
        Self::TokenVending,
        Self::Submission,
    ];

    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::HealthCheck => "health-check",
            Self::BalanceCheck => "balance-check",
            Self::TokenVending => "token-vending",
            Self::Submission => "submission",
        }
    }

    /// The step that follows this one, if any
    pub const fn next(&self) -> Option<StepKind> {
        match self {
            Self::HealthCheck => Some(Self::BalanceCheck),
            Self::BalanceCheck => Some(Self::TokenVending),
            Self::TokenVending => Some(Self::Submission),
            Self::Submission => None,
        }
    }

    /// Progress percent reached once this step succeeds.
    /// The four steps split the 0-80 range evenly; polling owns 80-100.
    pub const fn target_percent(&self) -> u8 {
        match self {
            Self::HealthCheck => 20,
            Self::BalanceCheck => 40,
            Self::TokenVending => 60,
            Self::Submission => 80,
        }
    }

    /// Per-attempt timeout for the remote call
    pub const fn default_timeout(&self) -> Duration {
        match self {
            Self::HealthCheck => Duration::from_secs(10),
            Self::BalanceCheck => Duration::from_secs(10),
            Self::TokenVending => Duration::from_secs(15),
            Self::Submission => Duration::from_secs(20),
        }
    }

    /// Total attempts allowed for this step, first try included
    pub const fn attempt_budget(&self) -> u32 {
        match self {
            Self::HealthCheck => 3,
            Self::BalanceCheck => 2,
            Self::TokenVending => 2,
            Self::Submission => 3,
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for StepKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StepKind::ALL
            .into_iter()
            .find(|step| step.as_str() == s)
            .ok_or(())
    }
}

/// Job lifecycle states.
///
/// Transitions only move forward through the step list or jump to a
/// terminal state; there is no backward transition. Serializes as its
/// display string (`"queued"`, `"running:health-check"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JobState {
    #[default]
    Queued,
    Running(StepKind),
    Polling,
    Completed,
    Failed,
    TimedOut,
    Cancelled,
}

impl JobState {
    /// Whether this state is final and irreversible
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::TimedOut | Self::Cancelled
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Running(step) => write!(f, "running:{}", step),
            Self::Polling => write!(f, "polling"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::TimedOut => write!(f, "timed-out"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "polling" => Ok(Self::Polling),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "timed-out" => Ok(Self::TimedOut),
            "cancelled" => Ok(Self::Cancelled),
            other => match other.strip_prefix("running:") {
                Some(step) => step
                    .parse()
                    .map(Self::Running)
                    .map_err(|_| format!("unknown step '{}'", step)),
                None => Err(format!("unknown job state '{}'", other)),
            },
        }
    }
}

impl Serialize for JobState {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for JobState {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Error when an invalid state transition is attempted
#[derive(Debug, Clone, Error)]
#[error("Invalid state transition: cannot {action} while in {current_state} state")]
pub struct InvalidStateTransition {
    pub current_state: JobState,
    pub action: &'static str,
}
