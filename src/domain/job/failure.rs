//! Failure classification for job steps

use std::fmt;

use serde::{Deserialize, Serialize};

/// Classification of a step or job failure.
///
/// The retry policy branches on this, not on error source types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    /// The step's own deadline elapsed
    Timeout,
    /// Transport-level failure reaching the engine
    Network,
    /// Credential rejected or missing scope
    Auth,
    /// The request itself can never succeed (e.g. malformed URL)
    InvalidInput,
    /// Engine asked us to back off
    RateLimited,
    /// Engine-side 5xx or unhealthy report
    ServerError,
    /// Local precondition: no credits to spend
    InsufficientBalance,
    Unknown,
}

impl FailureKind {
    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Network => "network",
            Self::Auth => "auth",
            Self::InvalidInput => "invalid-input",
            Self::RateLimited => "rate-limited",
            Self::ServerError => "server-error",
            Self::InsufficientBalance => "insufficient-balance",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Terminal failure record carried by a failed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
    pub kind: FailureKind,
    /// Human-readable reason surfaced to the host
    pub reason: String,
    /// Attempts spent on the step that gave up
    pub attempts: u32,
}

impl JobFailure {
    /// Create a failure record for a single-attempt abort
    pub fn aborted(kind: FailureKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
            attempts: 1,
        }
    }
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.reason)
    }
}
