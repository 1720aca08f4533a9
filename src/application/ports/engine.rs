//! Business Engine port interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::job::FailureKind;
use crate::domain::transcription::{ProcessingTier, VideoUrl};

/// Errors from the Business Engine boundary.
///
/// Every remote failure mode is represented here as a value; nothing
/// at this boundary panics the host. The orchestrator branches on
/// [`EngineError::kind`], not on error source types.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("Engine request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Invalid request: {0}")]
    InvalidInput(String),

    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,

    #[error("Insufficient credits")]
    InsufficientCredits,

    #[error("Engine error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    #[error("Failed to parse engine response: {0}")]
    Parse(String),

    #[error("Unexpected engine failure: {0}")]
    Unknown(String),
}

impl EngineError {
    /// Map onto the failure taxonomy the retry policy understands
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Timeout => FailureKind::Timeout,
            Self::Network(_) => FailureKind::Network,
            Self::Auth(_) => FailureKind::Auth,
            Self::InvalidInput(_) => FailureKind::InvalidInput,
            Self::RateLimited => FailureKind::RateLimited,
            Self::InsufficientCredits => FailureKind::InsufficientBalance,
            // A malformed response is an engine-side defect
            Self::Server { .. } | Self::Parse(_) => FailureKind::ServerError,
            Self::Unknown(_) => FailureKind::Unknown,
        }
    }
}

/// Result of the capability check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReport {
    pub healthy: bool,
}

/// Credit balance for the calling identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditBalance {
    pub balance: i64,
}

/// Short-lived token vended for one transcription request.
///
/// Owned by a single orchestration run; never cached across jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendedToken {
    pub token: String,
    pub scope: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub balance_after: Option<i64>,
}

impl VendedToken {
    /// Whether the token's expiry has already passed
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }
}

/// Receipt from a successful submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    /// External job handle used for status polling
    pub request_id: String,
}

/// Remote job state as reported by the status endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

/// One status poll response
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub status: RemoteStatus,
    /// Remote-reported progress, 0-100 within the remote's own scale
    pub percent: Option<u8>,
    pub transcript: Option<String>,
    pub confidence: Option<f32>,
    pub language: Option<String>,
    pub error: Option<String>,
}

impl StatusReport {
    /// Bare status with no payload
    pub fn status_only(status: RemoteStatus) -> Self {
        Self {
            status,
            percent: None,
            transcript: None,
            confidence: None,
            language: None,
            error: None,
        }
    }
}

/// Port for the Pluct Business Engine.
///
/// One method per remote collaborator in the pipeline. Implementations
/// classify every failure as an [`EngineError`]; they do not retry.
/// Retries are the orchestrator's responsibility.
#[async_trait]
pub trait BusinessEngine: Send + Sync {
    /// Capability check. Healthy means the engine will accept work.
    async fn health(&self) -> Result<HealthReport, EngineError>;

    /// Credit balance for the identity behind `user_jwt`.
    async fn credit_balance(&self, user_jwt: &str) -> Result<CreditBalance, EngineError>;

    /// Vend a short-lived transcription token.
    ///
    /// `client_request_id` must be fresh and unique per attempt; it is
    /// the idempotency key for credit deduction.
    async fn vend_token(
        &self,
        user_jwt: &str,
        client_request_id: &str,
    ) -> Result<VendedToken, EngineError>;

    /// Submit a video URL for transcription under a vended token.
    async fn submit(
        &self,
        url: &VideoUrl,
        tier: ProcessingTier,
        token: &str,
    ) -> Result<SubmissionReceipt, EngineError>;

    /// Query the status of a submitted transcription.
    async fn poll_status(&self, request_id: &str, token: &str)
        -> Result<StatusReport, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_map_to_taxonomy() {
        assert_eq!(EngineError::Timeout.kind(), FailureKind::Timeout);
        assert_eq!(
            EngineError::Network("refused".into()).kind(),
            FailureKind::Network
        );
        assert_eq!(EngineError::Auth("401".into()).kind(), FailureKind::Auth);
        assert_eq!(
            EngineError::InvalidInput("bad url".into()).kind(),
            FailureKind::InvalidInput
        );
        assert_eq!(EngineError::RateLimited.kind(), FailureKind::RateLimited);
        assert_eq!(
            EngineError::InsufficientCredits.kind(),
            FailureKind::InsufficientBalance
        );
        assert_eq!(
            EngineError::Server {
                status: 500,
                message: "boom".into()
            }
            .kind(),
            FailureKind::ServerError
        );
        assert_eq!(
            EngineError::Parse("bad json".into()).kind(),
            FailureKind::ServerError
        );
        assert_eq!(
            EngineError::Unknown("?".into()).kind(),
            FailureKind::Unknown
        );
    }

    #[test]
    fn token_expiry() {
        let now = Utc::now();
        let live = VendedToken {
            token: "t".into(),
            scope: None,
            expires_at: Some(now + chrono::Duration::minutes(5)),
            balance_after: None,
        };
        assert!(!live.is_expired(now));

        let stale = VendedToken {
            expires_at: Some(now - chrono::Duration::seconds(1)),
            ..live.clone()
        };
        assert!(stale.is_expired(now));

        let no_expiry = VendedToken {
            expires_at: None,
            ..live
        };
        assert!(!no_expiry.is_expired(now));
    }
}
