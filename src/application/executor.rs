//! Step executor: one remote call under a deadline, with a classified outcome

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::application::ports::EngineError;
use crate::domain::job::{FailureKind, StepKind};

/// Classified failure of a single step attempt.
///
/// The orchestrator branches on `kind`; `reason` is carried into the
/// terminal job record when the step ultimately gives up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{step} failed ({kind}): {reason}")]
pub struct StepFailure {
    pub step: StepKind,
    pub kind: FailureKind,
    pub reason: String,
}

/// Run one step attempt under `timeout`.
///
/// If the call does not resolve in time the attempt is classified as
/// `timeout` and the caller is released; the underlying future is
/// dropped, so a late result is discarded rather than delivered.
/// Retries are the orchestrator's responsibility, not the executor's.
pub async fn run_step<T, F>(step: StepKind, timeout: Duration, call: F) -> Result<T, StepFailure>
where
    F: Future<Output = Result<T, EngineError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(StepFailure {
            step,
            kind: err.kind(),
            reason: err.to_string(),
        }),
        Err(_) => Err(StepFailure {
            step,
            kind: FailureKind::Timeout,
            reason: format!("{} did not respond within {:?}", step, timeout),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn success_passes_value_through() {
        let result = run_step(StepKind::HealthCheck, Duration::from_secs(1), async {
            Ok::<_, EngineError>(42)
        })
        .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn engine_error_is_classified() {
        let result = run_step::<(), _>(StepKind::Submission, Duration::from_secs(1), async {
            Err(EngineError::InvalidInput("not a video url".into()))
        })
        .await;

        let failure = result.unwrap_err();
        assert_eq!(failure.step, StepKind::Submission);
        assert_eq!(failure.kind, FailureKind::InvalidInput);
        assert!(failure.reason.contains("not a video url"));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_call_times_out() {
        let result = run_step::<(), _>(
            StepKind::TokenVending,
            Duration::from_secs(15),
            async {
                std::future::pending::<()>().await;
                unreachable!()
            },
        )
        .await;

        let failure = result.unwrap_err();
        assert_eq!(failure.kind, FailureKind::Timeout);
        assert!(failure.reason.contains("token-vending"));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_does_not_block_past_deadline() {
        let started = tokio::time::Instant::now();
        let _ = run_step::<(), _>(StepKind::HealthCheck, Duration::from_secs(10), async {
            std::future::pending::<()>().await;
            unreachable!()
        })
        .await;
        // virtual clock: elapsed is exactly the timeout, no overshoot
        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }
}
