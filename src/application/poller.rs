//! Status poller: repeated remote status checks until terminal or deadline

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{BusinessEngine, RemoteStatus};
use crate::domain::job::{FailureKind, JobFailure};
use crate::domain::transcription::TranscriptResult;

/// Progress percent reached when polling begins
const POLL_FLOOR: u8 = 80;
/// Estimated progress never claims completion on its own
const POLL_CEILING: u8 = 99;

/// How a polling session ended
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Completed(TranscriptResult),
    Failed(JobFailure),
    /// The caller's time budget ran out while the remote was still working
    DeadlineExceeded,
    Cancelled,
}

/// Polls remote job status at a fixed interval.
///
/// Transient query errors are logged and swallowed: the loop itself is
/// the retry mechanism and the caller's deadline bounds it, so they do
/// not consume any step retry budget. Cancellation is observed between
/// ticks; an in-flight query's result is discarded.
pub struct StatusPoller {
    interval: Duration,
}

impl StatusPoller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(100)),
        }
    }

    /// Poll until a terminal remote state, the deadline, or cancellation.
    ///
    /// `on_progress` is invoked once per non-terminal report with the
    /// job-wide percent (the 80-100 window) and a status message. When
    /// the remote omits its percent, an estimate derived from elapsed
    /// time fills in, capped below 100.
    pub async fn poll<E>(
        &self,
        engine: &E,
        request_id: &str,
        token: &str,
        deadline: Instant,
        cancel: &CancellationToken,
        mut on_progress: impl FnMut(u8, &str),
    ) -> PollOutcome
    where
        E: BusinessEngine + ?Sized,
    {
        let started = Instant::now();

        loop {
            if cancel.is_cancelled() {
                return PollOutcome::Cancelled;
            }
            let now = Instant::now();
            if now >= deadline {
                return PollOutcome::DeadlineExceeded;
            }

            match engine.poll_status(request_id, token).await {
                Ok(report) => match report.status {
                    RemoteStatus::Completed => {
                        return match report.transcript {
                            Some(transcript) => PollOutcome::Completed(TranscriptResult {
                                transcript,
                                confidence: report.confidence,
                                language: report.language,
                            }),
                            None => PollOutcome::Failed(JobFailure::aborted(
                                FailureKind::ServerError,
                                "engine reported completion without a transcript",
                            )),
                        };
                    }
                    RemoteStatus::Failed => {
                        let reason = report
                            .error
                            .unwrap_or_else(|| "remote transcription failed".to_string());
                        return PollOutcome::Failed(JobFailure::aborted(
                            FailureKind::ServerError,
                            reason,
                        ));
                    }
                    RemoteStatus::Queued | RemoteStatus::Processing => {
                        let percent = report
                            .percent
                            .map(Self::map_remote_percent)
                            .unwrap_or_else(|| Self::estimate_percent(started, deadline));
                        let message = match report.status {
                            RemoteStatus::Queued => "queued remotely".to_string(),
                            _ => format!("transcribing ({}%)", percent),
                        };
                        on_progress(percent, &message);
                    }
                },
                Err(err) => {
                    tracing::warn!(request_id, error = %err, "transient status poll failure");
                }
            }

            let wake = Instant::now() + self.interval;
            tokio::select! {
                _ = cancel.cancelled() => return PollOutcome::Cancelled,
                _ = tokio::time::sleep_until(wake.min(deadline)) => {}
            }
        }
    }

    /// Map the remote's 0-100 scale into the job's 80-100 window
    fn map_remote_percent(remote: u8) -> u8 {
        POLL_FLOOR + remote.min(100) / 5
    }

    /// Fallback estimate from elapsed share of the time budget
    fn estimate_percent(started: Instant, deadline: Instant) -> u8 {
        let total = deadline.saturating_duration_since(started);
        if total.is_zero() {
            return POLL_CEILING;
        }
        let elapsed = started.elapsed();
        let fraction = (elapsed.as_secs_f64() / total.as_secs_f64()).min(1.0);
        let span = f64::from(POLL_CEILING - POLL_FLOOR);
        POLL_FLOOR + (fraction * span) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{
        CreditBalance, EngineError, HealthReport, StatusReport, SubmissionReceipt, VendedToken,
    };
    use crate::domain::transcription::{ProcessingTier, VideoUrl};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Engine stub that serves a scripted sequence of status responses
    struct ScriptedStatus {
        responses: Mutex<VecDeque<Result<StatusReport, EngineError>>>,
    }

    impl ScriptedStatus {
        fn new(responses: Vec<Result<StatusReport, EngineError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
            }
        }
    }

    #[async_trait]
    impl BusinessEngine for ScriptedStatus {
        async fn health(&self) -> Result<HealthReport, EngineError> {
            unimplemented!("not exercised by poller tests")
        }

        async fn credit_balance(&self, _user_jwt: &str) -> Result<CreditBalance, EngineError> {
            unimplemented!("not exercised by poller tests")
        }

        async fn vend_token(
            &self,
            _user_jwt: &str,
            _client_request_id: &str,
        ) -> Result<VendedToken, EngineError> {
            unimplemented!("not exercised by poller tests")
        }

        async fn submit(
            &self,
            _url: &VideoUrl,
            _tier: ProcessingTier,
            _token: &str,
        ) -> Result<SubmissionReceipt, EngineError> {
            unimplemented!("not exercised by poller tests")
        }

        async fn poll_status(
            &self,
            _request_id: &str,
            _token: &str,
        ) -> Result<StatusReport, EngineError> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(StatusReport::status_only(RemoteStatus::Processing)))
        }
    }

    fn processing(percent: Option<u8>) -> Result<StatusReport, EngineError> {
        Ok(StatusReport {
            percent,
            ..StatusReport::status_only(RemoteStatus::Processing)
        })
    }

    fn completed(transcript: &str) -> Result<StatusReport, EngineError> {
        Ok(StatusReport {
            transcript: Some(transcript.to_string()),
            confidence: Some(0.97),
            language: Some("en".to_string()),
            ..StatusReport::status_only(RemoteStatus::Completed)
        })
    }

    #[tokio::test(start_paused = true)]
    async fn completes_with_transcript() {
        let engine = ScriptedStatus::new(vec![
            processing(Some(40)),
            processing(Some(80)),
            completed("hello world"),
        ]);
        let poller = StatusPoller::new(Duration::from_secs(2));
        let cancel = CancellationToken::new();
        let mut seen = Vec::new();

        let outcome = poller
            .poll(
                &engine,
                "req-1",
                "tok",
                Instant::now() + Duration::from_secs(100),
                &cancel,
                |percent, _| seen.push(percent),
            )
            .await;

        match outcome {
            PollOutcome::Completed(result) => {
                assert_eq!(result.transcript, "hello world");
                assert_eq!(result.language.as_deref(), Some("en"));
            }
            other => panic!("expected completion, got {:?}", other),
        }
        assert_eq!(seen, vec![88, 96]);
    }

    #[tokio::test(start_paused = true)]
    async fn remote_failure_is_terminal() {
        let engine = ScriptedStatus::new(vec![Ok(StatusReport {
            error: Some("video has no audio track".to_string()),
            ..StatusReport::status_only(RemoteStatus::Failed)
        })]);
        let poller = StatusPoller::new(Duration::from_secs(2));

        let outcome = poller
            .poll(
                &engine,
                "req-1",
                "tok",
                Instant::now() + Duration::from_secs(100),
                &CancellationToken::new(),
                |_, _| {},
            )
            .await;

        match outcome {
            PollOutcome::Failed(failure) => {
                assert_eq!(failure.kind, FailureKind::ServerError);
                assert!(failure.reason.contains("no audio track"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_do_not_stop_polling() {
        let engine = ScriptedStatus::new(vec![
            Err(EngineError::Network("connection reset".into())),
            Err(EngineError::Timeout),
            completed("recovered"),
        ]);
        let poller = StatusPoller::new(Duration::from_secs(2));

        let outcome = poller
            .poll(
                &engine,
                "req-1",
                "tok",
                Instant::now() + Duration::from_secs(100),
                &CancellationToken::new(),
                |_, _| {},
            )
            .await;

        assert!(matches!(outcome, PollOutcome::Completed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_bounds_healthy_polling() {
        // remote stays in processing forever
        let engine = ScriptedStatus::new(vec![]);
        let poller = StatusPoller::new(Duration::from_secs(2));

        let outcome = poller
            .poll(
                &engine,
                "req-1",
                "tok",
                Instant::now() + Duration::from_secs(30),
                &CancellationToken::new(),
                |_, _| {},
            )
            .await;

        assert_eq!(outcome, PollOutcome::DeadlineExceeded);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_observed_within_one_tick() {
        let engine = ScriptedStatus::new(vec![]);
        let poller = StatusPoller::new(Duration::from_secs(5));
        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            cancel_clone.cancel();
        });

        let started = Instant::now();
        let outcome = poller
            .poll(
                &engine,
                "req-1",
                "tok",
                Instant::now() + Duration::from_secs(100),
                &cancel,
                |_, _| {},
            )
            .await;

        assert_eq!(outcome, PollOutcome::Cancelled);
        assert!(started.elapsed() <= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn completion_without_transcript_is_a_failure() {
        let engine = ScriptedStatus::new(vec![Ok(StatusReport::status_only(
            RemoteStatus::Completed,
        ))]);
        let poller = StatusPoller::new(Duration::from_secs(2));

        let outcome = poller
            .poll(
                &engine,
                "req-1",
                "tok",
                Instant::now() + Duration::from_secs(100),
                &CancellationToken::new(),
                |_, _| {},
            )
            .await;

        match outcome {
            PollOutcome::Failed(failure) => {
                assert_eq!(failure.kind, FailureKind::ServerError)
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn remote_percent_maps_into_poll_window() {
        assert_eq!(StatusPoller::map_remote_percent(0), 80);
        assert_eq!(StatusPoller::map_remote_percent(50), 90);
        assert_eq!(StatusPoller::map_remote_percent(100), 100);
        // out-of-range input clamps
        assert_eq!(StatusPoller::map_remote_percent(250), 100);
    }
}
