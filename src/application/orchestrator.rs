//! Job orchestrator: drives one job from admission to a terminal state

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use uuid::Uuid;

use crate::application::executor;
use crate::application::poller::{PollOutcome, StatusPoller};
use crate::application::ports::{BusinessEngine, EngineError};
use crate::application::registry::JobHandle;
use crate::application::retry::RetryPolicy;
use crate::domain::job::{Job, JobFailure, ProgressEvent, StepKind};
use crate::domain::transcription::{ProcessingTier, TranscriptResult, VideoUrl};

/// Knobs for one orchestrator instance, shared by all its jobs
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Long-lived identity credential presented to the engine
    pub user_jwt: String,
    /// Overall deadline per job, retries and polling included
    pub max_duration: Duration,
    /// Fixed status poll cadence
    pub poll_interval: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            user_jwt: String::new(),
            max_duration: Duration::from_secs(160),
            poll_interval: Duration::from_secs(2),
        }
    }
}

/// How a job run ended.
///
/// `Superseded` means another actor (a replacement admission or a host
/// cancel) already finalized the record; the run stops silently and any
/// in-flight result is discarded.
#[derive(Debug)]
enum Finish {
    Completed(TranscriptResult),
    Failed(JobFailure),
    TimedOut,
    Cancelled,
    Superseded,
}

/// The top-level state machine. Sequences the pipeline steps through the
/// step executor, applies the retry policy to recoverable failures,
/// publishes one progress event per observable transition, and hands the
/// final stretch to the status poller.
pub struct Orchestrator<E> {
    engine: Arc<E>,
    settings: OrchestratorSettings,
    retry: RetryPolicy,
    poller: StatusPoller,
}

impl<E: BusinessEngine> Orchestrator<E> {
    pub fn new(engine: Arc<E>, settings: OrchestratorSettings, retry: RetryPolicy) -> Self {
        let poller = StatusPoller::new(settings.poll_interval);
        Self {
            engine,
            settings,
            retry,
            poller,
        }
    }

    /// Drive `handle` to a terminal state. Infallible from the caller's
    /// view: every failure mode ends as a terminal transition on the job
    /// record, never as a propagated error.
    pub async fn run(&self, handle: JobHandle) {
        let (url, tier) = handle.with_job(|job| (job.source_url().clone(), job.tier()));
        let deadline = Instant::now() + self.settings.max_duration;

        tracing::info!(job_id = %handle.id(), url = %url, tier = %tier, "job started");

        let finish = match self.drive(&handle, &url, tier, deadline).await {
            Ok(result) => Finish::Completed(result),
            Err(finish) => finish,
        };
        self.finalize(&handle, finish);
    }

    /// The pipeline proper. `Err` carries every non-success finish.
    async fn drive(
        &self,
        handle: &JobHandle,
        url: &VideoUrl,
        tier: ProcessingTier,
        deadline: Instant,
    ) -> Result<TranscriptResult, Finish> {
        // Capability check: an unhealthy report consumes retry budget the
        // same way a 5xx would.
        self.run_step_with_retry(handle, StepKind::HealthCheck, deadline, Some("engine healthy"), |_| {
            let engine = Arc::clone(&self.engine);
            async move {
                let report = engine.health().await?;
                if report.healthy {
                    Ok(())
                } else {
                    Err(EngineError::Server {
                        status: 503,
                        message: "engine reports unhealthy".to_string(),
                    })
                }
            }
        })
        .await?;

        // Balance check: a non-positive balance is a local precondition
        // failure, classified insufficient-balance and never retried.
        self.run_step_with_retry(
            handle,
            StepKind::BalanceCheck,
            deadline,
            Some("credit balance verified"),
            |_| {
                let engine = Arc::clone(&self.engine);
                let jwt = self.settings.user_jwt.clone();
                async move {
                    let credit = engine.credit_balance(&jwt).await?;
                    if credit.balance <= 0 {
                        Err(EngineError::InsufficientCredits)
                    } else {
                        Ok(credit)
                    }
                }
            },
        )
        .await?;

        // Token vending: a fresh idempotency key per attempt so a retried
        // vend can never double-charge.
        let token = self
            .run_step_with_retry(handle, StepKind::TokenVending, deadline, Some("token vended"), |_| {
                let engine = Arc::clone(&self.engine);
                let jwt = self.settings.user_jwt.clone();
                async move {
                    let client_request_id = Uuid::new_v4().to_string();
                    let token = engine.vend_token(&jwt, &client_request_id).await?;
                    if token.is_expired(Utc::now()) {
                        return Err(EngineError::Auth("vended token already expired".to_string()));
                    }
                    Ok(token)
                }
            })
            .await?;

        // Submission: its success event is the polling transition below.
        let receipt = self
            .run_step_with_retry(handle, StepKind::Submission, deadline, None, |_| {
                let engine = Arc::clone(&self.engine);
                let url = url.clone();
                let bearer = token.token.clone();
                async move { engine.submit(&url, tier, &bearer).await }
            })
            .await?;

        self.mutate(handle, |job| {
            job.begin_polling()?;
            handle.publish(ProgressEvent::now(
                job.id().clone(),
                job.state(),
                None,
                job.progress_percent(),
                "submitted; awaiting transcript",
            ));
            Ok(())
        })?;

        tracing::info!(job_id = %handle.id(), request_id = %receipt.request_id, "polling for transcript");

        let outcome = self
            .poller
            .poll(
                self.engine.as_ref(),
                &receipt.request_id,
                &token.token,
                deadline,
                handle.cancel_token(),
                |percent, message| {
                    handle.with_job(|job| {
                        if job.is_terminal() {
                            return;
                        }
                        job.advance_progress(percent);
                        handle.publish(ProgressEvent::now(
                            job.id().clone(),
                            job.state(),
                            None,
                            job.progress_percent(),
                            message,
                        ));
                    });
                },
            )
            .await;

        match outcome {
            PollOutcome::Completed(result) => Ok(result),
            PollOutcome::Failed(failure) => Err(Finish::Failed(failure)),
            PollOutcome::DeadlineExceeded => Err(Finish::TimedOut),
            PollOutcome::Cancelled => Err(Finish::Cancelled),
        }
    }

    /// Run one pipeline step under its timeout, retrying per policy.
    ///
    /// Emits the step's success event (advancing progress to the step's
    /// allocation) unless `success_message` is `None`. The overall
    /// deadline always wins over per-step budgets: once it has passed,
    /// the run finishes `TimedOut` no matter what the step reported.
    async fn run_step_with_retry<T, F, Fut>(
        &self,
        handle: &JobHandle,
        step: StepKind,
        deadline: Instant,
        success_message: Option<&str>,
        op: F,
    ) -> Result<T, Finish>
    where
        F: Fn(u32) -> Fut,
        Fut: Future<Output = Result<T, EngineError>>,
    {
        self.mutate(handle, |job| {
            job.begin_step(step)?;
            Ok(())
        })?;

        let budget = step.attempt_budget();
        let mut attempt: u32 = 1;

        loop {
            self.checkpoint(handle, deadline)?;

            let remaining = deadline.saturating_duration_since(Instant::now());
            let timeout = step.default_timeout().min(remaining);

            match executor::run_step(step, timeout, op(attempt)).await {
                Ok(value) => {
                    if let Some(message) = success_message {
                        self.mutate(handle, |job| {
                            job.advance_progress(step.target_percent());
                            handle.publish(ProgressEvent::now(
                                job.id().clone(),
                                job.state(),
                                Some(step),
                                job.progress_percent(),
                                message,
                            ));
                            Ok(())
                        })?;
                    }
                    return Ok(value);
                }
                Err(failure) => {
                    if Instant::now() >= deadline {
                        return Err(Finish::TimedOut);
                    }

                    let decision = self.retry.decide(failure.kind, attempt, budget);
                    if !decision.should_retry {
                        tracing::error!(
                            job_id = %handle.id(),
                            step = %step,
                            kind = %failure.kind,
                            attempts = attempt,
                            "step exhausted its attempts"
                        );
                        return Err(Finish::Failed(JobFailure {
                            kind: failure.kind,
                            reason: failure.reason,
                            attempts: attempt,
                        }));
                    }

                    tracing::warn!(
                        job_id = %handle.id(),
                        step = %step,
                        kind = %failure.kind,
                        attempt,
                        delay_ms = decision.delay.as_millis() as u64,
                        "step failed; backing off before retry"
                    );

                    tokio::select! {
                        _ = handle.cancel_requested() => return Err(Finish::Cancelled),
                        _ = tokio::time::sleep(decision.delay) => {}
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// Cooperative checkpoint between steps and attempts
    fn checkpoint(&self, handle: &JobHandle, deadline: Instant) -> Result<(), Finish> {
        if handle.is_cancel_requested() {
            return Err(Finish::Cancelled);
        }
        if Instant::now() >= deadline {
            return Err(Finish::TimedOut);
        }
        Ok(())
    }

    /// Apply a transition under the job lock, bailing out silently if the
    /// record was already finalized by a supersede or host cancel.
    fn mutate<R>(
        &self,
        handle: &JobHandle,
        f: impl FnOnce(&mut Job) -> Result<R, crate::domain::job::InvalidStateTransition>,
    ) -> Result<R, Finish> {
        handle.with_job(|job| {
            if job.is_terminal() {
                return Err(Finish::Superseded);
            }
            f(job).map_err(|err| {
                tracing::error!(job_id = %handle.id(), error = %err, "unexpected state transition");
                Finish::Superseded
            })
        })
    }

    /// Apply the terminal transition and emit exactly one terminal event.
    /// If the record is already terminal the outcome is discarded.
    fn finalize(&self, handle: &JobHandle, finish: Finish) {
        match finish {
            Finish::Completed(result) => handle.with_job(|job| {
                if job.is_terminal() {
                    return;
                }
                let _ = job.complete(result);
                handle.publish(ProgressEvent::now(
                    job.id().clone(),
                    job.state(),
                    None,
                    job.progress_percent(),
                    "transcription complete",
                ));
                tracing::info!(job_id = %job.id(), "job completed");
            }),
            Finish::Failed(failure) => handle.with_job(|job| {
                if job.is_terminal() {
                    return;
                }
                let message = failure.to_string();
                let _ = job.fail(failure);
                handle.publish(ProgressEvent::now(
                    job.id().clone(),
                    job.state(),
                    job.current_step(),
                    job.progress_percent(),
                    message.clone(),
                ));
                tracing::error!(job_id = %job.id(), reason = %message, "job failed");
            }),
            Finish::TimedOut => handle.with_job(|job| {
                if job.is_terminal() {
                    return;
                }
                let _ = job.time_out();
                handle.publish(ProgressEvent::now(
                    job.id().clone(),
                    job.state(),
                    job.current_step(),
                    job.progress_percent(),
                    "job deadline exceeded",
                ));
                tracing::error!(job_id = %job.id(), "job timed out");
            }),
            Finish::Cancelled => {
                if handle.finalize_cancelled() {
                    tracing::info!(job_id = %handle.id(), "job cancelled");
                }
            }
            Finish::Superseded => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{
        CreditBalance, HealthReport, StatusReport, SubmissionReceipt, VendedToken,
    };
    use crate::application::ports::RemoteStatus;
    use crate::application::registry::{JobRegistry, JobSettings};
    use crate::domain::job::{FailureKind, JobState};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Engine stub: fixed happy-path responses with programmable tweaks
    struct StubEngine {
        healthy: bool,
        balance: i64,
        vend_auth_failures: AtomicU32,
        vend_request_ids: Mutex<Vec<String>>,
        health_calls: AtomicU32,
        statuses: Mutex<Vec<StatusReport>>,
    }

    impl StubEngine {
        fn happy() -> Self {
            Self {
                healthy: true,
                balance: 5,
                vend_auth_failures: AtomicU32::new(0),
                vend_request_ids: Mutex::new(Vec::new()),
                health_calls: AtomicU32::new(0),
                statuses: Mutex::new(vec![StatusReport {
                    transcript: Some("hello world".to_string()),
                    confidence: Some(0.9),
                    language: Some("en".to_string()),
                    ..StatusReport::status_only(RemoteStatus::Completed)
                }]),
            }
        }
    }

    #[async_trait]
    impl BusinessEngine for StubEngine {
        async fn health(&self) -> Result<HealthReport, EngineError> {
            self.health_calls.fetch_add(1, Ordering::SeqCst);
            Ok(HealthReport {
                healthy: self.healthy,
            })
        }

        async fn credit_balance(&self, _user_jwt: &str) -> Result<CreditBalance, EngineError> {
            Ok(CreditBalance {
                balance: self.balance,
            })
        }

        async fn vend_token(
            &self,
            _user_jwt: &str,
            client_request_id: &str,
        ) -> Result<VendedToken, EngineError> {
            self.vend_request_ids
                .lock()
                .unwrap()
                .push(client_request_id.to_string());
            if self.vend_auth_failures.load(Ordering::SeqCst) > 0 {
                self.vend_auth_failures.fetch_sub(1, Ordering::SeqCst);
                return Err(EngineError::Auth("token rejected".to_string()));
            }
            Ok(VendedToken {
                token: "short-lived".to_string(),
                scope: Some("ttt:transcribe".to_string()),
                expires_at: Some(Utc::now() + chrono::Duration::minutes(5)),
                balance_after: Some(self.balance - 1),
            })
        }

        async fn submit(
            &self,
            _url: &VideoUrl,
            _tier: ProcessingTier,
            _token: &str,
        ) -> Result<SubmissionReceipt, EngineError> {
            Ok(SubmissionReceipt {
                request_id: "req-42".to_string(),
            })
        }

        async fn poll_status(
            &self,
            _request_id: &str,
            _token: &str,
        ) -> Result<StatusReport, EngineError> {
            let mut statuses = self.statuses.lock().unwrap();
            if statuses.len() > 1 {
                Ok(statuses.remove(0))
            } else {
                Ok(statuses[0].clone())
            }
        }
    }

    fn admit_one(registry: &JobRegistry) -> JobHandle {
        registry
            .admit(
                VideoUrl::parse("https://example.com/v1").unwrap(),
                ProcessingTier::QuickScan,
                &JobSettings::default(),
            )
            .handle()
            .clone()
    }

    fn orchestrator(engine: Arc<StubEngine>) -> Orchestrator<StubEngine> {
        Orchestrator::new(
            engine,
            OrchestratorSettings {
                user_jwt: "jwt".to_string(),
                ..OrchestratorSettings::default()
            },
            RetryPolicy::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn happy_path_reaches_completed() {
        let engine = Arc::new(StubEngine::happy());
        let registry = JobRegistry::new();
        let handle = admit_one(&registry);

        orchestrator(Arc::clone(&engine)).run(handle.clone()).await;

        let job = handle.snapshot();
        assert_eq!(job.state(), JobState::Completed);
        assert_eq!(job.progress_percent(), 100);
        assert_eq!(job.result().unwrap().transcript, "hello world");
        assert!(job.failure().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn event_percents_are_monotone_with_one_terminal() {
        let engine = Arc::new(StubEngine::happy());
        let registry = JobRegistry::new();
        let handle = admit_one(&registry);

        orchestrator(engine).run(handle.clone()).await;

        let replay = handle.subscribe().replay;
        let mut last = 0;
        for event in &replay {
            assert!(event.percent >= last, "progress went backwards");
            last = event.percent;
        }
        assert_eq!(replay.iter().filter(|e| e.is_terminal()).count(), 1);
        assert!(replay.last().unwrap().is_terminal());
    }

    #[tokio::test(start_paused = true)]
    async fn unhealthy_engine_exhausts_health_retries() {
        let engine = Arc::new(StubEngine {
            healthy: false,
            ..StubEngine::happy()
        });
        let registry = JobRegistry::new();
        let handle = admit_one(&registry);

        orchestrator(Arc::clone(&engine)).run(handle.clone()).await;

        let job = handle.snapshot();
        assert_eq!(job.state(), JobState::Failed);
        let failure = job.failure().unwrap();
        assert_eq!(failure.kind, FailureKind::ServerError);
        assert_eq!(failure.attempts, StepKind::HealthCheck.attempt_budget());
        assert_eq!(
            engine.health_calls.load(Ordering::SeqCst),
            StepKind::HealthCheck.attempt_budget()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn auth_failure_on_vend_uses_fresh_idempotency_key() {
        let engine = Arc::new(StubEngine {
            vend_auth_failures: AtomicU32::new(1),
            ..StubEngine::happy()
        });
        let registry = JobRegistry::new();
        let handle = admit_one(&registry);

        orchestrator(Arc::clone(&engine)).run(handle.clone()).await;

        assert_eq!(handle.snapshot().state(), JobState::Completed);
        let ids = engine.vend_request_ids.lock().unwrap();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1], "idempotency key must be fresh per attempt");
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_job_discards_late_result() {
        let engine = Arc::new(StubEngine::happy());
        let registry = JobRegistry::new();
        let handle = admit_one(&registry);

        // someone else finalizes the record first
        handle.finalize_cancelled();
        orchestrator(engine).run(handle.clone()).await;

        let job = handle.snapshot();
        assert_eq!(job.state(), JobState::Cancelled);
        assert!(job.result().is_none());
        // no events after the terminal one
        assert!(handle.subscribe().replay.last().unwrap().is_terminal());
    }
}
