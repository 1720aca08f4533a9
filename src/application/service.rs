//! Job service: the host-facing facade over the orchestration core

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Semaphore;

use crate::domain::config::AppConfig;
use crate::domain::job::{Job, JobId};
use crate::domain::transcription::{ProcessingTier, VideoUrl};

use super::orchestrator::{Orchestrator, OrchestratorSettings};
use super::ports::BusinessEngine;
use super::registry::{Admission, JobRegistry, JobSettings};
use super::reporter::Subscription;
use super::retry::RetryPolicy;

/// Errors from job submission
#[derive(Debug, Clone, Error)]
pub enum SubmitError {
    #[error("Missing user credential. Set PLUCT_USER_JWT or configure via 'pluct-transcribe config set user_jwt <token>'")]
    MissingCredential,
}

/// Service-level knobs, usually derived from [`AppConfig`]
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub user_jwt: Option<String>,
    pub max_duration: Duration,
    pub poll_interval: Duration,
    /// Jobs allowed to run concurrently; admissions beyond this wait
    /// in `Queued` until a worker slot frees
    pub max_concurrent_jobs: usize,
    pub replay_buffer: usize,
}

impl ServiceSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            user_jwt: config.user_jwt.clone(),
            max_duration: config.job_deadline_or_default(),
            poll_interval: config.poll_interval_or_default(),
            max_concurrent_jobs: config.max_concurrent_jobs_or_default(),
            replay_buffer: config.replay_buffer_or_default(),
        }
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::defaults())
    }
}

/// One logical worker task per admitted job, bounded by a semaphore;
/// steps run sequentially within a job, jobs run in parallel across the
/// pool. The registry below enforces per-URL mutual exclusion.
pub struct JobService<E> {
    orchestrator: Arc<Orchestrator<E>>,
    registry: Arc<JobRegistry>,
    permits: Arc<Semaphore>,
    job_settings: JobSettings,
    has_credential: bool,
}

impl<E: BusinessEngine + 'static> JobService<E> {
    pub fn new(engine: Arc<E>, settings: ServiceSettings) -> Self {
        let has_credential = settings
            .user_jwt
            .as_deref()
            .map(|jwt| !jwt.trim().is_empty())
            .unwrap_or(false);

        let orchestrator = Orchestrator::new(
            engine,
            OrchestratorSettings {
                user_jwt: settings.user_jwt.unwrap_or_default(),
                max_duration: settings.max_duration,
                poll_interval: settings.poll_interval,
            },
            RetryPolicy::default(),
        );

        Self {
            orchestrator: Arc::new(orchestrator),
            registry: Arc::new(JobRegistry::new()),
            permits: Arc::new(Semaphore::new(settings.max_concurrent_jobs.max(1))),
            job_settings: JobSettings {
                max_duration: settings.max_duration,
                replay_buffer: settings.replay_buffer,
            },
            has_credential,
        }
    }

    /// Admit a job for `url`, superseding any active job for the same
    /// URL, and start a background worker for it.
    pub fn submit_job(&self, url: VideoUrl, tier: ProcessingTier) -> Result<JobId, SubmitError> {
        if !self.has_credential {
            return Err(SubmitError::MissingCredential);
        }

        let admission = self.registry.admit(url, tier, &self.job_settings);
        if let Admission::Replaced { superseded, handle } = &admission {
            tracing::info!(
                superseded = %superseded,
                job_id = %handle.id(),
                "resubmitted URL; previous job cancelled"
            );
        }

        let handle = admission.handle().clone();
        let id = handle.id().clone();

        let orchestrator = Arc::clone(&self.orchestrator);
        let registry = Arc::clone(&self.registry);
        let permits = Arc::clone(&self.permits);
        let worker_id = id.clone();

        tokio::spawn(async move {
            // A cancel that lands while the job waits for a worker slot
            // resolves immediately instead of occupying one.
            let permit = tokio::select! {
                _ = handle.cancel_requested() => {
                    handle.finalize_cancelled();
                    registry.release(&worker_id);
                    return;
                }
                permit = permits.acquire_owned() => permit,
            };

            match permit {
                Ok(_permit) => {
                    orchestrator.run(handle).await;
                }
                // semaphore closed: service is shutting down
                Err(_) => {
                    handle.finalize_cancelled();
                }
            }
            registry.release(&worker_id);
        });

        Ok(id)
    }

    /// Subscribe to a job's ordered progress stream (bounded replay
    /// plus live feed). `None` if the id is unknown or long finished.
    pub fn subscribe(&self, id: &JobId) -> Option<Subscription> {
        self.registry.get(id).map(|handle| handle.subscribe())
    }

    /// Request cooperative cancellation. Returns whether the job was
    /// known; the terminal event follows at the job's next checkpoint.
    pub fn cancel_job(&self, id: &JobId) -> bool {
        match self.registry.get(id) {
            Some(handle) => {
                handle.request_cancel();
                true
            }
            None => false,
        }
    }

    /// Point-in-time copy of the authoritative job record
    pub fn snapshot(&self, id: &JobId) -> Option<Job> {
        self.registry.get(id).map(|handle| handle.snapshot())
    }

    /// Jobs admitted and not yet released
    pub fn active_jobs(&self) -> usize {
        self.registry.active_count()
    }
}
