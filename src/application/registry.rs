//! Job dedup registry: at most one active job per source URL

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::domain::job::{Job, JobId, ProgressEvent};
use crate::domain::transcription::{ProcessingTier, VideoUrl};

use super::reporter::{ProgressReporter, Subscription};

/// How many terminal jobs stay queryable after release, so a caller that
/// just observed a terminal event can still fetch the final snapshot.
const FINISHED_RETENTION: usize = 32;

/// Per-job knobs applied at admission
#[derive(Debug, Clone)]
pub struct JobSettings {
    /// Overall deadline for the whole run, retries and polling included
    pub max_duration: Duration,
    /// Replay ring size for late progress subscribers
    pub replay_buffer: usize,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            max_duration: Duration::from_secs(160),
            replay_buffer: 16,
        }
    }
}

/// Shared handle to one admitted job: the authoritative record, its
/// cancellation token, and its event stream.
#[derive(Clone)]
pub struct JobHandle {
    id: JobId,
    job: Arc<Mutex<Job>>,
    cancel: CancellationToken,
    reporter: Arc<ProgressReporter>,
}

impl JobHandle {
    fn new(job: Job, replay_buffer: usize) -> Self {
        Self {
            id: job.id().clone(),
            job: Arc::new(Mutex::new(job)),
            cancel: CancellationToken::new(),
            reporter: Arc::new(ProgressReporter::new(replay_buffer)),
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    /// Point-in-time copy of the job record
    pub fn snapshot(&self) -> Job {
        self.with_job(|job| job.clone())
    }

    /// Attach a progress subscriber (replay + live feed)
    pub fn subscribe(&self) -> Subscription {
        self.reporter.subscribe()
    }

    /// Signal cooperative cancellation; observed at the next checkpoint
    pub fn request_cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Resolves when cancellation has been requested
    pub async fn cancel_requested(&self) {
        self.cancel.cancelled().await
    }

    /// Run `f` against the locked job record
    pub(crate) fn with_job<R>(&self, f: impl FnOnce(&mut Job) -> R) -> R {
        let mut job = self.job.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut job)
    }

    pub(crate) fn publish(&self, event: ProgressEvent) {
        self.reporter.publish(event);
    }

    /// Move the job to `Cancelled` and emit the terminal event, unless it
    /// already reached a terminal state. Used both for host cancellation
    /// and for supersede-on-readmission; doing the transition and the
    /// event under one lock keeps the stream free of post-terminal events.
    pub(crate) fn finalize_cancelled(&self) -> bool {
        self.cancel.cancel();
        self.with_job(|job| {
            if job.is_terminal() {
                return false;
            }
            // cannot fail: checked non-terminal under the same lock
            let _ = job.cancel();
            self.reporter.publish(ProgressEvent::now(
                job.id().clone(),
                job.state(),
                job.current_step(),
                job.progress_percent(),
                "job cancelled",
            ));
            true
        })
    }
}

/// Outcome of an admission request
pub enum Admission {
    /// No active job existed for this URL
    Admitted(JobHandle),
    /// An active job existed and was cancelled in favor of the new one
    Replaced {
        superseded: JobId,
        handle: JobHandle,
    },
}

impl Admission {
    pub fn handle(&self) -> &JobHandle {
        match self {
            Self::Admitted(handle) => handle,
            Self::Replaced { handle, .. } => handle,
        }
    }
}

struct RegistryInner {
    /// Active (non-terminal) job per canonical URL string
    by_url: HashMap<String, JobId>,
    active: HashMap<JobId, JobHandle>,
    /// Recently finished jobs, oldest first
    finished: VecDeque<JobHandle>,
}

/// Single-writer map enforcing one active job per URL.
///
/// All mutations go through one mutex, so two jobs for the same URL can
/// never coexist even under concurrent admission requests.
pub struct JobRegistry {
    inner: Mutex<RegistryInner>,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                by_url: HashMap::new(),
                active: HashMap::new(),
                finished: VecDeque::new(),
            }),
        }
    }

    /// Admit a job for `url`, superseding any active job for the same URL
    /// (latest request wins). The superseded job is moved to `Cancelled`
    /// and its terminal event published before the new handle becomes
    /// visible, so the one-active-job-per-URL invariant holds at every
    /// instant.
    pub fn admit(&self, url: VideoUrl, tier: ProcessingTier, settings: &JobSettings) -> Admission {
        let mut inner = self.lock();

        let handle = JobHandle::new(
            Job::new(url.clone(), tier, settings.max_duration),
            settings.replay_buffer,
        );
        let id = handle.id().clone();

        let superseded = inner.by_url.insert(url.as_str().to_string(), id.clone());
        let superseded = superseded.and_then(|old_id| {
            let old = inner.active.remove(&old_id)?;
            old.finalize_cancelled();
            Self::park_finished(&mut inner, old);
            Some(old_id)
        });

        inner.active.insert(id, handle.clone());
        drop(inner);

        handle.publish(ProgressEvent::now(
            handle.id().clone(),
            handle.with_job(|job| job.state()),
            None,
            0,
            "queued",
        ));

        match superseded {
            Some(old_id) => Admission::Replaced {
                superseded: old_id,
                handle,
            },
            None => Admission::Admitted(handle),
        }
    }

    /// Look up a job by id, active entries first, then recent finishers
    pub fn get(&self, id: &JobId) -> Option<JobHandle> {
        let inner = self.lock();
        inner.active.get(id).cloned().or_else(|| {
            inner
                .finished
                .iter()
                .find(|handle| handle.id() == id)
                .cloned()
        })
    }

    /// Release a terminal job: frees its URL slot and parks the handle in
    /// the bounded finished ring so the final snapshot stays queryable.
    pub fn release(&self, id: &JobId) {
        let mut inner = self.lock();
        if let Some(handle) = inner.active.remove(id) {
            let url = handle.with_job(|job| job.source_url().as_str().to_string());
            if inner.by_url.get(&url) == Some(id) {
                inner.by_url.remove(&url);
            }
            Self::park_finished(&mut inner, handle);
        }
    }

    /// Number of admitted jobs not yet released
    pub fn active_count(&self) -> usize {
        self.lock().active.len()
    }

    fn park_finished(inner: &mut RegistryInner, handle: JobHandle) {
        if inner.finished.len() == FINISHED_RETENTION {
            inner.finished.pop_front();
        }
        inner.finished.push_back(handle);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
