//! Job storage front-end used by the scheduler and the engine facade.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use qjob_types::{Job, JobId, JobStatus, ResultRecord};
use tokio::sync::watch;

use crate::error::{EngineError, EngineResult};
use crate::storage::{JobFilter, JobStorage, JobUpdate, MemoryStorage};

/// Keyed collection of jobs with guarded status transitions.
///
/// Wraps a [`JobStorage`] backend and publishes a generation counter that is
/// bumped on every terminal transition, so waiters can sleep until some job
/// finishes instead of polling.
pub struct JobStore {
    storage: Arc<dyn JobStorage>,
    terminal: watch::Sender<u64>,
    /// Lifetime count of `Completed` transitions.
    completed: AtomicU64,
}

impl JobStore {
    /// Create a job store with in-memory storage.
    pub fn new() -> Self {
        Self::with_storage(Arc::new(MemoryStorage::new()))
    }

    /// Create a job store with a custom storage backend.
    pub fn with_storage(storage: Arc<dyn JobStorage>) -> Self {
        let (terminal, _) = watch::channel(0);
        Self {
            storage,
            terminal,
            completed: AtomicU64::new(0),
        }
    }

    /// Store a new job.
    pub async fn insert(&self, job: Job) -> EngineResult<()> {
        self.storage.insert_job(job).await
    }

    /// Snapshot of a job, or `JobNotFound`.
    pub async fn get(&self, job_id: &JobId) -> EngineResult<Job> {
        self.storage
            .get_job(job_id)
            .await?
            .ok_or_else(|| EngineError::JobNotFound(job_id.0.clone()))
    }

    /// Jobs matching `filter`, in submission order.
    pub async fn list(&self, filter: JobFilter) -> EngineResult<Vec<Job>> {
        self.storage.list_jobs(filter).await
    }

    /// All jobs submitted by `user_id`, in submission order.
    pub async fn list_by_user(&self, user_id: &str) -> EngineResult<Vec<Job>> {
        self.list(JobFilter::new().with_user(user_id)).await
    }

    /// Every job, in submission order.
    pub async fn list_all(&self) -> EngineResult<Vec<Job>> {
        self.list(JobFilter::new()).await
    }

    /// Number of stored jobs.
    pub async fn len(&self) -> EngineResult<usize> {
        self.storage.len().await
    }

    /// Compare-and-set `expected -> next`.
    ///
    /// Returns `Ok(false)` if the job is no longer in `expected`. Fails with
    /// `InvalidTransition` if `expected -> next` is not a legal edge.
    pub async fn transition(
        &self,
        job_id: &JobId,
        expected: JobStatus,
        next: JobStatus,
    ) -> EngineResult<bool> {
        self.update(job_id, expected, JobUpdate::Advance(next)).await
    }

    /// `Running -> Completed` with results and reported execution time.
    pub async fn complete(
        &self,
        job_id: &JobId,
        results: ResultRecord,
        execution_time: f64,
    ) -> EngineResult<bool> {
        let update = JobUpdate::Complete {
            results,
            execution_time,
        };
        self.update(job_id, JobStatus::Running, update).await
    }

    /// `expected -> Failed` with a diagnostic.
    pub async fn fail(
        &self,
        job_id: &JobId,
        expected: JobStatus,
        reason: impl Into<String>,
    ) -> EngineResult<bool> {
        let update = JobUpdate::Fail {
            reason: reason.into(),
        };
        self.update(job_id, expected, update).await
    }

    /// `expected -> Cancelled`, optionally recording why.
    pub async fn cancel(
        &self,
        job_id: &JobId,
        expected: JobStatus,
        reason: Option<&str>,
    ) -> EngineResult<bool> {
        let update = JobUpdate::Cancel {
            reason: reason.map(str::to_string),
        };
        self.update(job_id, expected, update).await
    }

    /// Jobs completed over the store's lifetime.
    ///
    /// Unlike a count of `Completed` entries this never decreases.
    pub fn total_completed(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    /// Receiver for the terminal-transition generation counter.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.terminal.subscribe()
    }

    async fn update(
        &self,
        job_id: &JobId,
        expected: JobStatus,
        update: JobUpdate,
    ) -> EngineResult<bool> {
        let next = update.target();
        if !expected.can_transition_to(next) {
            return Err(EngineError::InvalidTransition {
                from: expected,
                to: next,
            });
        }

        let applied = self.storage.update_if(job_id, expected, update).await?;
        if applied && next == JobStatus::Completed {
            self.completed.fetch_add(1, Ordering::SeqCst);
        }
        if applied && next.is_terminal() {
            self.terminal.send_modify(|generation| *generation += 1);
        }
        Ok(applied)
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}
