//! Pluggable storage backends for job state.
//!
//! This module defines the `JobStorage` trait which lets the job store run
//! over different backends. Only [`MemoryStorage`] ships today; jobs live for
//! the lifetime of the process.

use async_trait::async_trait;
use qjob_types::{Job, JobId, JobStatus, ResultRecord};

use crate::error::EngineResult;

pub mod memory;

pub use memory::MemoryStorage;

/// Filter for querying jobs.
#[derive(Clone, Debug, Default)]
pub struct JobFilter {
    /// Only jobs submitted by this user
    pub user_id: Option<String>,
    /// Only jobs in this state
    pub status: Option<JobStatus>,
    /// Maximum number of results (`None` for all)
    pub limit: Option<usize>,
}

impl JobFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `job` passes every set criterion.
    pub fn matches(&self, job: &Job) -> bool {
        if let Some(ref user_id) = self.user_id {
            if &job.user_id != user_id {
                return false;
            }
        }
        if let Some(status) = self.status {
            if job.status != status {
                return false;
            }
        }
        true
    }
}

/// A status change applied atomically by a storage backend.
#[derive(Debug, Clone)]
pub enum JobUpdate {
    /// Plain edge of the state machine (e.g. `Queued -> Running`).
    Advance(JobStatus),
    /// `Running -> Completed` with results and reported time.
    Complete {
        results: ResultRecord,
        execution_time: f64,
    },
    /// `-> Failed` with a diagnostic.
    Fail { reason: String },
    /// `-> Cancelled`, optionally with a diagnostic.
    Cancel { reason: Option<String> },
}

impl JobUpdate {
    /// Status the job ends up in.
    pub fn target(&self) -> JobStatus {
        match self {
            JobUpdate::Advance(next) => *next,
            JobUpdate::Complete { .. } => JobStatus::Completed,
            JobUpdate::Fail { .. } => JobStatus::Failed,
            JobUpdate::Cancel { .. } => JobStatus::Cancelled,
        }
    }

    /// Apply to a job snapshot, validating the edge first.
    pub fn apply(self, job: &mut Job) -> EngineResult<()> {
        match self {
            JobUpdate::Advance(next) => job.advance(next)?,
            JobUpdate::Complete {
                results,
                execution_time,
            } => job.complete(results, execution_time)?,
            JobUpdate::Fail { reason } => {
                job.advance(JobStatus::Failed)?;
                job.error = Some(reason);
            }
            JobUpdate::Cancel { reason } => {
                job.advance(JobStatus::Cancelled)?;
                job.error = reason;
            }
        }
        Ok(())
    }
}

/// Storage backend trait for job state.
///
/// All implementations must be thread-safe (`Send + Sync`) and make every
/// completed write visible to subsequent reads from any task.
#[async_trait]
pub trait JobStorage: Send + Sync {
    /// Store a new job. Fails with `DuplicateId` if the ID is taken.
    async fn insert_job(&self, job: Job) -> EngineResult<()>;

    /// Retrieve a job snapshot by ID.
    async fn get_job(&self, job_id: &JobId) -> EngineResult<Option<Job>>;

    /// List jobs matching `filter`, in submission order.
    async fn list_jobs(&self, filter: JobFilter) -> EngineResult<Vec<Job>>;

    /// Compare-and-set update.
    ///
    /// Applies `update` only if the job is currently in `expected` and
    /// returns whether it was applied. Fails with `JobNotFound` for an
    /// unknown ID.
    async fn update_if(
        &self,
        job_id: &JobId,
        expected: JobStatus,
        update: JobUpdate,
    ) -> EngineResult<bool>;

    /// Number of stored jobs.
    async fn len(&self) -> EngineResult<usize>;
}
