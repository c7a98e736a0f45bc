//! Aggregate statistics over the job store.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use qjob_types::{Job, JobStatus};
use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::job_store::JobStore;

/// Point-in-time statistics snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    /// Jobs currently stored (every accepted submission).
    #[serde(rename = "total_jobs_submitted")]
    pub total_submitted: usize,
    /// Lifetime count of completed jobs.
    #[serde(rename = "total_jobs_completed")]
    pub total_completed: u64,
    /// Lifetime count of submissions rejected by admission control.
    #[serde(rename = "total_jobs_rejected")]
    pub total_rejected: u64,
    pub queued: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// Mean reported execution time over jobs that have one; 0.0 if none.
    pub average_execution_time_seconds: f64,
}

impl Stats {
    /// Build a snapshot from a list of jobs and the lifetime counters.
    pub fn from_jobs(jobs: &[Job], total_completed: u64, total_rejected: u64) -> Self {
        let mut stats = Stats {
            total_submitted: jobs.len(),
            total_completed,
            total_rejected,
            ..Stats::default()
        };

        let mut time_sum = 0.0;
        let mut timed = 0usize;
        for job in jobs {
            *stats.count_mut(job.status) += 1;
            if let Some(t) = job.execution_time.filter(|t| *t > 0.0) {
                time_sum += t;
                timed += 1;
            }
        }
        if timed > 0 {
            stats.average_execution_time_seconds = time_sum / timed as f64;
        }
        stats
    }

    /// Number of jobs currently in `status`.
    pub fn count(&self, status: JobStatus) -> usize {
        match status {
            JobStatus::Queued => self.queued,
            JobStatus::Running => self.running,
            JobStatus::Completed => self.completed,
            JobStatus::Failed => self.failed,
            JobStatus::Cancelled => self.cancelled,
        }
    }

    /// Sum over every status bucket.
    pub fn status_total(&self) -> usize {
        JobStatus::ALL.iter().map(|s| self.count(*s)).sum()
    }

    fn count_mut(&mut self, status: JobStatus) -> &mut usize {
        match status {
            JobStatus::Queued => &mut self.queued,
            JobStatus::Running => &mut self.running,
            JobStatus::Completed => &mut self.completed,
            JobStatus::Failed => &mut self.failed,
            JobStatus::Cancelled => &mut self.cancelled,
        }
    }
}

/// Computes [`Stats`] snapshots.
///
/// The scan is not transactional: jobs that change state while it runs may
/// be counted in either bucket, so buckets only sum to `total_submitted`
/// when no job is in flight.
pub struct StatisticsAggregator {
    store: Arc<JobStore>,
    rejected: Arc<AtomicU64>,
}

impl StatisticsAggregator {
    pub fn new(store: Arc<JobStore>, rejected: Arc<AtomicU64>) -> Self {
        Self { store, rejected }
    }

    pub async fn snapshot(&self) -> EngineResult<Stats> {
        let jobs = self.store.list_all().await?;
        Ok(Stats::from_jobs(
            &jobs,
            self.store.total_completed(),
            self.rejected.load(Ordering::SeqCst),
        ))
    }
}
