//! In-memory job storage (no persistence).
//!
//! Jobs are kept in an `Arc<RwLock<..>>` around an `FxHashMap` plus an
//! insertion-order index. Every mutation takes the write lock, so a write
//! that has returned is visible to every later read from any task. Jobs are
//! lost when the process exits.

use async_trait::async_trait;
use qjob_types::{Job, JobId, JobStatus};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{JobFilter, JobStorage, JobUpdate};
use crate::error::{EngineError, EngineResult};

#[derive(Default)]
struct Inner {
    jobs: FxHashMap<String, Job>,
    /// Job IDs in submission order.
    order: Vec<String>,
}

/// In-memory job storage.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStorage {
    /// Create a new in-memory storage.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStorage for MemoryStorage {
    async fn insert_job(&self, job: Job) -> EngineResult<()> {
        let mut inner = self.inner.write().await;
        if inner.jobs.contains_key(&job.id.0) {
            return Err(EngineError::DuplicateId(job.id.0));
        }
        inner.order.push(job.id.0.clone());
        inner.jobs.insert(job.id.0.clone(), job);
        Ok(())
    }

    async fn get_job(&self, job_id: &JobId) -> EngineResult<Option<Job>> {
        let inner = self.inner.read().await;
        Ok(inner.jobs.get(&job_id.0).cloned())
    }

    async fn list_jobs(&self, filter: JobFilter) -> EngineResult<Vec<Job>> {
        let inner = self.inner.read().await;
        let limit = filter.limit.unwrap_or(usize::MAX);

        Ok(inner
            .order
            .iter()
            .filter_map(|id| inner.jobs.get(id))
            .filter(|job| filter.matches(job))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn update_if(
        &self,
        job_id: &JobId,
        expected: JobStatus,
        update: JobUpdate,
    ) -> EngineResult<bool> {
        let mut inner = self.inner.write().await;

        let job = inner
            .jobs
            .get_mut(&job_id.0)
            .ok_or_else(|| EngineError::JobNotFound(job_id.0.clone()))?;

        if job.status != expected {
            return Ok(false);
        }

        // Apply to a copy so a rejected edge leaves the stored job untouched.
        let mut next = job.clone();
        update.apply(&mut next)?;
        *job = next;
        Ok(true)
    }

    async fn len(&self) -> EngineResult<usize> {
        Ok(self.inner.read().await.jobs.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qjob_types::{Backend, Parameters, ResultRecord};

    fn job(id: &str, user: &str) -> Job {
        Job::new(id, user, "SHOR", Backend::Simulator, Parameters::new(), 1)
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let storage = MemoryStorage::new();
        storage.insert_job(job("a", "alice")).await.unwrap();

        let fetched = storage.get_job(&JobId::new("a")).await.unwrap().unwrap();
        assert_eq!(fetched.user_id, "alice");
        assert_eq!(fetched.status, JobStatus::Queued);
        assert!(storage.get_job(&JobId::new("zz")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let storage = MemoryStorage::new();
        storage.insert_job(job("a", "alice")).await.unwrap();
        let err = storage.insert_job(job("a", "bob")).await.unwrap_err();
        assert!(matches!(err, EngineError::DuplicateId(id) if id == "a"));

        // The original entry is untouched.
        let fetched = storage.get_job(&JobId::new("a")).await.unwrap().unwrap();
        assert_eq!(fetched.user_id, "alice");
        assert_eq!(storage.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_preserves_submission_order() {
        let storage = MemoryStorage::new();
        for (id, user) in [("c", "alice"), ("a", "bob"), ("b", "alice")] {
            storage.insert_job(job(id, user)).await.unwrap();
        }

        let all: Vec<String> = storage
            .list_jobs(JobFilter::new())
            .await
            .unwrap()
            .into_iter()
            .map(|j| j.id.0)
            .collect();
        assert_eq!(all, vec!["c", "a", "b"]);

        let alice = storage
            .list_jobs(JobFilter::new().with_user("alice"))
            .await
            .unwrap();
        assert_eq!(alice.len(), 2);
        assert_eq!(alice[1].id.0, "b");

        let limited = storage
            .list_jobs(JobFilter::new().with_limit(1))
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_update_if_compare_and_set() {
        let storage = MemoryStorage::new();
        let id = JobId::new("a");
        storage.insert_job(job("a", "alice")).await.unwrap();

        // Wrong expected state: not applied.
        let applied = storage
            .update_if(&id, JobStatus::Running, JobUpdate::Advance(JobStatus::Completed))
            .await
            .unwrap();
        assert!(!applied);

        assert!(storage
            .update_if(&id, JobStatus::Queued, JobUpdate::Advance(JobStatus::Running))
            .await
            .unwrap());
        let running = storage.get_job(&id).await.unwrap().unwrap();
        assert!(running.started_at.is_some());

        let mut results = ResultRecord::new();
        results.insert("algorithm", "Shor");
        assert!(storage
            .update_if(
                &id,
                JobStatus::Running,
                JobUpdate::Complete {
                    results,
                    execution_time: 2.5
                }
            )
            .await
            .unwrap());

        let done = storage.get_job(&id).await.unwrap().unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.execution_time, Some(2.5));
        assert!(!done.results.is_empty());
    }

    #[tokio::test]
    async fn test_update_if_rejects_illegal_edge() {
        let storage = MemoryStorage::new();
        let id = JobId::new("a");
        storage.insert_job(job("a", "alice")).await.unwrap();

        let err = storage
            .update_if(&id, JobStatus::Queued, JobUpdate::Advance(JobStatus::Completed))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));

        let unchanged = storage.get_job(&id).await.unwrap().unwrap();
        assert_eq!(unchanged.status, JobStatus::Queued);
    }

    #[tokio::test]
    async fn test_update_unknown_job() {
        let storage = MemoryStorage::new();
        let err = storage
            .update_if(
                &JobId::new("ghost"),
                JobStatus::Queued,
                JobUpdate::Cancel { reason: None },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::JobNotFound(_)));
    }
}
