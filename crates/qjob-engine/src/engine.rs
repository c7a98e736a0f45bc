//! Engine facade: the operations exposed to transport layers.

use std::sync::Arc;
use std::time::Duration;

use qjob_sim::{SimulatorRegistry, create_default_registry};
use qjob_types::{Backend, Job, JobId, Parameters, ResultRecord};
use tracing::{debug, error};

use crate::config::SchedulerConfig;
use crate::error::{EngineError, EngineResult};
use crate::job_store::JobStore;
use crate::scheduler::{JobRequest, JobScheduler};
use crate::stats::{StatisticsAggregator, Stats};
use crate::storage::JobFilter;

/// Bundles the job store, scheduler, simulator registry and statistics.
pub struct Engine {
    store: Arc<JobStore>,
    registry: Arc<SimulatorRegistry>,
    scheduler: JobScheduler,
    stats: StatisticsAggregator,
}

impl Engine {
    /// Engine with in-memory storage and the built-in simulators.
    ///
    /// Must be called from within a tokio runtime; the worker pool starts
    /// immediately.
    pub fn new(config: SchedulerConfig) -> Self {
        Self::with_parts(
            config,
            Arc::new(JobStore::new()),
            Arc::new(create_default_registry()),
        )
    }

    /// Engine over a caller-supplied store and registry.
    pub fn with_parts(
        config: SchedulerConfig,
        store: Arc<JobStore>,
        registry: Arc<SimulatorRegistry>,
    ) -> Self {
        let scheduler = JobScheduler::start(Arc::clone(&store), Arc::clone(&registry), config);
        let stats = StatisticsAggregator::new(Arc::clone(&store), scheduler.rejected_counter());
        Self {
            store,
            registry,
            scheduler,
            stats,
        }
    }

    /// Queue an algorithm run; the returned job is `Queued`.
    ///
    /// `shots <= 0` selects the configured default.
    pub async fn submit_job(
        &self,
        user_id: &str,
        algorithm: &str,
        backend: Backend,
        parameters: Parameters,
        shots: i64,
    ) -> EngineResult<Job> {
        let request = JobRequest::new(user_id, algorithm)
            .with_backend(backend)
            .with_parameters(parameters)
            .with_shots(shots);
        self.scheduler.submit(request).await
    }

    pub async fn get_job(&self, job_id: &JobId) -> Option<Job> {
        match self.store.get(job_id).await {
            Ok(job) => Some(job),
            Err(EngineError::JobNotFound(_)) => None,
            Err(e) => {
                error!(job_id = %job_id, error = %e, "Failed to read job");
                None
            }
        }
    }

    pub async fn list_jobs_for_user(&self, user_id: &str) -> Vec<Job> {
        self.store.list_by_user(user_id).await.unwrap_or_else(|e| {
            error!(user_id, error = %e, "Failed to list jobs");
            Vec::new()
        })
    }

    pub async fn list_all_jobs(&self) -> Vec<Job> {
        self.list_jobs(JobFilter::new()).await
    }

    /// Jobs matching `filter`, in submission order.
    pub async fn list_jobs(&self, filter: JobFilter) -> Vec<Job> {
        self.store.list(filter).await.unwrap_or_else(|e| {
            error!(error = %e, "Failed to list jobs");
            Vec::new()
        })
    }

    /// Run a simulator directly, bypassing the queue and the store.
    ///
    /// Negative `shots` are clamped to zero. The random stream is a fork of
    /// the scheduler's master source.
    pub async fn run_algorithm_sync(
        &self,
        algorithm: &str,
        parameters: Parameters,
        shots: i64,
    ) -> EngineResult<ResultRecord> {
        let shots = u32::try_from(shots.max(0)).unwrap_or(u32::MAX);
        let mut rng = self.scheduler.fork_rng().await;
        let registry = Arc::clone(&self.registry);
        let algorithm = algorithm.to_string();
        debug!(algorithm = %algorithm, shots, "Running algorithm synchronously");

        let result = tokio::task::spawn_blocking(move || {
            registry.dispatch(&algorithm, &parameters, shots, &mut rng)
        })
        .await
        .map_err(|e| EngineError::Internal(format!("simulator task failed: {e}")))??;
        Ok(result)
    }

    /// Cancel a queued job; `false` if it is unknown, running or finished.
    pub async fn cancel_job(&self, job_id: &JobId) -> bool {
        self.scheduler.cancel(job_id).await
    }

    pub async fn get_statistics(&self) -> Stats {
        self.stats.snapshot().await.unwrap_or_else(|e| {
            error!(error = %e, "Failed to compute statistics");
            Stats::default()
        })
    }

    /// Resolve once the job is terminal, or fail with `Timeout`.
    pub async fn wait_for_job(&self, job_id: &JobId, timeout: Duration) -> EngineResult<Job> {
        self.scheduler.wait_for(job_id, timeout).await
    }

    /// Stop the worker pool; see [`JobScheduler::shutdown`].
    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
    }

    pub fn registry(&self) -> &SimulatorRegistry {
        &self.registry
    }

    pub fn scheduler(&self) -> &JobScheduler {
        &self.scheduler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qjob_types::{JobStatus, Value};

    #[tokio::test]
    async fn test_get_unknown_job_is_none() {
        let engine = Engine::new(SchedulerConfig::without_delays());
        assert!(engine.get_job(&JobId::new("missing")).await.is_none());
        assert!(!engine.cancel_job(&JobId::new("missing")).await);
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_run_algorithm_sync() {
        let engine = Engine::new(SchedulerConfig::without_delays().with_seed(3));
        let result = engine
            .run_algorithm_sync("shor", Parameters::new().with("number", 35), 1)
            .await
            .unwrap();
        let factors: Vec<i64> = result
            .get("factors")
            .and_then(Value::as_list)
            .unwrap()
            .iter()
            .filter_map(Value::as_i64)
            .collect();
        assert_eq!(factors, vec![5, 7]);

        // Nothing was stored.
        assert!(engine.list_all_jobs().await.is_empty());
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_run_algorithm_sync_negative_shots() {
        let engine = Engine::new(SchedulerConfig::without_delays());
        let result = engine
            .run_algorithm_sync("TELEPORT", Parameters::new(), -10)
            .await
            .unwrap();
        assert!(result.counts("counts").unwrap().is_empty());
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_run_algorithm_sync_invalid_parameter() {
        let engine = Engine::new(SchedulerConfig::without_delays());
        let err = engine
            .run_algorithm_sync("GROVER", Parameters::new().with("qubits", 500), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Simulation(_)));
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_submitted_job_is_listed() {
        let engine = Engine::new(SchedulerConfig::without_delays());
        let job = engine
            .submit_job("alice", "GROVER", Backend::AwsBraket, Parameters::new(), 32)
            .await
            .unwrap();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.backend, Backend::AwsBraket);

        let listed = engine.list_jobs_for_user("alice").await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, job.id);
        assert!(engine.list_jobs_for_user("bob").await.is_empty());
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_list_jobs_filtered() {
        let config = SchedulerConfig::without_delays()
            .with_queue_delay(crate::config::DelayRange::new(60_000, 60_001));
        let engine = Engine::new(config);
        let mut ids = Vec::new();
        for user in ["alice", "bob", "alice"] {
            let job = engine
                .submit_job(user, "SHOR", Backend::Simulator, Parameters::new(), 1)
                .await
                .unwrap();
            ids.push(job.id);
        }
        assert!(engine.cancel_job(&ids[1]).await);

        let cancelled = engine
            .list_jobs(JobFilter::new().with_status(JobStatus::Cancelled))
            .await;
        assert_eq!(cancelled.len(), 1);
        assert_eq!(cancelled[0].id, ids[1]);

        let first_queued = engine
            .list_jobs(JobFilter::new().with_status(JobStatus::Queued).with_limit(1))
            .await;
        assert_eq!(first_queued.len(), 1);
        assert_eq!(first_queued[0].id, ids[0]);
        engine.shutdown().await;
    }
}
