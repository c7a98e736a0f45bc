//! Bounded worker pool that executes queued jobs.
//!
//! Submissions reserve a slot in a bounded `mpsc` queue before anything is
//! stored, so a full queue rejects the request with [`EngineError::QueueFull`]
//! and leaves no trace in the store. A fixed number of worker tasks share the
//! receiving end; each job ID is received by exactly one worker, which owns
//! the job until it reaches a terminal state.
//!
//! Per job, a worker:
//! 1. sleeps the simulated queue delay while the job is still `Queued`,
//! 2. claims it with a `Queued -> Running` compare-and-set (a job cancelled
//!    in the meantime is skipped),
//! 3. sleeps the simulated compute delay,
//! 4. dispatches the simulator on the blocking pool and stores the results.
//!
//! Shutdown raises an interrupt observed during both sleeps: sleeping jobs
//! become `Cancelled`, jobs still in the queue are drained and cancelled, and
//! a job already inside a simulator runs to completion.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use qjob_sim::{RandomSource, SimulatorRegistry};
use qjob_types::{Backend, Job, JobId, JobStatus, Parameters};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, RwLock, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::config::SchedulerConfig;
use crate::error::{EngineError, EngineResult};
use crate::job_store::JobStore;
use crate::metrics::Metrics;

/// Diagnostic attached to jobs cancelled by shutdown.
pub const INTERRUPTED: &str = "interrupted";

/// A request to run an algorithm in the background.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub user_id: String,
    pub algorithm: String,
    pub backend: Backend,
    pub parameters: Parameters,
    /// Requested shots; zero or negative selects the configured default.
    pub shots: i64,
}

impl JobRequest {
    pub fn new(user_id: impl Into<String>, algorithm: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            algorithm: algorithm.into(),
            backend: Backend::default(),
            parameters: Parameters::new(),
            shots: 0,
        }
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_shots(mut self, shots: i64) -> Self {
        self.shots = shots;
        self
    }
}

/// Queue entry: the job plus its own random stream, forked at submission so
/// a seeded scheduler is reproducible regardless of which worker runs what.
struct QueuedJob {
    id: JobId,
    rng: RandomSource,
}

/// State shared by the scheduler handle and its workers.
struct Shared {
    store: Arc<JobStore>,
    registry: Arc<SimulatorRegistry>,
    config: SchedulerConfig,
    metrics: Metrics,
    queue: Mutex<mpsc::Receiver<QueuedJob>>,
    interrupt: watch::Sender<bool>,
}

/// Fixed-size worker pool draining a bounded submission queue.
pub struct JobScheduler {
    shared: Arc<Shared>,
    sender: mpsc::Sender<QueuedJob>,
    rng: Mutex<RandomSource>,
    rejected: Arc<AtomicU64>,
    /// Held shared by `submit` and exclusively by `shutdown` while it raises
    /// the interrupt, so no submission lands after the queue is drained.
    admission: RwLock<()>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl JobScheduler {
    /// Spawn `config.workers` worker tasks on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn start(
        store: Arc<JobStore>,
        registry: Arc<SimulatorRegistry>,
        config: SchedulerConfig,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(config.max_queued_jobs.max(1));
        let (interrupt, _) = watch::channel(false);
        let rng = RandomSource::from_seed_option(config.seed);
        let worker_count = config.workers.max(1);

        let shared = Arc::new(Shared {
            store,
            registry,
            config,
            metrics: Metrics::new(),
            queue: Mutex::new(receiver),
            interrupt,
        });

        let workers = (0..worker_count)
            .map(|worker| tokio::spawn(run_worker(Arc::clone(&shared), worker)))
            .collect();

        info!(
            workers = worker_count,
            capacity = shared.config.max_queued_jobs,
            seeded = shared.config.seed.is_some(),
            "Job scheduler started"
        );

        Self {
            shared,
            sender,
            rng: Mutex::new(rng),
            rejected: Arc::new(AtomicU64::new(0)),
            admission: RwLock::new(()),
            workers: Mutex::new(workers),
        }
    }

    /// Queue a job and return its `Queued` snapshot immediately.
    #[instrument(skip(self, request), fields(user_id = %request.user_id, algorithm = %request.algorithm))]
    pub async fn submit(&self, request: JobRequest) -> EngineResult<Job> {
        let _admission = self.admission.read().await;
        if self.is_shutting_down() {
            return Err(EngineError::ShuttingDown);
        }

        let permit = match self.sender.try_reserve() {
            Ok(permit) => permit,
            Err(TrySendError::Full(())) => {
                self.rejected.fetch_add(1, Ordering::SeqCst);
                self.shared.metrics.record_job_rejected();
                warn!(
                    capacity = self.shared.config.max_queued_jobs,
                    "Queue full, rejecting job"
                );
                return Err(EngineError::QueueFull {
                    capacity: self.shared.config.max_queued_jobs,
                });
            }
            Err(TrySendError::Closed(())) => return Err(EngineError::ShuttingDown),
        };

        let shots = self.effective_shots(request.shots);
        let job = Job::new(
            JobId::generate(),
            request.user_id,
            request.algorithm,
            request.backend,
            request.parameters,
            shots,
        );
        let rng = self.rng.lock().await.fork();

        // A failed insert drops the permit and frees the slot.
        self.shared.store.insert(job.clone()).await?;
        permit.send(QueuedJob {
            id: job.id.clone(),
            rng,
        });

        self.shared
            .metrics
            .record_job_submitted(&self.shared.registry.resolve(&job.algorithm));
        info!(job_id = %job.id, shots, backend = %job.backend, "Job submitted");
        Ok(job)
    }

    /// Cancel a job that is still queued.
    ///
    /// Returns `false` if the job does not exist or has already been claimed
    /// by a worker or finished.
    #[instrument(skip(self, job_id), fields(job_id = %job_id))]
    pub async fn cancel(&self, job_id: &JobId) -> bool {
        match self
            .shared
            .store
            .cancel(job_id, JobStatus::Queued, None)
            .await
        {
            Ok(true) => {
                self.shared.metrics.record_job_cancelled(JobStatus::Queued);
                info!("Job cancelled");
                true
            }
            Ok(false) | Err(EngineError::JobNotFound(_)) => false,
            Err(e) => {
                error!(error = %e, "Failed to cancel job");
                false
            }
        }
    }

    /// Wait until the job reaches a terminal state.
    pub async fn wait_for(&self, job_id: &JobId, timeout: Duration) -> EngineResult<Job> {
        let mut terminal = self.shared.store.subscribe();
        let wait = async {
            loop {
                let job = self.shared.store.get(job_id).await?;
                if job.status.is_terminal() {
                    return Ok(job);
                }
                if terminal.changed().await.is_err() {
                    return Err(EngineError::ShuttingDown);
                }
            }
        };

        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| EngineError::Timeout(job_id.0.clone()))?
    }

    /// Stop the pool.
    ///
    /// Jobs sleeping in a simulated delay are cancelled, queued jobs are
    /// drained and cancelled, and workers are joined. Jobs already inside a
    /// simulator finish normally. Later submissions fail with
    /// `ShuttingDown`. Submissions already in flight finish first and are
    /// drained with the rest of the queue. Calling this more than once is a
    /// no-op.
    pub async fn shutdown(&self) {
        {
            let _admission = self.admission.write().await;
            if self.shared.interrupt.send_replace(true) {
                return;
            }
        }
        info!("Job scheduler shutting down");

        let workers = std::mem::take(&mut *self.workers.lock().await);
        for handle in workers {
            if let Err(e) = handle.await {
                error!(error = %e, "Worker task failed");
            }
        }

        let mut drained = 0usize;
        let mut queue = self.shared.queue.lock().await;
        while let Ok(queued) = queue.try_recv() {
            match self
                .shared
                .store
                .cancel(&queued.id, JobStatus::Queued, Some(INTERRUPTED))
                .await
            {
                Ok(true) => {
                    drained += 1;
                    self.shared.metrics.record_job_cancelled(JobStatus::Queued);
                }
                Ok(false) => {}
                Err(e) => warn!(job_id = %queued.id, error = %e, "Failed to cancel queued job"),
            }
        }

        info!(drained, "Job scheduler stopped");
    }

    /// Whether [`shutdown`](Self::shutdown) has been requested.
    pub fn is_shutting_down(&self) -> bool {
        *self.shared.interrupt.borrow()
    }

    /// Derive an independent random stream from the scheduler's master source.
    pub async fn fork_rng(&self) -> RandomSource {
        self.rng.lock().await.fork()
    }

    /// Submissions rejected by admission control over the scheduler's lifetime.
    pub fn total_rejected(&self) -> u64 {
        self.rejected.load(Ordering::SeqCst)
    }

    /// Shared handle to the rejection counter.
    pub fn rejected_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.rejected)
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }

    fn effective_shots(&self, requested: i64) -> u32 {
        if requested <= 0 {
            self.shared.config.default_shots
        } else {
            u32::try_from(requested).unwrap_or(u32::MAX)
        }
    }
}

async fn run_worker(shared: Arc<Shared>, worker: usize) {
    let mut interrupt = shared.interrupt.subscribe();
    debug!(worker, "Worker started");

    loop {
        let next = {
            let mut queue = shared.queue.lock().await;
            tokio::select! {
                biased;
                () = interrupted(&mut interrupt) => None,
                queued = queue.recv() => queued,
            }
        };
        let Some(queued) = next else { break };

        let job_id = queued.id.clone();
        if let Err(e) = shared.process(worker, queued, &mut interrupt).await {
            error!(worker, job_id = %job_id, error = %e, "Job processing failed");
        }
    }

    debug!(worker, "Worker stopped");
}

impl Shared {
    async fn process(
        &self,
        worker: usize,
        queued: QueuedJob,
        interrupt: &mut watch::Receiver<bool>,
    ) -> EngineResult<()> {
        let QueuedJob { id, mut rng } = queued;

        let job = self.store.get(&id).await?;
        if job.status != JobStatus::Queued {
            debug!(job_id = %id, status = %job.status, "Skipping job that is no longer queued");
            return Ok(());
        }
        let algorithm = self.registry.resolve(&job.algorithm);

        let delay = rng.duration_between(self.config.queue_delay.min(), self.config.queue_delay.max());
        if !sleep_unless_interrupted(delay, interrupt).await {
            self.cancel_interrupted(&id, JobStatus::Queued).await?;
            return Ok(());
        }

        if !self
            .store
            .transition(&id, JobStatus::Queued, JobStatus::Running)
            .await?
        {
            debug!(job_id = %id, "Job cancelled before it was claimed");
            return Ok(());
        }
        let queue_time_ms = Utc::now()
            .signed_duration_since(job.created_at)
            .num_milliseconds()
            .max(0) as u64;
        self.metrics.record_job_started(&algorithm, queue_time_ms);
        info!(worker, job_id = %id, algorithm = %algorithm, queue_time_ms, "Job running");

        let delay = rng.duration_between(self.config.run_delay.min(), self.config.run_delay.max());
        if !sleep_unless_interrupted(delay, interrupt).await {
            self.cancel_interrupted(&id, JobStatus::Running).await?;
            return Ok(());
        }

        let registry = Arc::clone(&self.registry);
        let mut sim_rng = rng.fork();
        let Job {
            algorithm: requested,
            parameters,
            shots,
            ..
        } = job;
        let outcome = tokio::task::spawn_blocking(move || {
            registry.dispatch(&requested, &parameters, shots, &mut sim_rng)
        })
        .await;

        match outcome {
            Ok(Ok(results)) => {
                let range = self.config.execution_time;
                let execution_time = rng.uniform_between(range.min_seconds, range.max_seconds);
                if self.store.complete(&id, results, execution_time).await? {
                    self.metrics.record_job_completed(&algorithm);
                    info!(job_id = %id, execution_time, "Job completed");
                }
            }
            Ok(Err(e)) => {
                error!(job_id = %id, algorithm = %algorithm, error = %e, "Simulation failed");
                self.fail(&id, &algorithm, "simulation", e.to_string()).await?;
            }
            Err(e) => {
                let reason = if e.is_panic() {
                    "simulator panicked".to_string()
                } else {
                    format!("simulator task aborted: {e}")
                };
                error!(job_id = %id, algorithm = %algorithm, error = %reason, "Simulation crashed");
                self.fail(&id, &algorithm, "panic", reason).await?;
            }
        }

        Ok(())
    }

    async fn fail(
        &self,
        id: &JobId,
        algorithm: &str,
        error_type: &str,
        reason: String,
    ) -> EngineResult<()> {
        if self.store.fail(id, JobStatus::Running, reason).await? {
            self.metrics.record_job_failed(algorithm, error_type);
        }
        Ok(())
    }

    async fn cancel_interrupted(&self, id: &JobId, from: JobStatus) -> EngineResult<()> {
        if self.store.cancel(id, from, Some(INTERRUPTED)).await? {
            self.metrics.record_job_cancelled(from);
            info!(job_id = %id, from = %from, "Job interrupted");
        }
        Ok(())
    }
}

/// Resolves once the interrupt flag is raised (or its sender is gone).
async fn interrupted(interrupt: &mut watch::Receiver<bool>) {
    let _ = interrupt.wait_for(|stop| *stop).await;
}

/// Sleep for `delay`; returns `false` if interrupted first.
async fn sleep_unless_interrupted(delay: Duration, interrupt: &mut watch::Receiver<bool>) -> bool {
    if *interrupt.borrow() {
        return false;
    }
    if delay.is_zero() {
        return true;
    }
    tokio::select! {
        () = tokio::time::sleep(delay) => true,
        () = interrupted(interrupt) => false,
    }
}
