//! Integration tests for the job lifecycle: execution, cancellation,
//! admission control and shutdown.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use qjob_engine::storage::{JobFilter, JobStorage, JobUpdate, MemoryStorage};
use qjob_engine::{DelayRange, Engine, EngineError, EngineResult, JobStore, SchedulerConfig};
use qjob_sim::{RandomSource, SimResult, create_default_registry};
use qjob_types::{Backend, Job, JobId, JobStatus, Parameters, ResultRecord, Value};
use tokio::sync::Notify;

const WAIT: Duration = Duration::from_secs(10);

/// Long enough that a job never leaves the delay during a test.
const FOREVER: DelayRange = DelayRange::new(60_000, 60_001);

fn fast_engine() -> Engine {
    Engine::new(SchedulerConfig::without_delays().with_seed(11))
}

async fn submit(engine: &Engine, algorithm: &str, params: Parameters, shots: i64) -> Job {
    engine
        .submit_job("alice", algorithm, Backend::Simulator, params, shots)
        .await
        .unwrap()
}

/// Poll until `predicate` holds for the job or the deadline passes.
async fn wait_until(engine: &Engine, id: &JobId, predicate: impl Fn(&Job) -> bool) -> Job {
    let deadline = tokio::time::Instant::now() + WAIT;
    loop {
        let job = engine.get_job(id).await.unwrap();
        if predicate(&job) || tokio::time::Instant::now() > deadline {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

fn assert_results_invariant(job: &Job) {
    assert_eq!(
        !job.results.is_empty(),
        job.status == JobStatus::Completed,
        "job {} in {} has results: {:?}",
        job.id,
        job.status,
        job.results
    );
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_job_runs_to_completion() {
    let engine = fast_engine();
    let job = submit(&engine, "GROVER", Parameters::new(), 200).await;
    assert_eq!(job.status, JobStatus::Queued);
    assert!(job.results.is_empty());

    let done = engine.wait_for_job(&job.id, WAIT).await.unwrap();
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(
        done.results.get("algorithm").and_then(Value::as_str),
        Some("Grover")
    );
    assert_eq!(done.results.counts("counts").unwrap().total(), 200);

    let execution_time = done.execution_time.unwrap();
    assert!((1.5..5.0).contains(&execution_time));
    assert!(done.created_at <= done.started_at.unwrap());
    assert!(done.started_at.unwrap() <= done.completed_at.unwrap());
    assert!(done.error.is_none());

    let stats = engine.get_statistics().await;
    assert_eq!(stats.total_completed, 1);
    assert_eq!(stats.completed, 1);
    assert!((stats.average_execution_time_seconds - execution_time).abs() < 1e-12);

    engine.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unknown_algorithm_runs_random_circuit() {
    let engine = fast_engine();
    let job = submit(&engine, "FOO", Parameters::new().with("qubits", 3), 50).await;

    let done = engine.wait_for_job(&job.id, WAIT).await.unwrap();
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.algorithm, "FOO");
    assert_eq!(
        done.results.get("algorithm").and_then(Value::as_str),
        Some("Random Circuit")
    );

    engine.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_invalid_parameter_fails_job() {
    let engine = fast_engine();
    let job = submit(&engine, "grover", Parameters::new().with("qubits", 500), 10).await;

    let done = engine.wait_for_job(&job.id, WAIT).await.unwrap();
    assert_eq!(done.status, JobStatus::Failed);
    assert!(done.error.as_deref().unwrap().contains("qubits"));
    assert!(done.execution_time.is_none());
    assert_results_invariant(&done);

    let stats = engine.get_statistics().await;
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.total_completed, 0);

    engine.shutdown().await;
}

fn explode(_: &Parameters, _: u32, _: &mut RandomSource) -> SimResult<ResultRecord> {
    panic!("simulator exploded");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panicking_simulator_fails_job() {
    let mut registry = create_default_registry();
    registry.register("EXPLODE", explode);
    let engine = Engine::with_parts(
        SchedulerConfig::without_delays(),
        Arc::new(JobStore::new()),
        Arc::new(registry),
    );

    let bad = submit(&engine, "explode", Parameters::new(), 1).await;
    let done = engine.wait_for_job(&bad.id, WAIT).await.unwrap();
    assert_eq!(done.status, JobStatus::Failed);
    assert_eq!(done.error.as_deref(), Some("simulator panicked"));

    // The worker survives and keeps serving.
    let good = submit(&engine, "TELEPORT", Parameters::new(), 10).await;
    let done = engine.wait_for_job(&good.id, WAIT).await.unwrap();
    assert_eq!(done.status, JobStatus::Completed);

    engine.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_seeded_engines_are_reproducible() {
    async fn run(seed: u64) -> Vec<(ResultRecord, f64)> {
        let engine = Engine::new(
            SchedulerConfig::without_delays()
                .with_seed(seed)
                .with_workers(3),
        );
        let mut ids = Vec::new();
        for algorithm in ["GROVER", "QVECTOR", "TELEPORT", "RANDOM", "SHOR"] {
            ids.push(submit(&engine, algorithm, Parameters::new(), 128).await.id);
        }
        let mut out = Vec::new();
        for id in &ids {
            let job = engine.wait_for_job(id, WAIT).await.unwrap();
            out.push((job.results, job.execution_time.unwrap()));
        }
        engine.shutdown().await;
        out
    }

    assert_eq!(run(2024).await, run(2024).await);
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancel_completed_job_is_rejected() {
    let engine = fast_engine();
    let job = submit(&engine, "SHOR", Parameters::new(), 1).await;
    let done = engine.wait_for_job(&job.id, WAIT).await.unwrap();
    assert_eq!(done.status, JobStatus::Completed);

    assert!(!engine.cancel_job(&job.id).await);
    assert_eq!(engine.get_job(&job.id).await.unwrap(), done);

    engine.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancel_queued_job() {
    let engine = Engine::new(SchedulerConfig::without_delays().with_queue_delay(FOREVER));
    let job = submit(&engine, "GROVER", Parameters::new(), 10).await;

    assert!(engine.cancel_job(&job.id).await);
    assert!(!engine.cancel_job(&job.id).await);

    let cancelled = engine.get_job(&job.id).await.unwrap();
    assert_eq!(cancelled.status, JobStatus::Cancelled);
    assert!(cancelled.started_at.is_none());
    assert!(cancelled.completed_at.is_some());
    assert!(cancelled.error.is_none());
    assert_results_invariant(&cancelled);

    engine.shutdown().await;
    // Shutdown does not touch an already-cancelled job.
    assert_eq!(engine.get_job(&job.id).await.unwrap(), cancelled);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancel_running_job_is_rejected() {
    let engine = Engine::new(SchedulerConfig::without_delays().with_run_delay(FOREVER));
    let job = submit(&engine, "GROVER", Parameters::new(), 10).await;

    let running = wait_until(&engine, &job.id, |j| j.status == JobStatus::Running).await;
    assert_eq!(running.status, JobStatus::Running);
    assert!(!engine.cancel_job(&job.id).await);

    engine.shutdown().await;
}

// ---------------------------------------------------------------------------
// Admission control and shutdown
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_full_queue_rejects_without_storing() {
    let engine = Engine::new(
        SchedulerConfig::without_delays()
            .with_workers(1)
            .with_max_queued_jobs(1)
            .with_queue_delay(FOREVER),
    );

    // The single worker takes the first job and sleeps on it.
    let first = submit(&engine, "GROVER", Parameters::new(), 10).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    // The second fills the queue; the third is turned away.
    let second = submit(&engine, "GROVER", Parameters::new(), 10).await;
    let err = engine
        .submit_job("bob", "GROVER", Backend::Simulator, Parameters::new(), 10)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::QueueFull { capacity: 1 }));

    assert_eq!(engine.list_all_jobs().await.len(), 2);
    assert!(engine.list_jobs_for_user("bob").await.is_empty());
    let stats = engine.get_statistics().await;
    assert_eq!(stats.total_rejected, 1);
    assert_eq!(stats.queued, 2);

    engine.shutdown().await;

    for id in [&first.id, &second.id] {
        let job = engine.get_job(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Cancelled);
        assert_eq!(job.error.as_deref(), Some("interrupted"));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_interrupts_running_job() {
    let engine = Engine::new(SchedulerConfig::without_delays().with_run_delay(FOREVER));
    let job = submit(&engine, "TELEPORT", Parameters::new(), 10).await;
    wait_until(&engine, &job.id, |j| j.status == JobStatus::Running).await;

    engine.shutdown().await;

    let job = engine.get_job(&job.id).await.unwrap();
    assert_eq!(job.status, JobStatus::Cancelled);
    assert_eq!(job.error.as_deref(), Some("interrupted"));
    assert!(job.started_at.is_some());
    assert_results_invariant(&job);

    let err = engine
        .submit_job("alice", "SHOR", Backend::Simulator, Parameters::new(), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ShuttingDown));
}

/// Memory storage whose inserts park until the test releases them.
#[derive(Default)]
struct GatedStorage {
    inner: MemoryStorage,
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl JobStorage for GatedStorage {
    async fn insert_job(&self, job: Job) -> EngineResult<()> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.insert_job(job).await
    }

    async fn get_job(&self, job_id: &JobId) -> EngineResult<Option<Job>> {
        self.inner.get_job(job_id).await
    }

    async fn list_jobs(&self, filter: JobFilter) -> EngineResult<Vec<Job>> {
        self.inner.list_jobs(filter).await
    }

    async fn update_if(
        &self,
        job_id: &JobId,
        expected: JobStatus,
        update: JobUpdate,
    ) -> EngineResult<bool> {
        self.inner.update_if(job_id, expected, update).await
    }

    async fn len(&self) -> EngineResult<usize> {
        self.inner.len().await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_waits_for_in_flight_submission() {
    let gate = Arc::new(GatedStorage::default());
    let storage: Arc<dyn JobStorage> = gate.clone();
    let engine = Arc::new(Engine::with_parts(
        SchedulerConfig::without_delays().with_queue_delay(FOREVER),
        Arc::new(JobStore::with_storage(storage)),
        Arc::new(create_default_registry()),
    ));

    let submitting = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            engine
                .submit_job("alice", "GROVER", Backend::Simulator, Parameters::new(), 10)
                .await
        })
    };
    gate.entered.notified().await;

    let stopping = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.shutdown().await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!stopping.is_finished());

    gate.release.notify_one();
    let job = submitting.await.unwrap().unwrap();
    stopping.await.unwrap();

    // The accepted job is cancelled by shutdown instead of stranded in the queue.
    let job = engine.wait_for_job(&job.id, WAIT).await.unwrap();
    assert_eq!(job.status, JobStatus::Cancelled);
    assert_eq!(job.error.as_deref(), Some("interrupted"));

    let err = engine
        .submit_job("alice", "GROVER", Backend::Simulator, Parameters::new(), 10)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ShuttingDown));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_wait_for_times_out() {
    let engine = Engine::new(SchedulerConfig::without_delays().with_queue_delay(FOREVER));
    let job = submit(&engine, "SHOR", Parameters::new(), 1).await;

    let err = engine
        .wait_for_job(&job.id, Duration::from_millis(50))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Timeout(id) if id == job.id.0));

    let err = engine
        .wait_for_job(&JobId::new("missing"), WAIT)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::JobNotFound(_)));

    engine.shutdown().await;
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_statistics_sum_at_quiescence() {
    let engine = Engine::new(SchedulerConfig::without_delays().with_workers(4));

    let mut ids = Vec::new();
    for i in 0..20 {
        let (algorithm, params) = match i % 5 {
            0 => ("GROVER", Parameters::new()),
            1 => ("SHOR", Parameters::new().with("number", 91)),
            2 => ("QVECTOR", Parameters::new().with("dimensions", 16)),
            3 => ("RANDOM", Parameters::new().with("qubits", 64)),
            _ => ("TELEPORT", Parameters::new()),
        };
        ids.push(submit(&engine, algorithm, params, 64).await.id);
    }
    for id in &ids {
        let job = engine.wait_for_job(id, WAIT).await.unwrap();
        assert!(job.status.is_terminal());
        assert_results_invariant(&job);
    }

    let stats = engine.get_statistics().await;
    let all = engine.list_all_jobs().await;
    assert_eq!(stats.total_submitted, all.len());
    assert_eq!(stats.status_total(), all.len());
    // RANDOM with 64 qubits is out of range and fails.
    assert_eq!(stats.failed, 4);
    assert_eq!(stats.completed, 16);
    assert_eq!(stats.total_completed, 16);
    assert!((1.5..5.0).contains(&stats.average_execution_time_seconds));

    // Jobs come back in submission order.
    let listed: Vec<&JobId> = all.iter().map(|j| &j.id).collect();
    assert_eq!(listed, ids.iter().collect::<Vec<_>>());

    engine.shutdown().await;
}
