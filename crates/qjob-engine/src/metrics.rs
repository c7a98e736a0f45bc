//! Prometheus metrics for the job engine.
//!
//! Tracks submissions, admission-control rejections, terminal outcomes,
//! queue time and the number of queued and running jobs.

use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, Gauge, HistogramVec, IntCounter, TextEncoder, register_counter_vec,
    register_gauge, register_histogram_vec, register_int_counter,
};
use qjob_types::JobStatus;

lazy_static! {
    /// Counter for total jobs submitted, labeled by algorithm
    pub static ref JOBS_SUBMITTED: CounterVec = register_counter_vec!(
        "qjob_jobs_submitted_total",
        "Total number of jobs accepted into the queue",
        &["algorithm"]
    )
    .unwrap();

    /// Counter for total jobs completed successfully, labeled by algorithm
    pub static ref JOBS_COMPLETED: CounterVec = register_counter_vec!(
        "qjob_jobs_completed_total",
        "Total number of jobs completed successfully",
        &["algorithm"]
    )
    .unwrap();

    /// Counter for total jobs failed, labeled by algorithm and error_type
    pub static ref JOBS_FAILED: CounterVec = register_counter_vec!(
        "qjob_jobs_failed_total",
        "Total number of jobs that failed",
        &["algorithm", "error_type"]
    )
    .unwrap();

    /// Counter for total jobs cancelled, labeled by the state they left
    pub static ref JOBS_CANCELLED: CounterVec = register_counter_vec!(
        "qjob_jobs_cancelled_total",
        "Total number of jobs cancelled",
        &["from_state"]
    )
    .unwrap();

    /// Counter for submissions rejected because the queue was full
    pub static ref JOBS_REJECTED: IntCounter = register_int_counter!(
        "qjob_jobs_rejected_total",
        "Total number of submissions rejected by admission control"
    )
    .unwrap();

    /// Histogram for job queue time (submission to claim) in milliseconds
    pub static ref JOB_QUEUE_TIME: HistogramVec = register_histogram_vec!(
        "qjob_job_queue_time_milliseconds",
        "Time jobs spend queued before a worker claims them",
        &["algorithm"],
        vec![10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 1500.0, 2500.0, 5000.0, 10000.0]
    )
    .unwrap();

    /// Gauge for currently running jobs
    pub static ref ACTIVE_JOBS: Gauge = register_gauge!(
        "qjob_active_jobs",
        "Number of jobs currently running"
    )
    .unwrap();

    /// Gauge for currently queued jobs
    pub static ref QUEUED_JOBS: Gauge = register_gauge!(
        "qjob_queued_jobs",
        "Number of jobs currently waiting in the queue"
    )
    .unwrap();
}

/// Metrics recorder for the job engine.
///
/// The collectors live in process-wide statics (`lazy_static`); this handle
/// only groups the recording calls.
#[derive(Clone, Copy, Debug, Default)]
pub struct Metrics;

impl Metrics {
    pub fn new() -> Self {
        Self
    }

    /// A job was accepted into the queue.
    pub fn record_job_submitted(&self, algorithm: &str) {
        JOBS_SUBMITTED.with_label_values(&[algorithm]).inc();
        QUEUED_JOBS.inc();
    }

    /// A submission was turned away because the queue was full.
    pub fn record_job_rejected(&self) {
        JOBS_REJECTED.inc();
    }

    /// A worker claimed a job after `queue_time_ms` in the queue.
    pub fn record_job_started(&self, algorithm: &str, queue_time_ms: u64) {
        QUEUED_JOBS.dec();
        ACTIVE_JOBS.inc();
        JOB_QUEUE_TIME
            .with_label_values(&[algorithm])
            .observe(queue_time_ms as f64);
    }

    pub fn record_job_completed(&self, algorithm: &str) {
        JOBS_COMPLETED.with_label_values(&[algorithm]).inc();
        ACTIVE_JOBS.dec();
    }

    pub fn record_job_failed(&self, algorithm: &str, error_type: &str) {
        JOBS_FAILED
            .with_label_values(&[algorithm, error_type])
            .inc();
        ACTIVE_JOBS.dec();
    }

    /// A job was cancelled while in `from`.
    pub fn record_job_cancelled(&self, from: JobStatus) {
        JOBS_CANCELLED.with_label_values(&[from.as_str()]).inc();
        match from {
            JobStatus::Running => ACTIVE_JOBS.dec(),
            _ => QUEUED_JOBS.dec(),
        }
    }

    /// Current metrics in Prometheus text format.
    pub fn export(&self) -> Result<String, std::fmt::Error> {
        let encoder = TextEncoder::new();
        let metric_families = prometheus::gather();
        let mut buffer = Vec::new();

        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|_| std::fmt::Error)?;

        String::from_utf8(buffer).map_err(|_| std::fmt::Error)
    }
}
