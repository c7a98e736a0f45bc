//! Error types for the job engine.

use qjob_sim::SimError;
use qjob_types::{JobStatus, TypesError};
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Errors that can occur in the job engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Job not found.
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// A job with this ID is already stored.
    #[error("Duplicate job id: {0}")]
    DuplicateId(String),

    /// The submission queue is at capacity.
    #[error("Job queue is full ({capacity} pending jobs)")]
    QueueFull { capacity: usize },

    /// The requested status change is not an edge of the state machine.
    #[error("Invalid job transition: {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    /// The scheduler has been shut down.
    #[error("Scheduler is shutting down")]
    ShuttingDown,

    /// Waiting for a job exceeded its deadline.
    #[error("Timed out waiting for job: {0}")]
    Timeout(String),

    /// A simulator rejected its input.
    #[error("Simulation error: {0}")]
    Simulation(#[from] SimError),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<TypesError> for EngineError {
    fn from(err: TypesError) -> Self {
        match err {
            TypesError::InvalidTransition { from, to } => EngineError::InvalidTransition { from, to },
            other => EngineError::Internal(other.to_string()),
        }
    }
}
