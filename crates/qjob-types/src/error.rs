//! Error types for the types crate.

use thiserror::Error;

/// Errors produced while parsing enumerated job fields.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum TypesError {
    /// Backend name is not one of the known targets.
    #[error("Unknown backend: {0}")]
    UnknownBackend(String),

    /// Status name is not one of the known states.
    #[error("Unknown job status: {0}")]
    UnknownStatus(String),

    /// The requested status change is not an edge of the job state machine.
    #[error("Invalid job transition: {from} -> {to}")]
    InvalidTransition {
        from: crate::JobStatus,
        to: crate::JobStatus,
    },
}

/// Result type for the types crate.
pub type TypesResult<T> = Result<T, TypesError>;
