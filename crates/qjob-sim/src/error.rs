//! Error types for the sim crate.

use thiserror::Error;

/// Errors produced by simulator dispatch.
///
/// Missing or wrong-typed parameters never error (they take their
/// defaults); only values outside the supported range do.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SimError {
    /// A parameter is well-typed but outside the supported range.
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Parameter key.
        name: &'static str,
        /// Human-readable constraint.
        reason: String,
    },

    /// Neither the requested simulator nor the fallback is registered.
    #[error("No simulator registered for {0}")]
    NoSimulator(String),
}

/// Result type for simulator operations.
pub type SimResult<T> = Result<T, SimError>;
