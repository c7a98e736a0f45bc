//! Job lifecycle types.
//!
//! **Invariants:**
//! - A new job is always `Queued`.
//! - Transitions are monotonic; a job never moves backward.
//! - Terminal states (`Completed`, `Failed`, `Cancelled`) are permanent.
//! - `results` is non-empty only when the status is `Completed`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{TypesError, TypesResult};
use crate::value::{Parameters, ResultRecord};

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Create a job ID from an existing string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random (v4 UUID) job ID.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Short prefix used in log lines.
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Waiting in the submission queue.
    Queued,
    /// Claimed by a worker.
    Running,
    /// Finished with results.
    Completed,
    /// Finished without results after an unexpected failure.
    Failed,
    /// Cancelled before completion.
    Cancelled,
}

impl JobStatus {
    /// Every status, in state-machine order.
    pub const ALL: [JobStatus; 5] = [
        JobStatus::Queued,
        JobStatus::Running,
        JobStatus::Completed,
        JobStatus::Failed,
        JobStatus::Cancelled,
    ];

    /// Check if this is a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Whether `self -> next` is an edge of the state machine.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Running)
                | (JobStatus::Queued, JobStatus::Cancelled)
                | (JobStatus::Running, JobStatus::Completed)
                | (JobStatus::Running, JobStatus::Failed)
                | (JobStatus::Running, JobStatus::Cancelled)
        )
    }

    /// Canonical upper-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "QUEUED",
            JobStatus::Running => "RUNNING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
            JobStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = TypesError;

    fn from_str(s: &str) -> TypesResult<Self> {
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| TypesError::UnknownStatus(s.to_string()))
    }
}

/// Target execution environment attached to a job.
///
/// Informational only: every backend runs on the local simulators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Backend {
    #[default]
    Simulator,
    IbmQuantum,
    AwsBraket,
    GoogleSycamore,
}

impl Backend {
    pub const ALL: [Backend; 4] = [
        Backend::Simulator,
        Backend::IbmQuantum,
        Backend::AwsBraket,
        Backend::GoogleSycamore,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Backend::Simulator => "SIMULATOR",
            Backend::IbmQuantum => "IBM_QUANTUM",
            Backend::AwsBraket => "AWS_BRAKET",
            Backend::GoogleSycamore => "GOOGLE_SYCAMORE",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = TypesError;

    fn from_str(s: &str) -> TypesResult<Self> {
        Backend::ALL
            .into_iter()
            .find(|backend| backend.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| TypesError::UnknownBackend(s.to_string()))
    }
}

/// A submitted algorithm run and its lifecycle state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub user_id: String,
    /// Algorithm name as submitted; matched case-insensitively at dispatch.
    pub algorithm: String,
    pub backend: Backend,
    pub status: JobStatus,
    pub parameters: Parameters,
    /// Populated exactly once, on the transition to `Completed`.
    pub results: ResultRecord,
    pub shots: u32,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Reported execution time in seconds, set on completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
    /// Diagnostic text for failed or interrupted jobs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Job {
    /// Create a new queued job.
    pub fn new(
        id: impl Into<JobId>,
        user_id: impl Into<String>,
        algorithm: impl Into<String>,
        backend: Backend,
        parameters: Parameters,
        shots: u32,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            algorithm: algorithm.into(),
            backend,
            status: JobStatus::Queued,
            parameters,
            results: ResultRecord::new(),
            shots,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            execution_time: None,
            error: None,
        }
    }

    /// Move the job to `next`, stamping `started_at` / `completed_at`.
    ///
    /// Fails without touching the job if `next` is not reachable from the
    /// current status.
    pub fn advance(&mut self, next: JobStatus) -> TypesResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(TypesError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        let now = Utc::now();
        if next == JobStatus::Running && self.started_at.is_none() {
            self.started_at = Some(now);
        }
        if next.is_terminal() && self.completed_at.is_none() {
            self.completed_at = Some(now);
        }
        Ok(())
    }

    /// Record a successful run: results, reported time, `Completed`.
    pub fn complete(&mut self, results: ResultRecord, execution_time: f64) -> TypesResult<()> {
        self.advance(JobStatus::Completed)?;
        self.results = results;
        self.execution_time = Some(execution_time);
        Ok(())
    }
}
