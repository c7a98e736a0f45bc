//! JSON request/response types for the REST gateway.

use serde::{Deserialize, Serialize};

// ── Requests ──────────────────────────────────────────────────────────────

/// Query string of POST /jobs. The JSON body carries the parameters.
#[derive(Debug, Deserialize)]
pub struct SubmitJobQuery {
    /// Algorithm name; unknown names run the random circuit.
    pub algorithm: Option<String>,
    /// Backend tag (default `SIMULATOR`).
    pub backend: Option<String>,
    /// Number of shots; zero or negative selects the server default.
    #[serde(default = "default_shots")]
    pub shots: i64,
}

/// GET /jobs
#[derive(Debug, Default, Deserialize)]
pub struct ListJobsQuery {
    /// Only jobs in this state (e.g. `QUEUED`, case-insensitive).
    pub status: Option<String>,
    /// Maximum number of jobs returned.
    pub limit: Option<usize>,
}

/// POST /algorithms/grover
#[derive(Debug, Deserialize)]
pub struct GroverQuery {
    #[serde(default = "default_qubits")]
    pub qubits: i64,
    #[serde(rename = "markedState", default = "default_marked_state")]
    pub marked_state: String,
    #[serde(default = "default_shots")]
    pub shots: i64,
}

/// POST /algorithms/shor
#[derive(Debug, Deserialize)]
pub struct ShorQuery {
    pub number: i64,
}

/// POST /algorithms/state-vector
#[derive(Debug, Deserialize)]
pub struct StateVectorQuery {
    #[serde(default = "default_dimensions")]
    pub dimensions: i64,
}

/// POST /algorithms/teleport
#[derive(Debug, Deserialize)]
pub struct TeleportQuery {
    #[serde(default = "default_shots")]
    pub shots: i64,
}

/// POST /circuits/random
#[derive(Debug, Deserialize)]
pub struct RandomCircuitQuery {
    #[serde(default = "default_qubits")]
    pub qubits: i64,
    #[serde(default = "default_depth")]
    pub depth: i64,
    #[serde(default = "default_shots")]
    pub shots: i64,
}

fn default_shots() -> i64 {
    1024
}

fn default_qubits() -> i64 {
    5
}

fn default_marked_state() -> String {
    "10101".to_string()
}

fn default_dimensions() -> i64 {
    8
}

fn default_depth() -> i64 {
    10
}

// ── Responses ─────────────────────────────────────────────────────────────

/// DELETE /jobs/{id}
#[derive(Debug, Serialize, Deserialize)]
pub struct CancelJobResponse {
    pub cancelled: bool,
}

/// GET /health
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub quantum_backend: String,
    pub max_qubits: i64,
    pub algorithms_supported: Vec<String>,
    pub api_version: String,
}

/// GET /system/info
#[derive(Debug, Serialize, Deserialize)]
pub struct SystemInfoResponse {
    pub quantum_processor: String,
    pub max_qubits_supported: i64,
    pub gate_set: Vec<String>,
    pub entanglement_capability: bool,
    pub quantum_volume: u32,
    pub coherence_time: String,
    pub gate_fidelity: String,
    pub available_backends: Vec<String>,
}

/// Error payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}
