//! REST gateway for the job engine.
//!
//! Every route maps onto one [`Engine`] operation or returns a static
//! descriptive payload. All routes live under `/api/quantum`.

pub mod types;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use qjob_types::{Backend, JobId, JobStatus, Parameters};
use std::str::FromStr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::engine::Engine;
use crate::error::EngineError;
use crate::metrics::Metrics;
use crate::storage::JobFilter;

use types::*;

/// Header carrying the opaque caller identity.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Base path of every route.
pub const API_BASE: &str = "/api/quantum";

// ── Shared application state ──────────────────────────────────────────────

/// Application state shared across all REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub metrics: Metrics,
    pub metrics_enabled: bool,
}

impl AppState {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            metrics: Metrics::new(),
            metrics_enabled: true,
        }
    }
}

// ── Router construction ───────────────────────────────────────────────────

/// Build the Axum router for the REST gateway.
///
/// `cors_origins` is a comma-separated list of allowed origins, or `"*"`.
pub fn rest_router(state: AppState, cors_origins: &str) -> Router {
    let cors = build_cors_layer(cors_origins);

    let api = Router::new()
        .route("/jobs", post(submit_job_handler).get(list_jobs_handler))
        .route("/jobs/user/:user_id", get(list_user_jobs_handler))
        .route("/jobs/:id", get(get_job_handler).delete(cancel_job_handler))
        .route("/statistics", get(statistics_handler))
        .route("/algorithms/grover", post(grover_handler))
        .route("/algorithms/shor", post(shor_handler))
        .route("/algorithms/state-vector", post(state_vector_handler))
        .route("/algorithms/teleport", post(teleport_handler))
        .route("/circuits/random", post(random_circuit_handler))
        .route("/health", get(health_handler))
        .route("/system/info", get(system_info_handler))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .nest(API_BASE, api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn build_cors_layer(origins: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(USER_ID_HEADER)]);

    if origins == "*" {
        layer.allow_origin(tower_http::cors::Any)
    } else {
        let allowed: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|o| o.trim().parse().ok())
            .collect();
        layer.allow_origin(allowed)
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────

fn error_response(status: StatusCode, msg: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: msg.into(),
            code: status.as_u16(),
        }),
    )
        .into_response()
}

fn engine_error_response(err: EngineError) -> Response {
    let status = match &err {
        EngineError::JobNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::QueueFull { .. } => StatusCode::TOO_MANY_REQUESTS,
        EngineError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
        EngineError::Simulation(_) => StatusCode::BAD_REQUEST,
        EngineError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        EngineError::DuplicateId(_)
        | EngineError::InvalidTransition { .. }
        | EngineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, err.to_string())
}

fn user_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn parse_parameters(body: &[u8]) -> Result<Parameters, Response> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Parameters::new());
    }
    serde_json::from_slice(body).map_err(|e| {
        error_response(
            StatusCode::BAD_REQUEST,
            format!("Invalid parameters body: {e}"),
        )
    })
}

async fn run_sync(
    state: &AppState,
    algorithm: &str,
    parameters: Parameters,
    shots: i64,
) -> Result<Response, Response> {
    let result = state
        .engine
        .run_algorithm_sync(algorithm, parameters, shots)
        .await
        .map_err(engine_error_response)?;
    Ok(Json(result).into_response())
}

// ── Job handlers ──────────────────────────────────────────────────────────

async fn submit_job_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SubmitJobQuery>,
    body: Bytes,
) -> Result<impl IntoResponse, Response> {
    let user_id = user_id(&headers).ok_or_else(|| {
        error_response(StatusCode::BAD_REQUEST, "Missing X-User-ID header")
    })?;
    let algorithm = query
        .algorithm
        .as_deref()
        .ok_or_else(|| error_response(StatusCode::BAD_REQUEST, "Missing algorithm parameter"))?;
    let backend = match query.backend.as_deref() {
        Some(name) => Backend::from_str(name)
            .map_err(|e| error_response(StatusCode::BAD_REQUEST, e.to_string()))?,
        None => Backend::default(),
    };
    let parameters = parse_parameters(&body)?;

    let job = state
        .engine
        .submit_job(user_id, algorithm, backend, parameters, query.shots)
        .await
        .map_err(engine_error_response)?;

    info!(job_id = %job.id, user_id, algorithm, "REST job submitted");
    Ok(Json(job))
}

async fn get_job_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, Response> {
    let job_id = JobId::new(id);
    let job = state.engine.get_job(&job_id).await.ok_or_else(|| {
        error_response(StatusCode::NOT_FOUND, format!("Job not found: {job_id}"))
    })?;
    Ok(Json(job))
}

async fn list_user_jobs_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    Json(state.engine.list_jobs_for_user(&user_id).await)
}

async fn list_jobs_handler(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> Result<impl IntoResponse, Response> {
    let mut filter = JobFilter::new();
    if let Some(status) = query.status.as_deref() {
        let status = JobStatus::from_str(status)
            .map_err(|e| error_response(StatusCode::BAD_REQUEST, e.to_string()))?;
        filter = filter.with_status(status);
    }
    if let Some(limit) = query.limit {
        filter = filter.with_limit(limit);
    }
    Ok(Json(state.engine.list_jobs(filter).await))
}

async fn cancel_job_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let cancelled = state.engine.cancel_job(&JobId::new(id)).await;
    Json(CancelJobResponse { cancelled })
}

async fn statistics_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.engine.get_statistics().await)
}

// ── Synchronous algorithm handlers ────────────────────────────────────────

async fn grover_handler(
    State(state): State<AppState>,
    Query(q): Query<GroverQuery>,
) -> Result<Response, Response> {
    let parameters = Parameters::new()
        .with("qubits", q.qubits)
        .with("marked_state", q.marked_state);
    run_sync(&state, "GROVER", parameters, q.shots).await
}

async fn shor_handler(
    State(state): State<AppState>,
    Query(q): Query<ShorQuery>,
) -> Result<Response, Response> {
    run_sync(&state, "SHOR", Parameters::new().with("number", q.number), 1).await
}

async fn state_vector_handler(
    State(state): State<AppState>,
    Query(q): Query<StateVectorQuery>,
) -> Result<Response, Response> {
    let parameters = Parameters::new().with("dimensions", q.dimensions);
    run_sync(&state, "QVECTOR", parameters, 1).await
}

async fn teleport_handler(
    State(state): State<AppState>,
    Query(q): Query<TeleportQuery>,
) -> Result<Response, Response> {
    run_sync(&state, "TELEPORT", Parameters::new(), q.shots).await
}

async fn random_circuit_handler(
    State(state): State<AppState>,
    Query(q): Query<RandomCircuitQuery>,
) -> Result<Response, Response> {
    let parameters = Parameters::new()
        .with("qubits", q.qubits)
        .with("depth", q.depth);
    run_sync(&state, "RANDOM", parameters, q.shots).await
}

// ── Descriptive handlers ──────────────────────────────────────────────────

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "UP".to_string(),
        service: "Quantum Computing API".to_string(),
        quantum_backend: "simulator".to_string(),
        max_qubits: qjob_sim::MAX_QUBITS,
        algorithms_supported: ["Grover", "Shor", "QVECTOR", "Teleport", "Random"]
            .map(String::from)
            .to_vec(),
        api_version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn system_info_handler() -> impl IntoResponse {
    Json(SystemInfoResponse {
        quantum_processor: "qjob probabilistic simulator".to_string(),
        max_qubits_supported: qjob_sim::MAX_QUBITS,
        gate_set: ["H", "X", "Y", "Z", "CNOT", "SWAP", "RX", "RY", "RZ"]
            .map(String::from)
            .to_vec(),
        entanglement_capability: true,
        quantum_volume: 2048,
        coherence_time: "100ms (simulated)".to_string(),
        gate_fidelity: "0.999".to_string(),
        available_backends: Backend::ALL.iter().map(|b| b.as_str().to_string()).collect(),
    })
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    if !state.metrics_enabled {
        return error_response(StatusCode::NOT_FOUND, "Metrics are disabled");
    }
    match state.metrics.export() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(_) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to encode metrics",
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_serialization() {
        let resp = ErrorResponse {
            error: "not found".to_string(),
            code: 404,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("404"));
    }

    #[test]
    fn test_engine_error_status_mapping() {
        let cases = [
            (EngineError::QueueFull { capacity: 1 }, StatusCode::TOO_MANY_REQUESTS),
            (EngineError::JobNotFound("x".into()), StatusCode::NOT_FOUND),
            (EngineError::ShuttingDown, StatusCode::SERVICE_UNAVAILABLE),
            (EngineError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(engine_error_response(err).status(), status);
        }
    }

    #[test]
    fn test_user_id_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(user_id(&headers), None);
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("  "));
        assert_eq!(user_id(&headers), None);
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("alice"));
        assert_eq!(user_id(&headers), Some("alice"));
    }

    #[test]
    fn test_parse_parameters() {
        assert!(parse_parameters(b"").unwrap().is_empty());
        assert!(parse_parameters(b"  \n").unwrap().is_empty());
        let params = parse_parameters(br#"{"number": 21}"#).unwrap();
        assert_eq!(params.int_or("number", 0), 21);
        assert_eq!(
            parse_parameters(b"[1, 2]").unwrap_err().status(),
            StatusCode::BAD_REQUEST
        );
    }
}
