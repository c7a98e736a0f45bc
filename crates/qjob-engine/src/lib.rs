//! `qjob-engine`: asynchronous job lifecycle engine for simulated quantum
//! algorithms.
//!
//! Callers submit named algorithm runs; a bounded pool of worker tasks picks
//! them from a bounded queue, simulates queue and compute latency, dispatches
//! to a [`qjob_sim`] simulator and records the results. Job state lives in a
//! [`JobStore`] over a pluggable [`storage::JobStorage`] backend.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use qjob_engine::{Engine, SchedulerConfig};
//! use qjob_types::{Backend, Parameters};
//!
//! # async fn run() -> Result<(), qjob_engine::EngineError> {
//! let engine = Engine::new(SchedulerConfig::default());
//! let job = engine
//!     .submit_job("alice", "GROVER", Backend::Simulator, Parameters::new(), 1024)
//!     .await?;
//! let done = engine.wait_for_job(&job.id, Duration::from_secs(30)).await?;
//! println!("{}: {:?}", done.status, done.results.get("counts"));
//! engine.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! The [`rest`] module exposes the engine over HTTP/JSON; the `qjob-server`
//! binary wires it to configuration, logging and signal handling.

pub mod config;
pub mod engine;
pub mod error;
pub mod job_store;
pub mod metrics;
pub mod rest;
pub mod scheduler;
pub mod stats;
pub mod storage;
pub mod tracing_config;

pub use config::{Config, ConfigError, DelayRange, ExecutionTimeRange, SchedulerConfig};
pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use job_store::JobStore;
pub use metrics::Metrics;
pub use scheduler::{JobRequest, JobScheduler};
pub use stats::{StatisticsAggregator, Stats};
pub use tracing_config::{TracingConfig, TracingFormat, init_tracing};
