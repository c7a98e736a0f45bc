//! Configuration management for the qjob server.
//!
//! Supports loading configuration from:
//! 1. Configuration files (YAML)
//! 2. Environment variables (with `QJOB_` prefix)
//! 3. .env files
//!
//! Configuration precedence (highest to lowest):
//! 1. Environment variables
//! 2. Configuration file
//! 3. Default values

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Complete server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP gateway settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Worker pool and job timing
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Logging and metrics
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// HTTP gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8080")
    #[serde(default = "default_address")]
    pub address: String,

    /// Comma-separated allowed CORS origins, or "*"
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,
}

/// Worker pool, admission control and simulated timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Number of worker tasks draining the queue
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Capacity of the submission queue; submissions beyond it are rejected
    #[serde(default = "default_max_queued_jobs")]
    pub max_queued_jobs: usize,

    /// Shot count used when a submission asks for zero shots
    #[serde(default = "default_shots")]
    pub default_shots: u32,

    /// Simulated wait before a worker claims a job
    #[serde(default = "default_queue_delay")]
    pub queue_delay: DelayRange,

    /// Simulated compute time between claim and dispatch
    #[serde(default = "default_run_delay")]
    pub run_delay: DelayRange,

    /// Range of the reported execution time
    #[serde(default)]
    pub execution_time: ExecutionTimeRange,

    /// Master seed for reproducible runs; entropy when unset
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Half-open delay range `[min_ms, max_ms)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

/// Half-open range `[min_seconds, max_seconds)` for reported execution time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExecutionTimeRange {
    pub min_seconds: f64,
    pub max_seconds: f64,
}

/// Observability configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Expose `/metrics`
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "console" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_address() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_cors_origins() -> String {
    "*".to_string()
}

fn default_workers() -> usize {
    4
}

fn default_max_queued_jobs() -> usize {
    1000
}

fn default_shots() -> u32 {
    1024
}

fn default_queue_delay() -> DelayRange {
    DelayRange::new(500, 1500)
}

fn default_run_delay() -> DelayRange {
    DelayRange::new(1000, 3000)
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "console".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            cors_origins: default_cors_origins(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            max_queued_jobs: default_max_queued_jobs(),
            default_shots: default_shots(),
            queue_delay: default_queue_delay(),
            run_delay: default_run_delay(),
            execution_time: ExecutionTimeRange::default(),
            seed: None,
        }
    }
}

impl SchedulerConfig {
    /// Default settings with both simulated delays set to zero.
    pub fn without_delays() -> Self {
        Self {
            queue_delay: DelayRange::ZERO,
            run_delay: DelayRange::ZERO,
            ..Self::default()
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_max_queued_jobs(mut self, max_queued_jobs: usize) -> Self {
        self.max_queued_jobs = max_queued_jobs;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_queue_delay(mut self, delay: DelayRange) -> Self {
        self.queue_delay = delay;
        self
    }

    pub fn with_run_delay(mut self, delay: DelayRange) -> Self {
        self.run_delay = delay;
        self
    }
}

impl DelayRange {
    pub const ZERO: DelayRange = DelayRange {
        min_ms: 0,
        max_ms: 0,
    };

    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub fn min(&self) -> Duration {
        Duration::from_millis(self.min_ms)
    }

    pub fn max(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }
}

impl Default for ExecutionTimeRange {
    fn default() -> Self {
        Self {
            min_seconds: 1.5,
            max_seconds: 5.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_yaml(&contents)
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config =
            serde_yaml_ng::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with the following precedence:
    /// 1. Load .env file if it exists
    /// 2. Load from file if provided
    /// 3. Apply environment variable overrides
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => Config::default(),
        };

        let config = config.merge_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Merge `QJOB_*` overrides read through `lookup`.
    ///
    /// Only variables that are set override the loaded values. A set but
    /// unparsable numeric variable is a validation error.
    pub fn merge_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server
        if let Some(v) = lookup("QJOB_ADDRESS") {
            self.server.address = v;
        }
        if let Some(v) = lookup("QJOB_CORS_ORIGINS") {
            self.server.cors_origins = v;
        }

        // Scheduler
        if let Some(v) = lookup("QJOB_WORKERS") {
            self.scheduler.workers = parse_var("QJOB_WORKERS", &v)?;
        }
        if let Some(v) = lookup("QJOB_MAX_QUEUED_JOBS") {
            self.scheduler.max_queued_jobs = parse_var("QJOB_MAX_QUEUED_JOBS", &v)?;
        }
        if let Some(v) = lookup("QJOB_DEFAULT_SHOTS") {
            self.scheduler.default_shots = parse_var("QJOB_DEFAULT_SHOTS", &v)?;
        }
        if let Some(v) = lookup("QJOB_SEED") {
            self.scheduler.seed = Some(parse_var("QJOB_SEED", &v)?);
        }

        // Observability
        if let Some(v) = lookup("QJOB_LOG_LEVEL") {
            self.observability.logging.level = v;
        }
        if let Some(v) = lookup("QJOB_LOG_FORMAT") {
            self.observability.logging.format = v;
        }

        Ok(self)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.address()?;

        let scheduler = &self.scheduler;
        if scheduler.workers == 0 {
            return Err(ConfigError::Validation(
                "workers must be greater than 0".to_string(),
            ));
        }
        if scheduler.max_queued_jobs == 0 {
            return Err(ConfigError::Validation(
                "max_queued_jobs must be greater than 0".to_string(),
            ));
        }
        if scheduler.default_shots == 0 || scheduler.default_shots > qjob_sim::MAX_SHOTS {
            return Err(ConfigError::Validation(format!(
                "default_shots must be between 1 and {}",
                qjob_sim::MAX_SHOTS
            )));
        }
        for (name, range) in [
            ("queue_delay", scheduler.queue_delay),
            ("run_delay", scheduler.run_delay),
        ] {
            if range.min_ms > range.max_ms {
                return Err(ConfigError::Validation(format!(
                    "{name}: min_ms ({}) exceeds max_ms ({})",
                    range.min_ms, range.max_ms
                )));
            }
        }
        let exec = scheduler.execution_time;
        if !(exec.min_seconds.is_finite() && exec.max_seconds.is_finite())
            || exec.min_seconds <= 0.0
            || exec.min_seconds > exec.max_seconds
        {
            return Err(ConfigError::Validation(format!(
                "execution_time must satisfy 0 < min_seconds <= max_seconds, got [{}, {})",
                exec.min_seconds, exec.max_seconds
            )));
        }

        match self.observability.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ConfigError::Validation(format!(
                    "Invalid log level: {other}"
                )));
            }
        }

        match self.observability.logging.format.to_ascii_lowercase().as_str() {
            "console" | "json" => {}
            other => {
                return Err(ConfigError::Validation(format!(
                    "Invalid log format: {other}"
                )));
            }
        }

        Ok(())
    }

    /// Get the parsed server address.
    pub fn address(&self) -> Result<SocketAddr, ConfigError> {
        self.server.address.parse().map_err(|_| {
            ConfigError::Validation(format!("Invalid server address: {}", self.server.address))
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Validation(format!("{name}: cannot parse {value:?}")))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),
}
