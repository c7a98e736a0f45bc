//! qjob server binary.
//!
//! Runs the job engine behind the REST gateway.
//!
//! # Configuration
//!
//! Loaded from an optional YAML file (`--config`), then `.env`, then
//! `QJOB_*` environment variables (see `qjob_engine::config`). `--address`
//! overrides everything else for the listen address.
//!
//! # Usage
//!
//! ```bash
//! QJOB_WORKERS=8 QJOB_LOG_FORMAT=json qjob-server --address 0.0.0.0:8080
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use mimalloc::MiMalloc;
use qjob_engine::rest::{AppState, rest_router};
use qjob_engine::{Config, Engine, TracingConfig, init_tracing};
use tokio::sync::Notify;
use tracing::info;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Asynchronous job engine for simulated quantum algorithms.
#[derive(Parser, Debug)]
#[command(name = "qjob-server", version, about)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, env = "QJOB_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address (overrides the configuration)
    #[arg(short, long)]
    address: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(address) = cli.address {
        config.server.address = address;
        config.validate().context("invalid --address")?;
    }

    init_tracing(&TracingConfig::from(&config.observability.logging))
        .context("failed to initialize tracing")?;

    info!(
        workers = config.scheduler.workers,
        max_queued_jobs = config.scheduler.max_queued_jobs,
        "Starting qjob server"
    );

    let engine = Arc::new(Engine::new(config.scheduler.clone()));
    let state = AppState {
        metrics_enabled: config.observability.metrics_enabled,
        ..AppState::new(Arc::clone(&engine))
    };
    let app = rest_router(state, &config.server.cors_origins);

    // Graceful shutdown
    let shutdown = Arc::new(Notify::new());
    let shutdown_clone = Arc::clone(&shutdown);
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown_clone.notify_one();
    });

    let addr = config.address()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("REST gateway listening on {addr}");
    info!("CORS origins: {}", config.server.cors_origins);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.notified().await;
            info!("Shutdown signal received");
        })
        .await?;

    engine.shutdown().await;
    info!("qjob server shut down");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT"),
        () = terminate => info!("Received SIGTERM"),
    }
}
