// crates/server/src/main.rs
//! Jobcast server binary.
//!
//! Parses configuration, installs tracing, creates the job registry once and
//! serves until SIGINT/SIGTERM, cancelling live jobs on the way out.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use jobcast_jobs::JobRegistry;
use jobcast_observability::init_tracing;
use jobcast_server::shutdown::shutdown_signal;
use jobcast_server::{create_app, AppState, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    config.validate()?;

    let _tracing = init_tracing(&config.log())?;

    let registry = Arc::new(JobRegistry::new());
    let state = AppState::new(Arc::clone(&registry), config.work());
    let app = create_app(state);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    eprintln!("\n  jobcast v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("  \u{2192} POST http://{addr}/api/jobs\n");
    tracing::info!(%addr, steps = config.steps, step_interval_ms = config.step_interval_ms, "Starting server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(registry))
        .await
        .context("server error")?;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}
