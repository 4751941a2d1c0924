// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::Arc;
use std::time::Instant;

use jobcast_jobs::{JobRegistry, JobRunner};

use crate::work::WorkConfig;

/// Shared application state accessible from all route handlers.
///
/// The registry is created once at startup and handed in explicitly; handlers
/// reach it only through this state.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// Starts background jobs against the shared registry.
    pub jobs: JobRunner,
    /// Shape of the demo workload.
    pub work: WorkConfig,
}

impl AppState {
    pub fn new(registry: Arc<JobRegistry>, work: WorkConfig) -> Arc<Self> {
        Arc::new(Self {
            start_time: Instant::now(),
            jobs: JobRunner::new(registry),
            work,
        })
    }

    /// Live job registry.
    pub fn registry(&self) -> &Arc<JobRegistry> {
        self.jobs.registry()
    }

    /// Get the server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
