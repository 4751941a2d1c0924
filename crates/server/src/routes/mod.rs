//! API route handlers for the jobcast server.

pub mod health;
pub mod jobs;
pub mod progress;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined API router with all routes under /api prefix.
///
/// Routes:
/// - GET  /api/health - Health check
/// - POST /api/jobs - Start a job, 303 redirect to its progress stream
/// - GET  /api/jobs - List live jobs
/// - GET  /api/jobs/{id} - Plain-text progress stream
/// - GET  /api/jobs/{id}/events - SSE progress stream
/// - POST /api/jobs/{id}/cancel - Cancel a live job
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", health::router())
        .nest("/api", jobs::router())
        .nest("/api", progress::router())
        .with_state(state)
}
