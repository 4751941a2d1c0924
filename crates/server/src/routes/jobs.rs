// crates/server/src/routes/jobs.rs
//! API routes for starting and managing background jobs.
//!
//! - POST /jobs - Start a demo job, redirect to its progress stream
//! - GET /jobs - List all live jobs
//! - POST /jobs/{id}/cancel - Cancel a live job

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Redirect;
use axum::routing::{get, post};
use axum::{Json, Router};
use jobcast_jobs::{JobId, JobSummary};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::work::simulated_work;

#[derive(Debug, Default, Deserialize)]
pub struct SubmitParams {
    /// Override the configured step count.
    pub steps: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub job_id: JobId,
    pub cancelled: bool,
}

/// Location of a job's progress stream.
pub fn progress_path(id: JobId) -> String {
    format!("/api/jobs/{id}")
}

/// POST /api/jobs - Start a job and hand its id back via `303 See Other`.
async fn submit_job(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SubmitParams>,
) -> ApiResult<Redirect> {
    let steps = state.work.steps(params.steps)?;
    let interval = state.work.step_interval;

    let handle = state
        .jobs
        .start_job("simulated", move |ctx| simulated_work(ctx, steps, interval));

    tracing::info!(job_id = handle.id, steps, "job submitted");
    Ok(Redirect::to(&progress_path(handle.id)))
}

/// GET /api/jobs - List all live jobs.
async fn list_jobs(State(state): State<Arc<AppState>>) -> Json<Vec<JobSummary>> {
    Json(state.registry().active_jobs())
}

/// POST /api/jobs/{id}/cancel - Request cancellation of a live job.
///
/// The job's viewers receive a final `cancelled` line before the stream ends.
async fn cancel_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<JobId>,
) -> ApiResult<(StatusCode, Json<CancelResponse>)> {
    if !state.registry().cancel(id) {
        return Err(ApiError::JobNotFound(id));
    }
    tracing::info!(job_id = id, "job cancellation requested");
    Ok((
        StatusCode::ACCEPTED,
        Json(CancelResponse {
            job_id: id,
            cancelled: true,
        }),
    ))
}

/// Build the jobs router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/jobs", post(submit_job).get(list_jobs))
        .route("/jobs/{id}/cancel", post(cancel_job))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::work::WorkConfig;
    use axum::body::Body;
    use axum::http::{header, Request};
    use jobcast_jobs::JobRegistry;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_state() -> Arc<AppState> {
        AppState::new(
            Arc::new(JobRegistry::new()),
            WorkConfig {
                default_steps: 2,
                max_steps: 5,
                step_interval: Duration::from_secs(60),
            },
        )
    }

    fn app(state: Arc<AppState>) -> Router {
        Router::new().nest("/api", router()).with_state(state)
    }

    #[test]
    fn test_progress_path() {
        assert_eq!(progress_path(12), "/api/jobs/12");
    }

    #[tokio::test]
    async fn test_submit_redirects_to_progress() {
        let state = test_state();
        let response = app(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/jobs")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        assert_eq!(location, "/api/jobs/1");
        assert!(state.registry().lookup(1).is_some());
        state.registry().cancel_all();
    }

    #[tokio::test]
    async fn test_submit_rejects_out_of_range_steps() {
        let state = test_state();
        let response = app(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/jobs?steps=6")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(state.registry().is_empty());
    }

    #[tokio::test]
    async fn test_list_jobs_empty() {
        let response = app(test_state())
            .oneshot(Request::builder().uri("/api/jobs").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
        assert!(json.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_unknown_job_is_404() {
        let response = app(test_state())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/jobs/99/cancel")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
