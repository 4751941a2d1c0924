// crates/server/src/routes/progress.rs
//! Progress streaming endpoints.
//!
//! - `GET /api/jobs/{id}`        - chunked `text/plain`, one line per message
//! - `GET /api/jobs/{id}/events` - the same messages as SSE
//!
//! Both answer 404 without streaming anything when the job is unknown or has
//! already finished. A viewer that disconnects mid-stream drops its
//! subscription; the job and other viewers are unaffected.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use jobcast_jobs::{JobError, JobId, Message, Subscription};

use crate::error::ApiResult;
use crate::state::AppState;

/// Build the progress sub-router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/jobs/{id}", get(stream_progress))
        .route("/jobs/{id}/events", get(stream_progress_events))
}

/// Subscribe to a live job, or fail with not-found.
fn attach(state: &AppState, id: JobId) -> ApiResult<Subscription> {
    let sub = state.registry().subscribe(id).ok_or(JobError::UnknownJob(id))?;
    tracing::debug!(job_id = id, "progress viewer attached");
    Ok(sub)
}

/// Logs viewers that go away before the end of the stream.
struct ViewerGuard {
    job_id: JobId,
    finished: bool,
}

impl Drop for ViewerGuard {
    fn drop(&mut self) {
        if self.finished {
            tracing::debug!(job_id = self.job_id, "progress viewer finished");
        } else {
            tracing::debug!(job_id = self.job_id, "progress viewer disconnected early");
        }
    }
}

/// GET /api/jobs/{id} - stream a job's progress as plain text.
///
/// Each payload becomes one chunk terminated by `\n`, handed to the
/// transport as soon as it is received. The body ends on `EndOfStream`.
pub async fn stream_progress(
    State(state): State<Arc<AppState>>,
    Path(id): Path<JobId>,
) -> ApiResult<Response> {
    let mut sub = attach(&state, id)?;

    let stream = async_stream::stream! {
        let mut guard = ViewerGuard { job_id: id, finished: false };
        while let Some(msg) = sub.recv().await {
            match msg {
                Message::Payload(mut line) => {
                    line.push('\n');
                    yield Ok::<_, Infallible>(Bytes::from(line));
                }
                Message::EndOfStream => break,
            }
        }
        guard.finished = true;
    };

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}

/// SSE handler that streams a job's progress.
///
/// # Events
///
/// | Event name | When emitted                         |
/// |------------|--------------------------------------|
/// | `progress` | Each payload published by the job    |
/// | `done`     | Job finished; data is the job id     |
///
/// The stream terminates after `done`.
pub async fn stream_progress_events(
    State(state): State<Arc<AppState>>,
    Path(id): Path<JobId>,
) -> ApiResult<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>> {
    let mut sub = attach(&state, id)?;

    let stream = async_stream::stream! {
        let mut guard = ViewerGuard { job_id: id, finished: false };
        while let Some(msg) = sub.recv().await {
            match msg {
                Message::Payload(text) => {
                    yield Ok::<_, Infallible>(Event::default().event("progress").data(text));
                }
                Message::EndOfStream => {
                    yield Ok::<_, Infallible>(Event::default().event("done").data(id.to_string()));
                    break;
                }
            }
        }
        guard.finished = true;
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::work::WorkConfig;
    use axum::http::{Request, StatusCode};
    use jobcast_jobs::JobRegistry;
    use tower::ServiceExt;

    fn app(state: Arc<AppState>) -> Router {
        Router::new().nest("/api", router()).with_state(state)
    }

    #[tokio::test]
    async fn test_unknown_job_is_404() {
        let state = AppState::new(Arc::new(JobRegistry::new()), WorkConfig::default());
        let response = app(state)
            .oneshot(Request::builder().uri("/api/jobs/7").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_non_numeric_id_is_400() {
        let state = AppState::new(Arc::new(JobRegistry::new()), WorkConfig::default());
        let response = app(state)
            .oneshot(Request::builder().uri("/api/jobs/abc").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_plain_text_stream_headers_and_body() {
        let state = AppState::new(Arc::new(JobRegistry::new()), WorkConfig::default());
        let (go_tx, go_rx) = tokio::sync::oneshot::channel::<()>();
        let handle = state.jobs.start_job("test", |ctx| async move {
            let _ = go_rx.await;
            ctx.publish("A");
            ctx.publish("B");
            Ok(())
        });

        let response = app(state)
            .oneshot(
                Request::builder()
                    .uri(format!("/api/jobs/{}", handle.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");

        go_tx.send(()).unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"A\nB\n");
    }
}
