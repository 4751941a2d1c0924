// crates/jobs/src/runner.rs
//! Spawns background jobs and guarantees each one ends its progress stream.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures_util::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::channel::BroadcastChannel;
use crate::error::JobError;
use crate::registry::JobRegistry;
use crate::types::JobId;

/// Payload published when a job is cancelled before finishing.
pub const CANCELLED_MESSAGE: &str = "cancelled";

/// Starts jobs against a shared [`JobRegistry`].
///
/// Call `start_job` to spawn async work; viewers attach through the registry.
/// The runner never joins its jobs.
pub struct JobRunner {
    registry: Arc<JobRegistry>,
}

impl JobRunner {
    pub fn new(registry: Arc<JobRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// Start a new background job and return without waiting for it.
    ///
    /// The closure `f` receives a [`JobContext`], the job's only write handle.
    /// Whatever the outcome (success, `Err`, panic, cancellation) the job's
    /// channel is closed and its id deregistered exactly once. Failures are
    /// published as one last payload before `EndOfStream`.
    pub fn start_job<F, Fut>(&self, job_type: impl Into<String>, f: F) -> JobHandle
    where
        F: FnOnce(JobContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), String>> + Send + 'static,
    {
        let job_type = job_type.into();
        let (id, channel, cancel) = self.registry.register_job();

        let ctx = JobContext {
            id,
            job_type: job_type.clone(),
            channel: Arc::clone(&channel),
            cancel: cancel.clone(),
        };
        let guard = CloseGuard {
            registry: Arc::clone(&self.registry),
            id,
            channel: Arc::clone(&channel),
        };

        tracing::info!(job_id = id, job_type = %job_type, "job started");

        tokio::spawn(async move {
            let started = Instant::now();
            let body = AssertUnwindSafe(async move { f(ctx).await }).catch_unwind();

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => Outcome::Cancelled,
                result = body => match result {
                    Ok(Ok(())) => Outcome::Completed,
                    Ok(Err(e)) => Outcome::Failed(JobError::TaskFailure(e)),
                    Err(panic) => Outcome::Failed(JobError::TaskFailure(format!(
                        "job panicked: {}",
                        panic_message(&*panic)
                    ))),
                },
            };

            let elapsed_ms = started.elapsed().as_millis() as u64;
            match &outcome {
                Outcome::Completed => {
                    tracing::info!(job_id = id, job_type = %job_type, elapsed_ms, "job completed");
                }
                Outcome::Failed(err) => {
                    tracing::warn!(job_id = id, job_type = %job_type, elapsed_ms, error = %err, "job failed");
                    channel.publish(err.to_string());
                }
                Outcome::Cancelled => {
                    tracing::info!(job_id = id, job_type = %job_type, elapsed_ms, "job cancelled");
                    channel.publish(CANCELLED_MESSAGE);
                }
            }

            drop(guard);
        });

        JobHandle {
            id,
            registry: Arc::clone(&self.registry),
        }
    }
}

enum Outcome {
    Completed,
    Failed(JobError),
    Cancelled,
}

/// Deregisters and closes the job when dropped, including when the spawned
/// task is torn down before finishing.
struct CloseGuard {
    registry: Arc<JobRegistry>,
    id: JobId,
    channel: Arc<BroadcastChannel>,
}

impl Drop for CloseGuard {
    fn drop(&mut self) {
        self.registry.unregister_and_close(self.id, &self.channel);
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Write handle given to a running job.
#[derive(Debug)]
pub struct JobContext {
    id: JobId,
    job_type: String,
    channel: Arc<BroadcastChannel>,
    cancel: CancellationToken,
}

impl JobContext {
    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn job_type(&self) -> &str {
        &self.job_type
    }

    /// Send a progress line to every current viewer.
    pub fn publish(&self, message: impl Into<String>) {
        self.channel.publish(message);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once cancellation has been requested.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }
}

/// Handle to a started job.
pub struct JobHandle {
    pub id: JobId,
    registry: Arc<JobRegistry>,
}

impl JobHandle {
    /// Request cancellation. Returns `false` if the job already finished.
    pub fn cancel(&self) -> bool {
        self.registry.cancel(self.id)
    }

    pub fn is_running(&self) -> bool {
        self.registry.lookup(self.id).is_some()
    }
}
