// crates/jobs/src/error.rs
use thiserror::Error;

use crate::types::JobId;

#[derive(Debug, Error)]
pub enum JobError {
    /// Never issued, or the job already finished and was deregistered.
    #[error("Job not found: {0}")]
    UnknownJob(JobId),

    #[error("Job failed: {0}")]
    TaskFailure(String),
}
