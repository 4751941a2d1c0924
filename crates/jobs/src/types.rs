// crates/jobs/src/types.rs
//! Types for the background job system.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Unique identifier for a job. Never reused within a process.
pub type JobId = u64;

/// One item on a job's progress channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// A progress line produced by the job.
    Payload(String),
    /// Terminal marker. Published exactly once, always last.
    EndOfStream,
}

impl Message {
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Message::EndOfStream)
    }

    /// The payload text, or `None` for the end-of-stream marker.
    pub fn as_payload(&self) -> Option<&str> {
        match self {
            Message::Payload(text) => Some(text),
            Message::EndOfStream => None,
        }
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Message::Payload(text)
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Message::Payload(text.to_string())
    }
}

/// Snapshot of a live job for listing endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub job_id: JobId,
    pub started_at: DateTime<Utc>,
    pub subscribers: usize,
}
