// crates/jobs/src/lib.rs
//! In-process job registry with per-job progress broadcast.
//!
//! Provides:
//! - `IdAllocator` - monotonically increasing job identifiers
//! - `BroadcastChannel` / `Subscription` - one writer, many independent readers
//! - `JobRegistry` - live map from `JobId` to its channel
//! - `JobRunner` - spawns background jobs and guarantees their stream terminates

pub mod allocator;
pub mod channel;
pub mod error;
pub mod registry;
pub mod runner;
pub mod types;

pub use allocator::IdAllocator;
pub use channel::{BroadcastChannel, Subscription};
pub use error::JobError;
pub use registry::JobRegistry;
pub use runner::{JobContext, JobHandle, JobRunner, CANCELLED_MESSAGE};
pub use types::{JobId, JobSummary, Message};
