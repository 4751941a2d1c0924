// crates/jobs/src/registry.rs
//! Live mapping from `JobId` to the job's progress channel.
//!
//! An id is present exactly while its job is running: inserted by
//! [`JobRegistry::register`], removed by [`JobRegistry::unregister_and_close`]
//! in the same critical section that publishes `EndOfStream`.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::allocator::IdAllocator;
use crate::channel::{BroadcastChannel, Subscription};
use crate::types::{JobId, JobSummary};

struct Entry {
    channel: Arc<BroadcastChannel>,
    cancel: CancellationToken,
    started_at: DateTime<Utc>,
}

/// Concurrency-safe registry of in-flight jobs.
///
/// Uses `std::sync::RwLock` (not `tokio::sync::RwLock`) because no operation
/// holds the lock across an `.await`.
pub struct JobRegistry {
    ids: IdAllocator,
    jobs: RwLock<HashMap<JobId, Entry>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            ids: IdAllocator::new(),
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Allocate an id, create its channel and insert the mapping as one step.
    ///
    /// The id is drawn while holding the write lock, so ids enter the map in
    /// issuance order.
    pub fn register(&self) -> (JobId, Arc<BroadcastChannel>) {
        let (id, channel, _) = self.register_job();
        (id, channel)
    }

    /// `register`, also handing back the job's cancellation token.
    pub(crate) fn register_job(&self) -> (JobId, Arc<BroadcastChannel>, CancellationToken) {
        let mut jobs = self.write();
        let id = self.ids.next();
        let channel = Arc::new(BroadcastChannel::new(id));
        let cancel = CancellationToken::new();
        jobs.insert(
            id,
            Entry {
                channel: Arc::clone(&channel),
                cancel: cancel.clone(),
                started_at: Utc::now(),
            },
        );
        tracing::debug!(job_id = id, active = jobs.len(), "job registered");
        (id, channel, cancel)
    }

    /// The channel of a running job, or `None` if the id was never issued or
    /// the job already finished.
    pub fn lookup(&self, id: JobId) -> Option<Arc<BroadcastChannel>> {
        self.read().get(&id).map(|e| Arc::clone(&e.channel))
    }

    /// Look up and subscribe under a single read lock.
    ///
    /// A subscription returned here was attached before the job's close, so it
    /// is guaranteed to observe `EndOfStream`.
    pub fn subscribe(&self, id: JobId) -> Option<Subscription> {
        self.read().get(&id).map(|e| e.channel.subscribe())
    }

    /// Publish `EndOfStream` on `channel` and remove `id`, indivisibly.
    ///
    /// Only the first call for a job has any effect.
    pub fn unregister_and_close(&self, id: JobId, channel: &BroadcastChannel) {
        let mut jobs = self.write();
        let closed = channel.close();
        let removed = jobs.remove(&id).is_some();
        if closed || removed {
            tracing::debug!(job_id = id, active = jobs.len(), "job unregistered");
        }
    }

    /// Request cancellation of a running job. Returns `false` if the job is
    /// not live.
    pub fn cancel(&self, id: JobId) -> bool {
        match self.read().get(&id) {
            Some(entry) => {
                entry.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every live job. Returns how many were signalled.
    pub fn cancel_all(&self) -> usize {
        let jobs = self.read();
        for entry in jobs.values() {
            entry.cancel.cancel();
        }
        jobs.len()
    }

    /// Summaries of all live jobs, ordered by id.
    pub fn active_jobs(&self) -> Vec<JobSummary> {
        let mut out: Vec<JobSummary> = self
            .read()
            .iter()
            .map(|(id, e)| JobSummary {
                job_id: *id,
                started_at: e.started_at,
                subscribers: e.channel.subscriber_count(),
            })
            .collect();
        out.sort_by_key(|s| s.job_id);
        out
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<JobId, Entry>> {
        self.jobs.read().unwrap_or_else(|e| {
            tracing::error!("RwLock poisoned reading jobs map, recovering");
            PoisonError::into_inner(e)
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<JobId, Entry>> {
        self.jobs.write().unwrap_or_else(|e| {
            tracing::error!("RwLock poisoned writing jobs map, recovering");
            PoisonError::into_inner(e)
        })
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}
