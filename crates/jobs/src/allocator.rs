// crates/jobs/src/allocator.rs
//! Job identifier allocation.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::JobId;

/// Issues strictly increasing job ids, starting at 1.
///
/// Lock-free; safe to share between any number of submitting requests.
#[derive(Debug)]
pub struct IdAllocator {
    next_id: AtomicU64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocate the next id. Every call returns a value greater than all
    /// previously returned values.
    pub fn next(&self) -> JobId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
