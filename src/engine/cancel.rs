//! Cooperative cancellation for resolution jobs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A flag the engine checks between backend calls and between hops.
///
/// Clones share the flag, so the caller keeps one handle and hands another
/// to the job. Cancellation never corrupts job state; it only stops the
/// traversal at the next checkpoint.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}
