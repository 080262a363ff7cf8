//! Ready aggregation across shards

use dashmap::DashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Tracks which shard indices have reported READY
///
/// Repeated readiness from one index (after a resume or reconnect) is
/// counted once, and the all-ready signal fires at most once.
#[derive(Debug, Default)]
pub struct ReadyTracker {
    expected: AtomicU32,
    ready: DashSet<u32>,
    fired: AtomicBool,
}

impl ReadyTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_expected(&self, count: u32) {
        self.expected.store(count, Ordering::SeqCst);
    }

    pub fn expected(&self) -> u32 {
        self.expected.load(Ordering::SeqCst)
    }

    pub fn ready_count(&self) -> u32 {
        self.ready.len() as u32
    }

    pub fn is_all_ready(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Record `index` as ready; true exactly once, when the last index arrives
    pub fn mark_ready(&self, index: u32) -> bool {
        self.ready.insert(index);
        let expected = self.expected();
        expected > 0
            && self.ready_count() >= expected
            && !self.fired.swap(true, Ordering::SeqCst)
    }
}
