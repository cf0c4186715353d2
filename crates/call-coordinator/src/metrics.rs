//! Coordinator call metrics.
//!
//! Shared between the coordinator task (which updates values) and whatever
//! reports them. All fields are atomic for lock-free concurrent access.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

/// Lock-free counters for call lifecycle outcomes.
#[derive(Debug, Default)]
pub struct CallMetrics {
    started: AtomicU64,
    accepted: AtomicU64,
    rejected: AtomicU64,
    ended: AtomicU64,
    timed_out: AtomicU64,
    active: AtomicU32,
}

/// Snapshot of call metrics at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallMetricsSnapshot {
    /// Calls this coordinator initiated.
    pub started: u64,
    /// Calls that reached `active`.
    pub accepted: u64,
    /// Calls declined by the remote party.
    pub rejected: u64,
    /// Calls that reached `ended`.
    pub ended: u64,
    /// Pending calls expired by the initiator deadline.
    pub timed_out: u64,
    /// Calls currently active.
    pub active: u32,
}

impl CallMetrics {
    /// Create a new shared metrics instance.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Record a started call.
    pub fn record_started(&self) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    /// Record an accepted call and bump the active gauge.
    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::SeqCst);
        self.active.fetch_add(1, Ordering::SeqCst);
    }

    /// Record a rejected call.
    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::SeqCst);
    }

    /// Record an ended call, dropping the active gauge if it was active.
    pub fn record_ended(&self, was_active: bool) {
        self.ended.fetch_add(1, Ordering::SeqCst);
        if was_active {
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Record a pending call expired by the initiator deadline.
    pub fn record_timed_out(&self) {
        self.timed_out.fetch_add(1, Ordering::SeqCst);
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> CallMetricsSnapshot {
        CallMetricsSnapshot {
            started: self.started.load(Ordering::SeqCst),
            accepted: self.accepted.load(Ordering::SeqCst),
            rejected: self.rejected.load(Ordering::SeqCst),
            ended: self.ended.load(Ordering::SeqCst),
            timed_out: self.timed_out.load(Ordering::SeqCst),
            active: self.active.load(Ordering::SeqCst),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_counters() {
        let metrics = CallMetrics::new();

        metrics.record_started();
        metrics.record_accepted();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.started, 1);
        assert_eq!(snapshot.accepted, 1);
        assert_eq!(snapshot.active, 1);

        metrics.record_ended(true);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.ended, 1);
        assert_eq!(snapshot.active, 0);
    }

    #[test]
    fn test_pending_end_leaves_gauge_untouched() {
        let metrics = CallMetrics::new();
        metrics.record_started();
        metrics.record_ended(false);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.ended, 1);
        assert_eq!(snapshot.active, 0);
    }

    #[test]
    fn test_rejections_and_timeouts() {
        let metrics = CallMetrics::new();
        metrics.record_rejected();
        metrics.record_timed_out();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.rejected, 1);
        assert_eq!(snapshot.timed_out, 1);
    }
}
