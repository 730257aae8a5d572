//! Queue counters and their read-only snapshot.
//!
//! Every frame that enters the queue leaves it through exactly one exit:
//!
//! | Exit       | Counter           | When                                          |
//! |------------|-------------------|-----------------------------------------------|
//! | sent       | `total_sent`      | transport write succeeded                     |
//! | coalesced  | `total_coalesced` | motion frame superseded by a later one        |
//! | failed     | `total_failed`    | transport write returned an error             |
//! | cleared    | `total_cleared`   | drained by `Disconnect` or `clear_queue`      |
//!
//! so that, whenever no transition is in progress,
//!
//! ```text
//! in_queue == total_queued − total_sent − total_coalesced − total_failed − total_cleared
//! ```
//!
//! Increments of `in_queue` always happen before the frame becomes visible
//! to the worker, so the counter never underflows.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Atomic counters shared by the enqueue path, the worker, and the lifecycle manager.
#[derive(Debug, Default)]
pub struct QueueCounters {
    total_queued: AtomicU64,
    total_sent: AtomicU64,
    in_queue: AtomicU64,
    total_coalesced: AtomicU64,
    total_failed: AtomicU64,
    total_cleared: AtomicU64,
}

impl QueueCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_queued(&self, n: u64) {
        self.total_queued.fetch_add(n, Ordering::SeqCst);
        self.in_queue.fetch_add(n, Ordering::SeqCst);
    }

    pub(crate) fn record_sent(&self) {
        self.in_queue.fetch_sub(1, Ordering::SeqCst);
        self.total_sent.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_failed(&self) {
        self.in_queue.fetch_sub(1, Ordering::SeqCst);
        self.total_failed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_coalesced(&self, n: u64) {
        if n == 0 {
            return;
        }
        self.in_queue.fetch_sub(n, Ordering::SeqCst);
        self.total_coalesced.fetch_add(n, Ordering::SeqCst);
    }

    pub(crate) fn record_cleared(&self, n: u64) {
        if n == 0 {
            return;
        }
        self.in_queue.fetch_sub(n, Ordering::SeqCst);
        self.total_cleared.fetch_add(n, Ordering::SeqCst);
    }

    /// Zeroes every counter.  Only called while the queue is empty and no
    /// worker is running.
    pub(crate) fn reset(&self) {
        for counter in [
            &self.total_queued,
            &self.total_sent,
            &self.in_queue,
            &self.total_coalesced,
            &self.total_failed,
            &self.total_cleared,
        ] {
            counter.store(0, Ordering::SeqCst);
        }
    }

    pub fn in_queue(&self) -> u64 {
        self.in_queue.load(Ordering::SeqCst)
    }

    pub fn total_sent(&self) -> u64 {
        self.total_sent.load(Ordering::SeqCst)
    }

    pub fn total_queued(&self) -> u64 {
        self.total_queued.load(Ordering::SeqCst)
    }

    /// Takes a snapshot of all counters.
    ///
    /// The individual loads are not taken atomically together, so a snapshot
    /// taken while the worker is busy may be off by the frames in flight.
    pub fn snapshot(&self) -> QueueStats {
        QueueStats {
            total_queued: self.total_queued.load(Ordering::SeqCst),
            total_sent: self.total_sent.load(Ordering::SeqCst),
            in_queue: self.in_queue.load(Ordering::SeqCst),
            total_coalesced: self.total_coalesced.load(Ordering::SeqCst),
            total_failed: self.total_failed.load(Ordering::SeqCst),
            total_cleared: self.total_cleared.load(Ordering::SeqCst),
        }
    }
}

/// Point-in-time copy of [`QueueCounters`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct QueueStats {
    pub total_queued: u64,
    pub total_sent: u64,
    pub in_queue: u64,
    pub total_coalesced: u64,
    pub total_failed: u64,
    pub total_cleared: u64,
}

impl QueueStats {
    /// `true` if the counter invariant holds for this snapshot.
    pub fn is_consistent(&self) -> bool {
        let exited = self.total_sent + self.total_coalesced + self.total_failed + self.total_cleared;
        self.total_queued.checked_sub(exited) == Some(self.in_queue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_counters_are_zero_and_consistent() {
        let stats = QueueCounters::new().snapshot();
        assert_eq!(stats, QueueStats::default());
        assert!(stats.is_consistent());
    }

    #[test]
    fn test_every_exit_keeps_invariant() {
        // Arrange
        let counters = QueueCounters::new();
        counters.record_queued(10);

        // Act
        counters.record_sent();
        counters.record_sent();
        counters.record_failed();
        counters.record_coalesced(4);
        counters.record_cleared(2);

        // Assert
        let stats = counters.snapshot();
        assert_eq!(stats.in_queue, 1);
        assert_eq!(stats.total_sent, 2);
        assert_eq!(stats.total_failed, 1);
        assert_eq!(stats.total_coalesced, 4);
        assert_eq!(stats.total_cleared, 2);
        assert!(stats.is_consistent());
    }

    #[test]
    fn test_inconsistent_snapshot_is_detected() {
        let stats = QueueStats {
            total_queued: 3,
            total_sent: 1,
            in_queue: 5,
            ..QueueStats::default()
        };
        assert!(!stats.is_consistent());
    }

    #[test]
    fn test_reset_zeroes_all_counters() {
        let counters = QueueCounters::new();
        counters.record_queued(3);
        counters.record_sent();

        counters.reset();

        assert_eq!(counters.snapshot(), QueueStats::default());
    }

    #[test]
    fn test_zero_sized_exits_are_no_ops() {
        let counters = QueueCounters::new();
        counters.record_coalesced(0);
        counters.record_cleared(0);
        assert_eq!(counters.snapshot(), QueueStats::default());
    }
}
