//! The message queue and its motion-coalescing drain.
//!
//! An unbounded FIFO of [`QueuedMessage`]s guarded by a single mutex.  The
//! queue also owns the [`QueueCounters`], and every counter update that
//! accompanies a push or pop happens while the lock is held, so the counter
//! invariant is exact whenever the lock is free.
//!
//! # Coalescing (for beginners)
//!
//! Moving the mouse produces hundreds of absolute-position frames per second.
//! The device only cares about the *latest* position, so when the worker
//! finds several motion frames at the head of the queue it keeps only the last
//! one.  Coalescing stops at the first non-motion frame, which is never
//! dropped or reordered:
//!
//! ```text
//! queue:  M1 M2 M3 B1 M4 K1
//! batch:  motion = M3, next = B1, coalesced = 2
//! left:   M4 K1
//! ```
//!
//! # In-flight frames
//!
//! Frames handed out in a [`Batch`] are *in flight* until the worker settles
//! them with [`MessageQueue::settle_sent`], [`settle_failed`] or
//! [`settle_abandoned`].  [`close_and_clear`] counts whatever is still in
//! flight as cleared, so an aborted worker cannot leave frames counted as
//! queued.  Settling after that point is ignored.
//!
//! [`settle_failed`]: MessageQueue::settle_failed
//! [`settle_abandoned`]: MessageQueue::settle_abandoned
//! [`close_and_clear`]: MessageQueue::close_and_clear

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use kvm_serial_core::QueuedMessage;

use super::stats::{QueueCounters, QueueStats};

/// What the worker sends in one iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// The most recent of the leading motion frames, if any.
    pub motion: Option<QueuedMessage>,
    /// The first non-motion frame after them, if any.
    pub next: Option<QueuedMessage>,
    /// How many motion frames were discarded in favour of `motion`.
    pub coalesced: u64,
}

impl Batch {
    /// The frames to transmit, in order.
    pub fn frames(&self) -> impl Iterator<Item = QueuedMessage> + '_ {
        self.motion.iter().chain(self.next.iter()).copied()
    }

    pub fn len(&self) -> usize {
        usize::from(self.motion.is_some()) + usize::from(self.next.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
struct QueueInner {
    items: VecDeque<QueuedMessage>,
    /// `false` while disconnected; pushes are ignored.
    open: bool,
    /// Popped by the worker but not yet settled.
    in_flight: u64,
}

/// Thread-safe FIFO shared by producers, the worker, and the lifecycle manager.
#[derive(Debug, Default)]
pub struct MessageQueue {
    inner: Mutex<QueueInner>,
    counters: QueueCounters,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueInner> {
        // No code path panics while holding the lock, but a poisoned queue
        // is still structurally valid.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts accepting pushes and zeroes the counters for a new connection.
    pub fn open(&self) {
        let mut inner = self.lock();
        inner.items.clear();
        inner.in_flight = 0;
        self.counters.reset();
        inner.open = true;
    }

    /// Stops accepting pushes.  Frames already queued stay until drained.
    pub fn close(&self) {
        self.lock().open = false;
    }

    pub fn is_open(&self) -> bool {
        self.lock().open
    }

    /// Appends `count` copies of `message`.
    ///
    /// Returns `false` (and changes nothing) when the queue is closed or
    /// `count` is zero.
    pub fn push(&self, message: QueuedMessage, count: u32) -> bool {
        if count == 0 {
            return false;
        }
        let mut inner = self.lock();
        if !inner.open {
            return false;
        }
        self.counters.record_queued(u64::from(count));
        inner
            .items
            .extend(std::iter::repeat(message).take(count as usize));
        true
    }

    /// Pops the next batch, coalescing leading motion frames.
    ///
    /// Returns `None` when the queue is empty.  Discarded motion frames are
    /// accounted as coalesced before the lock is released; the frames in the
    /// returned batch remain counted as in-queue until the worker records
    /// their outcome.
    pub fn drain_batch(&self) -> Option<Batch> {
        let mut inner = self.lock();

        let mut motion = None;
        let mut popped_motion = 0u64;
        while inner.items.front().is_some_and(QueuedMessage::is_motion) {
            motion = inner.items.pop_front();
            popped_motion += 1;
        }
        let next = inner.items.pop_front();

        if motion.is_none() && next.is_none() {
            return None;
        }

        let coalesced = popped_motion.saturating_sub(1);
        self.counters.record_coalesced(coalesced);
        let batch = Batch { motion, next, coalesced };
        inner.in_flight += batch.len() as u64;
        Some(batch)
    }

    /// Takes up to `n` frames out of flight; returns how many were there.
    fn settle(inner: &mut QueueInner, n: u64) -> u64 {
        let n = n.min(inner.in_flight);
        inner.in_flight -= n;
        n
    }

    /// Records that one in-flight frame was written.
    pub fn settle_sent(&self) {
        let mut inner = self.lock();
        if Self::settle(&mut inner, 1) == 1 {
            self.counters.record_sent();
        }
    }

    /// Records that one in-flight frame failed to write.
    pub fn settle_failed(&self) {
        let mut inner = self.lock();
        if Self::settle(&mut inner, 1) == 1 {
            self.counters.record_failed();
        }
    }

    /// Records that `n` in-flight frames will never be attempted.
    pub fn settle_abandoned(&self, n: u64) {
        let mut inner = self.lock();
        let n = Self::settle(&mut inner, n);
        self.counters.record_cleared(n);
    }

    /// Discards every queued frame, counting each as cleared.
    ///
    /// Returns how many frames were discarded.
    pub fn clear(&self) -> u64 {
        let mut inner = self.lock();
        let n = inner.items.len() as u64;
        inner.items.clear();
        self.counters.record_cleared(n);
        n
    }

    /// Closes the queue and discards what is left in it, including frames
    /// still in flight.
    pub fn close_and_clear(&self) -> u64 {
        let mut inner = self.lock();
        inner.open = false;
        let n = inner.items.len() as u64 + std::mem::take(&mut inner.in_flight);
        inner.items.clear();
        self.counters.record_cleared(n);
        n
    }

    /// Number of frames physically in the deque.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn counters(&self) -> &QueueCounters {
        &self.counters
    }

    pub fn stats(&self) -> QueueStats {
        self.counters.snapshot()
    }
}
