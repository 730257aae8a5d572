//! Jiggle monitor: keeps the target session awake while the link is idle.
//!
//! The monitor wakes every `poll_interval`, and once no motion frame has been
//! enqueued for a randomized threshold it enqueues two motion frames to random
//! positions `move_delay` apart.  It then resets the idle timer and draws a
//! new threshold.
//!
//! The decision logic lives in [`JiggleState`], a plain value with no clock
//! of its own, so it can be tested with hand-made instants.  The task in
//! [`run_jiggle`] only does the waiting and the enqueueing.

use std::ops::RangeInclusive;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use kvm_serial_core::{encode_mouse, MouseAction, Point, Priority, QueuedMessage, WireProfile};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::queue::MessageQueue;

/// Tunables for the jiggle monitor.
#[derive(Debug, Clone, PartialEq)]
pub struct JiggleConfig {
    pub enabled: bool,
    /// Shortest idle threshold.
    pub min_idle: Duration,
    /// Longest idle threshold (inclusive).
    pub max_idle: Duration,
    pub poll_interval: Duration,
    /// Pause between the two jiggle moves.
    pub move_delay: Duration,
    /// Device-coordinate range for both axes of a jiggle position.
    pub coord_range: RangeInclusive<i32>,
    /// Fixed RNG seed; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for JiggleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_idle: Duration::from_secs(120),
            max_idle: Duration::from_secs(180),
            poll_interval: Duration::from_secs(10),
            move_delay: Duration::from_millis(100),
            coord_range: 0x1000..=0x4000,
            seed: None,
        }
    }
}

// ── Idle tracking ─────────────────────────────────────────────────────────────

/// Last-activity timestamp plus the current randomized threshold.
///
/// Shared between the enqueue path (which calls [`record_activity`] for
/// every motion frame) and the monitor task, always behind one mutex.
///
/// [`record_activity`]: JiggleState::record_activity
#[derive(Debug)]
pub struct JiggleState {
    last_activity: Instant,
    threshold: Duration,
    idle_range: RangeInclusive<Duration>,
    coord_range: RangeInclusive<i32>,
    rng: StdRng,
}

impl JiggleState {
    pub fn new(config: &JiggleConfig, now: Instant) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let (lo, hi) = ordered(config.min_idle, config.max_idle);
        let mut state = Self {
            last_activity: now,
            threshold: lo,
            idle_range: lo..=hi,
            coord_range: config.coord_range.clone(),
            rng,
        };
        state.rearm(now);
        state
    }

    /// Records pointer-motion traffic.
    pub fn record_activity(&mut self, now: Instant) {
        self.last_activity = now;
    }

    /// `true` once the link has been idle for at least the current threshold.
    pub fn is_due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_activity) >= self.threshold
    }

    /// Resets the idle timer and draws a new threshold.
    pub fn rearm(&mut self, now: Instant) {
        self.last_activity = now;
        let lo = self.idle_range.start().as_millis() as u64;
        let hi = self.idle_range.end().as_millis() as u64;
        self.threshold = Duration::from_millis(self.rng.gen_range(lo..=hi));
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Draws a random jiggle position.
    pub fn next_position(&mut self) -> Point {
        let x = self.rng.gen_range(self.coord_range.clone());
        let y = self.rng.gen_range(self.coord_range.clone());
        Point::new(x, y)
    }
}

fn ordered(a: Duration, b: Duration) -> (Duration, Duration) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

pub(crate) fn lock_state(state: &Mutex<JiggleState>) -> std::sync::MutexGuard<'_, JiggleState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Monitor task ──────────────────────────────────────────────────────────────

/// Runs until `cancel` fires.
///
/// Jiggle frames go through the normal enqueue path, so they are subject to
/// the same closed-queue check and counters as user input.
pub async fn run_jiggle(
    config: JiggleConfig,
    queue: Arc<MessageQueue>,
    state: Arc<Mutex<JiggleState>>,
    cancel: CancellationToken,
) {
    info!(
        "jiggle monitor started (next in {:?})",
        lock_state(&state).threshold()
    );

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = sleep(config.poll_interval) => {}
        }

        let first = {
            let mut st = lock_state(&state);
            if !st.is_due(Instant::now()) {
                continue;
            }
            st.next_position()
        };
        info!("link idle, jiggling pointer");
        enqueue_move(&queue, &state, first);

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = sleep(config.move_delay) => {}
        }

        let second = lock_state(&state).next_position();
        enqueue_move(&queue, &state, second);

        let mut st = lock_state(&state);
        st.rearm(Instant::now());
        debug!("next jiggle in {:?}", st.threshold());
    }

    info!("jiggle monitor stopped");
}

/// `pos` is already in device units, so it is encoded unscaled whatever the
/// link's profile.
fn enqueue_move(queue: &MessageQueue, state: &Mutex<JiggleState>, pos: Point) {
    match encode_mouse(MouseAction::Move, pos, &WireProfile::STANDARD) {
        Ok(frame) => {
            if queue.push(QueuedMessage::new(frame, Priority::NORMAL), 1) {
                lock_state(state).record_activity(Instant::now());
            }
        }
        Err(e) => warn!("jiggle position {pos:?} not encodable: {e}"),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JiggleConfig {
        JiggleConfig {
            seed: Some(7),
            ..JiggleConfig::default()
        }
    }

    #[test]
    fn test_threshold_is_drawn_within_configured_range() {
        let start = Instant::now();
        let mut state = JiggleState::new(&config(), start);
        for _ in 0..200 {
            let t = state.threshold();
            assert!(t >= Duration::from_secs(120) && t <= Duration::from_secs(180), "{t:?}");
            state.rearm(start);
        }
    }

    #[test]
    fn test_not_due_before_threshold() {
        // Arrange
        let start = Instant::now();
        let state = JiggleState::new(&config(), start);

        // Act / Assert
        assert!(!state.is_due(start + state.threshold() - Duration::from_millis(1)));
        assert!(state.is_due(start + state.threshold()));
    }

    #[test]
    fn test_activity_postpones_jiggle() {
        // Arrange
        let start = Instant::now();
        let mut state = JiggleState::new(&config(), start);
        let threshold = state.threshold();

        // Act – motion just before the deadline
        state.record_activity(start + threshold - Duration::from_secs(1));

        // Assert
        assert!(!state.is_due(start + threshold));
        assert!(state.is_due(start + threshold * 2));
    }

    #[test]
    fn test_rearm_resets_timer() {
        let start = Instant::now();
        let mut state = JiggleState::new(&config(), start);
        let late = start + Duration::from_secs(500);
        assert!(state.is_due(late));

        state.rearm(late);

        assert!(!state.is_due(late));
    }

    #[test]
    fn test_positions_stay_inside_rectangle() {
        let mut state = JiggleState::new(&config(), Instant::now());
        for _ in 0..500 {
            let p = state.next_position();
            assert!((0x1000..=0x4000).contains(&p.x), "{p:?}");
            assert!((0x1000..=0x4000).contains(&p.y), "{p:?}");
        }
    }

    #[test]
    fn test_same_seed_gives_same_sequence() {
        let now = Instant::now();
        let mut a = JiggleState::new(&config(), now);
        let mut b = JiggleState::new(&config(), now);
        assert_eq!(a.threshold(), b.threshold());
        assert_eq!(a.next_position(), b.next_position());
    }

    #[test]
    fn test_swapped_bounds_are_ordered() {
        let cfg = JiggleConfig {
            min_idle: Duration::from_secs(5),
            max_idle: Duration::from_secs(2),
            ..config()
        };
        let state = JiggleState::new(&cfg, Instant::now());
        assert!(state.threshold() >= Duration::from_secs(2));
        assert!(state.threshold() <= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_enqueues_two_moves_once_idle() {
        // Arrange
        let cfg = JiggleConfig {
            min_idle: Duration::from_millis(300),
            max_idle: Duration::from_millis(300),
            poll_interval: Duration::from_millis(50),
            move_delay: Duration::from_millis(20),
            ..config()
        };
        let queue = Arc::new(MessageQueue::new());
        queue.open();
        let state = Arc::new(Mutex::new(JiggleState::new(&cfg, Instant::now())));
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_jiggle(
            cfg,
            Arc::clone(&queue),
            Arc::clone(&state),
            cancel.clone(),
        ));

        // Act – idle for longer than one threshold but shorter than two
        sleep(Duration::from_millis(450)).await;
        cancel.cancel();
        task.await.unwrap();

        // Assert
        assert_eq!(queue.len(), 2);
        let batch = queue.drain_batch().unwrap();
        assert_eq!(batch.coalesced, 1, "both jiggle frames are motion");
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_exits_promptly_on_cancel() {
        let cfg = config();
        let queue = Arc::new(MessageQueue::new());
        let state = Arc::new(Mutex::new(JiggleState::new(&cfg, Instant::now())));
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_jiggle(cfg, queue, state, cancel.clone()));

        cancel.cancel();

        tokio::time::timeout(Duration::from_millis(10), task)
            .await
            .expect("monitor should stop without waiting for its poll interval")
            .unwrap();
    }
}
