//! The coalescing worker: the single consumer of the message queue.
//!
//! ```text
//! loop {
//!     batch = queue.drain_batch()        // coalesce leading motion
//!     none   → wait idle_poll, retry
//!     some   → write motion, write next  // each: sent | failed
//! }
//! ```
//!
//! A failed write is reported, counted, and followed by a backoff; the
//! frame is not requeued.  Every wait is raced against the cancellation
//! token so the worker stops within one write of `Disconnect`.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::events::{EventBus, LinkEvent};
use super::queue::MessageQueue;
use crate::infrastructure::serial::Transport;

/// Worker pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Wait when the queue is empty.
    pub idle_poll: Duration,
    /// Gap after each write.
    pub send_gap: Duration,
    /// Wait after a failed write.
    pub error_backoff: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            idle_poll: Duration::from_millis(5),
            send_gap: Duration::from_millis(1),
            error_backoff: Duration::from_millis(100),
        }
    }
}

/// Returns `true` if the wait completed, `false` if cancelled first.
async fn wait_or_cancel(cancel: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = sleep(duration) => true,
    }
}

/// Runs until `cancel` fires.
pub async fn run_worker(
    config: WorkerConfig,
    queue: Arc<MessageQueue>,
    transport: Arc<dyn Transport>,
    events: EventBus,
    cancel: CancellationToken,
) {
    info!("worker started on {}", transport.port_name());

    'outer: while !cancel.is_cancelled() {
        let Some(batch) = queue.drain_batch() else {
            if !wait_or_cancel(&cancel, config.idle_poll).await {
                break;
            }
            continue;
        };

        if batch.coalesced > 0 {
            debug!("coalesced {} motion frame(s)", batch.coalesced);
        }

        let frames: Vec<_> = batch.frames().collect();
        for (i, message) in frames.iter().enumerate() {
            if cancel.is_cancelled() {
                // Popped but never attempted.
                queue.settle_abandoned((frames.len() - i) as u64);
                break 'outer;
            }

            match transport.write_frame(&message.frame).await {
                Ok(()) => {
                    trace!("TX {}", message.frame);
                    queue.settle_sent();
                    events.publish(LinkEvent::MessageSent(*message));
                }
                Err(e) => {
                    if e.is_retryable() {
                        warn!("send failed for [{}]: {e}", message.frame);
                    } else {
                        error!("send failed for [{}]: {e}", message.frame);
                    }
                    queue.settle_failed();
                    events.publish(LinkEvent::SendError(e.to_string()));
                    if !wait_or_cancel(&cancel, config.error_backoff).await {
                        queue.settle_abandoned((frames.len() - i - 1) as u64);
                        break 'outer;
                    }
                    continue;
                }
            }

            if !wait_or_cancel(&cancel, config.send_gap).await {
                queue.settle_abandoned((frames.len() - i - 1) as u64);
                break 'outer;
            }
        }
    }

    info!("worker stopped");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
