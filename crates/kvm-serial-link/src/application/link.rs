//! SerialLink: the connection lifecycle manager and public enqueue surface.
//!
//! # Lifecycle
//!
//! ```text
//!            connect(port) ──────────────┐
//!   ┌──────────────┐   open ok   ┌───────▼─────┐
//!   │ Disconnected │ ──────────▶ │  Connected  │  worker + jiggle running
//!   └──────▲───────┘             └───────┬─────┘
//!          └──── disconnect() / dispose() / connect() (implicit) ┘
//! ```
//!
//! `connect` always tears down an existing session first, so at most one
//! worker and one jiggle monitor are alive at any time.  Teardown closes the
//! queue to new frames, cancels the session token, joins both tasks with a
//! bounded wait, closes the transport, and only then discards what is left in
//! the queue.
//!
//! # Enqueueing
//!
//! All `queue_*` methods are synchronous and callable from any thread.  They
//! are silent no-ops while disconnected or after disposal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use kvm_serial_core::{
    encode_key, encode_mouse, Frame, FrameError, Hotkey, HotkeyError, KeyAction, KeyMapper,
    MouseAction, Point, Priority, QueuedMessage, ScrollDirection, WireProfile,
};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use super::events::{EventBus, LinkEvent};
use super::jiggle::{lock_state, run_jiggle, JiggleConfig, JiggleState};
use super::queue::MessageQueue;
use super::stats::QueueStats;
use super::worker::{run_worker, WorkerConfig};
use crate::infrastructure::serial::{SerialSettings, Transport, TransportConnector, TransportError};

/// Error type for link operations.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("link has been disposed")]
    Disposed,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Hotkey(#[from] HotkeyError),
}

/// Runtime settings for a [`SerialLink`].
#[derive(Debug, Clone, PartialEq)]
pub struct LinkSettings {
    /// Wire layout for mouse frames.
    pub profile: WireProfile,
    pub worker: WorkerConfig,
    pub jiggle: JiggleConfig,
    /// Upper bound on how long `disconnect` waits for each background task.
    pub shutdown_timeout: Duration,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            profile: WireProfile::STANDARD,
            worker: WorkerConfig::default(),
            jiggle: JiggleConfig::default(),
            shutdown_timeout: Duration::from_secs(2),
        }
    }
}

/// Everything owned by one connection.
struct ActiveSession {
    id: Uuid,
    transport: Arc<dyn Transport>,
    cancel: CancellationToken,
    worker: JoinHandle<()>,
    jiggle: Option<JoinHandle<()>>,
}

/// The serial command queue and protocol engine.
pub struct SerialLink {
    connector: Arc<dyn TransportConnector>,
    settings: LinkSettings,
    queue: Arc<MessageQueue>,
    idle: Arc<Mutex<JiggleState>>,
    events: EventBus,
    disposed: AtomicBool,
    session: tokio::sync::Mutex<Option<ActiveSession>>,
}

impl SerialLink {
    pub fn new(connector: Arc<dyn TransportConnector>, settings: LinkSettings) -> Self {
        let idle = JiggleState::new(&settings.jiggle, Instant::now());
        Self {
            connector,
            settings,
            queue: Arc::new(MessageQueue::new()),
            idle: Arc::new(Mutex::new(idle)),
            events: EventBus::new(),
            disposed: AtomicBool::new(false),
            session: tokio::sync::Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &LinkSettings {
        &self.settings
    }

    /// Subscribes to [`LinkEvent`] notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<LinkEvent> {
        self.events.subscribe()
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Opens `serial` and starts the worker and jiggle monitor.
    ///
    /// Any existing connection is torn down first.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Disposed`] after [`dispose`](Self::dispose), or
    /// [`LinkError::Transport`] if the port cannot be opened.  In both cases
    /// no background task is running afterwards.
    pub async fn connect(&self, serial: &SerialSettings) -> Result<(), LinkError> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(LinkError::Disposed);
        }

        let mut session = self.session.lock().await;
        self.teardown(&mut session).await;

        info!("connecting to {} at {} baud", serial.port, serial.baud_rate);
        let transport: Arc<dyn Transport> = match self.connector.open(serial).await {
            Ok(t) => Arc::from(t),
            Err(e) => {
                error!("connection to {} failed: {e}", serial.port);
                self.events
                    .publish(LinkEvent::StatusChanged(format!("Connection failed: {e}")));
                self.events.publish(LinkEvent::ConnectionChanged(false));
                return Err(e.into());
            }
        };

        *lock_state(&self.idle) = JiggleState::new(&self.settings.jiggle, Instant::now());
        self.queue.open();

        let cancel = CancellationToken::new();
        let worker = tokio::spawn(run_worker(
            self.settings.worker,
            Arc::clone(&self.queue),
            Arc::clone(&transport),
            self.events.clone(),
            cancel.clone(),
        ));
        let jiggle = self.settings.jiggle.enabled.then(|| {
            tokio::spawn(run_jiggle(
                self.settings.jiggle.clone(),
                Arc::clone(&self.queue),
                Arc::clone(&self.idle),
                cancel.clone(),
            ))
        });

        let id = Uuid::new_v4();
        info!(session = %id, "connected to {}", serial.port);
        *session = Some(ActiveSession {
            id,
            transport,
            cancel,
            worker,
            jiggle,
        });

        self.events
            .publish(LinkEvent::StatusChanged(format!("Connected to {}", serial.port)));
        self.events.publish(LinkEvent::ConnectionChanged(true));
        Ok(())
    }

    /// Stops the background tasks, closes the port, and discards queued frames.
    ///
    /// Safe to call when already disconnected; the disconnected notifications
    /// are published either way.
    pub async fn disconnect(&self) {
        let mut session = self.session.lock().await;
        if !self.teardown(&mut session).await {
            debug!("disconnect requested while not connected");
            self.publish_disconnected();
        }
    }

    /// Disconnects and permanently disables the link.  Idempotent.
    pub async fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.disconnect().await;
        debug!("link disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Returns `false` when there was no session to tear down.
    async fn teardown(&self, session: &mut Option<ActiveSession>) -> bool {
        let Some(active) = session.take() else {
            return false;
        };
        let port = active.transport.port_name().to_string();
        info!(session = %active.id, "disconnecting from {port}");

        self.queue.close();
        active.cancel.cancel();
        self.join_bounded("worker", active.worker).await;
        if let Some(jiggle) = active.jiggle {
            self.join_bounded("jiggle monitor", jiggle).await;
        }

        if let Err(e) = active.transport.close().await {
            warn!("error closing {port}: {e}");
        }

        let cleared = self.queue.close_and_clear();
        if cleared > 0 {
            debug!("discarded {cleared} queued frame(s)");
        }

        info!(session = %active.id, "disconnected from {port}");
        self.publish_disconnected();
        true
    }

    fn publish_disconnected(&self) {
        self.events
            .publish(LinkEvent::StatusChanged("Disconnected".to_string()));
        self.events.publish(LinkEvent::ConnectionChanged(false));
    }

    async fn join_bounded(&self, name: &str, mut handle: JoinHandle<()>) {
        match tokio::time::timeout(self.settings.shutdown_timeout, &mut handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("{name} task ended abnormally: {e}"),
            Err(_) => {
                warn!(
                    "{name} did not stop within {:?}; aborting",
                    self.settings.shutdown_timeout
                );
                handle.abort();
                let _ = handle.await;
            }
        }
    }

    // ── Enqueue ───────────────────────────────────────────────────────────────

    /// Appends `count` copies of `frame`.
    ///
    /// Returns `false` when nothing was queued (disconnected, disposed, or
    /// `count == 0`).  Motion frames reset the jiggle idle timer.
    pub fn queue_message(&self, frame: Frame, priority: Priority, count: u32) -> bool {
        if self.disposed.load(Ordering::SeqCst) {
            return false;
        }
        let accepted = self.queue.push(QueuedMessage::new(frame, priority), count);
        if accepted && frame.is_motion() {
            lock_state(&self.idle).record_activity(Instant::now());
        }
        accepted
    }

    /// Queues a key transition.  `key_code` is a device key code.
    pub fn queue_keyboard_event(&self, action: KeyAction, key_code: u8, is_system: bool) {
        trace!(
            "key {:?} 0x{key_code:02X} (system: {is_system})",
            action
        );
        self.queue_message(encode_key(action, key_code), Priority::INPUT, 1);
    }

    /// Queues a key transition for a Windows VK code, mapping it first.
    pub fn queue_vk_event(&self, action: KeyAction, vk_code: u8, is_system: bool) {
        trace!("vk {} {:?}", KeyMapper::key_name(vk_code), action);
        self.queue_keyboard_event(action, KeyMapper::vk_to_device(vk_code), is_system);
    }

    /// Queues a mouse move, click, or single scroll tick at `pos`.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError`] if `pos` does not fit the wire after scaling.
    pub fn queue_mouse_event(&self, action: MouseAction, pos: Point) -> Result<(), FrameError> {
        let frame = encode_mouse(action, pos, &self.settings.profile)?;
        self.queue_message(frame, Priority::INPUT, 1);
        Ok(())
    }

    /// Queues `|ticks|` scroll frames; positive scrolls up.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError`] if `pos` does not fit the wire after scaling.
    pub fn queue_scroll(&self, pos: Point, ticks: i32) -> Result<(), FrameError> {
        if ticks == 0 {
            return Ok(());
        }
        let action = MouseAction::Scroll(ScrollDirection::from_delta(ticks));
        let frame = encode_mouse(action, pos, &self.settings.profile)?;
        self.queue_message(frame, Priority::INPUT, ticks.unsigned_abs());
        Ok(())
    }

    /// Queues the full down/up sequence of `hotkey`.
    pub fn queue_hotkey(&self, hotkey: Hotkey) {
        debug!("hotkey {hotkey}");
        for frame in hotkey.frames() {
            self.queue_message(frame, Priority::INPUT, 1);
        }
    }

    /// Parses `name` and queues the hotkey.
    ///
    /// # Errors
    ///
    /// Returns [`HotkeyError::Unknown`] for unrecognised names.
    pub fn queue_hotkey_named(&self, name: &str) -> Result<(), HotkeyError> {
        self.queue_hotkey(name.parse()?);
        Ok(())
    }

    /// Discards every pending frame without sending it.  The connection stays up.
    pub fn clear_queue(&self) -> u64 {
        let cleared = self.queue.clear();
        info!("cleared {cleared} pending frame(s)");
        cleared
    }

    /// Waits until every queued frame has left the queue, or `timeout` elapses.
    ///
    /// Returns `true` if the queue drained.
    pub async fn wait_until_drained(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.queue.counters().in_queue() == 0 {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            sleep(self.settings.worker.idle_poll.max(Duration::from_millis(1))).await;
        }
    }

    // ── Statistics ────────────────────────────────────────────────────────────

    pub fn is_connected(&self) -> bool {
        self.queue.is_open() && !self.is_disposed()
    }

    /// Frames enqueued but not yet sent, coalesced, failed, or cleared.
    pub fn queue_count(&self) -> u64 {
        self.queue.counters().in_queue()
    }

    pub fn total_sent(&self) -> u64 {
        self.queue.counters().total_sent()
    }

    pub fn total_queued(&self) -> u64 {
        self.queue.counters().total_queued()
    }

    pub fn stats(&self) -> QueueStats {
        self.queue.stats()
    }
}

impl Drop for SerialLink {
    fn drop(&mut self) {
        // Without an async context the tasks cannot be joined; cancelling is
        // enough for them to exit and release the transport.
        if let Some(active) = self.session.get_mut().take() {
            self.queue.close();
            active.cancel.cancel();
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
