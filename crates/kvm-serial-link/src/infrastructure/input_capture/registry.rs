//! Thread-safe registry from hook identity to event sender.
//!
//! Low-level hook callbacks are plain `extern "system"` functions with no
//! user-data pointer.  Instead of stashing a sender in a global, each
//! callback computes its [`HookId`] (the hook thread's id on Windows) and
//! asks the registry where to deliver the event.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use super::{CaptureError, RawInputEvent};

/// Identity of one installed hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

impl HookId {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// A fresh id from a process-wide counter, for sources without a
    /// natural identity.  Starts above the 32-bit thread-id range.
    pub fn unique() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1 << 32);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Shared map of active hooks.  Clones refer to the same map.
#[derive(Debug, Clone, Default)]
pub struct HookRegistry {
    inner: Arc<Mutex<HashMap<HookId, Sender<RawInputEvent>>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by OS hook callbacks.
    pub fn global() -> &'static HookRegistry {
        static GLOBAL: OnceLock<HookRegistry> = OnceLock::new();
        GLOBAL.get_or_init(HookRegistry::new)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<HookId, Sender<RawInputEvent>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// # Errors
    ///
    /// Returns [`CaptureError::AlreadyRegistered`] if `id` is taken.
    pub fn register(&self, id: HookId, sender: Sender<RawInputEvent>) -> Result<(), CaptureError> {
        let mut map = self.lock();
        if map.contains_key(&id) {
            return Err(CaptureError::AlreadyRegistered(id));
        }
        map.insert(id, sender);
        Ok(())
    }

    /// Returns `true` if `id` was registered.
    pub fn unregister(&self, id: HookId) -> bool {
        self.lock().remove(&id).is_some()
    }

    pub fn is_registered(&self, id: HookId) -> bool {
        self.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delivers `event` to the hook registered as `id`.
    ///
    /// Returns `false` if nothing is registered or the receiver is gone; in
    /// the latter case the stale entry is removed.
    pub fn dispatch(&self, id: HookId, event: RawInputEvent) -> bool {
        let mut map = self.lock();
        let Some(sender) = map.get(&id) else {
            return false;
        };
        if sender.send(event).is_ok() {
            return true;
        }
        map.remove(&id);
        false
    }
}
