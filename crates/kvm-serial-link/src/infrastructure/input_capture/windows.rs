//! Windows low-level keyboard and mouse hook implementation.
//!
//! Installs WH_KEYBOARD_LL and WH_MOUSE_LL hooks on a dedicated thread that
//! runs a Win32 message loop.  The hook thread's id is its [`HookId`]: the
//! callbacks run on that same thread, so they find their sender in the
//! [`HookRegistry`] with `GetCurrentThreadId()`.
//!
//! # Safety
//!
//! This module uses `unsafe` code exclusively for Windows API FFI calls.
//! All `unsafe` blocks are annotated with `// SAFETY:` comments.

#![cfg(target_os = "windows")]

use std::sync::mpsc::{self, Sender};
use std::thread;

use tracing::{debug, warn};
use windows::Win32::Foundation::{LPARAM, LRESULT, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, DispatchMessageW, GetMessageW, PostThreadMessageW, SetWindowsHookExW,
    UnhookWindowsHookEx, HC_ACTION, KBDLLHOOKSTRUCT, MSG, MSLLHOOKSTRUCT, WH_KEYBOARD_LL,
    WH_MOUSE_LL, WM_KEYDOWN, WM_KEYUP, WM_LBUTTONDOWN, WM_LBUTTONUP, WM_MBUTTONDOWN,
    WM_MBUTTONUP, WM_MOUSEMOVE, WM_MOUSEWHEEL, WM_QUIT, WM_RBUTTONDOWN, WM_RBUTTONUP,
    WM_SYSKEYDOWN, WM_SYSKEYUP,
};

use super::{CaptureError, CaptureHandle, HookId, HookRegistry, InputSource, PointerButton, RawInputEvent};

/// Windows low-level input capture source.
pub struct WindowsInputSource {
    registry: &'static HookRegistry,
}

impl WindowsInputSource {
    pub fn new() -> Self {
        Self {
            registry: HookRegistry::global(),
        }
    }
}

impl Default for WindowsInputSource {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSource for WindowsInputSource {
    fn start(&self) -> Result<CaptureHandle, CaptureError> {
        let (tx, rx) = mpsc::channel::<RawInputEvent>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<u32, CaptureError>>();
        let registry = self.registry.clone();

        thread::Builder::new()
            .name("kvm-hook-loop".to_string())
            .spawn(move || run_hook_thread(registry, tx, ready_tx))
            .map_err(|e| CaptureError::HookInstallFailed(e.to_string()))?;

        let thread_id = ready_rx
            .recv()
            .map_err(|_| CaptureError::HookInstallFailed("hook thread exited early".into()))??;

        let id = HookId::from_raw(u64::from(thread_id));
        Ok(CaptureHandle::new(id, self.registry.clone(), rx).with_stop_hook(move || {
            // SAFETY: Posting WM_QUIT to a thread id is always safe; it fails
            // harmlessly if the thread has already exited.
            let posted = unsafe { PostThreadMessageW(thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) };
            if let Err(e) = posted {
                debug!("hook thread {thread_id} already gone: {e}");
            }
        }))
    }
}

/// Entry point for the dedicated hook thread.
fn run_hook_thread(
    registry: HookRegistry,
    tx: Sender<RawInputEvent>,
    ready: Sender<Result<u32, CaptureError>>,
) {
    // SAFETY: GetCurrentThreadId has no preconditions.
    let thread_id = unsafe { GetCurrentThreadId() };
    let id = HookId::from_raw(u64::from(thread_id));

    if let Err(e) = registry.register(id, tx) {
        let _ = ready.send(Err(e));
        return;
    }

    // SAFETY: SetWindowsHookExW requires the calling thread to pump messages,
    // which this thread does below.
    let hooks = unsafe {
        SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_hook_proc), None, 0).and_then(|kbd| {
            match SetWindowsHookExW(WH_MOUSE_LL, Some(mouse_hook_proc), None, 0) {
                Ok(mouse) => Ok((kbd, mouse)),
                Err(e) => {
                    let _ = UnhookWindowsHookEx(kbd);
                    Err(e)
                }
            }
        })
    };
    let (kbd_hook, mouse_hook) = match hooks {
        Ok(h) => h,
        Err(e) => {
            registry.unregister(id);
            let _ = ready.send(Err(CaptureError::HookInstallFailed(e.to_string())));
            return;
        }
    };
    let _ = ready.send(Ok(thread_id));
    debug!("input hooks installed on thread {thread_id}");

    // Win32 message loop – blocks until WM_QUIT is posted
    let mut msg = MSG::default();
    // SAFETY: Standard Win32 GetMessage/DispatchMessage loop pattern.
    unsafe {
        while GetMessageW(&mut msg, None, 0, 0).as_bool() {
            DispatchMessageW(&msg);
        }
        if let Err(e) = UnhookWindowsHookEx(kbd_hook) {
            warn!("failed to remove keyboard hook: {e}");
        }
        if let Err(e) = UnhookWindowsHookEx(mouse_hook) {
            warn!("failed to remove mouse hook: {e}");
        }
    }
    registry.unregister(id);
    debug!("input hooks removed from thread {thread_id}");
}

fn dispatch(event: RawInputEvent) {
    // SAFETY: GetCurrentThreadId has no preconditions.
    let id = HookId::from_raw(u64::from(unsafe { GetCurrentThreadId() }));
    HookRegistry::global().dispatch(id, event);
}

/// Low-level keyboard hook callback.
///
/// # Safety
///
/// Called by Windows from the hook thread.  Must return quickly (< ~300ms)
/// or the OS removes the hook.
unsafe extern "system" fn keyboard_hook_proc(
    n_code: i32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    if n_code == HC_ACTION as i32 {
        // SAFETY: l_param points to a KBDLLHOOKSTRUCT when n_code == HC_ACTION.
        let kbs = &*(l_param.0 as *const KBDLLHOOKSTRUCT);
        let vk_code = kbs.vkCode as u8;

        let event = match w_param.0 as u32 {
            WM_KEYDOWN => Some((true, false)),
            WM_KEYUP => Some((false, false)),
            WM_SYSKEYDOWN => Some((true, true)),
            WM_SYSKEYUP => Some((false, true)),
            _ => None,
        };
        if let Some((is_down, is_system)) = event {
            dispatch(RawInputEvent::Key {
                vk_code,
                is_down,
                is_system,
            });
        }
    }

    // SAFETY: Forward the event to the next hook in the chain.
    CallNextHookEx(None, n_code, w_param, l_param)
}

/// Low-level mouse hook callback.
///
/// # Safety
///
/// Called by Windows from the hook thread; must return quickly.
unsafe extern "system" fn mouse_hook_proc(
    n_code: i32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    if n_code == HC_ACTION as i32 {
        // SAFETY: l_param points to a MSLLHOOKSTRUCT when n_code == HC_ACTION.
        let mhs = &*(l_param.0 as *const MSLLHOOKSTRUCT);
        let (x, y) = (mhs.pt.x, mhs.pt.y);

        let button = |button, is_down| RawInputEvent::PointerButton {
            button,
            is_down,
            x,
            y,
        };
        let event = match w_param.0 as u32 {
            WM_MOUSEMOVE => Some(RawInputEvent::PointerMove { x, y }),
            WM_LBUTTONDOWN => Some(button(PointerButton::Left, true)),
            WM_LBUTTONUP => Some(button(PointerButton::Left, false)),
            WM_RBUTTONDOWN => Some(button(PointerButton::Right, true)),
            WM_RBUTTONUP => Some(button(PointerButton::Right, false)),
            WM_MBUTTONDOWN => Some(button(PointerButton::Middle, true)),
            WM_MBUTTONUP => Some(button(PointerButton::Middle, false)),
            WM_MOUSEWHEEL => Some(RawInputEvent::Wheel {
                delta: (mhs.mouseData >> 16) as i16,
                x,
                y,
            }),
            _ => None,
        };
        if let Some(event) = event {
            dispatch(event);
        }
    }

    // SAFETY: Forward to the next hook in the chain.
    CallNextHookEx(None, n_code, w_param, l_param)
}
