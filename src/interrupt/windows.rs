//! Console-control-event-based interrupt delivery.
//!
//! Grounded on the POSIX sibling in `[unix]`: the asymmetry is only in how
//! the OS callback signals the pending-kind bitmask — `SetConsoleCtrlHandler`
//! runs its callback on a dedicated system thread rather than in true
//! signal context, so it can call `SetEvent` directly instead of needing a
//! self-pipe `write(2)`. Everything past that (arming, dispatch, waiter
//! bookkeeping) is identical.

use std::sync::atomic::{AtomicIsize, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use windows_sys::Win32::Foundation::{CloseHandle, BOOL, HANDLE};
use windows_sys::Win32::System::Console::{
    SetConsoleCtrlHandler, CTRL_BREAK_EVENT, CTRL_CLOSE_EVENT, CTRL_C_EVENT, CTRL_LOGOFF_EVENT,
    CTRL_SHUTDOWN_EVENT,
};
use windows_sys::Win32::System::Threading::{CreateEventW, SetEvent};

use crate::backend::{Direction, RawTarget, ReadinessHandler};
use crate::controller::Controller;
use crate::operation::{InterruptKinds, InterruptOperation};

static PENDING_KINDS: AtomicU8 = AtomicU8::new(0);
static WAKE_EVENT: AtomicIsize = AtomicIsize::new(0);

unsafe extern "system" fn console_handler(ctrl_type: u32) -> BOOL {
    let bit = match ctrl_type {
        CTRL_C_EVENT | CTRL_BREAK_EVENT => InterruptKinds::BREAK,
        CTRL_CLOSE_EVENT => InterruptKinds::HANGUP,
        CTRL_LOGOFF_EVENT | CTRL_SHUTDOWN_EVENT => InterruptKinds::TERMINATE,
        _ => return 0,
    };
    PENDING_KINDS.fetch_or(bit.bits(), Ordering::SeqCst);
    let handle = WAKE_EVENT.load(Ordering::SeqCst);
    if handle != 0 {
        SetEvent(handle as HANDLE);
    }
    1
}

struct Source {
    event: HANDLE,
    waiters: Mutex<Vec<InterruptOperation>>,
    subscribed_controllers: Mutex<Vec<Controller>>,
    handler_installed: Mutex<bool>,
}

// SAFETY: HANDLE is an opaque kernel handle; distinct threads using the
// same handle value is the documented, supported usage.
unsafe impl Send for Source {}
unsafe impl Sync for Source {}

struct DispatchHandler(Arc<Source>);
impl ReadinessHandler for DispatchHandler {
    fn handle_read_ready(&self) -> bool {
        self.0.dispatch();
        false
    }
}

impl Source {
    fn global() -> &'static Arc<Source> {
        static SOURCE: OnceLock<Arc<Source>> = OnceLock::new();
        SOURCE.get_or_init(|| {
            let event = unsafe { CreateEventW(std::ptr::null(), 0, 0, std::ptr::null()) };
            if event == 0 {
                panic!(
                    "failed to create interrupt wake event: {}",
                    std::io::Error::last_os_error()
                );
            }
            WAKE_EVENT.store(event, Ordering::SeqCst);
            Arc::new(Source {
                event,
                waiters: Mutex::new(Vec::new()),
                subscribed_controllers: Mutex::new(Vec::new()),
                handler_installed: Mutex::new(false),
            })
        })
    }

    fn arm(&self, _kinds: InterruptKinds) {
        let mut installed = self.handler_installed.lock().unwrap();
        if !*installed {
            unsafe {
                SetConsoleCtrlHandler(Some(console_handler), 1);
            }
            log::debug!("interrupt: installed console control handler");
            *installed = true;
        }
    }

    fn ensure_subscribed(self: &Arc<Self>, ctl: &Controller) {
        let mut subs = self.subscribed_controllers.lock().unwrap();
        if subs.iter().any(|c| c == ctl) {
            return;
        }
        ctl.add_subscriber(
            RawTarget::Handle(self.event as std::os::windows::io::RawHandle),
            Direction::Read,
            Arc::new(DispatchHandler(self.clone())),
        );
        subs.push(ctl.clone());
    }

    fn dispatch(&self) {
        let pending = InterruptKinds::from_bits(PENDING_KINDS.swap(0, Ordering::SeqCst));
        if pending.is_empty() {
            return;
        }
        let mut waiters = self.waiters.lock().unwrap();
        let mut satisfied = Vec::new();
        waiters.retain(|op| {
            if op.requested().intersects(pending) {
                op.set_received(op.requested().intersection(pending));
                satisfied.push(op.clone());
                false
            } else {
                true
            }
        });
        drop(waiters);
        for op in satisfied {
            op.notifier().notify(&op.base());
        }
    }
}

impl Drop for Source {
    fn drop(&mut self) {
        unsafe {
            CloseHandle(self.event);
        }
    }
}

/// Handle onto the process-wide interrupt source. Cheap to construct
/// repeatedly; every instance shares the same underlying console-control
/// state.
#[derive(Clone)]
pub struct Interrupt {
    source: Arc<Source>,
}

impl Default for Interrupt {
    fn default() -> Self {
        Self::new()
    }
}

impl Interrupt {
    pub fn new() -> Self {
        Interrupt {
            source: Source::global().clone(),
        }
    }

    /// Blocks until any kind in `kinds` is observed or `timeout` elapses,
    /// returning the observed subset (empty on timeout).
    pub fn wait(
        &self,
        ctl: &Controller,
        kinds: InterruptKinds,
        timeout: Option<Duration>,
    ) -> InterruptKinds {
        let op = InterruptOperation::new(kinds);
        self.wait_async(ctl, &op);
        if ctl.wait_for(&op.base(), timeout) {
            op.received()
        } else {
            self.cancel(ctl, &op);
            InterruptKinds::empty()
        }
    }

    /// Associates `op` with `ctl`, installing the console control handler
    /// on first use and registering it to be satisfied on the next
    /// matching delivery.
    pub fn wait_async(&self, ctl: &Controller, op: &InterruptOperation) {
        op.set_controller(ctl.clone());
        self.source.arm(op.requested());
        self.source.ensure_subscribed(ctl);
        self.source.waiters.lock().unwrap().push(op.clone());
    }

    /// Removes `op` from the waiter list and from `ctl`'s completed-queue.
    pub fn cancel(&self, ctl: &Controller, op: &InterruptOperation) {
        let id = op.identity();
        self.source
            .waiters
            .lock()
            .unwrap()
            .retain(|o| o.identity() != id);
        ctl.revert_post(&op.base());
    }

    pub fn name(&self) -> String {
        "interrupt".into()
    }
}
