//! POSIX signal-based interrupt delivery.

use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicI32, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use crate::backend::{Direction, RawTarget, ReadinessHandler};
use crate::controller::Controller;
use crate::operation::{InterruptKinds, InterruptOperation};

static PENDING_KINDS: AtomicU8 = AtomicU8::new(0);
static WAKE_WRITE_FD: AtomicI32 = AtomicI32::new(-1);

extern "C" fn signal_handler(sig: libc::c_int) {
    let bit = match sig {
        libc::SIGINT => InterruptKinds::BREAK,
        libc::SIGHUP => InterruptKinds::HANGUP,
        libc::SIGTERM => InterruptKinds::TERMINATE,
        _ => return,
    };
    // Async-signal-safe: only atomics and a raw `write(2)`.
    PENDING_KINDS.fetch_or(bit.bits(), Ordering::SeqCst);
    let fd = WAKE_WRITE_FD.load(Ordering::SeqCst);
    if fd >= 0 {
        unsafe {
            libc::write(fd, [0u8].as_ptr() as *const _, 1);
        }
    }
}

fn signal_for(kind: InterruptKinds) -> Option<libc::c_int> {
    if kind.contains(InterruptKinds::BREAK) {
        Some(libc::SIGINT)
    } else if kind.contains(InterruptKinds::HANGUP) {
        Some(libc::SIGHUP)
    } else if kind.contains(InterruptKinds::TERMINATE) {
        Some(libc::SIGTERM)
    } else {
        None
    }
}

fn arm_signal(sig: libc::c_int) {
    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = signal_handler as usize;
        action.sa_flags = libc::SA_RESTART;
        libc::sigemptyset(&mut action.sa_mask);
        libc::sigaction(sig, &action, std::ptr::null_mut());
    }
}

struct Source {
    read_fd: RawFd,
    waiters: Mutex<Vec<InterruptOperation>>,
    subscribed_controllers: Mutex<Vec<Controller>>,
    armed: Mutex<InterruptKinds>,
}

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
            let mut fds = [0i32; 2];
            if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
                panic!(
                    "failed to create interrupt self-pipe: {}",
                    std::io::Error::last_os_error()
                );
            }
            for &fd in &fds {
                unsafe {
                    let flags = libc::fcntl(fd, libc::F_GETFL);
                    libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
                    libc::fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC);
                }
            }
            WAKE_WRITE_FD.store(fds[1], Ordering::SeqCst);
            Arc::new(Source {
                read_fd: fds[0],
                waiters: Mutex::new(Vec::new()),
                subscribed_controllers: Mutex::new(Vec::new()),
                armed: Mutex::new(InterruptKinds::empty()),
            })
        })
    }

    fn arm(&self, kinds: InterruptKinds) {
        let mut armed = self.armed.lock().unwrap();
        for kind in [
            InterruptKinds::BREAK,
            InterruptKinds::HANGUP,
            InterruptKinds::TERMINATE,
        ] {
            if kinds.intersects(kind) && !armed.contains(kind) {
                if let Some(sig) = signal_for(kind) {
                    arm_signal(sig);
                    log::debug!("interrupt: armed signal {} for {:?}", sig, kind);
                }
                *armed = armed.union(kind);
            }
        }
    }

    fn ensure_subscribed(self: &Arc<Self>, ctl: &Controller) {
        let mut subs = self.subscribed_controllers.lock().unwrap();
        if subs.iter().any(|c| c == ctl) {
            return;
        }
        ctl.add_subscriber(
            RawTarget::Fd(self.read_fd),
            Direction::Read,
            Arc::new(DispatchHandler(self.clone())),
        );
        subs.push(ctl.clone());
    }

    fn dispatch(&self) {
        let mut buf = [0u8; 64];
        loop {
            let n = unsafe { libc::read(self.read_fd, buf.as_mut_ptr() as *mut _, buf.len()) };
            if n <= 0 {
                break;
            }
        }
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

/// Handle onto the process-wide interrupt source. Cheap to construct
/// repeatedly; every instance shares the same underlying signal state.
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

    /// Associates `op` with `ctl`, arming any signal kinds it requests that
    /// are not already armed, and registers it to be satisfied on the next
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raising_sigint_satisfies_a_pending_wait() {
        let ctl = Controller::new().unwrap();
        let interrupt = Interrupt::new();
        let op = InterruptOperation::new(InterruptKinds::BREAK);
        interrupt.wait_async(&ctl, &op);

        unsafe {
            libc::raise(libc::SIGINT);
        }

        assert!(ctl.wait_for(&op.base(), Some(Duration::from_secs(2))));
        assert!(op.received().contains(InterruptKinds::BREAK));
    }

    #[test]
    fn cancel_removes_a_pending_wait() {
        let ctl = Controller::new().unwrap();
        let interrupt = Interrupt::new();
        let op = InterruptOperation::new(InterruptKinds::HANGUP);
        interrupt.wait_async(&ctl, &op);
        interrupt.cancel(&ctl, &op);

        unsafe {
            libc::raise(libc::SIGHUP);
        }
        assert!(!ctl.wait_for(&op.base(), Some(Duration::from_millis(100))));
    }
}
