//! A single background thread amortizing OS timer cost across every
//! outstanding [`Timer`].
//!
//! Grounded on `afl::async::Timer`/`Timer::Manager`: a singleton manager
//! thread holds a weak list of active timers, sleeps until the soonest one
//! is due, and fires completions through the normal [`crate::notifier::Notifier`]
//! path so a timer firing is indistinguishable from any other completion.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, OnceLock, Weak};
use std::time::{Duration, Instant};

use crate::controller::Controller;
use crate::operation::Operation;

struct TimerState {
    interval: Duration,
    cyclic: bool,
    active: bool,
    last_check: Instant,
    pending_signals: u32,
    waiters: VecDeque<Operation>,
}

struct TimerInner {
    state: Mutex<TimerState>,
}

impl TimerInner {
    /// Advances this timer to `now`. Called by the manager under no lock of
    /// its own other than the timer's — the manager's own mutex must
    /// already have been released before this runs, so a `Notifier` firing
    /// from here is free to re-enter anything except the manager itself.
    ///
    /// Returns the duration until this timer next needs re-evaluating, or
    /// `None` if it is inactive.
    fn update(&self, now: Instant) -> Option<Duration> {
        let mut s = self.state.lock().unwrap();
        if !s.active {
            return None;
        }
        let mut elapsed = now.saturating_duration_since(s.last_check);
        if elapsed >= s.interval {
            if let Some(waiter) = s.waiters.pop_front() {
                let notifier = waiter.notifier();
                drop(s);
                notifier.notify(&waiter);
                s = self.state.lock().unwrap();
            } else {
                s.pending_signals += 1;
            }
            s.last_check += s.interval;
            if !s.cyclic {
                s.active = false;
                return None;
            }
            elapsed = now.saturating_duration_since(s.last_check);
            if elapsed >= s.interval {
                // Firing again would be immediate (the consumer is behind);
                // throttle to one millisecond ahead instead of busy-looping
                // the manager thread.
                s.last_check = now - s.interval + Duration::from_millis(1);
                return Some(Duration::from_millis(1));
            }
        }
        Some(s.interval - elapsed)
    }
}

struct ManagerState {
    timers: Vec<Weak<TimerInner>>,
}

struct Manager {
    state: Mutex<ManagerState>,
    condvar: Condvar,
}

impl Manager {
    fn global() -> &'static Arc<Manager> {
        static MANAGER: OnceLock<Arc<Manager>> = OnceLock::new();
        MANAGER.get_or_init(|| {
            let manager = Arc::new(Manager {
                state: Mutex::new(ManagerState { timers: Vec::new() }),
                condvar: Condvar::new(),
            });
            let background = manager.clone();
            std::thread::Builder::new()
                .name("aio-core-timer".into())
                .spawn(move || background.run())
                .expect("failed to spawn timer manager thread");
            manager
        })
    }

    fn register(&self, timer: &Arc<TimerInner>) {
        let mut state = self.state.lock().unwrap();
        let already = state
            .timers
            .iter()
            .any(|w| w.upgrade().is_some_and(|t| Arc::ptr_eq(&t, timer)));
        if !already {
            state.timers.push(Arc::downgrade(timer));
        }
        drop(state);
        self.condvar.notify_all();
        log::debug!("timer manager: registered timer, waking for re-evaluation");
    }

    fn run(&self) {
        loop {
            let mut guard = self.state.lock().unwrap();
            guard.timers.retain(|w| w.upgrade().is_some());
            let now = Instant::now();
            let mut min_wait = Duration::from_secs(3600);
            for weak in guard.timers.iter() {
                if let Some(inner) = weak.upgrade() {
                    // `inner.update` only ever touches `inner`'s own mutex
                    // and the Notifier/Controller path — never this
                    // manager's mutex, which we still hold here.
                    if let Some(remaining) = inner.update(now) {
                        min_wait = min_wait.min(remaining);
                    }
                }
            }
            let (_guard, _timed_out) = self.condvar.wait_timeout(guard, min_wait).unwrap();
        }
    }
}

/// A cyclic or one-shot interval timer.
///
/// Firings are delivered through `wait`/`wait_async` exactly like any other
/// completion; internally a single process-wide manager thread tracks every
/// live `Timer`.
pub struct Timer {
    inner: Arc<TimerInner>,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    pub fn new() -> Self {
        Timer {
            inner: Arc::new(TimerInner {
                state: Mutex::new(TimerState {
                    interval: Duration::ZERO,
                    cyclic: false,
                    active: false,
                    last_check: Instant::now(),
                    pending_signals: 0,
                    waiters: VecDeque::new(),
                }),
            }),
        }
    }

    /// Arms the timer: it will fire every `interval` if `cyclic`, or once,
    /// `interval` from now.
    pub fn start(&self, interval: Duration, cyclic: bool) {
        {
            let mut s = self.inner.state.lock().unwrap();
            s.interval = interval;
            s.cyclic = cyclic;
            s.active = true;
            s.last_check = Instant::now();
        }
        Manager::global().register(&self.inner);
    }

    /// Disarms the timer. Pending signals already accrued are left intact
    /// for a subsequent `wait`/`wait_async` to consume.
    pub fn stop(&self) {
        let mut s = self.inner.state.lock().unwrap();
        s.active = false;
        log::debug!("timer stopped");
    }

    /// Blocks until the timer fires or `timeout` elapses.
    pub fn wait(&self, ctl: &Controller, timeout: Option<Duration>) -> bool {
        let op = Operation::new();
        self.wait_async(ctl, &op);
        if ctl.wait_for(&op, timeout) {
            true
        } else {
            self.cancel(ctl, &op);
            false
        }
    }

    /// Associates `op` with `ctl` and arranges for it to complete on the
    /// next firing (or immediately, if a firing is already pending).
    pub fn wait_async(&self, ctl: &Controller, op: &Operation) {
        op.set_controller(ctl.clone());
        let mut s = self.inner.state.lock().unwrap();
        if s.pending_signals > 0 {
            s.pending_signals -= 1;
            drop(s);
            op.notifier().notify_direct(op);
        } else {
            s.waiters.push_back(op.clone());
        }
    }

    /// Removes `op` from the waiter list and from `ctl`'s completed-queue.
    pub fn cancel(&self, ctl: &Controller, op: &Operation) {
        let mut s = self.inner.state.lock().unwrap();
        let id = op.identity();
        s.waiters.retain(|o| o.identity() != id);
        drop(s);
        ctl.revert_post(op);
    }

    pub fn name(&self) -> String {
        "timer".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_shot_timer_fires_once() {
        let ctl = Controller::new().unwrap();
        let timer = Timer::new();
        timer.start(Duration::from_millis(30), false);
        assert!(timer.wait(&ctl, Some(Duration::from_secs(2))));
        assert!(!timer.wait(&ctl, Some(Duration::from_millis(80))));
    }

    #[test]
    fn cyclic_timer_fires_repeatedly() {
        let ctl = Controller::new().unwrap();
        let timer = Timer::new();
        timer.start(Duration::from_millis(40), true);
        for _ in 0..3 {
            assert!(timer.wait(&ctl, Some(Duration::from_secs(2))));
        }
        timer.stop();
    }

    #[test]
    fn stopped_timer_never_fires() {
        let ctl = Controller::new().unwrap();
        let timer = Timer::new();
        timer.start(Duration::from_millis(20), false);
        timer.stop();
        assert!(!timer.wait(&ctl, Some(Duration::from_millis(80))));
    }
}
