//! Per-thread event demultiplexer.
//!
//! A `Controller` is the rendezvous point between operations completing
//! (possibly on other threads, possibly synchronously on the calling thread)
//! and the thread that wants to learn about it. It owns one platform
//! [`crate::backend::Backend`] and a FIFO of completed operations.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::backend::{Backend, Direction, PlatformBackend, RawTarget, ReadinessHandler};
use crate::operation::{Operation, SubscriptionId};

struct Inner {
    completed: Mutex<VecDeque<Operation>>,
    backend: PlatformBackend,
}

/// A per-thread (or shared, if you like) event loop core.
///
/// Cloning a `Controller` shares the same underlying queue and backend —
/// clones are how an [`Operation`] refers back to "its" controller without
/// borrowing.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<Inner>,
}

impl PartialEq for Controller {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
impl Eq for Controller {}

impl Controller {
    /// Creates a new controller with a fresh platform backend.
    pub fn new() -> std::io::Result<Self> {
        Ok(Controller {
            inner: Arc::new(Inner {
                completed: Mutex::new(VecDeque::new()),
                backend: PlatformBackend::new()?,
            }),
        })
    }

    /// Enqueues `op` as completed and wakes any thread blocked in `wait`.
    ///
    /// Safe to call from any thread; this is the path a `Notifier::notify`
    /// takes for a completion discovered on a foreign thread.
    pub fn post(&self, op: &Operation) {
        self.inner.completed.lock().unwrap().push_back(op.clone());
        self.inner.backend.wake();
    }

    /// Enqueues `op` as completed without waking the backend.
    ///
    /// Only correct when called from the controller's own owning thread —
    /// typically a rendezvous (e.g. [`crate::message_exchange::MessageExchange`])
    /// that discovered its peer already waiting and can skip the cross-thread
    /// wake because the caller is about to check the queue itself.
    pub fn post_direct(&self, op: &Operation) {
        self.inner.completed.lock().unwrap().push_back(op.clone());
    }

    /// Withdraws a previously-posted but not-yet-delivered completion.
    ///
    /// Used when cancellation races with completion: the operation was
    /// posted, but the canceller wants to ensure the caller never observes
    /// it as completed. Returns whether an entry was actually removed.
    pub fn revert_post(&self, op: &Operation) -> bool {
        let mut completed = self.inner.completed.lock().unwrap();
        let before = completed.len();
        completed.retain(|o| o.identity() != op.identity());
        completed.len() != before
    }

    /// Blocks until any operation completes or `timeout` elapses, returning
    /// the first completed operation found (FIFO), or `None` on timeout.
    /// `None` for `timeout` blocks indefinitely.
    pub fn wait(&self, timeout: Option<Duration>) -> Option<Operation> {
        self.wait_matching(timeout, |_| true)
    }

    /// Blocks until `target` specifically completes or `timeout` elapses.
    /// Other completions that arrive in the meantime remain queued for a
    /// later `wait`/`wait_for` call.
    pub fn wait_for(&self, target: &Operation, timeout: Option<Duration>) -> bool {
        let id = target.identity();
        self.wait_matching(timeout, |op| op.identity() == id).is_some()
    }

    fn wait_matching(
        &self,
        timeout: Option<Duration>,
        mut matches: impl FnMut(&Operation) -> bool,
    ) -> Option<Operation> {
        let deadline = timeout.map(|d| Instant::now() + d);

        loop {
            {
                let mut completed = self.inner.completed.lock().unwrap();
                if let Some(pos) = completed.iter().position(|op| matches(op)) {
                    return completed.remove(pos);
                }
            }

            let remaining = match deadline {
                None => None,
                Some(dl) => {
                    let now = Instant::now();
                    if now >= dl {
                        return None;
                    }
                    Some(dl - now)
                }
            };

            self.inner.backend.prepare();
            self.inner.backend.wait(remaining);
            self.inner.backend.finish();
        }
    }

    /// Registers OS-level readiness interest with the backend. Requires the
    /// `os-poll` feature; panics without it (see
    /// [`crate::backend::shell::ShellBackend`] for the fallback contract).
    pub(crate) fn add_subscriber(
        &self,
        raw: RawTarget,
        direction: Direction,
        handler: Arc<dyn ReadinessHandler>,
    ) -> SubscriptionId {
        self.inner.backend.add_subscriber(raw, direction, handler)
    }

    /// Withdraws a readiness subscription registered via `add_subscriber`.
    pub(crate) fn remove_subscriber(&self, id: SubscriptionId) {
        self.inner.backend.remove_subscriber(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_times_out_with_no_posted_operation() {
        let ctl = Controller::new().unwrap();
        let start = Instant::now();
        let result = ctl.wait(Some(Duration::from_millis(30)));
        assert!(result.is_none());
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn post_delivers_fifo() {
        let ctl = Controller::new().unwrap();
        let a = Operation::new();
        let b = Operation::new();
        ctl.post(&a);
        ctl.post(&b);
        let first = ctl.wait(Some(Duration::from_millis(100))).unwrap();
        let second = ctl.wait(Some(Duration::from_millis(100))).unwrap();
        assert_eq!(first, a);
        assert_eq!(second, b);
    }

    #[test]
    fn post_from_other_thread_wakes_waiter() {
        let ctl = Controller::new().unwrap();
        let op = Operation::new();
        let ctl2 = ctl.clone();
        let op2 = op.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            ctl2.post(&op2);
        });
        let result = ctl.wait(Some(Duration::from_secs(5)));
        assert_eq!(result, Some(op));
        handle.join().unwrap();
    }

    #[test]
    fn wait_for_ignores_unrelated_completions() {
        let ctl = Controller::new().unwrap();
        let other = Operation::new();
        let target = Operation::new();
        ctl.post(&other);
        ctl.post(&target);
        assert!(ctl.wait_for(&target, Some(Duration::from_millis(100))));
        // `other` is still queued for a later general wait().
        let remaining = ctl.wait(Some(Duration::from_millis(100)));
        assert_eq!(remaining, Some(other));
    }

    #[test]
    fn revert_post_withdraws_unseen_completion() {
        let ctl = Controller::new().unwrap();
        let op = Operation::new();
        ctl.post(&op);
        assert!(ctl.revert_post(&op));
        let result = ctl.wait(Some(Duration::from_millis(30)));
        assert!(result.is_none());
    }
}
