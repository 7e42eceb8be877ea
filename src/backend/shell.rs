//! Fallback backend used when the `os-poll` feature is disabled.
//!
//! A [`crate::controller::Controller`] can still be constructed without
//! `os-poll` — it can receive and dispatch posted operations — but nothing
//! in the crate can register OS readiness with it. Registration is a
//! programming error in that configuration, not a runtime condition, so it
//! panics rather than returning a `Result`.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use super::{Backend, Direction, RawTarget, ReadinessHandler};
use crate::operation::SubscriptionId;

pub(crate) struct ShellBackend {
    posted: Mutex<i32>,
    condvar: Condvar,
    waiters: AtomicI32,
}

impl ShellBackend {
    pub(crate) fn new() -> std::io::Result<Self> {
        Ok(ShellBackend {
            posted: Mutex::new(0),
            condvar: Condvar::new(),
            waiters: AtomicI32::new(0),
        })
    }
}

impl Backend for ShellBackend {
    fn prepare(&self) {
        self.waiters.fetch_add(1, Ordering::SeqCst);
    }

    fn finish(&self) {
        self.waiters.fetch_sub(1, Ordering::SeqCst);
    }

    fn wake(&self) {
        let mut posted = self.posted.lock().unwrap();
        *posted += 1;
        self.condvar.notify_all();
    }

    fn wait(&self, timeout: Option<Duration>) {
        let mut posted = self.posted.lock().unwrap();
        if *posted > 0 {
            *posted -= 1;
            return;
        }
        let result = match timeout {
            None => {
                posted = self.condvar.wait(posted).unwrap();
                Some(posted)
            }
            Some(d) => {
                let (guard, timed_out) = self.condvar.wait_timeout(posted, d).unwrap();
                if timed_out.timed_out() {
                    None
                } else {
                    Some(guard)
                }
            }
        };
        if let Some(mut guard) = result {
            if *guard > 0 {
                *guard -= 1;
            }
        }
    }

    fn add_subscriber(
        &self,
        _raw: RawTarget,
        _direction: Direction,
        _handler: Arc<dyn ReadinessHandler>,
    ) -> SubscriptionId {
        panic!(
            "readiness registration requires the `os-poll` feature; \
             this build only supports posted completions"
        );
    }

    fn remove_subscriber(&self, _id: SubscriptionId) {
        panic!(
            "readiness registration requires the `os-poll` feature; \
             this build only supports posted completions"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wake_then_wait_returns_immediately() {
        let backend = ShellBackend::new().unwrap();
        backend.prepare();
        backend.wake();
        let start = std::time::Instant::now();
        backend.wait(Some(Duration::from_secs(5)));
        assert!(start.elapsed() < Duration::from_millis(500));
        backend.finish();
    }

    #[test]
    fn wait_times_out_without_wake() {
        let backend = ShellBackend::new().unwrap();
        backend.prepare();
        let start = std::time::Instant::now();
        backend.wait(Some(Duration::from_millis(30)));
        assert!(start.elapsed() >= Duration::from_millis(20));
        backend.finish();
    }
}
