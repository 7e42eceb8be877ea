//! `poll(2)`-based backend.
//!
//! Subscriptions are not persistently registered with the kernel; the
//! interest set is rebuilt from the current subscriber list on every call
//! to `wait`. This matches the source design, where the subscriber set
//! typically has only a handful of entries and changes between almost every
//! wait — a persistent `epoll` registration would buy nothing here.

use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{Backend, Direction, RawTarget, ReadinessHandler};
use crate::operation::SubscriptionId;

struct Subscriber {
    id: SubscriptionId,
    fd: RawFd,
    direction: Direction,
    handler: Arc<dyn ReadinessHandler>,
    cancelled: AtomicBool,
}

pub(crate) struct UnixBackend {
    mode: Mutex<super::Mode>,
    subscribers: Mutex<Vec<Arc<Subscriber>>>,
    wake_read: RawFd,
    wake_write: RawFd,
    sem_count: AtomicI32,
}

// Process-wide, install once: a broken pipe must surface as EPIPE on the
// write, never terminate the process.
fn ignore_sigpipe_once() {
    use std::sync::Once;
    static ONCE: Once = Once::new();
    ONCE.call_once(|| unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_IGN);
    });
}

impl UnixBackend {
    pub(crate) fn new() -> std::io::Result<Self> {
        ignore_sigpipe_once();
        let mut fds = [0i32; 2];
        if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
            return Err(std::io::Error::last_os_error());
        }
        for &fd in &fds {
            unsafe {
                let flags = libc::fcntl(fd, libc::F_GETFL);
                libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
                libc::fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC);
            }
        }
        Ok(UnixBackend {
            mode: Mutex::new(super::Mode::NotWaiting),
            subscribers: Mutex::new(Vec::new()),
            wake_read: fds[0],
            wake_write: fds[1],
            sem_count: AtomicI32::new(0),
        })
    }

    fn drain_wake_pipe(&self) {
        let mut buf = [0u8; 64];
        loop {
            let n = unsafe { libc::read(self.wake_read, buf.as_mut_ptr() as *mut _, buf.len()) };
            if n <= 0 {
                break;
            }
        }
    }
}

impl Drop for UnixBackend {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.wake_read);
            libc::close(self.wake_write);
        }
    }
}

impl Backend for UnixBackend {
    fn prepare(&self) {
        let has_subscribers = !self.subscribers.lock().unwrap().is_empty();
        let mut mode = self.mode.lock().unwrap();
        *mode = if has_subscribers {
            super::Mode::WaitingForDescriptor
        } else {
            super::Mode::WaitingForSemaphore
        };
    }

    fn finish(&self) {
        *self.mode.lock().unwrap() = super::Mode::NotWaiting;
    }

    fn wake(&self) {
        let mode = *self.mode.lock().unwrap();
        match mode {
            super::Mode::NotWaiting => {}
            super::Mode::WaitingForSemaphore => {
                self.sem_count.fetch_add(1, Ordering::SeqCst);
                // The semaphore has no native OS handle here; a byte on the
                // wake pipe serves double duty as both semaphore-post and
                // descriptor-wake so `wait` only has one thing to poll.
                let _ = unsafe { libc::write(self.wake_write, b"\0".as_ptr() as *const _, 1) };
            }
            super::Mode::WaitingForDescriptor => {
                let _ = unsafe { libc::write(self.wake_write, b"\0".as_ptr() as *const _, 1) };
            }
        }
    }

    fn wait(&self, timeout: Option<Duration>) {
        let mode = *self.mode.lock().unwrap();
        let millis = match timeout {
            None => -1,
            Some(d) => d.as_millis().min(i32::MAX as u128) as i32,
        };

        if mode == super::Mode::WaitingForSemaphore {
            // Cheap path: still just poll the wake pipe, there is nothing
            // else to multiplex.
            let mut pfd = [libc::pollfd {
                fd: self.wake_read,
                events: libc::POLLIN,
                revents: 0,
            }];
            let _ = unsafe { libc::poll(pfd.as_mut_ptr(), 1, millis) };
            if pfd[0].revents & libc::POLLIN != 0 {
                self.drain_wake_pipe();
            }
            self.sem_count.store(0, Ordering::SeqCst);
            return;
        }

        // Expensive path: build the poll set from the current subscribers.
        // The snapshot carries each subscriber's own `Arc` (not just its fd)
        // so that dispatch below matches readiness back to the exact
        // subscription it was polled for, even if another thread adds or
        // removes subscriptions while this `poll(2)` call blocks — matching
        // by position against a freshly re-locked list would misalign once
        // the live list's length or order had changed underneath us.
        let snapshot: Vec<Arc<Subscriber>> = {
            let subs = self.subscribers.lock().unwrap();
            subs.iter()
                .filter(|s| !s.cancelled.load(Ordering::Acquire))
                .cloned()
                .collect()
        };

        let mut pollfds = Vec::with_capacity(snapshot.len() + 1);
        pollfds.push(libc::pollfd {
            fd: self.wake_read,
            events: libc::POLLIN,
            revents: 0,
        });
        for sub in &snapshot {
            pollfds.push(libc::pollfd {
                fd: sub.fd,
                events: match sub.direction {
                    Direction::Read => libc::POLLIN,
                    Direction::Write => libc::POLLOUT,
                },
                revents: 0,
            });
        }

        let n = unsafe { libc::poll(pollfds.as_mut_ptr(), pollfds.len() as libc::nfds_t, millis) };
        if n <= 0 {
            return;
        }

        if pollfds[0].revents != 0 {
            self.drain_wake_pipe();
        }

        // Dispatch readiness. Handlers may synchronously cancel sibling
        // subscriptions (including ones later in this same iteration); we
        // must not mutate the subscriber Vec while iterating it, so
        // cancellation during dispatch only flips `cancelled` and the
        // actual removal is swept afterwards.
        let mut done_ids = Vec::new();
        for (pfd, sub) in pollfds[1..].iter().zip(snapshot.iter()) {
            if sub.cancelled.load(Ordering::Acquire) {
                continue;
            }
            let ready_read = pfd.revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR) != 0;
            let ready_write = pfd.revents & (libc::POLLOUT | libc::POLLERR) != 0;
            let done = match sub.direction {
                Direction::Read if ready_read => sub.handler.handle_read_ready(),
                Direction::Write if ready_write => sub.handler.handle_write_ready(),
                _ => false,
            };
            if done {
                done_ids.push(sub.id);
            }
        }

        if !done_ids.is_empty() {
            let mut subs = self.subscribers.lock().unwrap();
            subs.retain(|s| !done_ids.contains(&s.id));
        }
        self.sweep_cancelled();
    }

    fn add_subscriber(
        &self,
        raw: RawTarget,
        direction: Direction,
        handler: Arc<dyn ReadinessHandler>,
    ) -> SubscriptionId {
        let RawTarget::Fd(fd) = raw;
        let id = SubscriptionId::next();
        self.subscribers.lock().unwrap().push(Arc::new(Subscriber {
            id,
            fd,
            direction,
            handler,
            cancelled: AtomicBool::new(false),
        }));
        log::trace!("backend: added subscriber {:?} fd={} dir={:?}", id, fd, direction);
        id
    }

    fn remove_subscriber(&self, id: SubscriptionId) {
        let subs = self.subscribers.lock().unwrap();
        if let Some(s) = subs.iter().find(|s| s.id == id) {
            s.cancelled.store(true, Ordering::Release);
        }
        drop(subs);
        self.sweep_cancelled();
    }
}

impl UnixBackend {
    fn sweep_cancelled(&self) {
        let mut subs = self.subscribers.lock().unwrap();
        subs.retain(|s| !s.cancelled.load(Ordering::Acquire));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semaphore_wake_returns_promptly() {
        let backend = Arc::new(UnixBackend::new().unwrap());
        let b2 = backend.clone();
        backend.prepare();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            b2.wake();
        });
        backend.wait(Some(Duration::from_secs(5)));
        handle.join().unwrap();
        backend.finish();
    }

    #[test]
    fn wait_times_out_without_wake() {
        let backend = UnixBackend::new().unwrap();
        backend.prepare();
        let start = std::time::Instant::now();
        backend.wait(Some(Duration::from_millis(30)));
        assert!(start.elapsed() >= Duration::from_millis(20));
        backend.finish();
    }
}
