//! Accept-queue machinery shared by [`super::tcp::TcpListener`] and
//! [`super::unix::UnixListener`].
//!
//! Plays the same "readiness produces a completion" role as
//! [`crate::fd_transport::FdTransport`]'s receive queue, except the
//! payload is a freshly accepted connection rather than bytes. The
//! distilled specification (§4.15, supplemented from `original_source`)
//! describes this as `net::Listener` "implementing `CommunicationObject`
//! with `receive_async` standing in for accept"; since `AcceptOperation`
//! is not a `ReceiveOperation`, that idea is realized here as a sibling
//! set of inherent methods (`accept_async`/`accept`/`cancel`) with the
//! same rhythm rather than a literal trait impl.

use std::collections::VecDeque;
use std::io;
use std::os::unix::io::RawFd;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use crate::backend::{Direction, RawTarget, ReadinessHandler};
use crate::controller::Controller;
use crate::operation::{AcceptOperation, Operation, OperationId, SubscriptionId};

struct ListenerState<T> {
    self_weak: Weak<Listener<T>>,
    pending: VecDeque<AcceptOperation<T>>,
    sub: Option<(Controller, SubscriptionId)>,
}

pub(crate) struct Listener<T> {
    fd: RawFd,
    name: String,
    accept_one: Box<dyn Fn(RawFd) -> io::Result<T> + Send + Sync>,
    state: Mutex<ListenerState<T>>,
}

struct AcceptHandler<T>(Arc<Listener<T>>);
impl<T: Send + Sync + 'static> ReadinessHandler for AcceptHandler<T> {
    fn handle_read_ready(&self) -> bool {
        self.0.on_accept_ready()
    }
}

impl<T: Send + Sync + 'static> Listener<T> {
    /// Takes ownership of the listening `fd`. `accept_one` performs one
    /// non-blocking `accept(2)` attempt and wraps the resulting
    /// descriptor into `T`; it must return `WouldBlock` rather than
    /// blocking.
    pub(crate) fn new(
        fd: RawFd,
        name: impl Into<String>,
        accept_one: impl Fn(RawFd) -> io::Result<T> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak| Listener {
            fd,
            name: name.into(),
            accept_one: Box::new(accept_one),
            state: Mutex::new(ListenerState {
                self_weak: weak.clone(),
                pending: VecDeque::new(),
                sub: None,
            }),
        })
    }

    pub(crate) fn raw_fd(&self) -> RawFd {
        self.fd
    }

    pub(crate) fn accept_async(self: &Arc<Self>, ctl: &Controller, op: &AcceptOperation<T>) {
        op.set_controller(ctl.clone());
        let mut state = self.state.lock().unwrap();
        let was_empty = state.pending.is_empty();
        state.pending.push_back(op.clone());
        if was_empty {
            let self_arc = state
                .self_weak
                .upgrade()
                .expect("listener dropped while an accept is still pending on it");
            let id = ctl.add_subscriber(
                RawTarget::Fd(self.fd),
                Direction::Read,
                Arc::new(AcceptHandler(self_arc)),
            );
            state.sub = Some((ctl.clone(), id));
        }
    }

    pub(crate) fn accept(
        self: &Arc<Self>,
        ctl: &Controller,
        op: &AcceptOperation<T>,
        timeout: Option<Duration>,
    ) -> bool {
        self.accept_async(ctl, op);
        if ctl.wait_for(&op.base(), timeout) {
            true
        } else {
            self.cancel(ctl, &op.base());
            false
        }
    }

    pub(crate) fn cancel(&self, ctl: &Controller, op: &Operation) {
        self.remove_by_identity(op.identity());
        ctl.revert_post(op);
    }

    pub(crate) fn name(&self) -> String {
        self.name.clone()
    }

    fn on_accept_ready(self: &Arc<Self>) -> bool {
        let completed = {
            let mut state = self.state.lock().unwrap();
            let op = match state.pending.front() {
                Some(op) => op.clone(),
                None => return true,
            };
            match (self.accept_one)(self.fd) {
                Ok(conn) => {
                    op.set_accepted(conn);
                    state.pending.pop_front();
                    Some(op)
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => return false,
                Err(err) => {
                    log::warn!("{}: accept error: {}", self.name, err);
                    return false;
                }
            }
        };
        if let Some(op) = completed {
            op.notifier().notify(&op.base());
        }
        let mut state = self.state.lock().unwrap();
        if state.pending.is_empty() {
            if let Some((ctl, id)) = state.sub.take() {
                drop(state);
                ctl.remove_subscriber(id);
            }
            true
        } else {
            false
        }
    }

    fn remove_by_identity(&self, id: OperationId) -> bool {
        let mut state = self.state.lock().unwrap();
        let before = state.pending.len();
        state.pending.retain(|op| op.identity() != id);
        let removed = state.pending.len() != before;
        if state.pending.is_empty() {
            if let Some((ctl, sub_id)) = state.sub.take() {
                drop(state);
                ctl.remove_subscriber(sub_id);
            }
        }
        removed
    }
}

impl<T> Drop for Listener<T> {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}
