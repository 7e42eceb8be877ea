//! Non-blocking Windows socket transport.
//!
//! Grounded on the same queue discipline as [`super::unix::FdTransport`],
//! adapted to Winsock: `WSAEventSelect` associates one auto-reset event
//! with the socket for `FD_READ | FD_WRITE | FD_CLOSE` (which also flips
//! the socket into non-blocking mode, per the Winsock contract) and that
//! event is what gets registered with the [`crate::backend`]'s
//! `WaitForMultipleObjects` wait set. A single `WSAEnumNetworkEvents` call
//! drains whichever of read/write actually fired, since Winsock reports
//! both in one shot and clears them together.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, Weak};

use windows_sys::Win32::Networking::WinSock::{
    closesocket, recv, send, shutdown, WSACloseEvent, WSACreateEvent, WSAEnumNetworkEvents,
    WSAEventSelect, WSAGetLastError, FD_CLOSE, FD_READ, FD_WRITE, SD_SEND, SOCKET, SOCKET_ERROR,
    WSAEWOULDBLOCK, WSANETWORKEVENTS,
};
use windows_sys::Win32::Foundation::HANDLE;

use crate::backend::{Direction, RawTarget, ReadinessHandler};
use crate::comm::CommunicationObject;
use crate::controller::Controller;
use crate::operation::{Operation, OperationId, ReceiveOperation, SendOperation, SubscriptionId};

struct FdState {
    self_weak: Weak<FdTransport>,
    send_queue: VecDeque<SendOperation>,
    receive_queue: VecDeque<ReceiveOperation>,
    read_sub: Option<(Controller, SubscriptionId)>,
    write_sub: Option<(Controller, SubscriptionId)>,
}

/// A non-blocking Winsock socket, usable as a [`CommunicationObject`].
pub struct FdTransport {
    socket: SOCKET,
    event: HANDLE,
    name: String,
    state: Mutex<FdState>,
}

unsafe impl Send for FdTransport {}
unsafe impl Sync for FdTransport {}

struct DispatchHandler(Arc<FdTransport>);
impl ReadinessHandler for DispatchHandler {
    fn handle_read_ready(&self) -> bool {
        self.0.dispatch();
        self.0.state.lock().unwrap().receive_queue.is_empty()
    }
    fn handle_write_ready(&self) -> bool {
        self.0.dispatch();
        self.0.state.lock().unwrap().send_queue.is_empty()
    }
}

impl FdTransport {
    /// Takes ownership of `socket`, arranging for it to be closed on drop.
    /// `socket` is switched to non-blocking, event-driven mode.
    pub fn new(socket: SOCKET, name: impl Into<String>) -> io::Result<Arc<Self>> {
        let event = unsafe { WSACreateEvent() };
        if event == 0 {
            return Err(io::Error::last_os_error());
        }
        let name = name.into();
        Ok(Arc::new_cyclic(|weak| FdTransport {
            socket,
            event,
            name,
            state: Mutex::new(FdState {
                self_weak: weak.clone(),
                send_queue: VecDeque::new(),
                receive_queue: VecDeque::new(),
                read_sub: None,
                write_sub: None,
            }),
        }))
    }

    pub fn raw_socket(&self) -> SOCKET {
        self.socket
    }

    /// Half-closes the send side, leaving the receive side open.
    pub fn close_send(&self) -> io::Result<()> {
        if unsafe { shutdown(self.socket, SD_SEND) } == SOCKET_ERROR {
            let err = io::Error::last_os_error();
            log::warn!("{}: close_send failed: {}", self.name, err);
            return Err(err);
        }
        Ok(())
    }

    /// Re-arms `WSAEventSelect` for whichever directions currently have a
    /// non-empty queue. Must be called with `state` already reflecting the
    /// updated queues.
    fn rearm(&self, state: &FdState) {
        let mut mask = FD_CLOSE;
        if !state.receive_queue.is_empty() {
            mask |= FD_READ;
        }
        if !state.send_queue.is_empty() {
            mask |= FD_WRITE;
        }
        unsafe {
            WSAEventSelect(self.socket, self.event, mask);
        }
    }

    fn dispatch(self: &Arc<Self>) {
        let mut events: WSANETWORKEVENTS = unsafe { std::mem::zeroed() };
        let rc = unsafe { WSAEnumNetworkEvents(self.socket, self.event, &mut events) };
        if rc == SOCKET_ERROR {
            log::warn!("{}: WSAEnumNetworkEvents failed: {}", self.name, unsafe {
                WSAGetLastError()
            });
            return;
        }
        let flags = events.lNetworkEvents as u32;
        let mut read_completed = None;
        let mut write_completed = None;

        if flags & (FD_READ | FD_CLOSE) != 0 {
            read_completed = self.service_read();
        }
        if flags & FD_WRITE != 0 {
            write_completed = self.service_write();
        }
        if let Some(op) = read_completed {
            op.notifier().notify(&op.base());
        }
        if let Some(op) = write_completed {
            op.notifier().notify(&op.base());
        }

        let mut state = self.state.lock().unwrap();
        if state.receive_queue.is_empty() {
            if let Some((ctl, id)) = state.read_sub.take() {
                drop(state);
                ctl.remove_subscriber(id);
                state = self.state.lock().unwrap();
            }
        }
        if state.send_queue.is_empty() {
            if let Some((ctl, id)) = state.write_sub.take() {
                drop(state);
                ctl.remove_subscriber(id);
                state = self.state.lock().unwrap();
            }
        }
        self.rearm(&state);
    }

    fn service_write(&self) -> Option<SendOperation> {
        let mut state = self.state.lock().unwrap();
        let op = state.send_queue.front()?.clone();
        let unsent = op.unsent_bytes();
        let n = unsafe { send(self.socket, unsent.as_ptr(), unsent.len() as i32, 0) };
        if n == SOCKET_ERROR {
            let code = unsafe { WSAGetLastError() };
            if code == WSAEWOULDBLOCK {
                return None;
            }
            log::warn!("{}: send error: {}", self.name, code);
            state.send_queue.pop_front();
            return Some(op);
        }
        op.add_sent_bytes(n as usize);
        state.send_queue.pop_front();
        Some(op)
    }

    fn service_read(&self) -> Option<ReceiveOperation> {
        let mut state = self.state.lock().unwrap();
        let op = state.receive_queue.front()?.clone();
        let mut buf = vec![0u8; op.unreceived_len()];
        let n = unsafe { recv(self.socket, buf.as_mut_ptr(), buf.len() as i32, 0) };
        if n == SOCKET_ERROR {
            let code = unsafe { WSAGetLastError() };
            if code == WSAEWOULDBLOCK {
                return None;
            }
            log::warn!("{}: recv error: {}", self.name, code);
            state.receive_queue.pop_front();
            return Some(op);
        }
        if n > 0 {
            op.fill_from(&buf[..n as usize]);
        }
        // n == 0: connection lost; surfaced the same way as Unix's `read`
        // returning 0, so `full_receive` tells it apart from a timeout.
        state.receive_queue.pop_front();
        Some(op)
    }

    fn remove_by_identity(&self, id: OperationId) -> bool {
        let mut state = self.state.lock().unwrap();
        let before_send = state.send_queue.len();
        state.send_queue.retain(|op| op.identity() != id);
        let removed_send = state.send_queue.len() != before_send;

        let before_recv = state.receive_queue.len();
        state.receive_queue.retain(|op| op.identity() != id);
        let removed_recv = state.receive_queue.len() != before_recv;

        if state.send_queue.is_empty() {
            if let Some((ctl, sub_id)) = state.write_sub.take() {
                drop(state);
                ctl.remove_subscriber(sub_id);
                state = self.state.lock().unwrap();
            }
        }
        if state.receive_queue.is_empty() {
            if let Some((ctl, sub_id)) = state.read_sub.take() {
                drop(state);
                ctl.remove_subscriber(sub_id);
            }
        }
        removed_send || removed_recv
    }
}

impl Drop for FdTransport {
    fn drop(&mut self) {
        unsafe {
            closesocket(self.socket);
            WSACloseEvent(self.event);
        }
    }
}

impl CommunicationObject for FdTransport {
    fn send_async(&self, ctl: &Controller, op: &SendOperation) {
        op.set_controller(ctl.clone());
        let mut state = self.state.lock().unwrap();
        let was_empty = state.send_queue.is_empty();
        state.send_queue.push_back(op.clone());
        if was_empty {
            let self_arc = state
                .self_weak
                .upgrade()
                .expect("transport dropped while a send is still pending on it");
            let id = ctl.add_subscriber(
                RawTarget::Handle(self.event as _),
                Direction::Write,
                Arc::new(DispatchHandler(self_arc)),
            );
            state.write_sub = Some((ctl.clone(), id));
            self.rearm(&state);
        }
    }

    fn receive_async(&self, ctl: &Controller, op: &ReceiveOperation) {
        op.set_controller(ctl.clone());
        let mut state = self.state.lock().unwrap();
        let was_empty = state.receive_queue.is_empty();
        state.receive_queue.push_back(op.clone());
        if was_empty {
            let self_arc = state
                .self_weak
                .upgrade()
                .expect("transport dropped while a receive is still pending on it");
            let id = ctl.add_subscriber(
                RawTarget::Handle(self.event as _),
                Direction::Read,
                Arc::new(DispatchHandler(self_arc)),
            );
            state.read_sub = Some((ctl.clone(), id));
            self.rearm(&state);
        }
    }

    fn cancel(&self, ctl: &Controller, op: &Operation) {
        self.remove_by_identity(op.identity());
        ctl.revert_post(op);
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}
