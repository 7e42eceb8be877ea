//! Non-blocking TCP, built on [`crate::fd_transport::FdTransport`].

use std::io;
use std::net::{SocketAddr, TcpListener as StdTcpListener, TcpStream as StdTcpStream};
use std::sync::Arc;
use std::time::Duration;

use crate::comm::CommunicationObject;
use crate::controller::Controller;
use crate::fd_transport::FdTransport;
use crate::operation::{AcceptOperation, Operation, ReceiveOperation, SendOperation};

#[cfg(unix)]
use std::os::unix::io::{FromRawFd, IntoRawFd, RawFd};
#[cfg(unix)]
use super::listener::Listener;

#[cfg(windows)]
use std::collections::VecDeque;
#[cfg(windows)]
use std::os::windows::io::{FromRawSocket, IntoRawSocket};
#[cfg(windows)]
use std::sync::Mutex;
#[cfg(windows)]
use windows_sys::Win32::Networking::WinSock::SOCKET;

/// A non-blocking TCP connection, usable as a [`CommunicationObject`].
///
/// Addresses are captured once, at construction, from the `std` socket
/// used to set the connection up (`connect`'s own `TcpStream`, or the
/// listener's `accept(2)` result) — cheaper than a `getsockname`/
/// `getpeername` round trip on every call, and every address a TCP
/// connection has is already known by the time either side of this type
/// exists.
pub struct TcpStream {
    transport: Arc<FdTransport>,
    local_addr: SocketAddr,
    peer_addr: SocketAddr,
}

impl TcpStream {
    /// Issues a non-blocking connect to `addr`.
    #[cfg(unix)]
    pub fn connect(addr: SocketAddr) -> io::Result<Self> {
        let std_stream = StdTcpStream::connect(addr)?;
        std_stream.set_nonblocking(true)?;
        let local_addr = std_stream.local_addr()?;
        let peer_addr = std_stream.peer_addr()?;
        let fd = std_stream.into_raw_fd();
        let transport = FdTransport::new(fd, format!("tcp:{peer_addr}"))?;
        Ok(TcpStream {
            transport,
            local_addr,
            peer_addr,
        })
    }

    #[cfg(unix)]
    fn from_std(std_stream: StdTcpStream) -> io::Result<Self> {
        std_stream.set_nonblocking(true)?;
        let local_addr = std_stream.local_addr()?;
        let peer_addr = std_stream.peer_addr()?;
        let fd = std_stream.into_raw_fd();
        let transport = FdTransport::new(fd, format!("tcp:{peer_addr}"))?;
        Ok(TcpStream {
            transport,
            local_addr,
            peer_addr,
        })
    }

    #[cfg(unix)]
    fn accept_one(fd: RawFd) -> io::Result<TcpStream> {
        let accepted = unsafe { libc::accept(fd, std::ptr::null_mut(), std::ptr::null_mut()) };
        if accepted < 0 {
            return Err(io::Error::last_os_error());
        }
        let std_stream = unsafe { StdTcpStream::from_raw_fd(accepted) };
        TcpStream::from_std(std_stream)
    }

    #[cfg(windows)]
    pub fn connect(addr: SocketAddr) -> io::Result<Self> {
        let std_stream = StdTcpStream::connect(addr)?;
        Self::from_std(std_stream)
    }

    #[cfg(windows)]
    fn from_std(std_stream: StdTcpStream) -> io::Result<Self> {
        std_stream.set_nonblocking(true)?;
        let local_addr = std_stream.local_addr()?;
        let peer_addr = std_stream.peer_addr()?;
        let socket = std_stream.into_raw_socket() as SOCKET;
        let transport = FdTransport::new(socket, format!("tcp:{peer_addr}"))?;
        Ok(TcpStream {
            transport,
            local_addr,
            peer_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Half-closes the write side (TCP FIN) without closing the read side.
    pub fn close_send(&self) -> io::Result<()> {
        self.transport.close_send()
    }
}

impl CommunicationObject for TcpStream {
    fn send_async(&self, ctl: &Controller, op: &SendOperation) {
        self.transport.send_async(ctl, op);
    }
    fn receive_async(&self, ctl: &Controller, op: &ReceiveOperation) {
        self.transport.receive_async(ctl, op);
    }
    fn cancel(&self, ctl: &Controller, op: &Operation) {
        self.transport.cancel(ctl, op);
    }
    fn name(&self) -> String {
        self.transport.name()
    }
}

/// A non-blocking listening TCP socket, producing [`TcpStream`]
/// completions through [`AcceptOperation`].
#[cfg(unix)]
pub struct TcpListener {
    listener: Arc<Listener<TcpStream>>,
    local_addr: SocketAddr,
}

#[cfg(unix)]
impl TcpListener {
    pub fn bind(addr: SocketAddr) -> io::Result<Self> {
        let std_listener = StdTcpListener::bind(addr)?;
        std_listener.set_nonblocking(true)?;
        let local_addr = std_listener.local_addr()?;
        let fd = std_listener.into_raw_fd();
        let listener = Listener::new(
            fd,
            format!("tcp-listener:{local_addr}"),
            TcpStream::accept_one,
        );
        Ok(TcpListener {
            listener,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn accept_async(&self, ctl: &Controller, op: &AcceptOperation<TcpStream>) {
        self.listener.accept_async(ctl, op);
    }

    pub fn accept(
        &self,
        ctl: &Controller,
        op: &AcceptOperation<TcpStream>,
        timeout: Option<Duration>,
    ) -> bool {
        self.listener.accept(ctl, op, timeout)
    }

    pub fn cancel(&self, ctl: &Controller, op: &Operation) {
        self.listener.cancel(ctl, op);
    }

    pub fn name(&self) -> String {
        self.listener.name()
    }
}

/// A non-blocking listening TCP socket on Windows.
///
/// Winsock has no portable `O_NONBLOCK`-style accept queue the way
/// `libc::accept` does, so rather than force this through the
/// `RawFd`-shaped [`super::listener::Listener`], `FD_ACCEPT` is watched
/// on its own `WSAEventSelect`'d event, mirroring
/// [`crate::fd_transport::FdTransport`]'s Windows half more than Unix's
/// listener.
#[cfg(windows)]
pub struct TcpListener {
    socket: SOCKET,
    event: windows_sys::Win32::Foundation::HANDLE,
    local_addr: SocketAddr,
    state: Mutex<WindowsListenerState>,
}

#[cfg(windows)]
struct WindowsListenerState {
    self_weak: std::sync::Weak<TcpListener>,
    pending: VecDeque<crate::operation::AcceptOperation<TcpStream>>,
    sub: Option<(Controller, crate::operation::SubscriptionId)>,
}

#[cfg(windows)]
struct WindowsAcceptHandler(Arc<TcpListener>);
#[cfg(windows)]
impl crate::backend::ReadinessHandler for WindowsAcceptHandler {
    fn handle_read_ready(&self) -> bool {
        self.0.on_accept_ready()
    }
}

#[cfg(windows)]
impl TcpListener {
    pub fn bind(addr: SocketAddr) -> io::Result<Arc<Self>> {
        use windows_sys::Win32::Networking::WinSock::WSACreateEvent;

        let std_listener = StdTcpListener::bind(addr)?;
        std_listener.set_nonblocking(true)?;
        let local_addr = std_listener.local_addr()?;
        let socket = std_listener.into_raw_socket() as SOCKET;
        let event = unsafe { WSACreateEvent() };
        if event == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Arc::new_cyclic(|weak| TcpListener {
            socket,
            event,
            local_addr,
            state: Mutex::new(WindowsListenerState {
                self_weak: weak.clone(),
                pending: VecDeque::new(),
                sub: None,
            }),
        }))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn accept_async(
        self: &Arc<Self>,
        ctl: &Controller,
        op: &crate::operation::AcceptOperation<TcpStream>,
    ) {
        use crate::backend::{Direction, RawTarget};
        use windows_sys::Win32::Networking::WinSock::{WSAEventSelect, FD_ACCEPT};

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
                RawTarget::Handle(self.event as _),
                Direction::Read,
                Arc::new(WindowsAcceptHandler(self_arc)),
            );
            state.sub = Some((ctl.clone(), id));
            unsafe {
                WSAEventSelect(self.socket, self.event, FD_ACCEPT);
            }
        }
    }

    pub fn accept(
        self: &Arc<Self>,
        ctl: &Controller,
        op: &crate::operation::AcceptOperation<TcpStream>,
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

    pub fn cancel(&self, ctl: &Controller, op: &Operation) {
        self.remove_by_identity(op.identity());
        ctl.revert_post(op);
    }

    pub fn name(&self) -> String {
        format!("tcp-listener:{}", self.local_addr)
    }

    fn on_accept_ready(self: &Arc<Self>) -> bool {
        use windows_sys::Win32::Networking::WinSock::{accept, INVALID_SOCKET};

        let completed = {
            let mut state = self.state.lock().unwrap();
            let op = match state.pending.front() {
                Some(op) => op.clone(),
                None => return true,
            };
            let accepted =
                unsafe { accept(self.socket, std::ptr::null_mut(), std::ptr::null_mut()) };
            if accepted == INVALID_SOCKET {
                return false;
            }
            let std_stream = unsafe { StdTcpStream::from_raw_socket(accepted as _) };
            match TcpStream::from_std(std_stream) {
                Ok(conn) => {
                    op.set_accepted(conn);
                    state.pending.pop_front();
                    Some(op)
                }
                Err(err) => {
                    log::warn!("tcp-listener: accept error: {}", err);
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

    fn remove_by_identity(&self, id: crate::operation::OperationId) -> bool {
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

#[cfg(windows)]
impl Drop for TcpListener {
    fn drop(&mut self) {
        use windows_sys::Win32::Networking::WinSock::{closesocket, WSACloseEvent};
        unsafe {
            closesocket(self.socket);
            WSACloseEvent(self.event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    #[cfg(unix)]
    fn connect_accept_and_round_trip_bytes() {
        let listener = TcpListener::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr();

        let ctl = Controller::new().unwrap();
        let accept_op = AcceptOperation::new();
        listener.accept_async(&ctl, &accept_op);

        let client = TcpStream::connect(addr).unwrap();

        assert!(ctl.wait_for(&accept_op.base(), Some(Duration::from_secs(2))));
        let server = accept_op.take_accepted().expect("connection accepted");

        let send_op = SendOperation::new(vec![1, 2, 3, 4]);
        assert!(client.send(&ctl, &send_op, Some(Duration::from_secs(2))));

        let recv_op = ReceiveOperation::new(4);
        assert!(server.receive(&ctl, &recv_op, Some(Duration::from_secs(2))));
        assert_eq!(recv_op.into_data(), vec![1, 2, 3, 4]);
    }

    #[test]
    #[cfg(unix)]
    fn accept_times_out_with_no_connection() {
        let listener = TcpListener::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let ctl = Controller::new().unwrap();
        let accept_op = AcceptOperation::new();
        assert!(!listener.accept(&ctl, &accept_op, Some(Duration::from_millis(50))));
    }
}
