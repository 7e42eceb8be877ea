//! Non-blocking Unix-domain sockets. Unix-only, mirroring
//! [`super::tcp`]'s stream/listener split.

use std::io;
use std::os::unix::io::{FromRawFd, IntoRawFd, RawFd};
use std::os::unix::net::{UnixListener as StdUnixListener, UnixStream as StdUnixStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::comm::CommunicationObject;
use crate::controller::Controller;
use crate::fd_transport::FdTransport;
use crate::operation::{AcceptOperation, Operation, ReceiveOperation, SendOperation};

use super::listener::Listener;

/// A non-blocking Unix-domain stream socket.
///
/// Unlike [`super::tcp::TcpStream`], a Unix-domain peer does not always
/// have a nameable path (anonymous `socketpair`-style connections, or a
/// peer that never called `bind`), so addresses are kept as the
/// `Option<PathBuf>` that `std`'s `SocketAddr::as_pathname` already
/// gives us rather than forced into a type that can't represent that.
pub struct UnixStream {
    transport: Arc<FdTransport>,
    local_addr: Option<PathBuf>,
    peer_addr: Option<PathBuf>,
}

impl UnixStream {
    pub fn connect(path: impl AsRef<Path>) -> io::Result<Self> {
        let std_stream = StdUnixStream::connect(path)?;
        Self::from_std(std_stream)
    }

    fn from_std(std_stream: StdUnixStream) -> io::Result<Self> {
        std_stream.set_nonblocking(true)?;
        let local_addr = std_stream.local_addr()?.as_pathname().map(Path::to_path_buf);
        let peer_addr = std_stream.peer_addr()?.as_pathname().map(Path::to_path_buf);
        let fd = std_stream.into_raw_fd();
        let transport = FdTransport::new(fd, "unix-stream".to_string())?;
        Ok(UnixStream {
            transport,
            local_addr,
            peer_addr,
        })
    }

    fn accept_one(fd: RawFd) -> io::Result<UnixStream> {
        let accepted = unsafe { libc::accept(fd, std::ptr::null_mut(), std::ptr::null_mut()) };
        if accepted < 0 {
            return Err(io::Error::last_os_error());
        }
        let std_stream = unsafe { StdUnixStream::from_raw_fd(accepted) };
        UnixStream::from_std(std_stream)
    }

    pub fn local_addr(&self) -> Option<&Path> {
        self.local_addr.as_deref()
    }

    pub fn peer_addr(&self) -> Option<&Path> {
        self.peer_addr.as_deref()
    }

    pub fn close_send(&self) -> io::Result<()> {
        self.transport.close_send()
    }
}

impl CommunicationObject for UnixStream {
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

/// A non-blocking listening Unix-domain socket, producing [`UnixStream`]
/// completions through [`AcceptOperation`]. Binding the same path twice
/// fails with `AddrInUse` unless the stale socket file is removed first,
/// same as `std`; cleaning that up is left to the caller.
pub struct UnixListener {
    listener: Arc<Listener<UnixStream>>,
    local_addr: Option<PathBuf>,
}

impl UnixListener {
    pub fn bind(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let std_listener = StdUnixListener::bind(path)?;
        std_listener.set_nonblocking(true)?;
        let local_addr = std_listener
            .local_addr()?
            .as_pathname()
            .map(Path::to_path_buf);
        let fd = std_listener.into_raw_fd();
        let listener = Listener::new(
            fd,
            format!("unix-listener:{}", path.display()),
            UnixStream::accept_one,
        );
        Ok(UnixListener {
            listener,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> Option<&Path> {
        self.local_addr.as_deref()
    }

    pub fn accept_async(&self, ctl: &Controller, op: &AcceptOperation<UnixStream>) {
        self.listener.accept_async(ctl, op);
    }

    pub fn accept(
        &self,
        ctl: &Controller,
        op: &AcceptOperation<UnixStream>,
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn socket_path(label: &str) -> PathBuf {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!(
            "aio-core-test-{}-{}-{}.sock",
            std::process::id(),
            label,
            n
        ))
    }

    #[test]
    fn connect_accept_and_round_trip_bytes() {
        let path = socket_path("roundtrip");
        let _ = std::fs::remove_file(&path);
        let listener = UnixListener::bind(&path).unwrap();

        let ctl = Controller::new().unwrap();
        let accept_op = AcceptOperation::new();
        listener.accept_async(&ctl, &accept_op);

        let client = UnixStream::connect(&path).unwrap();

        assert!(ctl.wait_for(&accept_op.base(), Some(Duration::from_secs(2))));
        let server = accept_op.take_accepted().expect("connection accepted");

        let send_op = SendOperation::new(vec![9, 9, 7]);
        assert!(client.send(&ctl, &send_op, Some(Duration::from_secs(2))));

        let recv_op = ReceiveOperation::new(3);
        assert!(server.receive(&ctl, &recv_op, Some(Duration::from_secs(2))));
        assert_eq!(recv_op.into_data(), vec![9, 9, 7]);

        let _ = std::fs::remove_file(&path);
    }
}
