//! Networking: non-blocking TCP and (Unix-only) Unix-domain sockets,
//! layered on [`crate::fd_transport`] and [`crate::controller::Controller`].
//!
//! Mirrors the source's `net` module shape — one submodule per transport
//! kind, each re-exporting a stream type and a listener type.

#[cfg(unix)]
mod listener;
mod tcp;

#[cfg(unix)]
mod unix;

pub use tcp::TcpStream;
#[cfg(unix)]
pub use tcp::TcpListener;

#[cfg(unix)]
pub use unix::{UnixListener, UnixStream};
