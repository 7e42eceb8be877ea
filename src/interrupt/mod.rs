//! Process-wide delivery of OS interrupt-like signals (`Ctrl-C`, hangup,
//! terminate) through the normal async completion path.
//!
//! Grounded on `afl::async::Interrupt` / `arch::posix::PosixInterrupt`: the
//! OS-level callback (a signal handler on POSIX, a console control handler
//! on Windows) runs under severe reentrancy restrictions and can only do
//! one safe thing — wake a self-pipe or set an event. Everything else
//! (looking up which waiters care, removing them, notifying) happens back
//! on a normal thread inside a read-readiness handler.

#[cfg(all(unix, feature = "os-ext"))]
mod unix;
#[cfg(all(windows, feature = "os-ext"))]
mod windows;

#[cfg(all(unix, feature = "os-ext"))]
pub use unix::Interrupt;
#[cfg(all(windows, feature = "os-ext"))]
pub use windows::Interrupt;
