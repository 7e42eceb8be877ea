//! Per-[`crate::controller::Controller`] platform backend.
//!
//! Two wait modes exist because readiness waiting is strictly more
//! expensive than semaphore waiting: [`Mode::WaitingForSemaphore`] when no
//! external readiness subscribers are registered (the only wake source is
//! `post` from another thread), [`Mode::WaitingForDescriptor`] once at least
//! one subscriber is registered, in which case the backend blocks inside a
//! multiplexed OS wait primitive (`poll(2)` on Unix,
//! `WaitForMultipleObjects` on Windows) with the wake primitive always
//! included in the wait set.

use std::time::Duration;

use crate::operation::SubscriptionId;

#[cfg(all(unix, feature = "os-poll"))]
mod unix;
#[cfg(all(windows, feature = "os-poll"))]
mod windows;
#[cfg(not(feature = "os-poll"))]
mod shell;

#[cfg(all(unix, feature = "os-poll"))]
pub(crate) use unix::UnixBackend as PlatformBackend;
#[cfg(all(windows, feature = "os-poll"))]
pub(crate) use windows::WindowsBackend as PlatformBackend;
#[cfg(not(feature = "os-poll"))]
pub(crate) use shell::ShellBackend as PlatformBackend;

/// Current wait posture of a backend. Consulted by `post`/`wake` to decide
/// how to rouse the owner thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    NotWaiting,
    WaitingForSemaphore,
    WaitingForDescriptor,
}

/// Which readiness direction a subscription cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

/// Callback invoked by the backend when a registered descriptor becomes
/// ready. Returning `true` removes the subscription; `false` keeps it
/// (more data, or more capacity, is still expected).
pub trait ReadinessHandler: Send + Sync {
    fn handle_read_ready(&self) -> bool {
        false
    }
    fn handle_write_ready(&self) -> bool {
        false
    }
}

/// The platform-specific inside of a `Controller`.
///
/// `wait` performs one bounded blocking wait: it must return once the wake
/// primitive fires, once a registered descriptor both becomes ready and its
/// handler reports completion, or once `timeout` elapses — whichever comes
/// first.
pub(crate) trait Backend: Send + Sync {
    fn prepare(&self);
    fn wait(&self, timeout: Option<Duration>);
    fn finish(&self);
    fn wake(&self);
    fn add_subscriber(
        &self,
        raw: RawTarget,
        direction: Direction,
        handler: std::sync::Arc<dyn ReadinessHandler>,
    ) -> SubscriptionId;
    fn remove_subscriber(&self, id: SubscriptionId);
}

/// The OS-level handle a subscription waits on.
#[derive(Debug, Clone, Copy)]
pub enum RawTarget {
    #[cfg(unix)]
    Fd(std::os::unix::io::RawFd),
    #[cfg(windows)]
    Handle(std::os::windows::io::RawHandle),
}
