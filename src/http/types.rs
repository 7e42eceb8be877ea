//! Request identity and connection-matching types for the client worker.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::AsyncError;

/// Opaque, monotonically increasing handle returned by
/// [`super::Client::add_request`], used later for [`super::Client::cancel_request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    pub(crate) fn as_u64(self) -> u64 {
        self.0
    }
}

pub(crate) struct RequestIdAllocator {
    next: AtomicU64,
}

impl RequestIdAllocator {
    pub(crate) fn new() -> Self {
        RequestIdAllocator { next: AtomicU64::new(1) }
    }

    pub(crate) fn alloc(&self) -> RequestId {
        RequestId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// The URI scheme a connection was (or should be) established under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Http,
    Https,
}

/// A request's `(host, port, scheme)` triple, used for connection matching.
///
/// A connection accepts a request only if its own target equals this one —
/// matching is by value, not by any notion of "compatible enough" (no
/// wildcard hosts, no scheme coercion).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    pub host: String,
    pub port: u16,
    pub scheme: Scheme,
}

impl Target {
    pub fn new(host: impl Into<String>, port: u16, scheme: Scheme) -> Self {
        Target { host: host.into(), port, scheme }
    }
}

/// One outstanding HTTP request handed to the [`super::Client`].
///
/// The request's payload and response framing are opaque to this module —
/// a `Request` carries only what the worker loop itself needs: the target
/// to match a connection against, and a completion callback to invoke
/// exactly once, from the worker thread, with either a successful outcome
/// or a terminal [`AsyncError`].
pub struct Request {
    pub(crate) target: Target,
    pub(crate) on_complete: Box<dyn FnOnce(Result<(), AsyncError>) + Send>,
    /// Opaque payload a [`super::HttpConnection`] implementation
    /// understands; the worker loop never looks inside it.
    pub(crate) payload: Arc<dyn std::any::Any + Send + Sync>,
}

impl Request {
    pub fn new<P: std::any::Any + Send + Sync>(
        target: Target,
        payload: P,
        on_complete: impl FnOnce(Result<(), AsyncError>) + Send + 'static,
    ) -> Self {
        Request {
            target,
            payload: Arc::new(payload),
            on_complete: Box::new(on_complete),
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn payload(&self) -> &(dyn std::any::Any + Send + Sync) {
        &*self.payload
    }
}
