//! The per-connection state machine and its external collaborators.
//!
//! Concrete request/response parsing lives outside this crate — a
//! [`HttpConnection`] implementation owns the wire protocol and the
//! underlying transport; this module only defines the shape the worker
//! loop in [`super::client::Client`] needs to drive it.

use std::time::Duration;

use crate::controller::Controller;
use crate::http::types::{RequestId, Target};
use crate::http::Request;
use crate::operation::Operation;

/// What a connection wants the worker loop to do after one `handle_event`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionOutcome {
    /// Idle and able to accept a matching request.
    WaitForRequest,
    /// A request is in flight; leave it alone.
    Transferring,
    /// The connection is done (request finished, error, or idle timeout)
    /// and wants to close. If it still has a request attached, the worker
    /// re-queues that request at the head of the pending list for the
    /// next connection to that target.
    Shutdown,
}

/// One pooled connection, driven by the [`super::client::Client`] run loop.
///
/// Implementations are expected to internally hold an `Arc` to their own
/// transport (e.g. an FD-backed [`crate::net::TcpStream`]) and register
/// readiness with whatever [`Controller`] `handle_event` is called with.
pub trait HttpConnection: Send {
    /// The `(host, port, scheme)` this connection was established for.
    fn target(&self) -> &Target;

    /// Offers `request` (identified by `id`, preserved so the worker can
    /// still `cancel_request` it after a retry) to this connection.
    /// Returns it back, unchanged, if the connection's target doesn't
    /// match or it is already busy.
    fn try_attach(&mut self, id: RequestId, request: Request) -> Option<(RequestId, Request)>;

    /// True if this connection currently has a request attached.
    fn has_request(&self) -> bool;

    /// Removes and fails the request with this id if it is the one
    /// currently attached. Returns whether a request was removed.
    fn cancel_request(&mut self, id: RequestId) -> bool;

    /// Advances this connection's state machine. `op` is `Some` only when
    /// the event that triggered this call was this connection's own
    /// readiness completion; `elapsed` is the wall-clock time since the
    /// previous call, used for idle/read timeout accounting.
    fn handle_event(
        &mut self,
        ctl: &Controller,
        op: Option<&Operation>,
        elapsed: Duration,
    ) -> ConnectionOutcome;

    /// Takes back the request (and its original id) currently attached, if
    /// any — used by the worker when a `Shutdown` outcome requires
    /// re-queuing it.
    fn take_request(&mut self) -> Option<(RequestId, Request)>;
}

/// External collaborator responsible for turning an unsatisfied
/// [`Target`] into a live connection (DNS resolution, `connect(2)`,
/// TLS handshake) on whatever schedule it chooses, then calling
/// [`super::client::Client::add_connection`] back with the result.
///
/// The client never calls this synchronously from inside a locked
/// section; see [`super::client::Client`]'s locking discipline.
pub trait ConnectionProvider: Send {
    /// Requests that a connection to `target` be created. May be
    /// asynchronous: the provider is free to return immediately and call
    /// `add_connection` later from any thread (including its own
    /// background thread), or to fail the outstanding request for that
    /// target directly if connecting is hopeless (e.g. DNS failure).
    fn request_connection(&self, client: &super::Client, target: &Target);
}
