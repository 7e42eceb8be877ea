//! Connection-pooling HTTP client worker loop.
//!
//! A [`Client`] is a long-lived scheduler, not a one-shot request
//! function: one thread calls [`Client::run`] as its entry point, while
//! any number of other threads call [`Client::add_request`],
//! [`Client::cancel_request`] and [`Client::stop`]. Concrete request/
//! response framing is outside this module's scope — a [`Request`]
//! carries an opaque payload and a completion callback, and connections
//! are supplied by an external [`ConnectionProvider`] collaborator
//! together with a [`HttpConnection`] implementation, the same way a
//! caller supplies concrete parsing on top of the core's transports.

mod client;
mod connection;
mod types;

pub use client::Client;
pub use connection::{ConnectionOutcome, ConnectionProvider, HttpConnection};
pub use types::{Request, RequestId, Scheme, Target};

/// Heartbeat interval for the worker's `Controller::wait` call: bounds how
/// long a connection can go without an elapsed-time update even when no
/// readiness event fires.
pub const WAIT_INTERVAL: std::time::Duration = std::time::Duration::from_millis(250);
