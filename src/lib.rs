//! Cross-platform, cancellable async I/O core.
//!
//! This crate provides a uniform primitive for composing non-blocking
//! operations on file descriptors, sockets, in-process message queues,
//! timers and interrupt sources, and makes them behave identically on
//! POSIX (`poll(2)` and signals) and Windows (`WaitForMultipleObjects`
//! and console control handlers) without leaking platform semantics to
//! callers.
//!
//! # The model
//!
//! A [`Controller`](controller::Controller) is a per-thread event
//! demultiplexer: it is the only place a thread ever blocks. An
//! [`Operation`](operation::Operation) is the identity handle a caller
//! uses to track one outstanding request — it is handed to a
//! [`CommunicationObject`](comm::CommunicationObject) together with the
//! controller that should learn about its completion. Every transport in
//! this crate (FD-backed sockets, [`MessageExchange`](message_exchange::MessageExchange),
//! [`Timer`](timer::Timer), [`Interrupt`](interrupt::Interrupt)) implements
//! that same contract, so a caller can treat a socket read, a rendezvous,
//! a timer firing, or a `Ctrl-C` identically: attach an operation to a
//! controller, then `wait`.
//!
//! [`MultiplexableStream`](multiplex::MultiplexableStream) is independent
//! of the controller machinery; it lets several logical cursors share one
//! seekable stream.
//!
//! The [`http`] module builds a long-lived connection-pooling client
//! worker loop on top of the controller and FD transport.
//!
//! # Feature flags
//!
//! See the `features` module below for what each Cargo feature enables.
#![cfg_attr(docsrs, feature(doc_cfg))]

/// Documentation of this crate's Cargo features.
///
/// This crate only provides a [`shell`](backend::shell) backend by
/// default-disabled builds; enable `os-poll` for a real platform backend.
///
/// * **`os-poll`** (default): enables the real per-platform
///   [`Controller`](controller::Controller) backend (`poll(2)` on Unix,
///   `WaitForMultipleObjects` on Windows). Without it, `Controller` can
///   still be constructed and can dispatch posted operations, but nothing
///   can register OS readiness with it — attempting to do so panics.
/// * **`os-ext`** (default, requires `os-poll`): enables
///   [`Interrupt`](interrupt::Interrupt) (signal / console-control
///   delivery) and half-close support in the FD transport.
/// * **`net`** (default, requires `os-poll`): enables the [`net`] module
///   (TCP and, on Unix, Unix-domain transports, built on the FD
///   transport).
/// * **`http`** (default, requires `net`): enables the [`http`] module
///   (the connection-pooling client worker loop).
pub mod features {}

pub mod backend;
pub mod comm;
pub mod controller;
pub mod error;
#[cfg(feature = "os-poll")]
pub mod fd_transport;
#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "os-ext")]
pub mod interrupt;
pub mod message_exchange;
pub mod multiplex;
#[cfg(feature = "net")]
pub mod net;
pub mod notifier;
pub mod operation;
pub mod timer;

pub use comm::CommunicationObject;
pub use controller::Controller;
pub use error::{AsyncError, AsyncResult};
pub use notifier::{DefaultNotifier, Notifier};
pub use operation::{
    AcceptOperation, InterruptKinds, InterruptOperation, Operation, OperationId, ReceiveOperation,
    SendOperation,
};
