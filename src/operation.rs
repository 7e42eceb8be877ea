//! The unit of async work and its data-carrying specializations.
//!
//! [`Operation`] is the identity handle a caller uses to track one
//! outstanding request; it is cheap to clone (an `Arc` underneath) and that
//! clone is what gets threaded through pending queues, the controller's
//! completed-queue, and the notifier. [`SendOperation`], [`ReceiveOperation`],
//! [`InterruptOperation`] and [`AcceptOperation`] each embed an `Operation`
//! as their shared core and add their own payload.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::controller::Controller;
use crate::notifier::{DefaultNotifier, Notifier};

/// Caller-owned handle representing one outstanding async request.
///
/// Constructed by the caller, handed a [`Controller`] via
/// [`Operation::set_controller`] before being passed to any communication
/// object. Once handed off, only the owning communication object or its
/// `Controller` may observe or mutate it until completion.
#[derive(Clone)]
pub struct Operation {
    inner: Arc<OperationState>,
}

struct OperationState {
    controller: Mutex<Option<Controller>>,
    notifier: Mutex<Arc<dyn Notifier>>,
}

impl Default for Operation {
    fn default() -> Self {
        Self::new()
    }
}

impl Operation {
    /// Creates a new, unattached operation with the default
    /// controller-posting notifier.
    pub fn new() -> Self {
        Operation {
            inner: Arc::new(OperationState {
                controller: Mutex::new(None),
                notifier: Mutex::new(Arc::new(DefaultNotifier)),
            }),
        }
    }

    /// Associates this operation with the controller that will receive its
    /// completion. Must be called before the operation is handed to any
    /// communication object.
    pub fn set_controller(&self, ctl: Controller) {
        *self.inner.controller.lock().unwrap() = Some(ctl);
    }

    /// The controller this operation will complete on, if any.
    pub fn controller(&self) -> Option<Controller> {
        self.inner.controller.lock().unwrap().clone()
    }

    /// Overrides the default notifier.
    pub fn set_notifier(&self, notifier: Arc<dyn Notifier>) {
        *self.inner.notifier.lock().unwrap() = notifier;
    }

    /// The notifier that will deliver this operation's completion.
    pub fn notifier(&self) -> Arc<dyn Notifier> {
        self.inner.notifier.lock().unwrap().clone()
    }

    /// An opaque, stable identity for this operation, usable for
    /// pointer-equality style bookkeeping (pending-queue removal,
    /// backend subscription keys).
    pub fn identity(&self) -> OperationId {
        OperationId(Arc::as_ptr(&self.inner) as usize)
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation").field("id", &self.identity()).finish()
    }
}

impl PartialEq for Operation {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
impl Eq for Operation {}

/// Opaque identity of an [`Operation`], stable for the operation's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId(usize);

static NEXT_SUBSCRIPTION_ID: AtomicUsize = AtomicUsize::new(1);

/// Opaque key for a backend readiness subscription, handed back at
/// registration time and used to remove the subscription later.
///
/// Every subscription is keyed by one of these rather than by raw
/// descriptor, resolving the registration-API ambiguity in the ported
/// design: there is exactly one registration shape, keyed per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(usize);

impl SubscriptionId {
    pub(crate) fn next() -> Self {
        SubscriptionId(NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A pending send: a caller-owned buffer plus a progress counter.
///
/// Buffers are owned (not borrowed) so that a `SendOperation` can be parked
/// on a pending queue and completed from another thread without lifetime
/// entanglement with the caller's stack frame.
#[derive(Clone)]
pub struct SendOperation {
    op: Operation,
    state: Arc<Mutex<SendState>>,
}

struct SendState {
    data: Vec<u8>,
    sent: usize,
}

impl SendOperation {
    /// Creates a send operation for `data`. Ownership of the buffer moves
    /// in; call [`SendOperation::into_data`] to reclaim it once complete.
    pub fn new(data: Vec<u8>) -> Self {
        SendOperation {
            op: Operation::new(),
            state: Arc::new(Mutex::new(SendState { data, sent: 0 })),
        }
    }

    pub fn set_controller(&self, ctl: Controller) {
        self.op.set_controller(ctl);
    }
    pub fn controller(&self) -> Option<Controller> {
        self.op.controller()
    }
    pub fn set_notifier(&self, notifier: Arc<dyn Notifier>) {
        self.op.set_notifier(notifier);
    }
    pub fn notifier(&self) -> Arc<dyn Notifier> {
        self.op.notifier()
    }
    /// The shared base handle, as stored on pending/completed queues.
    pub fn base(&self) -> Operation {
        self.op.clone()
    }
    pub fn identity(&self) -> OperationId {
        self.op.identity()
    }

    /// Bytes not yet sent.
    pub fn unsent_bytes(&self) -> Vec<u8> {
        let s = self.state.lock().unwrap();
        s.data[s.sent..].to_vec()
    }

    /// Total bytes sent so far.
    pub fn bytes_sent(&self) -> usize {
        self.state.lock().unwrap().sent
    }

    /// Advances the sent counter (called by the transport on progress).
    pub fn add_sent_bytes(&self, n: usize) {
        let mut s = self.state.lock().unwrap();
        s.sent = (s.sent + n).min(s.data.len());
    }

    /// True once every byte has been sent.
    pub fn is_completed(&self) -> bool {
        let s = self.state.lock().unwrap();
        s.sent >= s.data.len()
    }

    /// Reclaims ownership of the buffer. Only meaningful once the caller
    /// regains exclusive ownership (after completion/cancel).
    pub fn into_data(self) -> Vec<u8> {
        match Arc::try_unwrap(self.state) {
            Ok(state) => state.into_inner().unwrap().data,
            Err(shared) => shared.lock().unwrap().data.clone(),
        }
    }
}

/// A pending receive: a caller-owned destination buffer plus a progress
/// counter.
#[derive(Clone)]
pub struct ReceiveOperation {
    op: Operation,
    state: Arc<Mutex<ReceiveState>>,
}

struct ReceiveState {
    buf: Vec<u8>,
    received: usize,
}

impl ReceiveOperation {
    /// Creates a receive operation that will fill up to `len` bytes.
    pub fn new(len: usize) -> Self {
        ReceiveOperation {
            op: Operation::new(),
            state: Arc::new(Mutex::new(ReceiveState {
                buf: vec![0u8; len],
                received: 0,
            })),
        }
    }

    pub fn set_controller(&self, ctl: Controller) {
        self.op.set_controller(ctl);
    }
    pub fn controller(&self) -> Option<Controller> {
        self.op.controller()
    }
    pub fn set_notifier(&self, notifier: Arc<dyn Notifier>) {
        self.op.set_notifier(notifier);
    }
    pub fn notifier(&self) -> Arc<dyn Notifier> {
        self.op.notifier()
    }
    pub fn base(&self) -> Operation {
        self.op.clone()
    }
    pub fn identity(&self) -> OperationId {
        self.op.identity()
    }

    /// Total bytes received so far.
    pub fn bytes_received(&self) -> usize {
        self.state.lock().unwrap().received
    }

    /// How many bytes are still wanted.
    pub fn unreceived_len(&self) -> usize {
        let s = self.state.lock().unwrap();
        s.buf.len() - s.received
    }

    /// Copies `src` into the unfilled portion of the buffer, advancing the
    /// counter. Returns the number of bytes actually copied (bounded by
    /// remaining space).
    pub fn fill_from(&self, src: &[u8]) -> usize {
        let mut s = self.state.lock().unwrap();
        let start = s.received;
        let n = src.len().min(s.buf.len() - start);
        s.buf[start..start + n].copy_from_slice(&src[..n]);
        s.received += n;
        n
    }

    /// Runs `f` with mutable access to the unreceived tail of the buffer and
    /// advances the counter by the number of bytes `f` reports as filled.
    pub fn with_unreceived_mut<R>(&self, f: impl FnOnce(&mut [u8]) -> (usize, R)) -> R {
        let mut s = self.state.lock().unwrap();
        let start = s.received;
        let (n, r) = f(&mut s.buf[start..]);
        s.received += n;
        r
    }

    /// True once the buffer has been completely filled.
    pub fn is_completed(&self) -> bool {
        let s = self.state.lock().unwrap();
        s.received >= s.buf.len()
    }

    /// Reclaims ownership of the buffer.
    pub fn into_data(self) -> Vec<u8> {
        match Arc::try_unwrap(self.state) {
            Ok(state) => state.into_inner().unwrap().buf,
            Err(shared) => shared.lock().unwrap().buf.clone(),
        }
    }
}

/// Minimal bitflags-style macro, used here instead of pulling in the
/// `bitflags` crate for a single three-bit set.
macro_rules! bitflags_like_kinds {
    (
        $(#[$meta:meta])*
        pub struct $name:ident: $ty:ty {
            $(const $variant:ident = $value:expr;)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct $name($ty);

        impl $name {
            $(pub const $variant: $name = $name($value);)*

            pub const fn empty() -> Self {
                $name(0)
            }
            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }
            pub const fn intersects(self, other: Self) -> bool {
                self.0 & other.0 != 0
            }
            pub const fn union(self, other: Self) -> Self {
                $name(self.0 | other.0)
            }
            pub const fn intersection(self, other: Self) -> Self {
                $name(self.0 & other.0)
            }
            pub const fn is_empty(self) -> bool {
                self.0 == 0
            }
            pub(crate) const fn bits(self) -> $ty {
                self.0
            }
            pub(crate) const fn from_bits(bits: $ty) -> Self {
                $name(bits)
            }
        }

        impl std::ops::BitOr for $name {
            type Output = Self;
            fn bitor(self, rhs: Self) -> Self {
                self.union(rhs)
            }
        }
        impl std::ops::BitAnd for $name {
            type Output = Self;
            fn bitand(self, rhs: Self) -> Self {
                self.intersection(rhs)
            }
        }
    };
}

bitflags_like_kinds! {
    /// The interrupt kinds a process can be notified about.
    pub struct InterruptKinds: u8 {
        const BREAK = 0b001;
        const HANGUP = 0b010;
        const TERMINATE = 0b100;
    }
}

/// A single requested-kind / received-kind pair, waiting on
/// [`crate::interrupt::Interrupt`].
#[derive(Clone)]
pub struct InterruptOperation {
    op: Operation,
    requested: InterruptKinds,
    received: Arc<Mutex<InterruptKinds>>,
}

impl InterruptOperation {
    pub fn new(requested: InterruptKinds) -> Self {
        InterruptOperation {
            op: Operation::new(),
            requested,
            received: Arc::new(Mutex::new(InterruptKinds::empty())),
        }
    }
    pub fn set_controller(&self, ctl: Controller) {
        self.op.set_controller(ctl);
    }
    pub fn controller(&self) -> Option<Controller> {
        self.op.controller()
    }
    pub fn set_notifier(&self, notifier: Arc<dyn Notifier>) {
        self.op.set_notifier(notifier);
    }
    pub fn notifier(&self) -> Arc<dyn Notifier> {
        self.op.notifier()
    }
    pub fn base(&self) -> Operation {
        self.op.clone()
    }
    pub fn identity(&self) -> OperationId {
        self.op.identity()
    }
    pub fn requested(&self) -> InterruptKinds {
        self.requested
    }
    pub fn received(&self) -> InterruptKinds {
        *self.received.lock().unwrap()
    }
    pub fn set_received(&self, kinds: InterruptKinds) {
        *self.received.lock().unwrap() = kinds;
    }
}

/// A slot waiting to receive a freshly accepted connection.
pub struct AcceptOperation<C> {
    op: Operation,
    accepted: Arc<Mutex<Option<C>>>,
}

impl<C> Clone for AcceptOperation<C> {
    fn clone(&self) -> Self {
        AcceptOperation {
            op: self.op.clone(),
            accepted: self.accepted.clone(),
        }
    }
}

impl<C> AcceptOperation<C> {
    pub fn new() -> Self {
        AcceptOperation {
            op: Operation::new(),
            accepted: Arc::new(Mutex::new(None)),
        }
    }
    pub fn set_controller(&self, ctl: Controller) {
        self.op.set_controller(ctl);
    }
    pub fn controller(&self) -> Option<Controller> {
        self.op.controller()
    }
    pub fn set_notifier(&self, notifier: Arc<dyn Notifier>) {
        self.op.set_notifier(notifier);
    }
    pub fn notifier(&self) -> Arc<dyn Notifier> {
        self.op.notifier()
    }
    pub fn base(&self) -> Operation {
        self.op.clone()
    }
    pub fn identity(&self) -> OperationId {
        self.op.identity()
    }
    pub fn set_accepted(&self, conn: C) {
        *self.accepted.lock().unwrap() = Some(conn);
    }
    pub fn take_accepted(&self) -> Option<C> {
        self.accepted.lock().unwrap().take()
    }
}

impl<C> Default for AcceptOperation<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_operation_tracks_progress() {
        let op = SendOperation::new(vec![1, 2, 3, 4]);
        assert_eq!(op.unsent_bytes(), vec![1, 2, 3, 4]);
        op.add_sent_bytes(2);
        assert_eq!(op.unsent_bytes(), vec![3, 4]);
        assert_eq!(op.bytes_sent(), 2);
        assert!(!op.is_completed());
        op.add_sent_bytes(2);
        assert!(op.is_completed());
    }

    #[test]
    fn receive_operation_fills_incrementally() {
        let op = ReceiveOperation::new(5);
        assert_eq!(op.fill_from(b"ab"), 2);
        assert_eq!(op.bytes_received(), 2);
        assert!(!op.is_completed());
        assert_eq!(op.fill_from(b"cde"), 3);
        assert!(op.is_completed());
        assert_eq!(op.into_data(), b"abcde");
    }

    #[test]
    fn interrupt_kinds_bitset() {
        let k = InterruptKinds::BREAK | InterruptKinds::HANGUP;
        assert!(k.contains(InterruptKinds::BREAK));
        assert!(!k.contains(InterruptKinds::TERMINATE));
        assert!(k.intersects(InterruptKinds::TERMINATE | InterruptKinds::HANGUP));
    }

    #[test]
    fn operation_identity_distinguishes_clones() {
        let a = Operation::new();
        let b = a.clone();
        let c = Operation::new();
        assert_eq!(a.identity(), b.identity());
        assert_ne!(a.identity(), c.identity());
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
