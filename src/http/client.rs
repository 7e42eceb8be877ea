//! The connection-pooling HTTP client worker loop.
//!
//! Grounded on the source `HttpClient`'s `processConnections`/`run` pair: one
//! background thread owns a [`Controller`] and a pool of connections, and is
//! the only thread that ever touches connection state directly. Every other
//! thread only ever mutates queues under the client's mutex and then wakes
//! the worker by posting to its own controller — the same notifier path
//! any other completion takes, so "all completions arrive via the
//! controller" (including `Cancelled` failures) holds without a special
//! case.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::controller::Controller;
use crate::error::AsyncError;
use crate::operation::{Operation, OperationId};

use super::connection::{ConnectionOutcome, ConnectionProvider, HttpConnection};
use super::types::{RequestId, RequestIdAllocator, Target};
use super::{Request, WAIT_INTERVAL};

struct PendingRequest {
    id: RequestId,
    request: Request,
}

struct State {
    connections: Vec<Box<dyn HttpConnection>>,
    pending: VecDeque<PendingRequest>,
    cancels: VecDeque<RequestId>,
    connecting: HashSet<Target>,
    stopped: bool,
}

struct Inner {
    ctl: Controller,
    wake: Operation,
    wake_id: OperationId,
    ids: RequestIdAllocator,
    state: Mutex<State>,
    provider: Mutex<Option<Box<dyn ConnectionProvider>>>,
}

/// A long-lived, thread-safe HTTP request scheduler.
///
/// One thread calls [`Client::run`] as its entry point; any number of
/// other threads call [`Client::add_request`], [`Client::cancel_request`],
/// [`Client::add_connection`] and [`Client::stop`]. The client's own mutex
/// is never held while calling into the [`ConnectionProvider`] — see the
/// module docs on [`super`] for why.
pub struct Client {
    inner: Arc<Inner>,
}

impl Clone for Client {
    fn clone(&self) -> Self {
        Client { inner: self.inner.clone() }
    }
}

impl Client {
    /// Creates a client with its own private [`Controller`]. `run` must be
    /// called (typically from a dedicated thread) before requests make any
    /// progress.
    pub fn new() -> std::io::Result<Self> {
        let ctl = Controller::new()?;
        let wake = Operation::new();
        wake.set_controller(ctl.clone());
        let wake_id = wake.identity();
        Ok(Client {
            inner: Arc::new(Inner {
                ctl,
                wake,
                wake_id,
                ids: RequestIdAllocator::new(),
                state: Mutex::new(State {
                    connections: Vec::new(),
                    pending: VecDeque::new(),
                    cancels: VecDeque::new(),
                    connecting: HashSet::new(),
                    stopped: false,
                }),
                provider: Mutex::new(None),
            }),
        })
    }

    /// The controller this client's worker waits on. Exposed so a
    /// [`ConnectionProvider`] can hand freshly-created connections'
    /// transports the same controller, keeping every readiness event on
    /// one wait loop.
    pub fn controller(&self) -> &Controller {
        &self.inner.ctl
    }

    fn wake(&self) {
        self.inner.ctl.post(&self.inner.wake);
    }

    /// Installs the collaborator responsible for turning unsatisfied
    /// targets into live connections. Must be set before `run` is called
    /// to avoid a window where unsatisfied targets are silently ignored.
    pub fn set_connection_provider(&self, provider: Box<dyn ConnectionProvider>) {
        *self.inner.provider.lock().unwrap() = Some(provider);
    }

    /// Enqueues `req`, returning its id. If the client is already stopped,
    /// `req` is failed with [`AsyncError::Cancelled`] immediately through
    /// the normal completion path (not raised synchronously) and the
    /// returned id is still valid, just already resolved.
    pub fn add_request(&self, req: Request) -> RequestId {
        let id = self.inner.ids.alloc();
        let mut state = self.inner.state.lock().unwrap();
        if state.stopped {
            drop(state);
            (req.on_complete)(Err(AsyncError::Cancelled));
            return id;
        }
        state.pending.push_back(PendingRequest { id, request: req });
        drop(state);
        self.wake();
        id
    }

    /// Cancels `id`. If it is still waiting for a connection, it is failed
    /// locally with [`AsyncError::Cancelled`] right away. Otherwise the id
    /// is queued for the worker to cancel on whichever connection it was
    /// attached to.
    pub fn cancel_request(&self, id: RequestId) {
        let mut state = self.inner.state.lock().unwrap();
        if let Some(pos) = state.pending.iter().position(|p| p.id == id) {
            let pending = state.pending.remove(pos).unwrap();
            drop(state);
            (pending.request.on_complete)(Err(AsyncError::Cancelled));
            return;
        }
        state.cancels.push_back(id);
        drop(state);
        self.wake();
    }

    /// Hands a freshly established connection to the pool. Called by the
    /// [`ConnectionProvider`], typically from its own thread, after
    /// [`ConnectionProvider::request_connection`] succeeds.
    pub fn add_connection(&self, conn: Box<dyn HttpConnection>) {
        let mut state = self.inner.state.lock().unwrap();
        state.connecting.remove(conn.target());
        state.connections.push(conn);
        drop(state);
        self.wake();
    }

    /// Reports a target for which a request is waiting but no connection
    /// exists and none is already being established — used by the
    /// provider's async DNS/connect logic, and internally by the run loop.
    pub fn get_unsatisfied_target(&self) -> Option<Target> {
        let state = self.inner.state.lock().unwrap();
        state
            .pending
            .iter()
            .map(|p| p.request.target())
            .find(|target| {
                !state.connecting.contains(*target)
                    && !state.connections.iter().any(|c| c.target() == *target)
            })
            .cloned()
    }

    /// Fails every still-pending (not yet attached to a connection)
    /// request whose target matches `(host, port, scheme)` with a
    /// [`AsyncError::NetworkError`] built from `reason`/`message` — used
    /// by a provider that has given up on a target (e.g. DNS resolution
    /// failed permanently). Requests already attached to a connection are
    /// left for that connection's own state machine to resolve.
    ///
    /// Also clears the target from `connecting`: a provider calling this
    /// instead of `add_connection` means it abandoned the attempt, and
    /// `get_unsatisfied_target` must be able to report this target again
    /// for a later request rather than treating it as permanently
    /// in-flight.
    pub fn cancel_requests_by_target(
        &self,
        host: &str,
        port: u16,
        scheme: super::types::Scheme,
        reason: &str,
        message: &str,
    ) {
        let mut state = self.inner.state.lock().unwrap();
        let matches = |t: &Target| t.host == host && t.port == port && t.scheme == scheme;
        let mut failed = Vec::new();
        let remaining: VecDeque<PendingRequest> = state
            .pending
            .drain(..)
            .filter_map(|p| {
                if matches(p.request.target()) {
                    failed.push(p.request);
                    None
                } else {
                    Some(p)
                }
            })
            .collect();
        state.pending = remaining;
        state.connecting.retain(|t| !matches(t));
        drop(state);
        let err_text = format!("{reason}: {message}");
        for req in failed {
            (req.on_complete)(Err(AsyncError::NetworkError(err_text.clone())));
        }
    }

    /// Signals the worker loop to drain and exit. Idempotent. Does not
    /// join the thread running [`Client::run`]; callers own that thread.
    pub fn stop(&self) {
        let mut state = self.inner.state.lock().unwrap();
        if state.stopped {
            return;
        }
        state.stopped = true;
        drop(state);
        self.wake();
    }

    /// The worker loop entry point. Runs until [`Client::stop`] is called,
    /// then drains (failing every pending request and cancelling every
    /// connection with [`AsyncError::Cancelled`]) and returns.
    pub fn run(&self) {
        let mut last_tick = Instant::now();
        loop {
            if let Some(target) = self.get_unsatisfied_target() {
                let mut state = self.inner.state.lock().unwrap();
                let already = !state.connecting.insert(target.clone());
                drop(state);
                if !already {
                    if let Some(provider) = self.inner.provider.lock().unwrap().as_deref() {
                        provider.request_connection(self, &target);
                    }
                }
            }

            let now = Instant::now();
            let elapsed = now.saturating_duration_since(last_tick);
            last_tick = now;
            self.process_idle_connections(elapsed);

            let completed = self.inner.ctl.wait(Some(WAIT_INTERVAL));
            let now2 = Instant::now();
            let elapsed2 = now2.saturating_duration_since(last_tick);
            last_tick = now2;

            match completed {
                None => continue,
                Some(op) if op.identity() == self.inner.wake_id => {
                    let stopped = self.inner.state.lock().unwrap().stopped;
                    if stopped {
                        break;
                    }
                    self.process_cancels();
                }
                Some(op) => {
                    self.dispatch_event(Some(&op), elapsed2);
                }
            }
        }
        self.drain_on_shutdown();
    }

    /// Walks every connection once, looking for ones that became idle
    /// (`WaitForRequest`) or want to close (`Shutdown`) absent any fresh
    /// readiness event — the initial per-iteration sweep from the design's
    /// run-loop step 3.
    fn process_idle_connections(&self, elapsed: Duration) {
        self.dispatch_event(None, elapsed);
    }

    /// Drives every connection with one event and reacts to its outcome.
    /// Passing the same op to every connection (rather than looking up
    /// which one owns it) is the "naive, but contract-preserving" strategy
    /// the design explicitly permits.
    fn dispatch_event(&self, op: Option<&Operation>, elapsed: Duration) {
        let mut state = self.inner.state.lock().unwrap();
        let mut requeue = Vec::new();
        let mut i = 0;
        while i < state.connections.len() {
            let outcome = state.connections[i].handle_event(&self.inner.ctl, op, elapsed);
            match outcome {
                ConnectionOutcome::Transferring => {
                    i += 1;
                }
                ConnectionOutcome::WaitForRequest => {
                    let pos = state
                        .pending
                        .iter()
                        .position(|p| p.request.target() == state.connections[i].target());
                    match pos {
                        Some(pos) => {
                            let pending = state.pending.remove(pos).unwrap();
                            if let Some((id, req)) =
                                state.connections[i].try_attach(pending.id, pending.request)
                            {
                                // Target mismatch despite the lookup above
                                // shouldn't happen, but stay safe and put
                                // it back rather than drop it on the
                                // floor.
                                state.pending.push_front(PendingRequest { id, request: req });
                                i += 1;
                            }
                            // Else: attached. Re-run this slot without
                            // advancing `i` so the connection gets a
                            // chance to make progress in this same pass,
                            // mirroring the source's re-dispatch-in-place.
                        }
                        None => i += 1,
                    }
                }
                ConnectionOutcome::Shutdown => {
                    let mut conn = state.connections.remove(i);
                    if let Some((id, req)) = conn.take_request() {
                        requeue.push(PendingRequest { id, request: req });
                    }
                }
            }
        }
        for pending in requeue.into_iter().rev() {
            state.pending.push_front(pending);
        }
    }

    /// Processes queued cancel ids against live connections, then re-walks
    /// so any `Shutdown` outcome the cancellation produced is handled
    /// before the next `wait`.
    fn process_cancels(&self) {
        let ids: Vec<RequestId> = {
            let mut state = self.inner.state.lock().unwrap();
            state.cancels.drain(..).collect()
        };
        if ids.is_empty() {
            return;
        }
        {
            let mut state = self.inner.state.lock().unwrap();
            for id in ids {
                for conn in &mut state.connections {
                    if conn.cancel_request(id) {
                        break;
                    }
                }
            }
        }
        self.dispatch_event(None, Duration::ZERO);
    }

    fn drain_on_shutdown(&self) {
        let mut state = self.inner.state.lock().unwrap();
        let pending: Vec<PendingRequest> = state.pending.drain(..).collect();
        let mut connections = std::mem::take(&mut state.connections);
        state.connecting.clear();
        drop(state);

        for pending in pending {
            (pending.request.on_complete)(Err(AsyncError::Cancelled));
        }
        for mut conn in connections.drain(..) {
            if let Some((_id, req)) = conn.take_request() {
                (req.on_complete)(Err(AsyncError::Cancelled));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::types::Scheme;
    use std::sync::mpsc;
    use std::thread;

    fn target() -> Target {
        Target::new("example.invalid", 443, Scheme::Https)
    }

    #[test]
    fn add_request_on_stopped_client_fails_with_cancelled() {
        let client = Client::new().unwrap();
        client.stop();
        let (tx, rx) = mpsc::channel();
        let req = Request::new(target(), (), move |result| {
            tx.send(result).unwrap();
        });
        let id = client.add_request(req);
        assert_eq!(id.as_u64(), 1);
        let result = rx.recv().unwrap();
        assert!(matches!(result, Err(AsyncError::Cancelled)));
    }

    #[test]
    fn cancel_before_dispatch_never_touches_provider() {
        struct NoCallProvider(Arc<std::sync::atomic::AtomicBool>);
        impl ConnectionProvider for NoCallProvider {
            fn request_connection(&self, _client: &Client, _target: &Target) {
                self.0.store(true, std::sync::atomic::Ordering::SeqCst);
            }
        }

        let client = Client::new().unwrap();
        let called = Arc::new(std::sync::atomic::AtomicBool::new(false));
        client.set_connection_provider(Box::new(NoCallProvider(called.clone())));

        let (tx, rx) = mpsc::channel();
        let req = Request::new(target(), (), move |result| {
            tx.send(result).unwrap();
        });
        let id = client.add_request(req);
        client.cancel_request(id);

        let result = rx.recv().unwrap();
        assert!(matches!(result, Err(AsyncError::Cancelled)));
        assert!(!called.load(std::sync::atomic::Ordering::SeqCst));

        client.stop();
        let worker = client.clone();
        let handle = thread::spawn(move || worker.run());
        handle.join().unwrap();
    }

    #[test]
    fn stop_drains_pending_requests_as_cancelled() {
        let client = Client::new().unwrap();
        let (tx, rx) = mpsc::channel();
        let req = Request::new(target(), (), move |result| {
            tx.send(result).unwrap();
        });
        client.add_request(req);

        let worker = client.clone();
        let handle = thread::spawn(move || worker.run());
        client.stop();
        handle.join().unwrap();

        let result = rx.recv().unwrap();
        assert!(matches!(result, Err(AsyncError::Cancelled)));
    }

    /// A connection that accepts one request, reports `Transferring` once,
    /// then `Shutdown`s with the request still attached — the shape the
    /// design's retry-on-shutdown property exercises.
    struct FlakyConnection {
        target: Target,
        slot: Option<(RequestId, Request)>,
        ticks_before_shutdown: u32,
    }

    impl HttpConnection for FlakyConnection {
        fn target(&self) -> &Target {
            &self.target
        }

        fn try_attach(
            &mut self,
            id: RequestId,
            request: Request,
        ) -> Option<(RequestId, Request)> {
            if self.slot.is_some() || *request.target() != self.target {
                return Some((id, request));
            }
            self.slot = Some((id, request));
            None
        }

        fn has_request(&self) -> bool {
            self.slot.is_some()
        }

        fn cancel_request(&mut self, id: RequestId) -> bool {
            if self.slot.as_ref().map(|(i, _)| *i) == Some(id) {
                self.slot = None;
                true
            } else {
                false
            }
        }

        fn handle_event(
            &mut self,
            _ctl: &Controller,
            _op: Option<&Operation>,
            _elapsed: Duration,
        ) -> ConnectionOutcome {
            if self.slot.is_none() {
                return ConnectionOutcome::WaitForRequest;
            }
            if self.ticks_before_shutdown > 0 {
                self.ticks_before_shutdown -= 1;
                return ConnectionOutcome::Transferring;
            }
            ConnectionOutcome::Shutdown
        }

        fn take_request(&mut self) -> Option<(RequestId, Request)> {
            self.slot.take()
        }
    }

    struct OneShotProvider {
        target: Target,
        spawned: std::sync::atomic::AtomicUsize,
    }

    impl ConnectionProvider for OneShotProvider {
        fn request_connection(&self, client: &Client, target: &Target) {
            let n = self
                .spawned
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            client.add_connection(Box::new(FlakyConnection {
                target: target.clone(),
                slot: None,
                ticks_before_shutdown: if n == 0 { 0 } else { 100 },
            }));
        }
    }

    #[test]
    fn request_is_requeued_and_retried_after_connection_shutdown() {
        let t = target();
        let client = Client::new().unwrap();
        client.set_connection_provider(Box::new(OneShotProvider {
            target: t.clone(),
            spawned: std::sync::atomic::AtomicUsize::new(0),
        }));

        let (tx, rx) = mpsc::channel();
        let req = Request::new(t, (), move |result| {
            tx.send(result).unwrap();
        });
        client.add_request(req);

        let worker = client.clone();
        let handle = thread::spawn(move || worker.run());

        // The first connection immediately shuts down with the request
        // still attached; the worker must re-queue it and hand it to a
        // second connection rather than failing it. We can't observe the
        // completion (the mock connection never finishes the request) so
        // instead assert the request survives long enough for a second
        // connection to be created and pick it up.
        std::thread::sleep(Duration::from_millis(700));
        client.stop();
        handle.join().unwrap();

        // Draining on stop fails whatever is left with Cancelled — the
        // important thing is it is *this* request, not a silently dropped
        // one, proving it survived the shutdown/requeue cycle.
        let result = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(matches!(result, Err(AsyncError::Cancelled)));
    }

    /// A provider that abandons every target it is asked to connect,
    /// failing the outstanding requests directly via
    /// `cancel_requests_by_target` instead of ever calling
    /// `add_connection` — the behavior `ConnectionProvider::request_connection`'s
    /// docs call out for a permanently-failed DNS lookup.
    struct AbandoningProvider {
        attempts: std::sync::atomic::AtomicUsize,
    }

    impl ConnectionProvider for AbandoningProvider {
        fn request_connection(&self, client: &Client, target: &Target) {
            self.attempts.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            client.cancel_requests_by_target(
                &target.host,
                target.port,
                target.scheme,
                "dns",
                "resolution failed",
            );
        }
    }

    #[test]
    fn cancel_requests_by_target_clears_connecting_so_a_later_request_is_not_stuck() {
        let t = target();
        let client = Client::new().unwrap();
        client.set_connection_provider(Box::new(AbandoningProvider {
            attempts: std::sync::atomic::AtomicUsize::new(0),
        }));

        let (tx1, rx1) = mpsc::channel();
        let req1 = Request::new(t.clone(), (), move |result| {
            tx1.send(result).unwrap();
        });
        client.add_request(req1);

        let worker = client.clone();
        let handle = thread::spawn(move || worker.run());

        // The provider abandons the target without ever calling
        // `add_connection`; the first request must be failed, not left
        // hanging.
        let result1 = rx1.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(matches!(result1, Err(AsyncError::NetworkError(_))));

        // A second request to the same target must not be silently
        // stalled by a stale `connecting` entry: it has to reach the
        // provider again and get resolved (here, failed the same way)
        // rather than sit in `pending` forever.
        let (tx2, rx2) = mpsc::channel();
        let req2 = Request::new(t, (), move |result| {
            tx2.send(result).unwrap();
        });
        client.add_request(req2);
        let result2 = rx2.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(matches!(result2, Err(AsyncError::NetworkError(_))));

        client.stop();
        handle.join().unwrap();
    }
}
