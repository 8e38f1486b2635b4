//! In-process loopback transport.
//!
//! [`MemoryTransport`] plays the server's side of the wire from inside the
//! process: it records what the client emits and lets the caller push events
//! back with [`deliver`](MemoryTransport::deliver). The client crate's tests
//! drive every query scenario through it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use roomlink_protocol::events::{CONNECT, DISCONNECT, RECONNECTION};
use roomlink_protocol::{EventFrame, Payload};
use tokio::sync::Notify;

use crate::{
    Connect, ConnectOptions, ConnectionId, EventTransport, Listener,
    ListenerMap, TransportError,
};

/// A loopback [`EventTransport`]. Cloning yields another handle to the same
/// connection.
#[derive(Clone)]
pub struct MemoryTransport {
    inner: Arc<Inner>,
}

struct Inner {
    id: ConnectionId,
    listeners: ListenerMap,
    options: Mutex<ConnectOptions>,
    emitted: Mutex<Vec<EventFrame>>,
    emit_signal: Notify,
    closed: AtomicBool,
}

impl MemoryTransport {
    /// Creates a loopback "connected" with `options`.
    pub fn new(options: ConnectOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                id: ConnectionId::next(),
                listeners: ListenerMap::new(),
                options: Mutex::new(options),
                emitted: Mutex::new(Vec::new()),
                emit_signal: Notify::new(),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// The options this transport currently reconnects with.
    pub fn connect_options(&self) -> ConnectOptions {
        lock(&self.inner.options).clone()
    }

    /// Shorthand for one connect param.
    pub fn connect_param(&self, key: &str) -> Option<String> {
        lock(&self.inner.options).param(key).map(str::to_string)
    }

    /// Every frame emitted so far, oldest first.
    pub fn emitted(&self) -> Vec<EventFrame> {
        lock(&self.inner.emitted).clone()
    }

    /// How many frames named `event` have been emitted.
    pub fn emitted_count(&self, event: &str) -> usize {
        lock(&self.inner.emitted)
            .iter()
            .filter(|f| f.event == event)
            .count()
    }

    /// Waits until at least `count` frames named `event` have been emitted,
    /// then returns the latest of them.
    pub async fn wait_for_emit(&self, event: &str, count: usize) -> EventFrame {
        loop {
            let notified = self.inner.emit_signal.notified();
            {
                let emitted = lock(&self.inner.emitted);
                let matching: Vec<&EventFrame> =
                    emitted.iter().filter(|f| f.event == event).collect();
                if matching.len() >= count.max(1) {
                    if let Some(frame) = matching.last() {
                        return (*frame).clone();
                    }
                }
            }
            notified.await;
        }
    }

    /// Simulates the server pushing `event`. Returns how many listeners ran.
    pub fn deliver(&self, event: &str, payload: Payload) -> usize {
        tracing::trace!(event, "loopback deliver");
        self.inner.listeners.dispatch(event, &payload)
    }

    /// Simulates a dropped and re-established link.
    pub fn simulate_reconnect(&self) {
        self.deliver(DISCONNECT, Payload::Null);
        self.deliver(RECONNECTION, Payload::Null);
        self.deliver(CONNECT, Payload::Null);
    }

    /// Number of listeners across all events.
    pub fn total_listeners(&self) -> usize {
        self.inner.listeners.total()
    }

    /// Whether [`close`](EventTransport::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

impl EventTransport for MemoryTransport {
    fn emit(&self, event: &str, payload: Payload) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        lock(&self.inner.emitted).push(EventFrame::new(event, payload));
        self.inner.emit_signal.notify_waiters();
        Ok(())
    }

    fn on(&self, event: &str, listener: Listener) {
        self.inner.listeners.add(event, listener);
    }

    fn off(&self, event: &str, listener: &Listener) {
        self.inner.listeners.remove(event, listener);
    }

    fn listener_count(&self, event: &str) -> usize {
        self.inner.listeners.count(event)
    }

    fn set_connect_param(&self, key: &str, value: &str) {
        lock(&self.inner.options).set_param(key, value);
    }

    fn id(&self) -> ConnectionId {
        self.inner.id
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.inner.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

impl Connect for MemoryTransport {
    async fn connect(options: ConnectOptions) -> Result<Self, TransportError> {
        // Same validation as a real transport, so bad URLs fail in tests too.
        options.endpoint()?;
        Ok(Self::new(options))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
