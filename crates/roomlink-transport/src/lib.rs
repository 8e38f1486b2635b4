//! Event transport layer for Roomlink.
//!
//! Provides the [`EventTransport`] and [`Connect`] traits that abstract over a
//! bidirectional publish/subscribe channel: the client emits named events and
//! registers listeners for named events, with no acknowledgment and no
//! request/response pairing. Correlation is built on top of this by the
//! `roomlink` crate.
//!
//! Two implementations ship with the crate:
//!
//! - [`MemoryTransport`]: in-process loopback, for tests and offline tooling
//! - [`WebSocketTransport`]: WebSocket client via `tokio-tungstenite`
//!
//! # Lifecycle events
//!
//! Link changes are delivered as ordinary events with reserved names
//! ([`events::CONNECT`](roomlink_protocol::events::CONNECT),
//! [`events::DISCONNECT`](roomlink_protocol::events::DISCONNECT),
//! [`events::RECONNECTION`](roomlink_protocol::events::RECONNECTION)),
//! so the session layer subscribes to them like any server push.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
mod listeners;
mod memory;
mod options;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use listeners::ListenerMap;
pub use memory::MemoryTransport;
pub use options::{ConnectOptions, ReconnectConfig};
#[cfg(feature = "websocket")]
pub use websocket::WebSocketTransport;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use roomlink_protocol::Payload;

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque, transport-generated identifier for a connection.
///
/// This is NOT the player's identity: the server issues that separately
/// through the `registered` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocates the next process-unique id.
    pub(crate) fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Listener
// ---------------------------------------------------------------------------

/// A callback invoked with the payload of every matching event.
///
/// Listeners are compared by *identity*, not by behavior: two listeners are
/// equal only if one is a clone of the other. Keep the `Listener` you passed
/// to `on` and hand the same one (or a clone of it) to `off`.
///
/// ```rust
/// use roomlink_transport::Listener;
///
/// let a = Listener::new(|_| {});
/// let b = Listener::new(|_| {});
/// assert_eq!(a, a.clone());
/// assert_ne!(a, b);
/// ```
#[derive(Clone)]
pub struct Listener(Arc<dyn Fn(&Payload) + Send + Sync>);

impl Listener {
    /// Wraps a closure into a listener with a fresh identity.
    pub fn new(f: impl Fn(&Payload) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Invokes the listener.
    pub fn call(&self, payload: &Payload) {
        (self.0)(payload);
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Listener {}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listener({:p})", Arc::as_ptr(&self.0).cast::<()>())
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// A bidirectional, fire-and-forget event channel.
///
/// All methods except [`close`](EventTransport::close) are synchronous: they
/// only touch in-memory tables or queue a frame, never wait on the network.
pub trait EventTransport: Send + Sync + 'static {
    /// Queues `event` with `payload` for the server.
    ///
    /// Frames from one transport reach the server in emit order. There is
    /// no delivery acknowledgment.
    ///
    /// # Errors
    /// [`TransportError::Closed`] after [`close`](EventTransport::close),
    /// or [`TransportError::Protocol`] if the frame can't be encoded.
    fn emit(&self, event: &str, payload: Payload) -> Result<(), TransportError>;

    /// Registers `listener` for `event`. The same event may have any number
    /// of listeners; all of them run, in registration order.
    fn on(&self, event: &str, listener: Listener);

    /// Removes `listener` from `event`. A no-op if it isn't registered.
    fn off(&self, event: &str, listener: &Listener);

    /// Number of listeners currently registered for `event`.
    fn listener_count(&self, event: &str) -> usize;

    /// Sets a connect-time query parameter used by later reconnects.
    fn set_connect_param(&self, key: &str, value: &str);

    /// The transport-generated id of this connection.
    fn id(&self) -> ConnectionId;

    /// Shuts the link down. Later emits fail with [`TransportError::Closed`].
    async fn close(&self) -> Result<(), TransportError>;
}

/// A transport that can open itself from [`ConnectOptions`].
pub trait Connect: EventTransport + Sized {
    /// Opens a connection to `options.url` carrying `options.params`.
    ///
    /// # Errors
    /// Returns [`TransportError::InvalidUrl`] or
    /// [`TransportError::ConnectFailed`]; these are not retried.
    async fn connect(options: ConnectOptions) -> Result<Self, TransportError>;
}
