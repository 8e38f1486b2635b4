//! Subscription registry: the one place listeners are added and removed.
//!
//! Every subscription goes through here on its way to the transport. The
//! registry also keeps a second list, the **error-callback set**: every
//! listener subscribed under the reserved event name `"error"`. Those run
//! when the server pushes `error` (via the transport, like any listener)
//! *and* whenever a query fails (via [`SubscriptionRegistry::notify_errors`]).

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use roomlink_protocol::Payload;
use roomlink_protocol::events::ERROR;
use roomlink_transport::{EventTransport, Listener};

/// Routes subscriptions to the transport and tracks error callbacks.
pub struct SubscriptionRegistry<T: EventTransport> {
    transport: Arc<T>,
    error_callbacks: Mutex<Vec<Listener>>,
}

impl<T: EventTransport> SubscriptionRegistry<T> {
    /// A registry over `transport` with no error callbacks.
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            error_callbacks: Mutex::new(Vec::new()),
        }
    }

    /// Registers `listener` for `event`.
    ///
    /// Under `"error"` the listener also joins the error-callback set.
    pub fn subscribe(&self, event: &str, listener: Listener) {
        if event == ERROR {
            self.error_callbacks().push(listener.clone());
        }
        self.transport.on(event, listener);
        tracing::trace!(event, "subscribed");
    }

    /// Removes the exact `(event, listener)` pair.
    ///
    /// Matching is by listener identity: pass the same `Listener` (or a clone
    /// of it) that was subscribed. Removing an unknown pair does nothing.
    pub fn unsubscribe(&self, event: &str, listener: &Listener) {
        self.transport.off(event, listener);
        if event == ERROR {
            self.error_callbacks().retain(|l| l != listener);
        }
        tracing::trace!(event, "unsubscribed");
    }

    /// Invokes every error callback with `payload`.
    ///
    /// Returns how many ran. The set is snapshotted first, so a callback
    /// may unsubscribe itself without skipping the others.
    pub fn notify_errors(&self, payload: &Payload) -> usize {
        let snapshot = self.error_callbacks().clone();
        for callback in &snapshot {
            callback.call(payload);
        }
        snapshot.len()
    }

    /// Number of listeners in the error-callback set.
    pub fn error_callback_count(&self) -> usize {
        self.error_callbacks().len()
    }

    /// Number of listeners the transport holds for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.transport.listener_count(event)
    }

    /// The underlying transport.
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    fn error_callbacks(&self) -> MutexGuard<'_, Vec<Listener>> {
        self.error_callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
