//! The listener table shared by every transport implementation.
//!
//! # Dispatch safety
//!
//! Listeners routinely change the table while they run: a pending query's
//! reply listener removes itself (and its sibling) the moment it fires.
//! [`ListenerMap::dispatch`] therefore copies the listener list for the event
//! and releases the lock *before* invoking anything. A listener removed
//! mid-dispatch still receives the event being dispatched, one added
//! mid-dispatch waits for the next one, and nothing is ever skipped.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use roomlink_protocol::Payload;

use crate::Listener;

/// Event name → listeners, in registration order.
#[derive(Debug, Default)]
pub struct ListenerMap {
    inner: Mutex<HashMap<String, Vec<Listener>>>,
}

impl ListenerMap {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `listener` to `event`.
    pub fn add(&self, event: &str, listener: Listener) {
        self.lock()
            .entry(event.to_string())
            .or_default()
            .push(listener);
    }

    /// Removes every registration of `listener` under `event`.
    ///
    /// Returns `true` if anything was removed. Other events, and other
    /// listeners of the same event, are never touched.
    pub fn remove(&self, event: &str, listener: &Listener) -> bool {
        let mut map = self.lock();
        let Some(list) = map.get_mut(event) else {
            return false;
        };
        let before = list.len();
        list.retain(|l| l != listener);
        let removed = list.len() != before;
        if list.is_empty() {
            map.remove(event);
        }
        removed
    }

    /// Invokes every listener of `event` with `payload`.
    ///
    /// Returns how many listeners ran.
    pub fn dispatch(&self, event: &str, payload: &Payload) -> usize {
        // Snapshot, then release the lock before calling out.
        let snapshot: Vec<Listener> = match self.lock().get(event) {
            Some(list) => list.clone(),
            None => return 0,
        };
        for listener in &snapshot {
            listener.call(payload);
        }
        snapshot.len()
    }

    /// Number of listeners registered for `event`.
    pub fn count(&self, event: &str) -> usize {
        self.lock().get(event).map_or(0, Vec::len)
    }

    /// Number of listeners across all events.
    pub fn total(&self) -> usize {
        self.lock().values().map(Vec::len).sum()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<Listener>>> {
        // A listener that panicked mid-`add` can't leave the map torn: every
        // mutation above is a single call on the map.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
