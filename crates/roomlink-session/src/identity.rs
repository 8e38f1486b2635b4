//! The client's view of its own identity on the server.
//!
//! A client has two identifiers:
//! - the **resumption token**, which it submits when connecting so the server
//!   can recognize a returning player; it survives restarts via the store;
//! - the **public id**, which the server announces in its `registered` event
//!   and which lives in memory only.
//!
//! When `registered` arrives, the public id becomes the new resumption token,
//! so the next connect (or reconnect) resumes the identity just confirmed.
//!
//! ```text
//!   load() ──→ token from store ──→ connect(playerID=token)
//!                                        │
//!                      registered(id) ◄──┘
//!                           │
//!            public_id = id, token = id, store[playerID] = id
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{SessionError, SessionStore};

/// Store key (and connect parameter) carrying the resumption token.
pub const RESUMPTION_TOKEN_KEY: &str = "playerID";

/// A snapshot of the session identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Submitted at connect time. `None` for a first-time client.
    pub resumption_token: Option<String>,

    /// Issued by the server. `None` until the first `registered` event.
    pub public_id: Option<String>,
}

/// Owns the session identity for one client instance.
///
/// Shared between the client and its transport callbacks, so all state sits
/// behind a mutex or an atomic and every method takes `&self`.
pub struct SessionIdentity {
    store: Arc<dyn SessionStore>,
    session: Mutex<Session>,
    reconnecting: AtomicBool,
}

impl SessionIdentity {
    /// Reads the persisted token from `store`.
    ///
    /// # Errors
    /// Propagates the store's read error. A token that was never written is
    /// not an error.
    pub fn load(store: Arc<dyn SessionStore>) -> Result<Self, SessionError> {
        let resumption_token = store.get(RESUMPTION_TOKEN_KEY)?;
        match &resumption_token {
            Some(_) => tracing::debug!("resuming persisted session"),
            None => tracing::debug!("no persisted session, connecting fresh"),
        }
        Ok(Self {
            store,
            session: Mutex::new(Session {
                resumption_token,
                public_id: None,
            }),
            reconnecting: AtomicBool::new(false),
        })
    }

    /// The token to submit when (re)connecting.
    pub fn resumption_token(&self) -> Option<String> {
        self.session().resumption_token.clone()
    }

    /// The server-issued public id, once registered.
    pub fn public_id(&self) -> Option<String> {
        self.session().public_id.clone()
    }

    /// Both identifiers at once.
    pub fn snapshot(&self) -> Session {
        self.session().clone()
    }

    /// Handles the server's `registered` event.
    ///
    /// Records `public_id`, adopts it as the resumption token, persists it,
    /// and clears the reconnecting flag. The in-memory identity is updated
    /// even when persisting fails.
    ///
    /// # Errors
    /// Returns the store's write error.
    pub fn record_registration(&self, public_id: &str) -> Result<(), SessionError> {
        {
            let mut session = self.session();
            session.public_id = Some(public_id.to_string());
            session.resumption_token = Some(public_id.to_string());
        }
        self.reconnecting.store(false, Ordering::SeqCst);
        tracing::info!(public_id, "registered with server");

        self.store.set(RESUMPTION_TOKEN_KEY, public_id)
    }

    /// Handles the transport's `reconnection` signal.
    pub fn mark_reconnecting(&self) {
        self.reconnecting.store(true, Ordering::SeqCst);
        tracing::info!("transport reconnected, awaiting registration");
    }

    /// `true` between a `reconnection` and the next `registered`.
    pub fn is_reconnecting(&self) -> bool {
        self.reconnecting.load(Ordering::SeqCst)
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SessionIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionIdentity")
            .field("session", &*self.session())
            .field("reconnecting", &self.is_reconnecting())
            .finish_non_exhaustive()
    }
}

// =========================================================================
// Tests
// =========================================================================
