//! `RoomClient`: bootstrap, session wiring, and the room operations.
//!
//! Construction ties the layers together:
//!
//! 1. Load the resumption token from the [`SessionStore`].
//! 2. Connect the transport with `playerID=<token>` (when there is one).
//! 3. Subscribe the session listeners (`registered`, `reconnection`) and the
//!    push listeners from [`ClientConfig`].
//!
//! After that, every room operation is a single [`RoomClient::query`] call.

use std::marker::PhantomData;
use std::sync::{Arc, Weak};

use roomlink_protocol::events::{
    CREATE_ROOM, GET_ROOM, JOIN_ROOM, LEAVE_ROOM, RECONNECTION, REGISTERED,
    SET_PLAYER, SET_ROOM_SETTINGS, START_GAME,
};
use roomlink_protocol::{
    CreateRoomArgs, JoinRoomArgs, Payload, SetPlayerArgs,
};
use roomlink_session::{
    MemoryStore, RESUMPTION_TOKEN_KEY, Session, SessionIdentity, SessionStore,
};
use roomlink_transport::{Connect, ConnectOptions, EventTransport, Listener};
use serde::Serialize;

use crate::{ClientConfig, ClientError, QueryCorrelator, SubscriptionRegistry};

/// An async client for a room server.
///
/// Generic over the transport so tests can run it on a
/// [`MemoryTransport`](roomlink_transport::MemoryTransport); applications use
/// the default [`WebSocketTransport`](roomlink_transport::WebSocketTransport)
/// through [`RoomClient::connect`].
pub struct RoomClient<T: EventTransport> {
    transport: Arc<T>,
    registry: Arc<SubscriptionRegistry<T>>,
    queries: QueryCorrelator<T>,
    identity: Arc<SessionIdentity>,
}

/// Builder for a [`RoomClient`].
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use roomlink::prelude::*;
///
/// # async fn run() -> Result<(), ClientError> {
/// let client: RoomClient<WebSocketTransport> = RoomClient::builder()
///     .config(ClientConfig::default().with_server_url("ws://127.0.0.1:3000/"))
///     .store(Arc::new(FileStore::new("session.json")))
///     .connect()
///     .await?;
/// let room = client.get_room().await?;
/// # Ok(())
/// # }
/// ```
pub struct RoomClientBuilder<T> {
    config: ClientConfig,
    store: Arc<dyn SessionStore>,
    _transport: PhantomData<fn() -> T>,
}

impl<T: Connect> Default for RoomClientBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Connect> RoomClientBuilder<T> {
    /// Default config, in-memory session store.
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            store: Arc::new(MemoryStore::new()),
            _transport: PhantomData,
        }
    }

    /// Replaces the whole configuration.
    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets where the resumption token is persisted.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = store;
        self
    }

    /// Opens the transport and wires up the client.
    ///
    /// # Errors
    /// Store read errors and transport connect errors propagate unchanged.
    pub async fn connect(self) -> Result<RoomClient<T>, ClientError> {
        RoomClient::connect_with_store(self.config, self.store).await
    }
}

impl<T: EventTransport> RoomClient<T> {
    /// Starts a [`RoomClientBuilder`].
    pub fn builder() -> RoomClientBuilder<T>
    where
        T: Connect,
    {
        RoomClientBuilder::new()
    }

    /// Connects with `config` and an in-memory session store.
    ///
    /// # Errors
    /// See [`RoomClientBuilder::connect`].
    pub async fn connect(config: ClientConfig) -> Result<Self, ClientError>
    where
        T: Connect,
    {
        Self::connect_with_store(config, Arc::new(MemoryStore::new())).await
    }

    /// Connects with `config`, resuming the identity persisted in `store`.
    ///
    /// # Errors
    /// See [`RoomClientBuilder::connect`].
    pub async fn connect_with_store(
        config: ClientConfig,
        store: Arc<dyn SessionStore>,
    ) -> Result<Self, ClientError>
    where
        T: Connect,
    {
        let identity = Arc::new(SessionIdentity::load(store)?);

        let mut options = ConnectOptions::new(config.resolved_server_url())
            .with_reconnect(config.reconnect.clone());
        if let Some(token) = identity.resumption_token() {
            options.set_param(RESUMPTION_TOKEN_KEY, &token);
        }

        let transport = Arc::new(T::connect(options).await?);
        tracing::info!(id = %transport.id(), url = config.resolved_server_url(), "room client connected");

        Ok(Self::assemble(transport, identity, &config))
    }

    /// Wires the registry, correlator, and listeners around a transport.
    fn assemble(
        transport: Arc<T>,
        identity: Arc<SessionIdentity>,
        config: &ClientConfig,
    ) -> Self {
        let registry = Arc::new(SubscriptionRegistry::new(Arc::clone(&transport)));

        registry.subscribe(
            REGISTERED,
            registration_listener(Arc::downgrade(&transport), Arc::clone(&identity)),
        );
        registry.subscribe(RECONNECTION, {
            let identity = Arc::clone(&identity);
            Listener::new(move |_| identity.mark_reconnecting())
        });
        for (event, listener) in config.push_listeners() {
            registry.subscribe(event, listener);
        }

        let queries = QueryCorrelator::new(
            Arc::clone(&registry),
            config.query_timeout,
            config.correlation,
        );

        Self {
            transport,
            registry,
            queries,
            identity,
        }
    }

    // -----------------------------------------------------------------------
    // Core
    // -----------------------------------------------------------------------

    /// Emits `request` with `args` and awaits `<request>_response`.
    ///
    /// # Errors
    /// See [`QueryCorrelator::query`]; additionally
    /// [`ClientError::InvalidArgs`] if `args` can't be serialized.
    pub async fn query<A: Serialize + ?Sized>(
        &self,
        request: &str,
        args: &A,
    ) -> Result<Payload, ClientError> {
        let args = serde_json::to_value(args).map_err(|source| {
            ClientError::InvalidArgs {
                request: request.to_string(),
                source,
            }
        })?;
        self.queries.query(request, args).await
    }

    /// Registers `listener` for `event`. Subscribing under `"error"` also
    /// makes it an error callback for failed queries.
    pub fn subscribe(&self, event: &str, listener: Listener) {
        self.registry.subscribe(event, listener);
    }

    /// Removes the exact `(event, listener)` pair; a no-op if absent.
    pub fn unsubscribe(&self, event: &str, listener: &Listener) {
        self.registry.unsubscribe(event, listener);
    }

    /// The server-issued public id, once `registered` has arrived.
    pub fn public_id(&self) -> Option<String> {
        self.identity.public_id()
    }

    /// The current session identity.
    pub fn session(&self) -> Session {
        self.identity.snapshot()
    }

    /// `true` between a transport reconnection and the next `registered`.
    pub fn is_reconnecting(&self) -> bool {
        self.identity.is_reconnecting()
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The subscription registry.
    pub fn registry(&self) -> &SubscriptionRegistry<T> {
        &self.registry
    }

    /// Closes the transport. Pending queries run into their timeout.
    ///
    /// # Errors
    /// Propagates the transport's close error.
    pub async fn close(&self) -> Result<(), ClientError> {
        self.transport.close().await?;
        tracing::info!(id = %self.transport.id(), "room client closed");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Room operations
    // -----------------------------------------------------------------------

    /// `createRoom`: create a room and join it.
    pub async fn create_room(&self, args: &CreateRoomArgs) -> Result<Payload, ClientError> {
        self.query(CREATE_ROOM, args).await
    }

    /// `joinRoom`: join a room by code.
    pub async fn join_room(&self, args: &JoinRoomArgs) -> Result<Payload, ClientError> {
        self.query(JOIN_ROOM, args).await
    }

    /// `leaveRoom`: leave the current room.
    pub async fn leave_room(&self) -> Result<Payload, ClientError> {
        self.query(LEAVE_ROOM, &Payload::Null).await
    }

    /// `getRoom`: fetch the current room.
    pub async fn get_room(&self) -> Result<Payload, ClientError> {
        self.query(GET_ROOM, &Payload::Null).await
    }

    /// `setPlayer`: update this player's name and data.
    pub async fn set_player(&self, args: &SetPlayerArgs) -> Result<Payload, ClientError> {
        self.query(SET_PLAYER, args).await
    }

    /// `setRoomSettings`: replace the room settings. The settings object is
    /// sent as-is.
    pub async fn set_room_settings<S: Serialize + ?Sized>(
        &self,
        settings: &S,
    ) -> Result<Payload, ClientError> {
        self.query(SET_ROOM_SETTINGS, settings).await
    }

    /// `startGame`: start the game in the current room.
    pub async fn start_game(&self) -> Result<Payload, ClientError> {
        self.query(START_GAME, &Payload::Null).await
    }
}

/// Handles `registered`: record the public id, persist it as the resumption
/// token, and make later reconnects submit it.
///
/// Holds the transport weakly: the transport owns this listener, so a strong
/// reference would keep both alive forever.
fn registration_listener<T: EventTransport>(
    transport: Weak<T>,
    identity: Arc<SessionIdentity>,
) -> Listener {
    Listener::new(move |payload| {
        let public_id = match payload {
            Payload::String(id) => id.clone(),
            Payload::Number(n) => n.to_string(),
            other => {
                tracing::warn!(payload = %other, "ignoring registered event without an id");
                return;
            }
        };
        if let Err(e) = identity.record_registration(&public_id) {
            tracing::warn!(error = %e, "failed to persist resumption token");
        }
        if let Some(transport) = transport.upgrade() {
            transport.set_connect_param(RESUMPTION_TOKEN_KEY, &public_id);
        }
    })
}
