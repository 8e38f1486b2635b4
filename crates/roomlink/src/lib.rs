//! # Roomlink
//!
//! Async client for multiplayer room servers.
//!
//! The server speaks plain named events: the client emits `joinRoom`, the
//! server later emits `joinRoom_response` or `joinRoom_error`, and pushes
//! `roomUpdated` / `gameStarted` / ... whenever it likes. Roomlink turns that
//! into awaitable calls:
//!
//! - [`QueryCorrelator`] pairs each request with its reply, with a timeout
//!   and guaranteed listener cleanup.
//! - [`SubscriptionRegistry`] routes subscriptions and keeps the set of
//!   error callbacks that hear about every failed query.
//! - [`RoomClient`] wires both to a transport and a persisted session
//!   identity, and exposes the room operations.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use roomlink::prelude::*;
//!
//! # async fn run() -> Result<(), ClientError> {
//! let client: RoomClient<WebSocketTransport> = RoomClient::connect(
//!     ClientConfig::default()
//!         .with_server_url("ws://127.0.0.1:3000/")
//!         .on_room_updated(|room| println!("room: {room}")),
//! )
//! .await?;
//!
//! let room = client
//!     .create_room(&CreateRoomArgs {
//!         player_name: "alice".into(),
//!         ..Default::default()
//!     })
//!     .await?;
//! println!("created {room}");
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;
mod query;
mod registry;

pub use client::{RoomClient, RoomClientBuilder};
pub use config::{
    ClientConfig, CorrelationMode, DEFAULT_QUERY_TIMEOUT, DEFAULT_SERVER_URL,
};
pub use error::{ClientError, TIMEOUT_CODE, timeout_payload};
pub use query::QueryCorrelator;
pub use registry::SubscriptionRegistry;

pub use roomlink_protocol::events;
pub use roomlink_protocol::{
    CreateRoomArgs, JoinRoomArgs, Payload, SetPlayerArgs,
};
pub use roomlink_session::{
    FileStore, MemoryStore, Session, SessionError, SessionStore,
};
pub use roomlink_transport::{
    Connect, ConnectOptions, EventTransport, Listener, MemoryTransport,
    ReconnectConfig, TransportError,
};
#[cfg(feature = "websocket")]
pub use roomlink_transport::WebSocketTransport;

pub mod prelude {
    pub use crate::{
        ClientConfig, ClientError, CorrelationMode, CreateRoomArgs, FileStore,
        JoinRoomArgs, Listener, MemoryStore, MemoryTransport, Payload,
        RoomClient, SetPlayerArgs, SessionStore,
    };
    #[cfg(feature = "websocket")]
    pub use crate::WebSocketTransport;
}
