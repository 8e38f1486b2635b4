//! Wire protocol for Roomlink.
//!
//! This crate defines the "language" the client speaks to a room server:
//!
//! - **Frames** ([`EventFrame`]): one named event plus its JSON payload.
//! - **Event names** ([`events`]): the reserved push events and the
//!   `<request>_response` / `<request>_error` naming rule for replies.
//! - **Request arguments** ([`CreateRoomArgs`], [`JoinRoomArgs`], ...):
//!   the payloads of the room operations.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): frames to/from bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! ```text
//! Transport (frames on a socket) → Protocol (EventFrame) → Client (query / subscribe)
//! ```
//!
//! The protocol layer doesn't know about connections or pending queries.
//! It only knows how events are named and how they are serialized.

mod codec;
mod error;
pub mod events;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    CreateRoomArgs, EventFrame, JoinRoomArgs, Payload, SetPlayerArgs,
};
