//! Session identity for Roomlink clients.
//!
//! This crate answers one question for the client: "who am I to the server,
//! and how do I prove it again after a reconnect or a restart?"
//!
//! 1. **Persistence**: a resumption token kept in a [`SessionStore`]
//!    ([`MemoryStore`], [`FileStore`], or your own)
//! 2. **Identity**: the server-issued public id, captured when the server
//!    sends `registered` ([`SessionIdentity`])
//! 3. **Reconnection state**: a diagnostic flag set while the transport is
//!    re-establishing a lost link
//!
//! # How it fits in the stack
//!
//! ```text
//! Client (above)  ← reads the token at connect time, feeds it `registered`
//!     ↕
//! Session Layer (this crate)  ← token + public id + reconnecting flag
//!     ↕
//! Store (below)  ← any key-value persistence
//! ```

mod error;
mod identity;
mod store;

pub use error::SessionError;
pub use identity::{RESUMPTION_TOKEN_KEY, Session, SessionIdentity};
pub use store::{FileStore, MemoryStore, SessionStore};
