//! Event names used on the wire.
//!
//! Requests and replies are correlated purely by name: a request `getRoom`
//! is answered by either `getRoom_response` or `getRoom_error`. The helpers
//! [`response_event`] and [`error_event`] are the single place that rule
//! lives, so the client and any test server derive the same names.

// ---------------------------------------------------------------------------
// Outbound requests
// ---------------------------------------------------------------------------

/// Client → Server: create a room and join it as its first player.
pub const CREATE_ROOM: &str = "createRoom";
/// Client → Server: join an existing room by code.
pub const JOIN_ROOM: &str = "joinRoom";
/// Client → Server: leave the current room.
pub const LEAVE_ROOM: &str = "leaveRoom";
/// Client → Server: fetch the current room.
pub const GET_ROOM: &str = "getRoom";
/// Client → Server: update this player's name and data.
pub const SET_PLAYER: &str = "setPlayer";
/// Client → Server: replace the room settings.
pub const SET_ROOM_SETTINGS: &str = "setRoomSettings";
/// Client → Server: start the game in the current room.
pub const START_GAME: &str = "startGame";

// ---------------------------------------------------------------------------
// Unsolicited pushes
// ---------------------------------------------------------------------------

/// Server → Client: the connection is registered. Payload: the public id.
pub const REGISTERED: &str = "registered";
/// Server → Client: the room changed. Payload: the room.
pub const ROOM_UPDATED: &str = "roomUpdated";
/// Server → Client: the room no longer exists.
pub const ROOM_DESTROYED: &str = "roomDestroyed";
/// Server → Client: the game started.
pub const GAME_STARTED: &str = "gameStarted";
/// Server → Client: a player left the room.
pub const PLAYER_LEFT: &str = "playerLeft";
/// Server → Client: a player came back after a disconnect.
pub const PLAYER_REJOINED: &str = "playerRejoined";
/// Server → Client: a general error. Also the reserved name for error
/// callbacks on the client.
pub const ERROR: &str = "error";

// ---------------------------------------------------------------------------
// Transport lifecycle
// ---------------------------------------------------------------------------

/// The link is up (fired again after every successful reconnect).
pub const CONNECT: &str = "connect";
/// The link was lost.
pub const DISCONNECT: &str = "disconnect";
/// The transport re-established a lost link.
pub const RECONNECTION: &str = "reconnection";

/// Suffix of the event that carries a successful reply.
pub const RESPONSE_SUFFIX: &str = "_response";
/// Suffix of the event that carries a failed reply.
pub const ERROR_SUFFIX: &str = "_error";

/// Returns the name of the success reply for `request`.
///
/// ```rust
/// assert_eq!(roomlink_protocol::events::response_event("getRoom"), "getRoom_response");
/// ```
pub fn response_event(request: &str) -> String {
    format!("{request}{RESPONSE_SUFFIX}")
}

/// Returns the name of the error reply for `request`.
pub fn error_event(request: &str) -> String {
    format!("{request}{ERROR_SUFFIX}")
}
