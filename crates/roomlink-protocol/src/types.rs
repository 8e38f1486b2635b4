//! Types that travel on the wire.
//!
//! Every message in either direction is an [`EventFrame`]: an event name and
//! a JSON payload. The payload shape is owned by the server, so it stays an
//! untyped [`Payload`] everywhere except the request arguments the client
//! builds itself.

use serde::{Deserialize, Serialize};

/// A JSON payload carried by an event.
///
/// Room state, player data, and error bodies are all defined by the server,
/// so the client passes them through as `serde_json::Value`.
pub type Payload = serde_json::Value;

// ---------------------------------------------------------------------------
// EventFrame
// ---------------------------------------------------------------------------

/// One named event on the wire.
///
/// ```text
/// { "event": "getRoom_response", "data": { "roomCode": "AB12", "players": [] } }
/// ```
///
/// `data` defaults to `null` when absent, so `{"event":"roomDestroyed"}` is a
/// valid frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventFrame {
    /// The event name (`getRoom`, `registered`, `joinRoom_error`, ...).
    pub event: String,

    /// The payload. `null` for events that carry nothing.
    #[serde(default)]
    pub data: Payload,
}

impl EventFrame {
    /// Creates a frame for `event` carrying `data`.
    pub fn new(event: impl Into<String>, data: Payload) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }
}

// ---------------------------------------------------------------------------
// Request arguments
// ---------------------------------------------------------------------------

/// Arguments of `createRoom`.
///
/// `#[serde(rename_all = "camelCase")]` produces `playerName`, `playerData`
/// and `roomSettings`, the field names the room server reads.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomArgs {
    /// Display name of the creating player.
    pub player_name: String,
    /// Game-specific player data, opaque to the client.
    pub player_data: Payload,
    /// Initial room settings, opaque to the client.
    pub room_settings: Payload,
}

/// Arguments of `joinRoom`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomArgs {
    /// Display name of the joining player.
    pub player_name: String,
    /// Game-specific player data.
    pub player_data: Payload,
    /// The code of the room to join.
    pub room_code: String,
}

/// Arguments of `setPlayer`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPlayerArgs {
    /// New display name.
    pub player_name: String,
    /// New player data.
    pub player_data: Payload,
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The server reads exact JSON shapes, so these tests pin the field
    //! names our serde attributes produce.

    use serde_json::json;

    use super::*;

    #[test]
    fn test_event_frame_json_format() {
        let frame = EventFrame::new("getRoom", json!({ "a": 1 }));
        let json = serde_json::to_value(&frame).unwrap();

        assert_eq!(json, json!({ "event": "getRoom", "data": { "a": 1 } }));
    }

    #[test]
    fn test_event_frame_missing_data_defaults_to_null() {
        let frame: EventFrame =
            serde_json::from_str(r#"{"event":"roomDestroyed"}"#).unwrap();

        assert_eq!(frame.event, "roomDestroyed");
        assert!(frame.data.is_null());
    }

    #[test]
    fn test_event_frame_missing_event_is_rejected() {
        let result = serde_json::from_str::<EventFrame>(r#"{"data":1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_create_room_args_use_camel_case() {
        let args = CreateRoomArgs {
            player_name: "Al".into(),
            player_data: json!({ "color": "red" }),
            room_settings: json!({ "maxPlayers": 4 }),
        };
        let json = serde_json::to_value(&args).unwrap();

        assert_eq!(json["playerName"], "Al");
        assert_eq!(json["playerData"]["color"], "red");
        assert_eq!(json["roomSettings"]["maxPlayers"], 4);
    }

    #[test]
    fn test_join_room_args_use_camel_case() {
        let args = JoinRoomArgs {
            player_name: "Al".into(),
            player_data: json!({}),
            room_code: "ZZZZ".into(),
        };
        let json = serde_json::to_value(&args).unwrap();

        assert_eq!(
            json,
            json!({ "playerName": "Al", "playerData": {}, "roomCode": "ZZZZ" })
        );
    }

    #[test]
    fn test_set_player_args_default_data_is_null() {
        let args = SetPlayerArgs {
            player_name: "Bo".into(),
            ..SetPlayerArgs::default()
        };
        let json = serde_json::to_value(&args).unwrap();

        assert_eq!(json["playerName"], "Bo");
        assert!(json["playerData"].is_null());
    }
}
