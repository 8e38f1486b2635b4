//! Codec trait and the JSON implementation for event frames.
//!
//! A "codec" (coder/decoder) turns an [`EventFrame`] into bytes for the
//! socket and back. The transport only needs something that implements
//! [`Codec`]; room servers speak JSON, so [`JsonCodec`] is the default.

use crate::{EventFrame, ProtocolError};

/// Encodes frames to bytes and decodes bytes back into frames.
///
/// `Send + Sync + 'static` because the codec lives inside the transport's
/// background task for the whole life of the connection.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a frame.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if the payload can't be represented.
    fn encode(&self, frame: &EventFrame) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes a frame.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] for malformed input and
    /// [`ProtocolError::InvalidFrame`] for an empty event name.
    fn decode(&self, data: &[u8]) -> Result<EventFrame, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use roomlink_protocol::{Codec, EventFrame, JsonCodec};
/// use serde_json::json;
///
/// let codec = JsonCodec;
/// let frame = EventFrame::new("getRoom", json!(null));
///
/// let bytes = codec.encode(&frame).unwrap();
/// let decoded = codec.decode(&bytes).unwrap();
/// assert_eq!(frame, decoded);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, frame: &EventFrame) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(frame).map_err(ProtocolError::Encode)
    }

    fn decode(&self, data: &[u8]) -> Result<EventFrame, ProtocolError> {
        let frame: EventFrame =
            serde_json::from_slice(data).map_err(ProtocolError::Decode)?;
        if frame.event.is_empty() {
            return Err(ProtocolError::InvalidFrame(
                "event name is empty".into(),
            ));
        }
        Ok(frame)
    }
}
