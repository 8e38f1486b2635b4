//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding event frames.
///
/// Each crate in Roomlink defines its own error enum, so a `ProtocolError`
/// always means the problem is in serialization, not in networking or in
/// the server's answer to a query.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust value into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a frame).
    ///
    /// Common causes: malformed JSON, a missing `event` field, or a
    /// truncated message.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame parsed but breaks a protocol rule, e.g. an empty event name.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
}
