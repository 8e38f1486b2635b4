use roomlink_protocol::ProtocolError;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The server could not be reached or refused the handshake.
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    /// The server URL or one of its connect params is malformed.
    #[error("invalid server url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A frame could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The transport was closed by the client.
    #[error("transport closed")]
    Closed,
}
