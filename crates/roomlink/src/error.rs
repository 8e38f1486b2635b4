//! Unified error type for the Roomlink client.

use std::time::Duration;

use roomlink_protocol::Payload;
use roomlink_session::SessionError;
use roomlink_transport::TransportError;

/// The error code carried by a synthesized timeout payload.
pub const TIMEOUT_CODE: &str = "timeout";

/// The payload delivered to error callbacks when a query times out:
/// `{"code": "timeout"}`.
pub fn timeout_payload() -> Payload {
    serde_json::json!({ "code": TIMEOUT_CODE })
}

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` variants let `?` lift transport and session errors
/// automatically. The query variants are produced by the correlation layer.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A transport-level error (connect, emit after close, bad URL).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The session store couldn't be read at construction.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The server answered `<request>_error`.
    #[error("{request} rejected by server: {payload}")]
    Rejected { request: String, payload: Payload },

    /// No reply arrived in time.
    #[error("{request} timed out after {timeout:?}")]
    Timeout { request: String, timeout: Duration },

    /// Single-flight mode: a query with this name is still pending.
    #[error("a {request} query is already in flight")]
    AlreadyInFlight { request: String },

    /// The arguments couldn't be serialized to JSON.
    #[error("invalid arguments for {request}: {source}")]
    InvalidArgs {
        request: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ClientError {
    /// The payload error callbacks received for this failure.
    ///
    /// The server's body for [`Rejected`](Self::Rejected),
    /// `{"code": "timeout"}` for [`Timeout`](Self::Timeout), `None` for
    /// errors that never reached the callbacks.
    pub fn payload(&self) -> Option<Payload> {
        match self {
            Self::Rejected { payload, .. } => Some(payload.clone()),
            Self::Timeout { .. } => Some(timeout_payload()),
            _ => None,
        }
    }

    /// The `code` field of [`payload`](Self::payload), if it is a string.
    ///
    /// ```rust
    /// # use std::time::Duration;
    /// use roomlink::ClientError;
    ///
    /// let err = ClientError::Timeout { request: "startGame".into(), timeout: Duration::from_secs(5) };
    /// assert_eq!(err.code().as_deref(), Some("timeout"));
    /// ```
    pub fn code(&self) -> Option<String> {
        self.payload()?
            .get("code")?
            .as_str()
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err: ClientError = TransportError::Closed.into();
        assert!(matches!(err, ClientError::Transport(_)));
        assert_eq!(err.to_string(), "transport closed");
    }

    #[test]
    fn test_from_session_error() {
        let err: ClientError = SessionError::Store("nope".into()).into();
        assert!(matches!(err, ClientError::Session(_)));
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_rejected_payload_and_code() {
        let err = ClientError::Rejected {
            request: "joinRoom".into(),
            payload: json!({ "code": "room_not_found" }),
        };

        assert_eq!(err.payload(), Some(json!({ "code": "room_not_found" })));
        assert_eq!(err.code().as_deref(), Some("room_not_found"));
    }

    #[test]
    fn test_rejected_without_code_field() {
        let err = ClientError::Rejected {
            request: "joinRoom".into(),
            payload: json!("plain message"),
        };
        assert_eq!(err.code(), None);
    }

    #[test]
    fn test_timeout_payload_shape() {
        assert_eq!(timeout_payload(), json!({ "code": "timeout" }));
    }

    #[test]
    fn test_local_errors_have_no_payload() {
        let err = ClientError::AlreadyInFlight {
            request: "getRoom".into(),
        };
        assert_eq!(err.payload(), None);
    }
}
