//! Error types for the session layer.

use std::path::PathBuf;

/// Errors that can occur while loading or persisting session identity.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The backing file couldn't be read or written.
    #[error("session store {path} unavailable: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backing file exists but isn't a JSON object of strings.
    /// Usually a hand-edited or truncated file.
    #[error("session store {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A custom store rejected the operation.
    #[error("session store failed: {0}")]
    Store(String),
}
