//! Key-value persistence for the resumption token.
//!
//! The client only ever stores one value, but the [`SessionStore`] trait is a
//! plain string map so an application can point it at whatever it already
//! persists settings in.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::SessionError;

/// Persistent string storage, keyed by string.
///
/// # Trait bounds
///
/// - `Send + Sync` → the store is shared with transport callbacks, which may
///   run on any runtime thread.
/// - `'static` → it lives as long as the client.
pub trait SessionStore: Send + Sync + 'static {
    /// Reads `key`. `Ok(None)` means "never written".
    fn get(&self, key: &str) -> Result<Option<String>, SessionError>;

    /// Writes `key`, replacing any earlier value.
    fn set(&self, key: &str, value: &str) -> Result<(), SessionError>;
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// A [`SessionStore`] that forgets everything when the process exits.
///
/// Good for tests, and for clients that should start a fresh identity on
/// every launch.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.values().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        self.values().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FileStore
// ---------------------------------------------------------------------------

/// A [`SessionStore`] backed by a small JSON file (`{"playerID": "..."}`).
///
/// The file and its parent directories are created on the first write.
/// Every `set` rewrites the whole file; that's fine for a handful of keys.
/// Writes go to a sibling `<name>.tmp` file that is then renamed over the
/// original, so an interrupted write leaves the previous contents intact.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// A store at `path`. Nothing is touched until the first read or write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Where the file lives.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, String>, SessionError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(HashMap::new());
            }
            Err(source) => {
                return Err(SessionError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        serde_json::from_slice(&bytes).map_err(|source| SessionError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn write_all(
        &self,
        values: &HashMap<String, String>,
    ) -> Result<(), SessionError> {
        let io_err = |source| SessionError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        let bytes = serde_json::to_vec_pretty(values).map_err(|source| {
            SessionError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;
        let tmp = self.tmp_path();
        fs::write(&tmp, bytes).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut values = self.read_all()?;
        values.insert(key.to_string(), value.to_string());
        self.write_all(&values)?;
        tracing::debug!(path = %self.path.display(), key, "session value persisted");
        Ok(())
    }
}

// =========================================================================
// Tests
// =========================================================================
