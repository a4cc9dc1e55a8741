//! Key-value persistence adapter.
//!
//! Every store serializes its whole collection as one JSON document under a
//! fixed key. Failures are logged and swallowed so the rest of the
//! application keeps working in memory when the medium misbehaves.

pub mod json_file;
pub mod keys;
pub mod memory;

use std::{fmt, sync::Arc};

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::error;

pub use json_file::JsonFileBackend;
pub use memory::MemoryBackend;

/// Failures raised by key-value backends. Never surfaced past [`LocalStorage`].
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid storage key `{0}`")]
    InvalidKey(String),
    #[error("Storage backend poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Raw string storage addressed by key.
pub trait KeyValueBackend: Send + Sync {
    /// Whether the medium can currently be used at all.
    fn is_available(&self) -> bool {
        true
    }

    fn read(&self, key: &str) -> Result<Option<String>>;
    fn write(&self, key: &str, value: &str) -> Result<()>;
    fn delete(&self, key: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// JSON front-end over an optional [`KeyValueBackend`].
///
/// Cloning shares the underlying backend, so every store built from one
/// handle sees the same data.
#[derive(Clone)]
pub struct LocalStorage {
    backend: Option<Arc<dyn KeyValueBackend>>,
}

impl fmt::Debug for LocalStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalStorage")
            .field("available", &self.is_available())
            .finish()
    }
}

impl LocalStorage {
    pub fn new(backend: impl KeyValueBackend + 'static) -> Self {
        Self {
            backend: Some(Arc::new(backend)),
        }
    }

    pub fn from_shared(backend: Arc<dyn KeyValueBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// Adapter with no medium behind it: reads return nothing, writes vanish.
    pub fn unavailable() -> Self {
        Self { backend: None }
    }

    pub fn is_available(&self) -> bool {
        self.backend
            .as_ref()
            .map(|backend| backend.is_available())
            .unwrap_or(false)
    }

    fn available_backend(&self) -> Option<&Arc<dyn KeyValueBackend>> {
        self.backend
            .as_ref()
            .filter(|backend| backend.is_available())
    }

    /// Reads and deserializes the value stored under `key`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let backend = self.available_backend()?;
        let raw = match backend.read(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                error!(key, error = %err, "failed to read storage key");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                error!(key, error = %err, "stored value is not valid JSON for this key");
                None
            }
        }
    }

    /// Serializes `value` and stores it under `key`.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let Some(backend) = self.available_backend() else {
            return;
        };
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(err) => {
                error!(key, error = %err, "failed to serialize value for storage");
                return;
            }
        };
        if let Err(err) = backend.write(key, &json) {
            error!(key, error = %err, "failed to write storage key");
        }
    }

    pub fn remove(&self, key: &str) {
        let Some(backend) = self.available_backend() else {
            return;
        };
        if let Err(err) = backend.delete(key) {
            error!(key, error = %err, "failed to remove storage key");
        }
    }

    pub fn clear(&self) {
        let Some(backend) = self.available_backend() else {
            return;
        };
        if let Err(err) = backend.clear() {
            error!(error = %err, "failed to clear storage");
        }
    }

    pub fn has(&self, key: &str) -> bool {
        let Some(backend) = self.available_backend() else {
            return false;
        };
        match backend.read(key) {
            Ok(value) => value.is_some(),
            Err(err) => {
                error!(key, error = %err, "failed to check storage key");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        value: i32,
    }

    struct BrokenBackend;

    impl KeyValueBackend for BrokenBackend {
        fn read(&self, _key: &str) -> Result<Option<String>> {
            Err(StorageError::Poisoned)
        }
        fn write(&self, _key: &str, _value: &str) -> Result<()> {
            Err(StorageError::Poisoned)
        }
        fn delete(&self, _key: &str) -> Result<()> {
            Err(StorageError::Poisoned)
        }
        fn clear(&self) -> Result<()> {
            Err(StorageError::Poisoned)
        }
    }

    #[test]
    fn get_returns_what_set_stored() {
        let storage = LocalStorage::new(MemoryBackend::new());
        let sample = Sample {
            name: "rent".into(),
            value: 7,
        };
        storage.set("sample", &sample);
        assert!(storage.has("sample"));
        assert_eq!(storage.get::<Sample>("sample"), Some(sample));
    }

    #[test]
    fn malformed_json_reads_as_missing() {
        let backend = MemoryBackend::new();
        backend.write("broken", "{not json").unwrap();
        let storage = LocalStorage::new(backend);
        assert!(storage.has("broken"));
        assert_eq!(storage.get::<Sample>("broken"), None);
    }

    #[test]
    fn unavailable_storage_is_a_silent_no_op() {
        let storage = LocalStorage::unavailable();
        storage.set("key", &vec![1, 2, 3]);
        assert!(!storage.is_available());
        assert!(!storage.has("key"));
        assert_eq!(storage.get::<Vec<i32>>("key"), None);
        storage.remove("key");
        storage.clear();
    }

    #[test]
    fn backend_errors_never_reach_callers() {
        let storage = LocalStorage::new(BrokenBackend);
        storage.set("key", &1);
        storage.remove("key");
        storage.clear();
        assert!(!storage.has("key"));
        assert_eq!(storage.get::<i32>("key"), None);
    }

    #[test]
    fn remove_and_clear_drop_values() {
        let storage = LocalStorage::new(MemoryBackend::new());
        storage.set("a", &1);
        storage.set("b", &2);
        storage.remove("a");
        assert!(!storage.has("a"));
        assert!(storage.has("b"));
        storage.clear();
        assert!(!storage.has("b"));
    }
}
