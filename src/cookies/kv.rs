//! Key-value persistence backends for the cookie store.

use dashmap::DashMap;

/// Errors raised by a [`KeyValueStore`] backend.
///
/// These never cross the cookie store boundary: the store logs them and
/// degrades to "cookie unavailable".
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Filesystem I/O failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Serialization/deserialization failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Stored encrypted payload is malformed.
    #[error("persisted cookie payload is invalid")]
    InvalidPayload,
    /// Encryption failed.
    #[error("failed to encrypt persisted cookies")]
    EncryptionFailed,
    /// Decryption failed (wrong key or tampered file).
    #[error("failed to decrypt persisted cookies")]
    DecryptionFailed,
}

/// Minimal string key-value persistence.
///
/// Writes must be durable when `set` returns. Implementations are shared
/// between the HTTP client's cookie hook and the application, so they must be
/// `Send + Sync`.
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the write cannot be made durable. The
    /// previous value is kept in that case.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Returns every stored `(key, value)` pair.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the backend cannot be read.
    fn entries(&self) -> Result<Vec<(String, String)>, StorageError>;

    /// Removes every record.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the backend cannot be written.
    fn clear(&self) -> Result<(), StorageError>;
}

/// Process-local store, lost on exit. Used in tests and for `--ephemeral` runs.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    records: DashMap<String, String>,
}

impl MemoryKeyValueStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, including expired or malformed ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.records.get(key).map(|entry| entry.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.records.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn entries(&self) -> Result<Vec<(String, String)>, StorageError> {
        Ok(self
            .records
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.records.clear();
        Ok(())
    }
}
