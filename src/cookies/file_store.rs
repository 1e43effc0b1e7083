//! File-backed key-value store with optional encryption at rest.
//!
//! All records live in one JSON document that is rewritten on every `set`.
//! When a master key is supplied the document is sealed with
//! XChaCha20-Poly1305 (`MAGIC | nonce | ciphertext`).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::kv::{KeyValueStore, StorageError};

const MAGIC: &[u8; 4] = b"ACK1";
const NONCE_LEN: usize = 24;
const KEY_LEN: usize = 32;

type Records = BTreeMap<String, String>;

/// Durable store backed by a single file.
///
/// Records are cached in memory after opening; the file is only read once.
pub struct FileKeyValueStore {
    path: PathBuf,
    key: Option<[u8; KEY_LEN]>,
    records: Mutex<Records>,
}

impl std::fmt::Debug for FileKeyValueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileKeyValueStore")
            .field("path", &self.path)
            .field("encrypted", &self.key.is_some())
            .finish_non_exhaustive()
    }
}

impl FileKeyValueStore {
    /// Opens the store at `path`, starting empty when the file is missing or unreadable.
    ///
    /// An unreadable file (corrupt, or sealed with a different key) is treated as
    /// "no cookies" and logged; it will be overwritten by the next `set`.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>, master_key: Option<&str>) -> Self {
        let path = path.into();
        let key = master_key.map(derive_key_bytes);
        let records = match read_records(&path, key.as_ref()) {
            Ok(records) => records,
            Err(error) => {
                warn!(
                    path = %path.display(),
                    error = %error,
                    "Failed to read persisted cookies; starting with an empty cookie store"
                );
                Records::new()
            }
        };
        debug!(path = %path.display(), records = records.len(), "Opened cookie file store");

        Self {
            path,
            key,
            records: Mutex::new(records),
        }
    }

    /// Opens the store, surfacing read failures instead of starting empty.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the file exists but cannot be read,
    /// decrypted, or parsed.
    pub fn try_open(path: impl Into<PathBuf>, master_key: Option<&str>) -> Result<Self, StorageError> {
        let path = path.into();
        let key = master_key.map(derive_key_bytes);
        let records = read_records(&path, key.as_ref())?;
        Ok(Self {
            path,
            key,
            records: Mutex::new(records),
        })
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether records are encrypted at rest.
    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        self.key.is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Records> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, records: &Records) -> Result<(), StorageError> {
        let plaintext = serde_json::to_vec(records)?;
        let payload = match &self.key {
            Some(key) => encrypt_bytes(&plaintext, key)?,
            None => plaintext,
        };
        write_payload(&self.path, &payload)
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut records = self.lock();
        let previous = records.insert(key.to_string(), value.to_string());
        if let Err(error) = self.persist(&records) {
            match previous {
                Some(previous) => records.insert(key.to_string(), previous),
                None => records.remove(key),
            };
            return Err(error);
        }
        Ok(())
    }

    fn entries(&self) -> Result<Vec<(String, String)>, StorageError> {
        Ok(self
            .lock()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut records = self.lock();
        records.clear();
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

fn read_records(path: &Path, key: Option<&[u8; KEY_LEN]>) -> Result<Records, StorageError> {
    if !path.exists() {
        return Ok(Records::new());
    }
    let bytes = fs::read(path)?;
    let plaintext = match key {
        Some(key) => decrypt_bytes(&bytes, key)?,
        None => bytes,
    };
    Ok(serde_json::from_slice(&plaintext)?)
}

fn write_payload(path: &Path, payload: &[u8]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let staging = path.with_extension("tmp");
    fs::write(&staging, payload)?;
    set_owner_only_permissions(&staging)?;
    fs::rename(&staging, path)?;
    Ok(())
}

#[cfg(unix)]
fn set_owner_only_permissions(path: &Path) -> Result<(), StorageError> {
    use std::os::unix::fs::PermissionsExt;

    let permissions = fs::Permissions::from_mode(0o600);
    fs::set_permissions(path, permissions)?;
    Ok(())
}

#[cfg(not(unix))]
fn set_owner_only_permissions(_path: &Path) -> Result<(), StorageError> {
    Ok(())
}

fn derive_key_bytes(key_material: &str) -> [u8; KEY_LEN] {
    let digest = Sha256::digest(key_material.trim().as_bytes());
    let mut key = [0_u8; KEY_LEN];
    key.copy_from_slice(&digest[..KEY_LEN]);
    key
}

fn encrypt_bytes(plaintext: &[u8], key: &[u8; KEY_LEN]) -> Result<Vec<u8>, StorageError> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));

    let mut nonce = [0_u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), plaintext)
        .map_err(|_| StorageError::EncryptionFailed)?;

    let mut output = Vec::with_capacity(MAGIC.len() + NONCE_LEN + ciphertext.len());
    output.extend_from_slice(MAGIC);
    output.extend_from_slice(&nonce);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

fn decrypt_bytes(payload: &[u8], key: &[u8; KEY_LEN]) -> Result<Vec<u8>, StorageError> {
    if payload.len() < MAGIC.len() + NONCE_LEN || &payload[..MAGIC.len()] != MAGIC {
        return Err(StorageError::InvalidPayload);
    }

    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    let nonce_end = MAGIC.len() + NONCE_LEN;
    let nonce = XNonce::from_slice(&payload[MAGIC.len()..nonce_end]);

    cipher
        .decrypt(nonce, &payload[nonce_end..])
        .map_err(|_| StorageError::DecryptionFailed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_records_survive_reopen() {
        let tempdir = TempDir::new().unwrap();
        let path = tempdir.path().join("cookies.dat");

        let store = FileKeyValueStore::open(&path, None);
        store.set("api.example.com_sid", "{}").unwrap();
        drop(store);

        let reopened = FileKeyValueStore::open(&path, None);
        assert_eq!(
            reopened.get("api.example.com_sid").unwrap().as_deref(),
            Some("{}")
        );
    }

    #[test]
    fn test_encrypted_file_does_not_contain_plaintext() {
        let tempdir = TempDir::new().unwrap();
        let path = tempdir.path().join("cookies.dat");

        let store = FileKeyValueStore::open(&path, Some("test-key"));
        store.set("host_sid", "super_secret_token").unwrap();

        let raw = fs::read(&path).unwrap();
        assert!(raw.starts_with(MAGIC));
        assert!(
            !String::from_utf8_lossy(&raw).contains("super_secret_token"),
            "encrypted payload must not contain the cookie value"
        );

        let reopened = FileKeyValueStore::try_open(&path, Some("test-key")).unwrap();
        assert_eq!(
            reopened.get("host_sid").unwrap().as_deref(),
            Some("super_secret_token")
        );
    }

    #[test]
    fn test_wrong_key_fails_strict_open_and_degrades_lenient_open() {
        let tempdir = TempDir::new().unwrap();
        let path = tempdir.path().join("cookies.dat");
        FileKeyValueStore::open(&path, Some("key-a"))
            .set("host_sid", "v")
            .unwrap();

        let strict = FileKeyValueStore::try_open(&path, Some("key-b"));
        assert!(matches!(strict, Err(StorageError::DecryptionFailed)));

        let lenient = FileKeyValueStore::open(&path, Some("key-b"));
        assert!(lenient.entries().unwrap().is_empty());
    }

    #[test]
    fn test_garbage_file_is_invalid_payload_when_encrypted() {
        let tempdir = TempDir::new().unwrap();
        let path = tempdir.path().join("cookies.dat");
        fs::write(&path, b"not-encrypted-data").unwrap();

        let result = FileKeyValueStore::try_open(&path, Some("test-key"));
        assert!(matches!(result, Err(StorageError::InvalidPayload)));
    }

    #[test]
    fn test_failed_write_keeps_previous_value() {
        let tempdir = TempDir::new().unwrap();
        let blocker = tempdir.path().join("not-a-dir");
        fs::write(&blocker, b"file").unwrap();
        // Parent path is a regular file, so every write fails.
        let store = FileKeyValueStore::open(blocker.join("cookies.dat"), None);

        assert!(store.set("k", "v").is_err());
        assert!(store.get("k").unwrap().is_none());
    }

    #[test]
    fn test_clear_removes_file() {
        let tempdir = TempDir::new().unwrap();
        let path = tempdir.path().join("cookies.dat");
        let store = FileKeyValueStore::open(&path, None);
        store.set("k", "v").unwrap();
        assert!(path.exists());

        store.clear().unwrap();
        assert!(!path.exists());
        assert!(store.entries().unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_store_sets_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let tempdir = TempDir::new().unwrap();
        let path = tempdir.path().join("cookies.dat");
        FileKeyValueStore::open(&path, None).set("k", "v").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }
}
