//! Host-scoped cookie persistence on top of a [`KeyValueStore`].

use std::fmt;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use super::kv::KeyValueStore;
use super::record::PersistedCookie;
use crate::clock::{Clock, SystemClock};

/// Durable cookie store keyed by `(host, cookie name)`.
///
/// Neither `save` nor `load` ever fails: backend errors are logged and the
/// affected cookie is treated as unavailable, so authentication degrades to
/// "unauthenticated" on the next request instead of aborting it.
#[derive(Clone)]
pub struct CookieStore {
    backend: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for CookieStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieStore")
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl CookieStore {
    /// Creates a store over `backend` using the system clock.
    #[must_use]
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self::with_clock(backend, Arc::new(SystemClock))
    }

    /// Creates a store with an explicit clock for expiry checks.
    #[must_use]
    pub fn with_clock(backend: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { backend, clock }
    }

    /// Current wall-clock time in epoch milliseconds, as seen by this store.
    #[must_use]
    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Upserts each cookie under `(host, name)` and persists before returning.
    ///
    /// Returns how many cookies were written. A cookie that fails to serialize
    /// or persist is skipped without retry and without aborting the batch.
    #[instrument(level = "debug", skip(self, cookies), fields(count = cookies.len()))]
    pub fn save(&self, host: &str, cookies: &[PersistedCookie]) -> usize {
        let mut saved = 0;
        for cookie in cookies {
            let key = record_key(host, &cookie.name);
            let encoded = match serde_json::to_string(cookie) {
                Ok(encoded) => encoded,
                Err(error) => {
                    warn!(host, name = %cookie.name, error = %error, "Skipping unserializable cookie");
                    continue;
                }
            };
            match self.backend.set(&key, &encoded) {
                Ok(()) => {
                    debug!(host, name = %cookie.name, "Persisted cookie");
                    saved += 1;
                }
                Err(error) => {
                    warn!(host, name = %cookie.name, error = %error, "Failed to persist cookie; skipping");
                }
            }
        }
        saved
    }

    /// Returns the unexpired cookies stored for `host`.
    ///
    /// A record belongs to `host` when its key starts with `host` (literal
    /// prefix match). Expiry is evaluated against the clock at call time.
    /// Undecodable records are skipped and only logged at debug level.
    #[instrument(level = "debug", skip(self))]
    pub fn load(&self, host: &str) -> Vec<PersistedCookie> {
        let entries = match self.backend.entries() {
            Ok(entries) => entries,
            Err(error) => {
                warn!(host, error = %error, "Cookie storage unavailable; continuing without cookies");
                return Vec::new();
            }
        };

        let now = self.clock.now_millis();
        entries
            .into_iter()
            .filter(|(key, _)| key.starts_with(host))
            .filter_map(|(key, raw)| match serde_json::from_str::<PersistedCookie>(&raw) {
                Ok(cookie) => Some(cookie),
                Err(error) => {
                    debug!(key = %key, error = %error, "Skipping malformed cookie record");
                    None
                }
            })
            .filter(|cookie| !cookie.is_expired_at(now))
            .collect()
    }

    /// Removes every stored cookie.
    ///
    /// Returns `false` when the backend could not be cleared.
    pub fn clear(&self) -> bool {
        match self.backend.clear() {
            Ok(()) => true,
            Err(error) => {
                warn!(error = %error, "Failed to clear persisted cookies");
                false
            }
        }
    }
}

fn record_key(host: &str, name: &str) -> String {
    format!("{host}_{name}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::cookies::kv::{MemoryKeyValueStore, StorageError};

    const T: i64 = 1_700_000_000_000;

    fn store_at(millis: i64) -> (CookieStore, Arc<MemoryKeyValueStore>, ManualClock) {
        let backend = Arc::new(MemoryKeyValueStore::new());
        let clock = ManualClock::at_millis(millis);
        let store = CookieStore::with_clock(backend.clone(), Arc::new(clock.clone()));
        (store, backend, clock)
    }

    #[test]
    fn test_load_excludes_cookie_at_and_after_expiry() {
        let (store, _backend, clock) = store_at(T - 1);
        store.save(
            "api.example.com",
            &[PersistedCookie::new("sid", "abc", "api.example.com").expires_at(T)],
        );

        assert_eq!(store.load("api.example.com").len(), 1, "T-1 includes");

        clock.set(chrono::DateTime::from_timestamp_millis(T).unwrap());
        assert!(store.load("api.example.com").is_empty(), "T excludes");

        clock.set(chrono::DateTime::from_timestamp_millis(T + 1).unwrap());
        assert!(store.load("api.example.com").is_empty(), "T+1 excludes");
    }

    #[test]
    fn test_load_is_host_scoped() {
        let (store, _backend, _clock) = store_at(T);
        store.save(
            "api.example.com",
            &[PersistedCookie::new("sid", "abc", "api.example.com")],
        );

        assert!(store.load("other.example.com").is_empty());
        assert_eq!(store.load("api.example.com").len(), 1);
    }

    #[test]
    fn test_load_matches_host_by_key_prefix() {
        let (store, _backend, _clock) = store_at(T);
        store.save(
            "api.example.com",
            &[PersistedCookie::new("sid", "abc", "api.example.com")],
        );

        assert_eq!(store.load("api.example").len(), 1);
        assert!(store.load("example.com").is_empty());
    }

    #[test]
    fn test_save_same_key_twice_keeps_latest() {
        let (store, backend, _clock) = store_at(T);
        store.save(
            "api.example.com",
            &[PersistedCookie::new("sid", "first", "api.example.com")],
        );
        store.save(
            "api.example.com",
            &[PersistedCookie::new("sid", "second", "api.example.com")],
        );

        let loaded = store.load("api.example.com");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].value(), "second");
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn test_load_skips_malformed_records() {
        let (store, backend, _clock) = store_at(T);
        backend.set("api.example.com_broken", "{not json").unwrap();
        store.save(
            "api.example.com",
            &[PersistedCookie::new("sid", "abc", "api.example.com")],
        );

        let loaded = store.load("api.example.com");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "sid");
    }

    /// Backend that refuses writes for one key and fails enumeration on demand.
    struct FlakyBackend {
        inner: MemoryKeyValueStore,
        reject_key: String,
        fail_entries: bool,
    }

    impl KeyValueStore for FlakyBackend {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if key == self.reject_key {
                return Err(StorageError::Io(std::io::Error::other("disk full")));
            }
            self.inner.set(key, value)
        }

        fn entries(&self) -> Result<Vec<(String, String)>, StorageError> {
            if self.fail_entries {
                return Err(StorageError::InvalidPayload);
            }
            self.inner.entries()
        }

        fn clear(&self) -> Result<(), StorageError> {
            self.inner.clear()
        }
    }

    #[test]
    fn test_save_skips_failed_write_without_aborting_batch() {
        let backend = Arc::new(FlakyBackend {
            inner: MemoryKeyValueStore::new(),
            reject_key: "api.example.com_b".to_string(),
            fail_entries: false,
        });
        let store = CookieStore::with_clock(backend, Arc::new(ManualClock::at_millis(T)));

        let saved = store.save(
            "api.example.com",
            &[
                PersistedCookie::new("a", "1", "api.example.com"),
                PersistedCookie::new("b", "2", "api.example.com"),
                PersistedCookie::new("c", "3", "api.example.com"),
            ],
        );

        assert_eq!(saved, 2);
        let mut names: Vec<String> = store
            .load("api.example.com")
            .into_iter()
            .map(|cookie| cookie.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn test_load_degrades_to_empty_when_backend_unavailable() {
        let backend = Arc::new(FlakyBackend {
            inner: MemoryKeyValueStore::new(),
            reject_key: String::new(),
            fail_entries: true,
        });
        let store = CookieStore::with_clock(backend, Arc::new(ManualClock::at_millis(T)));

        assert!(store.load("api.example.com").is_empty());
    }

    #[test]
    fn test_clear_removes_everything() {
        let (store, _backend, _clock) = store_at(T);
        store.save(
            "api.example.com",
            &[PersistedCookie::new("sid", "abc", "api.example.com")],
        );

        assert!(store.clear());
        assert!(store.load("api.example.com").is_empty());
    }
}
