//! Persistent authentication cookies.
//!
//! Cookies received from the catalog API are written through to a durable
//! [`KeyValueStore`] so a login survives process restarts. The
//! [`PersistentCookieJar`] plugs the store into the HTTP client.

mod file_store;
mod jar;
mod kv;
mod record;
mod store;

pub use file_store::FileKeyValueStore;
pub use jar::PersistentCookieJar;
pub use kv::{KeyValueStore, MemoryKeyValueStore, StorageError};
pub use record::{PersistedCookie, SESSION_COOKIE_EXPIRY_MILLIS, SetCookieError, parse_set_cookie};
pub use store::CookieStore;
