//! Wiring of the cookie store, API client, session and favorites cache.

use std::sync::Arc;

use tracing::{debug, info};

use crate::api::{ApiError, HttpCatalogApi};
use crate::clock::{Clock, SystemClock};
use crate::config::ClientConfig;
use crate::cookies::{
    CookieStore, FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, PersistentCookieJar,
};
use crate::favorites::FavoritesCache;
use crate::session::SessionManager;

/// One signed-in (or signed-out) client instance.
///
/// Owns a single [`SessionManager`] and [`FavoritesCache`] sharing one HTTP
/// client whose cookies persist through the configured store.
#[derive(Debug)]
pub struct CatalogApp {
    config: ClientConfig,
    cookies: CookieStore,
    api: Arc<HttpCatalogApi>,
    session: SessionManager,
    favorites: FavoritesCache,
}

impl CatalogApp {
    /// Builds the client from `config`.
    ///
    /// Cookies persist to `config.cookie_path` when set (encrypted when a
    /// master key is configured) and live in memory otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let backend: Arc<dyn KeyValueStore> = match &config.cookie_path {
            Some(path) => {
                let store = FileKeyValueStore::open(path, config.master_key.as_deref());
                debug!(
                    path = %store.path().display(),
                    encrypted = store.is_encrypted(),
                    "Using file cookie store"
                );
                Arc::new(store)
            }
            None => {
                debug!("Using in-memory cookie store");
                Arc::new(MemoryKeyValueStore::new())
            }
        };
        Self::with_backend(config, backend, Arc::new(SystemClock))
    }

    /// Builds the client over an explicit cookie backend and clock.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the HTTP client cannot be built.
    pub fn with_backend(
        config: ClientConfig,
        backend: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ApiError> {
        let cookies = CookieStore::with_clock(backend, Arc::clone(&clock));
        let jar = Arc::new(PersistentCookieJar::new(cookies.clone()));
        let api = Arc::new(HttpCatalogApi::new(&config.base_url, jar, config.timeouts())?);

        let session = SessionManager::new(api.clone());
        let favorites = FavoritesCache::new(api.clone(), session.subscribe())
            .with_clock(clock)
            .with_refresh_policy(config.refresh_failure_policy);

        Ok(Self {
            config,
            cookies,
            api,
            session,
            favorites,
        })
    }

    /// Effective configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Persistent cookie store behind the HTTP client.
    #[must_use]
    pub fn cookies(&self) -> &CookieStore {
        &self.cookies
    }

    /// Catalog API client, for the read-only endpoints.
    #[must_use]
    pub fn api(&self) -> &HttpCatalogApi {
        &self.api
    }

    /// Authentication session.
    #[must_use]
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Favorites of the signed-in user.
    #[must_use]
    pub fn favorites(&self) -> &FavoritesCache {
        &self.favorites
    }

    /// Logs out and empties the favorites cache. With `forget_cookies` the
    /// persisted cookies are erased as well.
    pub async fn sign_out(&self, forget_cookies: bool) {
        self.session.logout().await;
        self.favorites.clear();
        if forget_cookies {
            let cleared = self.cookies.clear();
            info!(cleared, "Forgot persisted cookies");
        }
    }
}
