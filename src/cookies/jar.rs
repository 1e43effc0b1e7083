//! reqwest cookie provider backed by the persistent [`CookieStore`].
//!
//! Installing the jar on the HTTP client makes cookie handling automatic:
//! every `Set-Cookie` is persisted as soon as the response arrives and every
//! request reloads cookies from storage.

use reqwest::Url;
use reqwest::header::HeaderValue;
use tracing::debug;

use super::record::parse_set_cookie;
use super::store::CookieStore;

/// Adapter between reqwest's cookie hook and [`CookieStore`].
#[derive(Debug, Clone)]
pub struct PersistentCookieJar {
    store: CookieStore,
}

impl PersistentCookieJar {
    /// Wraps `store` for use with `reqwest::ClientBuilder::cookie_provider`.
    #[must_use]
    pub fn new(store: CookieStore) -> Self {
        Self { store }
    }

    /// The underlying cookie store.
    #[must_use]
    pub fn store(&self) -> &CookieStore {
        &self.store
    }
}

impl reqwest::cookie::CookieStore for PersistentCookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let Some(host) = url.host_str() else {
            return;
        };
        let now = self.store.now_millis();

        let cookies: Vec<_> = cookie_headers
            .filter_map(|header| header.to_str().ok())
            .filter_map(|raw| match parse_set_cookie(raw, url, now) {
                Ok(cookie) => Some(cookie),
                Err(error) => {
                    debug!(host, error = %error, "Ignoring rejected Set-Cookie header");
                    None
                }
            })
            .collect();

        if !cookies.is_empty() {
            self.store.save(host, &cookies);
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let host = url.host_str()?;
        let header = self
            .store
            .load(host)
            .iter()
            .filter(|cookie| cookie.matches_request(url))
            .map(super::PersistedCookie::header_pair)
            .collect::<Vec<_>>()
            .join("; ");

        if header.is_empty() {
            return None;
        }
        HeaderValue::from_str(&header).ok()
    }
}
