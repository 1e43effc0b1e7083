//! Persisted cookie record and `Set-Cookie` header parsing.

use std::fmt;
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};
use url::Url;

/// Expiry assigned to cookies without `Expires`/`Max-Age` (9999-12-31T23:59:59.999Z).
///
/// Session cookies are persisted like any other so an authenticated session
/// survives a process restart.
pub const SESSION_COOKIE_EXPIRY_MILLIS: i64 = 253_402_300_799_999;

/// A single authentication cookie as stored on disk.
///
/// The value is redacted in Debug output to prevent accidental logging of
/// session tokens.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedCookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value (sensitive, never log).
    value: String,
    /// Domain the cookie was issued for, without a leading dot.
    pub domain: String,
    /// URL path scope.
    pub path: String,
    /// Expiry as Unix epoch milliseconds.
    #[serde(rename = "expiresAt")]
    pub expires_at_epoch_millis: i64,
    /// Only send over HTTPS.
    pub secure: bool,
    /// Not readable from scripts.
    pub http_only: bool,
    /// Only send to the exact issuing host (no `Domain` attribute was given).
    pub host_only: bool,
}

impl PersistedCookie {
    /// Creates a host-only session cookie scoped to `/`.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: "/".to_string(),
            expires_at_epoch_millis: SESSION_COOKIE_EXPIRY_MILLIS,
            secure: false,
            http_only: false,
            host_only: true,
        }
    }

    /// Sets the expiry in epoch milliseconds.
    #[must_use]
    pub fn expires_at(mut self, epoch_millis: i64) -> Self {
        self.expires_at_epoch_millis = epoch_millis;
        self
    }

    /// Sets the path scope.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Marks the cookie as HTTPS-only.
    #[must_use]
    pub fn secure(mut self) -> Self {
        self.secure = true;
        self
    }

    /// Marks the cookie as HTTP-only.
    #[must_use]
    pub fn http_only(mut self) -> Self {
        self.http_only = true;
        self
    }

    /// Sets whether the cookie is host-only.
    #[must_use]
    pub fn host_only(mut self, host_only: bool) -> Self {
        self.host_only = host_only;
        self
    }

    /// Returns the cookie value.
    ///
    /// Cookie values are sensitive; avoid logging the return value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns `true` once `now_millis` has reached the expiry.
    #[must_use]
    pub fn is_expired_at(&self, now_millis: i64) -> bool {
        self.expires_at_epoch_millis <= now_millis
    }

    /// Checks the secure flag and path scope against a request URL.
    ///
    /// Host scoping is done by the store's key lookup, not here.
    #[must_use]
    pub fn matches_request(&self, url: &Url) -> bool {
        if self.secure && url.scheme() != "https" {
            return false;
        }
        path_matches(&self.path, url.path())
    }

    /// Renders the `name=value` pair for a `Cookie` request header.
    #[must_use]
    pub fn header_pair(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}

impl fmt::Debug for PersistedCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistedCookie")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .field("domain", &self.domain)
            .field("path", &self.path)
            .field("expires_at_epoch_millis", &self.expires_at_epoch_millis)
            .field("secure", &self.secure)
            .field("http_only", &self.http_only)
            .field("host_only", &self.host_only)
            .finish()
    }
}

/// Reasons a `Set-Cookie` header is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SetCookieError {
    /// The leading `name=value` pair is missing or has an empty name.
    #[error("missing cookie name")]
    MissingName,
    /// The request URL has no host to scope the cookie to.
    #[error("request URL has no host")]
    NoHost,
    /// The `Domain` attribute does not cover the issuing host.
    #[error("domain attribute '{domain}' does not match host '{host}'")]
    DomainMismatch {
        /// The `Domain` attribute value.
        domain: String,
        /// The host that sent the header.
        host: String,
    },
}

/// Parses one `Set-Cookie` header received from `url`.
///
/// `Max-Age` takes precedence over `Expires`. A non-positive `Max-Age` yields a
/// record that is already expired at `now_millis`, which is how servers delete
/// cookies. Unknown attributes are ignored.
///
/// # Errors
///
/// Returns [`SetCookieError`] when the header has no name, the URL has no host,
/// or the `Domain` attribute would let the cookie escape the issuing host.
pub fn parse_set_cookie(
    header: &str,
    url: &Url,
    now_millis: i64,
) -> Result<PersistedCookie, SetCookieError> {
    let host = url
        .host_str()
        .ok_or(SetCookieError::NoHost)?
        .to_ascii_lowercase();

    let mut parts = header.split(';');
    let pair = parts.next().unwrap_or_default();
    let (name, value) = pair.split_once('=').ok_or(SetCookieError::MissingName)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(SetCookieError::MissingName);
    }
    let value = value.trim().trim_matches('"');

    let mut cookie =
        PersistedCookie::new(name, value, host.clone()).with_path(default_path(url.path()));
    let mut max_age: Option<i64> = None;
    let mut expires: Option<i64> = None;

    for attribute in parts {
        let (key, attr_value) = match attribute.split_once('=') {
            Some((key, attr_value)) => (key.trim(), attr_value.trim()),
            None => (attribute.trim(), ""),
        };

        match key.to_ascii_lowercase().as_str() {
            "domain" if !attr_value.is_empty() => {
                let domain = attr_value.trim_start_matches('.').to_ascii_lowercase();
                if !domain_matches(&host, &domain) {
                    return Err(SetCookieError::DomainMismatch { domain, host });
                }
                cookie.domain = domain;
                cookie.host_only = false;
            }
            "path" if attr_value.starts_with('/') => {
                cookie.path = attr_value.to_string();
            }
            "max-age" => {
                if let Ok(seconds) = attr_value.parse::<i64>() {
                    max_age = Some(seconds);
                }
            }
            "expires" => {
                expires = httpdate::parse_http_date(attr_value)
                    .ok()
                    .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
                    .and_then(|elapsed| i64::try_from(elapsed.as_millis()).ok());
            }
            "secure" => cookie.secure = true,
            "httponly" => cookie.http_only = true,
            _ => {}
        }
    }

    cookie.expires_at_epoch_millis = match (max_age, expires) {
        (Some(seconds), _) if seconds <= 0 => now_millis,
        (Some(seconds), _) => now_millis
            .saturating_add(seconds.saturating_mul(1000))
            .min(SESSION_COOKIE_EXPIRY_MILLIS),
        (None, Some(epoch_millis)) => epoch_millis.min(SESSION_COOKIE_EXPIRY_MILLIS),
        (None, None) => SESSION_COOKIE_EXPIRY_MILLIS,
    };

    Ok(cookie)
}

/// RFC 6265 default-path: the request path up to (not including) its last `/`.
fn default_path(request_path: &str) -> String {
    if !request_path.starts_with('/') {
        return "/".to_string();
    }
    match request_path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(index) => request_path[..index].to_string(),
    }
}

fn domain_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

fn path_matches(cookie_path: &str, request_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/')
            || request_path[cookie_path.len()..].starts_with('/'))
}
