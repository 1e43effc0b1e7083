//! reqwest-based implementation of the catalog API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use super::error::ApiError;
use super::models::{
    AddFavoriteRequest, Artist, Artwork, Category, FavoriteRecord, LoginRequest, Profile,
    RegisterRequest,
};
use super::{AccountApi, FavoritesApi};
use crate::cookies::PersistentCookieJar;
use crate::user_agent;

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_READ_TIMEOUT_SECS: u64 = 30;

/// Connect and overall request timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    /// TCP/TLS connect timeout in seconds.
    pub connect_secs: u64,
    /// Whole-request timeout in seconds.
    pub read_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            read_secs: DEFAULT_READ_TIMEOUT_SECS,
        }
    }
}

/// HTTP client for the catalog API.
///
/// Cookies are handled by the installed [`PersistentCookieJar`]: responses
/// persist their `Set-Cookie` headers and requests replay stored cookies.
#[derive(Debug, Clone)]
pub struct HttpCatalogApi {
    client: Client,
    base_url: Url,
}

impl HttpCatalogApi {
    /// Creates a client rooted at `base_url` (e.g. `https://host/api/`).
    ///
    /// A missing trailing slash is added so relative endpoint paths resolve
    /// beneath the base path.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidBaseUrl`] when `base_url` does not parse, or
    /// [`ApiError::ClientBuild`] when reqwest rejects the configuration.
    pub fn new(
        base_url: &str,
        cookie_jar: Arc<PersistentCookieJar>,
        timeouts: HttpTimeouts,
    ) -> Result<Self, ApiError> {
        let base_url = normalize_base_url(base_url)?;
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .timeout(Duration::from_secs(timeouts.read_secs))
            .user_agent(user_agent::default_user_agent())
            .gzip(true)
            .cookie_provider(cookie_jar)
            .build()
            .map_err(|error| ApiError::ClientBuild(error.to_string()))?;

        debug!(base_url = %base_url, "Catalog API client ready");
        Ok(Self { client, base_url })
    }

    /// The normalized base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Searches artists by free text.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure, non-success status, or an
    /// undecodable body.
    #[instrument(skip(self))]
    pub async fn search_artists(&self, query: &str) -> Result<Vec<Artist>, ApiError> {
        let mut url = self.endpoint("search")?;
        url.query_pairs_mut().append_pair("q", query);
        let response = self.send("search", self.client.get(url)).await?;
        decode("search", response).await
    }

    /// Fetches one artist's detail.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for unknown ids, or other [`ApiError`]s.
    #[instrument(skip(self))]
    pub async fn artist(&self, artist_id: &str) -> Result<Artist, ApiError> {
        let url = self.endpoint(&format!("artist/{}", encode_segment(artist_id)))?;
        let response = self.send("artist", self.client.get(url)).await?;
        decode("artist", response).await
    }

    /// Lists an artist's artworks.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on failure.
    #[instrument(skip(self))]
    pub async fn artworks(&self, artist_id: &str) -> Result<Vec<Artwork>, ApiError> {
        let url = self.endpoint(&format!("artist/{}/artworks", encode_segment(artist_id)))?;
        let response = self.send("artist/artworks", self.client.get(url)).await?;
        decode("artist/artworks", response).await
    }

    /// Lists artists similar to `artist_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on failure.
    #[instrument(skip(self))]
    pub async fn similar_artists(&self, artist_id: &str) -> Result<Vec<Artist>, ApiError> {
        let url = self.endpoint(&format!("artist/{}/similar", encode_segment(artist_id)))?;
        let response = self.send("artist/similar", self.client.get(url)).await?;
        decode("artist/similar", response).await
    }

    /// Lists the categories of one artwork.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on failure.
    #[instrument(skip(self))]
    pub async fn artwork_categories(&self, artwork_id: &str) -> Result<Vec<Category>, ApiError> {
        let url = self.endpoint(&format!("artwork/{}/categories", encode_segment(artwork_id)))?;
        let response = self.send("artwork/categories", self.client.get(url)).await?;
        decode("artwork/categories", response).await
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|error| ApiError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: error.to_string(),
            })
    }

    async fn send(&self, endpoint: &str, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|error| ApiError::network(endpoint, &error))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        warn!(endpoint, status = status.as_u16(), "Catalog API returned error status");
        Err(ApiError::from_status(endpoint, status.as_u16(), &body))
    }
}

#[async_trait]
impl AccountApi for HttpCatalogApi {
    #[instrument(skip(self, password))]
    async fn login(&self, email: &str, password: &str) -> Result<(), ApiError> {
        let url = self.endpoint("auth/login")?;
        let body = LoginRequest { email, password };
        self.send("auth/login", self.client.post(url).json(&body))
            .await?;
        Ok(())
    }

    #[instrument(skip(self, password))]
    async fn register(
        &self,
        full_name: &str,
        email: &str,
        password: &str,
    ) -> Result<(), ApiError> {
        let url = self.endpoint("auth/register")?;
        let body = RegisterRequest {
            fullname: full_name,
            email,
            password,
        };
        self.send("auth/register", self.client.post(url).json(&body))
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn who_am_i(&self) -> Result<Profile, ApiError> {
        let url = self.endpoint("auth/me")?;
        let response = self.send("auth/me", self.client.get(url)).await?;
        decode("auth/me", response).await
    }

    #[instrument(skip(self))]
    async fn logout(&self) -> Result<(), ApiError> {
        let url = self.endpoint("auth/logout")?;
        self.send("auth/logout", self.client.post(url)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_account(&self) -> Result<(), ApiError> {
        let url = self.endpoint("auth/delete")?;
        self.send("auth/delete", self.client.delete(url)).await?;
        Ok(())
    }
}

#[async_trait]
impl FavoritesApi for HttpCatalogApi {
    #[instrument(skip(self))]
    async fn is_favorite(&self, artist_id: &str) -> Result<bool, ApiError> {
        let url = self.endpoint(&format!(
            "user/favorites/check/{}",
            encode_segment(artist_id)
        ))?;
        let response = self
            .send("user/favorites/check", self.client.get(url))
            .await?;
        decode("user/favorites/check", response).await
    }

    #[instrument(skip(self))]
    async fn list_favorites(&self) -> Result<Vec<FavoriteRecord>, ApiError> {
        let url = self.endpoint("user/favorites")?;
        let response = self.send("user/favorites", self.client.get(url)).await?;
        decode("user/favorites", response).await
    }

    #[instrument(skip(self, request), fields(artist_id = %request.artist_id))]
    async fn add_favorite(&self, request: &AddFavoriteRequest) -> Result<(), ApiError> {
        let url = self.endpoint("user/favorites")?;
        self.send("user/favorites", self.client.post(url).json(request))
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_favorite(&self, artist_id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("user/favorites/{}", encode_segment(artist_id)))?;
        self.send("user/favorites", self.client.delete(url)).await?;
        Ok(())
    }
}

async fn decode<T: DeserializeOwned>(endpoint: &str, response: Response) -> Result<T, ApiError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|error| ApiError::network(endpoint, &error))?;
    serde_json::from_slice(&bytes).map_err(|error| ApiError::validation(endpoint, error.to_string()))
}

fn encode_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

fn normalize_base_url(raw: &str) -> Result<Url, ApiError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    let url = Url::parse(&with_slash).map_err(|error| ApiError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: error.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ApiError::InvalidBaseUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    Ok(url)
}
