//! Remote catalog API boundary.
//!
//! The session and favorites layers only talk to the server through the
//! [`AccountApi`] and [`FavoritesApi`] traits, so tests can substitute
//! in-process fakes. [`HttpCatalogApi`] is the production implementation and
//! also exposes the read-only catalog endpoints (search, artist detail).

mod client;
mod error;
mod models;

use async_trait::async_trait;

pub use client::{HttpCatalogApi, HttpTimeouts};
pub use error::ApiError;
pub use models::{
    AddFavoriteRequest, Artist, Artwork, Category, FavoriteRecord, Link, Links, Profile,
};

/// Authentication endpoints.
#[async_trait]
pub trait AccountApi: Send + Sync {
    /// Signs in; on success the server sets the session cookie.
    async fn login(&self, email: &str, password: &str) -> Result<(), ApiError>;

    /// Creates an account. Does not sign in.
    async fn register(&self, full_name: &str, email: &str, password: &str)
    -> Result<(), ApiError>;

    /// Returns the profile bound to the current session cookie.
    async fn who_am_i(&self) -> Result<Profile, ApiError>;

    /// Ends the server-side session.
    async fn logout(&self) -> Result<(), ApiError>;

    /// Permanently deletes the signed-in account.
    async fn delete_account(&self) -> Result<(), ApiError>;
}

/// Per-user favorites endpoints. All require a session cookie.
#[async_trait]
pub trait FavoritesApi: Send + Sync {
    /// Server-side membership check for one artist.
    async fn is_favorite(&self, artist_id: &str) -> Result<bool, ApiError>;

    /// Full favorites list in server order.
    async fn list_favorites(&self) -> Result<Vec<FavoriteRecord>, ApiError>;

    /// Adds an artist to the favorites.
    async fn add_favorite(&self, request: &AddFavoriteRequest) -> Result<(), ApiError>;

    /// Removes an artist from the favorites.
    async fn remove_favorite(&self, artist_id: &str) -> Result<(), ApiError>;
}
