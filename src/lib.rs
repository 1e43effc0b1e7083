//! Art Catalog Core Library
//!
//! Client-side core for a remote art-catalog API: search, artist detail and a
//! per-user favorites list behind authentication.
//!
//! # Architecture
//!
//! Leaves first:
//! - [`cookies`] - Durable authentication cookies, plugged into the HTTP client
//! - [`api`] - Request-issuing boundary ([`AccountApi`], [`FavoritesApi`])
//! - [`session`] - Authentication state machine and cached profile
//! - [`favorites`] - Favorites cache with optimistic toggle and live labels
//! - [`config`] - Defaults, config file and environment overrides
//! - [`app`] - Wires the above into one client instance

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod app;
pub mod clock;
pub mod config;
pub mod cookies;
pub mod favorites;
pub mod session;
mod user_agent;

// Re-export commonly used types
pub use api::{
    AccountApi, AddFavoriteRequest, ApiError, Artist, Artwork, Category, FavoriteRecord,
    FavoritesApi, HttpCatalogApi, HttpTimeouts, Profile,
};
pub use app::CatalogApp;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ClientConfig, ConfigError, DEFAULT_BASE_URL};
pub use cookies::{
    CookieStore, FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, PersistedCookie,
    PersistentCookieJar, StorageError,
};
pub use favorites::{
    FavoriteEntry, FavoritesCache, FavoritesError, RecomputeTicker, RefreshFailurePolicy,
    Snapshot, time_ago_label,
};
pub use session::{Session, SessionError, SessionManager, SessionStatus, SessionView};
