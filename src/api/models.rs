//! Request and response payloads exchanged with the catalog API.

use serde::{Deserialize, Serialize};

/// Credentials for `POST auth/login`.
#[derive(Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub(crate) email: &'a str,
    pub(crate) password: &'a str,
}

/// Body of `POST auth/register`. The server expects `fullname` in lowercase.
#[derive(Serialize)]
pub(crate) struct RegisterRequest<'a> {
    pub(crate) fullname: &'a str,
    pub(crate) email: &'a str,
    pub(crate) password: &'a str,
}

/// The signed-in user, as returned by `GET auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Server-side user id.
    pub id: String,
    /// Display name.
    pub full_name: String,
    /// Login email.
    pub email: String,
    /// Avatar URL.
    #[serde(default)]
    pub profile_image_url: Option<String>,
}

/// A favorite as listed by `GET user/favorites`.
///
/// `added_at` is the server-assigned RFC 3339 instant; any `timeAgo` the
/// server includes is ignored and recomputed locally.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteRecord {
    /// Artist id (unique per user).
    pub artist_id: String,
    /// Artist display title.
    pub title: String,
    /// Thumbnail image URL.
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Nationality text.
    #[serde(default)]
    pub nationality: Option<String>,
    /// Birth year text.
    #[serde(default)]
    pub birth: Option<String>,
    /// When the favorite was created, as sent by the server.
    #[serde(default)]
    pub added_at: Option<String>,
}

/// Body of `POST user/favorites`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddFavoriteRequest {
    /// Artist id to favorite.
    pub artist_id: String,
    /// Artist display title.
    pub title: String,
    /// Thumbnail image URL.
    pub thumbnail: Option<String>,
    /// Birth year text.
    pub birth: Option<String>,
    /// Nationality text.
    pub nationality: Option<String>,
}

impl AddFavoriteRequest {
    /// Creates a request with only the required fields.
    #[must_use]
    pub fn new(artist_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            artist_id: artist_id.into(),
            title: title.into(),
            thumbnail: None,
            birth: None,
            nationality: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Links {
    #[serde(default)]
    pub thumbnail: Option<Link>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Link {
    pub href: String,
}

/// Artist summary or detail.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Artist {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub nationality: Option<String>,
    #[serde(default)]
    pub birthday: Option<String>,
    #[serde(default)]
    pub deathday: Option<String>,
    #[serde(default)]
    pub biography: Option<String>,
    #[serde(rename = "_links", default)]
    pub links: Option<Links>,
}

impl Artist {
    /// Thumbnail URL from `_links.thumbnail.href`.
    #[must_use]
    pub fn thumbnail(&self) -> Option<&str> {
        thumbnail_href(self.links.as_ref())
    }

    /// Best display label: `name`, falling back to `title`.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.title.as_deref())
            .unwrap_or("(unknown)")
    }
}

/// An artwork by an artist.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Artwork {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(rename = "_links", default)]
    pub links: Option<Links>,
}

impl Artwork {
    /// Image URL from `_links.thumbnail.href`.
    #[must_use]
    pub fn image_url(&self) -> Option<&str> {
        thumbnail_href(self.links.as_ref())
    }
}

/// A gene/category attached to an artwork.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(rename = "_links", default)]
    pub links: Option<Links>,
}

fn thumbnail_href(links: Option<&Links>) -> Option<&str> {
    links?.thumbnail.as_ref().map(|link| link.href.as_str())
}
