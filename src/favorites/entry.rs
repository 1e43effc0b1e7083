//! Cached favorite entries and their ordering.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::label::time_ago_label;
use crate::api::{AddFavoriteRequest, FavoriteRecord};

/// One favorited artist as held by the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavoriteEntry {
    /// Artist id; unique within the cache.
    pub artist_id: String,
    /// Display title.
    pub title: String,
    /// Thumbnail image URL.
    pub thumbnail_url: Option<String>,
    /// Nationality text.
    pub nationality: Option<String>,
    /// Birth year text.
    pub birth: Option<String>,
    /// Server-assigned creation instant. `None` when missing or unparseable.
    pub added_at: Option<DateTime<Utc>>,
    /// Derived from `added_at` and the current time; never sent upstream.
    pub time_ago_label: Option<String>,
}

impl FavoriteEntry {
    /// Builds an entry from the wire record, labelling it relative to `now`.
    #[must_use]
    pub fn from_record(record: FavoriteRecord, now: DateTime<Utc>) -> Self {
        let added_at = record.added_at.as_deref().and_then(parse_added_at);
        let mut entry = Self {
            artist_id: record.artist_id,
            title: record.title,
            thumbnail_url: record.thumbnail,
            nationality: record.nationality,
            birth: record.birth,
            added_at,
            time_ago_label: None,
        };
        entry.relabel(now);
        entry
    }

    /// Local stand-in for an add that the server has not confirmed yet.
    #[must_use]
    pub fn optimistic(request: &AddFavoriteRequest, now: DateTime<Utc>) -> Self {
        let mut entry = Self {
            artist_id: request.artist_id.clone(),
            title: request.title.clone(),
            thumbnail_url: request.thumbnail.clone(),
            nationality: request.nationality.clone(),
            birth: request.birth.clone(),
            added_at: Some(now),
            time_ago_label: None,
        };
        entry.relabel(now);
        entry
    }

    /// Whole seconds elapsed since `added_at`; negative if it lies ahead.
    #[must_use]
    pub fn age_seconds(&self, now: DateTime<Utc>) -> Option<i64> {
        self.added_at.map(|added| (now - added).num_seconds())
    }

    /// Recomputes the label. Returns `true` when it changed.
    pub fn relabel(&mut self, now: DateTime<Utc>) -> bool {
        let label = self.age_seconds(now).map(time_ago_label);
        if label == self.time_ago_label {
            return false;
        }
        self.time_ago_label = label;
        true
    }
}

fn parse_added_at(raw: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(instant) => Some(instant.with_timezone(&Utc)),
        Err(error) => {
            debug!(added_at = raw, error = %error, "Unparseable favorite timestamp");
            None
        }
    }
}

/// Orders entries newest first.
///
/// The server lists favorites oldest first, so the list is reversed before a
/// stable sort; entries sharing an instant keep that reversed order and
/// undated entries go last.
pub(crate) fn order_newest_first(entries: &mut [FavoriteEntry]) {
    entries.reverse();
    entries.sort_by(|left, right| match (left.added_at, right.added_at) {
        (Some(left), Some(right)) => right.cmp(&left),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

/// Relabels a snapshot. Returns `None` when no label changed.
pub(crate) fn relabel_all(
    entries: &[FavoriteEntry],
    now: DateTime<Utc>,
) -> Option<Arc<[FavoriteEntry]>> {
    let mut relabeled = entries.to_vec();
    let mut changed = false;
    for entry in &mut relabeled {
        changed |= entry.relabel(now);
    }
    changed.then(|| relabeled.into())
}
