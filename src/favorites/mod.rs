//! Favorites cache with optimistic toggling.
//!
//! [`FavoritesCache`] holds the signed-in user's favorites as an immutable
//! snapshot published through a `watch` channel. Toggles update the snapshot
//! before the server answers and are then reconciled with a full refresh.
//! Mutations are serialized per cache: the operation lock is held across the
//! remote call and the reconciling refresh.

mod entry;
mod label;
mod ticker;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, instrument, warn};

use crate::api::{AddFavoriteRequest, ApiError, FavoritesApi};
use crate::clock::{Clock, SystemClock};
use crate::session::SessionView;

pub use entry::FavoriteEntry;
pub use label::time_ago_label;
pub use ticker::{DEFAULT_LABEL_TICK, RecomputeTicker};

use entry::order_newest_first;

/// Immutable view of the cached favorites, newest first.
pub type Snapshot = Arc<[FavoriteEntry]>;

/// Errors returned by [`FavoritesCache`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FavoritesError {
    /// No authenticated session, or the server rejected it.
    #[error("not signed in")]
    Unauthorized,

    /// The remote call failed.
    #[error(transparent)]
    Api(ApiError),
}

impl From<ApiError> for FavoritesError {
    fn from(error: ApiError) -> Self {
        if error.is_unauthorized() {
            Self::Unauthorized
        } else {
            Self::Api(error)
        }
    }
}

/// What a failed refresh does to the cached list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshFailurePolicy {
    /// Keep showing the last good list.
    #[default]
    KeepStale,
    /// Empty the list.
    Clear,
}

impl fmt::Display for RefreshFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeepStale => write!(f, "keep-stale"),
            Self::Clear => write!(f, "clear"),
        }
    }
}

impl FromStr for RefreshFailurePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "keep-stale" | "keep_stale" | "stale" => Ok(Self::KeepStale),
            "clear" => Ok(Self::Clear),
            other => Err(format!(
                "unknown refresh failure policy '{other}' (expected keep-stale or clear)"
            )),
        }
    }
}

/// The signed-in user's favorites.
pub struct FavoritesCache {
    api: Arc<dyn FavoritesApi>,
    session: SessionView,
    clock: Arc<dyn Clock>,
    policy: RefreshFailurePolicy,
    state: Arc<watch::Sender<Snapshot>>,
    op_lock: Mutex<()>,
}

impl fmt::Debug for FavoritesCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FavoritesCache")
            .field("entries", &self.state.borrow().len())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl FavoritesCache {
    /// Creates an empty cache gated on `session`.
    #[must_use]
    pub fn new(api: Arc<dyn FavoritesApi>, session: SessionView) -> Self {
        let (state, _) = watch::channel(Snapshot::from(Vec::new()));
        Self {
            api,
            session,
            clock: Arc::new(SystemClock),
            policy: RefreshFailurePolicy::default(),
            state: Arc::new(state),
            op_lock: Mutex::new(()),
        }
    }

    /// Replaces the wall clock used for labels and optimistic entries.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sets what a failed refresh does to the list.
    #[must_use]
    pub fn with_refresh_policy(mut self, policy: RefreshFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Current list, newest first.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.state.borrow().clone()
    }

    /// Receiver that observes every published snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.state.subscribe()
    }

    /// Whether `artist_id` is in the cached list.
    #[must_use]
    pub fn contains(&self, artist_id: &str) -> bool {
        self.state
            .borrow()
            .iter()
            .any(|entry| entry.artist_id == artist_id)
    }

    /// Empties the cache, e.g. after logout.
    pub fn clear(&self) {
        self.state.send_replace(Snapshot::from(Vec::new()));
    }

    /// Replaces the list with the server's.
    ///
    /// Returns the number of entries now cached.
    ///
    /// # Errors
    ///
    /// [`FavoritesError::Unauthorized`] when signed out (the list is emptied),
    /// or the fetch failure; the list is then kept or emptied according to
    /// the [`RefreshFailurePolicy`].
    pub async fn refresh(&self) -> Result<usize, FavoritesError> {
        let _guard = self.op_lock.lock().await;
        self.refresh_locked().await
    }

    /// Adds the artist if absent, removes it if present.
    ///
    /// The assumed outcome (`true` = now a favorite) is published to the
    /// snapshot immediately, then a refresh reconciles it with the server.
    /// When the remote call fails the local change is rolled back and the
    /// error is returned.
    ///
    /// # Errors
    ///
    /// [`FavoritesError::Unauthorized`] without a session (nothing changes),
    /// or the remote failure.
    #[instrument(skip(self, request), fields(artist_id = %request.artist_id))]
    pub async fn toggle(&self, request: AddFavoriteRequest) -> Result<bool, FavoritesError> {
        let _guard = self.op_lock.lock().await;
        self.ensure_authenticated()?;

        let previous = self.snapshot();
        let present = previous
            .iter()
            .any(|entry| entry.artist_id == request.artist_id);
        let assumed = !present;
        self.apply_optimistic(&previous, &request, assumed);

        let remote = if present {
            self.api.remove_favorite(&request.artist_id).await
        } else {
            self.api.add_favorite(&request).await
        };

        match remote {
            Ok(()) => {
                debug!(favorite = assumed, "Toggle accepted");
                if let Err(error) = self.refresh_locked().await {
                    warn!(error = %error, "Reconciling refresh after toggle failed");
                }
                Ok(assumed)
            }
            Err(error) => {
                warn!(error = %error, "Toggle rejected; rolling back");
                self.state.send_replace(previous);
                if let Err(refresh_error) = self.refresh_locked().await {
                    debug!(error = %refresh_error, "Reconciling refresh after failed toggle failed");
                }
                Err(error.into())
            }
        }
    }

    /// Removes an artist, then refreshes.
    ///
    /// # Errors
    ///
    /// [`FavoritesError::Unauthorized`] without a session, or the remote
    /// failure. The list is left untouched when the removal fails.
    #[instrument(skip(self))]
    pub async fn remove(&self, artist_id: &str) -> Result<(), FavoritesError> {
        let _guard = self.op_lock.lock().await;
        self.ensure_authenticated()?;

        if let Err(error) = self.api.remove_favorite(artist_id).await {
            warn!(error = %error, "Remove favorite failed");
            return Err(error.into());
        }
        if let Err(error) = self.refresh_locked().await {
            warn!(error = %error, "Refresh after remove failed");
        }
        Ok(())
    }

    /// Asks the server whether `artist_id` is a favorite.
    ///
    /// # Errors
    ///
    /// [`FavoritesError::Unauthorized`] without a session, or the remote
    /// failure.
    pub async fn check_remote(&self, artist_id: &str) -> Result<bool, FavoritesError> {
        self.ensure_authenticated()?;
        Ok(self.api.is_favorite(artist_id).await?)
    }

    /// Recomputes every label against the current time.
    pub fn recompute_labels(&self) {
        ticker::recompute(&self.state, self.clock.now());
    }

    /// Starts the periodic label recompute loop on the current runtime.
    #[must_use = "dropping the ticker stops the loop"]
    pub fn start_recompute(&self, period: Duration) -> RecomputeTicker {
        RecomputeTicker::spawn(Arc::downgrade(&self.state), Arc::clone(&self.clock), period)
    }

    fn ensure_authenticated(&self) -> Result<(), FavoritesError> {
        if self.session.is_authenticated() {
            Ok(())
        } else {
            Err(FavoritesError::Unauthorized)
        }
    }

    fn apply_optimistic(&self, previous: &Snapshot, request: &AddFavoriteRequest, add: bool) {
        let next: Vec<FavoriteEntry> = if add {
            std::iter::once(FavoriteEntry::optimistic(request, self.clock.now()))
                .chain(previous.iter().cloned())
                .collect()
        } else {
            previous
                .iter()
                .filter(|entry| entry.artist_id != request.artist_id)
                .cloned()
                .collect()
        };
        self.state.send_replace(next.into());
    }

    #[instrument(skip(self))]
    async fn refresh_locked(&self) -> Result<usize, FavoritesError> {
        if !self.session.is_authenticated() {
            self.clear();
            return Err(FavoritesError::Unauthorized);
        }

        match self.api.list_favorites().await {
            Ok(records) => {
                let now = self.clock.now();
                let mut entries: Vec<FavoriteEntry> = records
                    .into_iter()
                    .map(|record| FavoriteEntry::from_record(record, now))
                    .collect();
                order_newest_first(&mut entries);
                let count = entries.len();
                self.state.send_replace(entries.into());
                info!(count, "Favorites refreshed");
                Ok(count)
            }
            Err(error) => {
                warn!(error = %error, policy = %self.policy, "Favorites refresh failed");
                if self.policy == RefreshFailurePolicy::Clear {
                    self.clear();
                }
                Err(error.into())
            }
        }
    }
}
