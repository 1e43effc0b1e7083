//! In-process stand-in for the remote catalog API.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use art_catalog_core::{
    AccountApi, AddFavoriteRequest, ApiError, Clock, FavoriteRecord, FavoritesApi, ManualClock,
    Profile,
};
use async_trait::async_trait;
use chrono::SecondsFormat;
use tokio::sync::Notify;

/// Server-side favorites kept oldest first, the way the real API lists them.
#[derive(Debug)]
pub struct FakeCatalog {
    clock: ManualClock,
    favorites: Mutex<Vec<FavoriteRecord>>,
    calls: Mutex<Vec<String>>,
    add_failures: Mutex<VecDeque<ApiError>>,
    remove_failures: Mutex<VecDeque<ApiError>>,
    list_failures: Mutex<VecDeque<ApiError>>,
    drop_adds: AtomicBool,
    hold_mutations: AtomicBool,
    mutation_entered: Notify,
    mutation_release: Notify,
}

impl FakeCatalog {
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            favorites: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            add_failures: Mutex::new(VecDeque::new()),
            remove_failures: Mutex::new(VecDeque::new()),
            list_failures: Mutex::new(VecDeque::new()),
            drop_adds: AtomicBool::new(false),
            hold_mutations: AtomicBool::new(false),
            mutation_entered: Notify::new(),
            mutation_release: Notify::new(),
        }
    }

    /// Seeds a server-side favorite with an explicit `addedAt`.
    pub fn seed(&self, artist_id: &str, title: &str, added_at: &str) {
        self.favorites.lock().unwrap().push(FavoriteRecord {
            artist_id: artist_id.to_string(),
            title: title.to_string(),
            thumbnail: None,
            nationality: None,
            birth: None,
            added_at: Some(added_at.to_string()),
        });
    }

    pub fn server_ids(&self) -> Vec<String> {
        self.favorites
            .lock()
            .unwrap()
            .iter()
            .map(|record| record.artist_id.clone())
            .collect()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail_next_add(&self, error: ApiError) {
        self.add_failures.lock().unwrap().push_back(error);
    }

    pub fn fail_next_remove(&self, error: ApiError) {
        self.remove_failures.lock().unwrap().push_back(error);
    }

    pub fn fail_next_list(&self, error: ApiError) {
        self.list_failures.lock().unwrap().push_back(error);
    }

    /// Acknowledge adds without storing them.
    pub fn drop_adds(&self, enabled: bool) {
        self.drop_adds.store(enabled, Ordering::SeqCst);
    }

    /// Park add/remove calls until [`FakeCatalog::release_mutation`].
    pub fn hold_mutations(&self, enabled: bool) {
        self.hold_mutations.store(enabled, Ordering::SeqCst);
    }

    pub async fn wait_for_mutation(&self) {
        self.mutation_entered.notified().await;
    }

    pub fn release_mutation(&self) {
        self.mutation_release.notify_one();
    }

    fn record_call(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    async fn gate(&self) {
        if self.hold_mutations.load(Ordering::SeqCst) {
            self.mutation_entered.notify_one();
            self.mutation_release.notified().await;
        }
    }
}

#[async_trait]
impl AccountApi for FakeCatalog {
    async fn login(&self, _email: &str, _password: &str) -> Result<(), ApiError> {
        self.record_call("login".to_string());
        Ok(())
    }

    async fn register(&self, _: &str, _: &str, _: &str) -> Result<(), ApiError> {
        self.record_call("register".to_string());
        Ok(())
    }

    async fn who_am_i(&self) -> Result<Profile, ApiError> {
        Ok(Profile {
            id: "u1".to_string(),
            full_name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            profile_image_url: None,
        })
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.record_call("logout".to_string());
        Ok(())
    }

    async fn delete_account(&self) -> Result<(), ApiError> {
        Ok(())
    }
}

#[async_trait]
impl FavoritesApi for FakeCatalog {
    async fn is_favorite(&self, artist_id: &str) -> Result<bool, ApiError> {
        Ok(self.server_ids().iter().any(|id| id == artist_id))
    }

    async fn list_favorites(&self) -> Result<Vec<FavoriteRecord>, ApiError> {
        self.record_call("list".to_string());
        if let Some(error) = self.list_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        Ok(self.favorites.lock().unwrap().clone())
    }

    async fn add_favorite(&self, request: &AddFavoriteRequest) -> Result<(), ApiError> {
        self.record_call(format!("add:{}", request.artist_id));
        self.gate().await;
        if let Some(error) = self.add_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        if self.drop_adds.load(Ordering::SeqCst) {
            return Ok(());
        }
        let added_at = self.clock.now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let mut favorites = self.favorites.lock().unwrap();
        if !favorites.iter().any(|record| record.artist_id == request.artist_id) {
            favorites.push(FavoriteRecord {
                artist_id: request.artist_id.clone(),
                title: request.title.clone(),
                thumbnail: request.thumbnail.clone(),
                nationality: request.nationality.clone(),
                birth: request.birth.clone(),
                added_at: Some(added_at),
            });
        }
        Ok(())
    }

    async fn remove_favorite(&self, artist_id: &str) -> Result<(), ApiError> {
        self.record_call(format!("remove:{artist_id}"));
        self.gate().await;
        if let Some(error) = self.remove_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        self.favorites
            .lock()
            .unwrap()
            .retain(|record| record.artist_id != artist_id);
        Ok(())
    }
}
