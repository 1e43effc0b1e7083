//! Favorites commands.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use art_catalog_core::{AddFavoriteRequest, CatalogApp, FavoriteEntry};
use tracing::{debug, warn};

use super::require_session;
use crate::cli::FavoritesCommand;

pub async fn run_favorites_command(app: &CatalogApp, action: FavoritesCommand) -> Result<()> {
    require_session(app).await?;

    match action {
        FavoritesCommand::List => {
            app.favorites()
                .refresh()
                .await
                .map_err(|error| anyhow!("Failed to load favorites: {error}"))?;
            print_favorites(&app.favorites().snapshot());
        }
        FavoritesCommand::Toggle { artist_id, title } => {
            // The cached list decides add vs remove, so load it first.
            if let Err(error) = app.favorites().refresh().await {
                warn!(error = %error, "Could not load favorites before toggling");
            }
            let request = build_add_request(app, &artist_id, title).await?;
            let now_favorite = app
                .favorites()
                .toggle(request)
                .await
                .map_err(|error| anyhow!("Toggle failed: {error}"))?;
            if now_favorite {
                println!("Added {artist_id} to favorites");
            } else {
                println!("Removed {artist_id} from favorites");
            }
        }
        FavoritesCommand::Remove { artist_id } => {
            app.favorites()
                .remove(&artist_id)
                .await
                .map_err(|error| anyhow!("Remove failed: {error}"))?;
            println!("Removed {artist_id} from favorites");
        }
        FavoritesCommand::Check { artist_id } => {
            let favorite = app
                .favorites()
                .check_remote(&artist_id)
                .await
                .map_err(|error| anyhow!("Check failed: {error}"))?;
            println!("{artist_id}: {}", if favorite { "favorite" } else { "not a favorite" });
        }
        FavoritesCommand::Watch { seconds } => {
            run_watch(app, seconds.map(Duration::from_secs)).await?;
        }
    }
    Ok(())
}

/// Uses the given title, or fills the request from the artist detail.
async fn build_add_request(
    app: &CatalogApp,
    artist_id: &str,
    title: Option<String>,
) -> Result<AddFavoriteRequest> {
    if let Some(title) = title {
        return Ok(AddFavoriteRequest::new(artist_id, title));
    }
    if let Some(entry) = app
        .favorites()
        .snapshot()
        .iter()
        .find(|entry| entry.artist_id == artist_id)
    {
        return Ok(AddFavoriteRequest::new(artist_id, entry.title.clone()));
    }

    let artist = app
        .api()
        .artist(artist_id)
        .await
        .with_context(|| format!("Failed to load artist '{artist_id}'"))?;
    let mut request = AddFavoriteRequest::new(artist_id, artist.display_name());
    request.thumbnail = artist.thumbnail().map(str::to_string);
    request.birth = artist.birthday.clone();
    request.nationality = artist.nationality.clone();
    Ok(request)
}

async fn run_watch(app: &CatalogApp, limit: Option<Duration>) -> Result<()> {
    app.favorites()
        .refresh()
        .await
        .map_err(|error| anyhow!("Failed to load favorites: {error}"))?;

    let mut updates = app.favorites().subscribe();
    let ticker = app.favorites().start_recompute(app.config().label_tick());
    print_favorites(&updates.borrow_and_update());

    let deadline = async {
        match limit {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                println!();
                print_favorites(&updates.borrow_and_update());
            }
            () = &mut deadline => {
                debug!("Watch time limit reached");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                debug!("Watch interrupted");
                break;
            }
        }
    }

    ticker.cancel();
    Ok(())
}

fn print_favorites(entries: &[FavoriteEntry]) {
    if entries.is_empty() {
        println!("No favorites yet.");
        return;
    }
    for entry in entries {
        println!("{}", render_favorite_row(entry));
    }
}

fn render_favorite_row(entry: &FavoriteEntry) -> String {
    let mut details = Vec::new();
    if let Some(nationality) = entry.nationality.as_deref().filter(|s| !s.is_empty()) {
        details.push(nationality);
    }
    if let Some(birth) = entry.birth.as_deref().filter(|s| !s.is_empty()) {
        details.push(birth);
    }

    let mut row = format!("{}  {}", entry.artist_id, entry.title);
    if !details.is_empty() {
        row.push_str(&format!(" ({})", details.join(", ")));
    }
    if let Some(label) = &entry.time_ago_label {
        row.push_str(&format!("  {label}"));
    }
    row
}
