//! Read-only catalog commands: search, artist detail, categories.

use anyhow::{Context, Result};
use art_catalog_core::{Artist, CatalogApp};

pub async fn run_search_command(app: &CatalogApp, query: &str) -> Result<()> {
    let artists = app
        .api()
        .search_artists(query)
        .await
        .with_context(|| format!("Search for '{query}' failed"))?;

    if artists.is_empty() {
        println!("No artists matched '{query}'.");
        return Ok(());
    }
    for artist in &artists {
        println!("{}", render_artist_row(artist));
    }
    Ok(())
}

pub async fn run_artist_command(
    app: &CatalogApp,
    artist_id: &str,
    with_artworks: bool,
    with_similar: bool,
) -> Result<()> {
    let artist = app
        .api()
        .artist(artist_id)
        .await
        .with_context(|| format!("Failed to load artist '{artist_id}'"))?;

    println!("{}", artist.display_name());
    if let Some(line) = life_line(&artist) {
        println!("{line}");
    }
    if let Some(biography) = artist.biography.as_deref().filter(|text| !text.trim().is_empty()) {
        println!();
        println!("{}", biography.trim());
    }

    if with_artworks {
        let artworks = app
            .api()
            .artworks(artist_id)
            .await
            .context("Failed to load artworks")?;
        println!();
        println!("Artworks ({}):", artworks.len());
        for artwork in &artworks {
            match artwork.date.as_deref() {
                Some(date) if !date.is_empty() => {
                    println!("  {}  {} ({date})", artwork.id, artwork.title);
                }
                _ => println!("  {}  {}", artwork.id, artwork.title),
            }
        }
    }

    if with_similar {
        let similar = app
            .api()
            .similar_artists(artist_id)
            .await
            .context("Failed to load similar artists")?;
        println!();
        println!("Similar artists ({}):", similar.len());
        for artist in &similar {
            println!("  {}", render_artist_row(artist));
        }
    }
    Ok(())
}

pub async fn run_categories_command(app: &CatalogApp, artwork_id: &str) -> Result<()> {
    let categories = app
        .api()
        .artwork_categories(artwork_id)
        .await
        .with_context(|| format!("Failed to load categories for '{artwork_id}'"))?;

    if categories.is_empty() {
        println!("No categories for artwork '{artwork_id}'.");
    }
    for category in &categories {
        println!("{}  {}", category.id, category.name);
    }
    Ok(())
}

fn render_artist_row(artist: &Artist) -> String {
    let id = artist.id.as_deref().unwrap_or("-");
    format!("{id}  {}", artist.display_name())
}

fn life_line(artist: &Artist) -> Option<String> {
    let nationality = artist.nationality.as_deref().filter(|s| !s.is_empty());
    let birthday = artist.birthday.as_deref().filter(|s| !s.is_empty());
    let deathday = artist.deathday.as_deref().filter(|s| !s.is_empty());

    let years = match (birthday, deathday) {
        (Some(born), Some(died)) => Some(format!("{born} - {died}")),
        (Some(born), None) => Some(born.to_string()),
        (None, Some(died)) => Some(format!("? - {died}")),
        (None, None) => None,
    };
    match (nationality, years) {
        (Some(nationality), Some(years)) => Some(format!("{nationality}, {years}")),
        (Some(nationality), None) => Some(nationality.to_string()),
        (None, Some(years)) => Some(years),
        (None, None) => None,
    }
}
