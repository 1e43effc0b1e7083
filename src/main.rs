//! CLI entry point for the art catalog client.

use anyhow::{Context, Result};
use art_catalog_core::{CatalogApp, ClientConfig};
use clap::Parser;
use tracing::debug;

mod cli;
mod commands;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let config = build_config(&args)?;
    debug!(?config, "Effective configuration");
    let app = CatalogApp::new(config).context("Failed to initialize the API client")?;
    debug!(base_url = %app.api().base_url(), "Art catalog client ready");

    match args.command {
        Command::Login { email, password } => {
            commands::run_login_command(&app, &email, password).await
        }
        Command::Register {
            name,
            email,
            password,
        } => commands::run_register_command(&app, &name, &email, password).await,
        Command::Whoami => commands::run_whoami_command(&app).await,
        Command::Logout { forget } => commands::run_logout_command(&app, forget).await,
        Command::DeleteAccount { yes } => commands::run_delete_account_command(&app, yes).await,
        Command::Search { query } => commands::run_search_command(&app, &query).await,
        Command::Artist {
            id,
            artworks,
            similar,
        } => commands::run_artist_command(&app, &id, artworks, similar).await,
        Command::Categories { artwork_id } => {
            commands::run_categories_command(&app, &artwork_id).await
        }
        Command::Favorites { action } => commands::run_favorites_command(&app, action).await,
    }
}

/// Config file and environment, then command-line overrides.
fn build_config(args: &Args) -> Result<ClientConfig> {
    let mut config = ClientConfig::load().context("Invalid configuration")?;
    if let Some(base_url) = &args.base_url {
        config.base_url.clone_from(base_url);
    }
    if let Some(path) = &args.cookie_file {
        config.cookie_path = Some(path.clone());
    }
    if args.ephemeral {
        config.cookie_path = None;
    }
    config.validate().context("Invalid command-line override")?;
    Ok(config)
}
