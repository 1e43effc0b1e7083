//! Account command handlers: login, register, whoami, logout, delete.

use anyhow::{Result, anyhow, bail};
use art_catalog_core::CatalogApp;
use tracing::info;

use super::{require_session, resolve_password};

pub async fn run_login_command(
    app: &CatalogApp,
    email: &str,
    password: Option<String>,
) -> Result<()> {
    let password = resolve_password(password)?;
    app.session()
        .login(email, &password)
        .await
        .map_err(|error| anyhow!("Login failed: {error}"))?;

    let session = app.session().snapshot();
    match session.full_name() {
        Some(name) => println!("Logged in as {name}"),
        None => println!("Logged in"),
    }
    app.session().reset_transient_flags();
    Ok(())
}

pub async fn run_register_command(
    app: &CatalogApp,
    full_name: &str,
    email: &str,
    password: Option<String>,
) -> Result<()> {
    let password = resolve_password(password)?;
    app.session()
        .register(full_name, email, &password)
        .await
        .map_err(|error| anyhow!("Registration failed: {error}"))?;

    println!("Account created. Log in with `art-catalog login {email}`.");
    Ok(())
}

pub async fn run_whoami_command(app: &CatalogApp) -> Result<()> {
    require_session(app).await?;
    let session = app.session().snapshot();
    let Some(profile) = session.profile else {
        bail!("Logged in, but the profile could not be loaded");
    };

    println!("{} <{}>", profile.full_name, profile.email);
    if let Some(image) = profile.profile_image_url {
        println!("avatar: {image}");
    }
    Ok(())
}

pub async fn run_logout_command(app: &CatalogApp, forget: bool) -> Result<()> {
    app.sign_out(forget).await;
    if forget {
        info!("Logged out and removed stored cookies");
    } else {
        info!("Logged out");
    }
    println!("Logged out");
    Ok(())
}

pub async fn run_delete_account_command(app: &CatalogApp, confirmed: bool) -> Result<()> {
    if !confirmed {
        bail!("Refusing to delete the account without --yes");
    }
    require_session(app).await?;
    app.session()
        .delete_account()
        .await
        .map_err(|error| anyhow!("Account deletion failed: {error}"))?;
    app.favorites().clear();

    println!("Account deleted");
    Ok(())
}
