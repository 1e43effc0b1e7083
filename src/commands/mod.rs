//! CLI command handlers.

mod account;
mod catalog;
mod favorites;

use std::io::{self, IsTerminal, Read};

use anyhow::{Result, bail};
use art_catalog_core::CatalogApp;

pub use account::{
    run_delete_account_command, run_login_command, run_logout_command, run_register_command,
    run_whoami_command,
};
pub use catalog::{run_artist_command, run_categories_command, run_search_command};
pub use favorites::run_favorites_command;

/// Restores the session from the persisted cookie, failing when there is none.
async fn require_session(app: &CatalogApp) -> Result<()> {
    if app.session().check_auth_status().await {
        Ok(())
    } else {
        bail!("Not logged in. Run `art-catalog login <EMAIL>` first.")
    }
}

/// Uses the flag value, or the first line of piped stdin.
fn resolve_password(flag: Option<String>) -> Result<String> {
    if let Some(password) = flag {
        return Ok(password);
    }
    if io::stdin().is_terminal() {
        bail!("No password given. Pass --password or pipe it on stdin.");
    }
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    password_from_input(&buffer)
}

fn password_from_input(input: &str) -> Result<String> {
    let password = input.lines().next().unwrap_or_default().trim_end_matches('\r');
    if password.is_empty() {
        bail!("No password provided on stdin");
    }
    Ok(password.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_password_from_input_takes_first_line() {
        assert_eq!(password_from_input("s3cret\nignored\n").unwrap(), "s3cret");
        assert_eq!(password_from_input("with space \r\n").unwrap(), "with space ");
    }

    #[test]
    fn test_password_from_input_rejects_empty() {
        assert!(password_from_input("").is_err());
        assert!(password_from_input("\n").is_err());
    }
}
