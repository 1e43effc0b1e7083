//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Browse the art catalog and manage your favorites.
///
/// Sessions persist between runs: log in once and later commands reuse the
/// stored cookie until it expires or you log out.
#[derive(Parser, Debug)]
#[command(name = "art-catalog")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// API root URL (overrides the config file)
    #[arg(long, value_name = "URL", global = true)]
    pub base_url: Option<String>,

    /// Cookie store file (overrides the config file)
    #[arg(long, value_name = "PATH", global = true)]
    pub cookie_file: Option<PathBuf>,

    /// Keep cookies in memory only for this run
    #[arg(long, global = true, conflicts_with = "cookie_file")]
    pub ephemeral: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Log in with email and password
    Login {
        /// Account email
        email: String,
        /// Password (read from stdin when omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Create an account (does not log in)
    Register {
        /// Display name
        #[arg(long)]
        name: String,
        /// Account email
        email: String,
        /// Password (read from stdin when omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Show the signed-in user
    Whoami,

    /// Log out
    Logout {
        /// Also erase the persisted cookies
        #[arg(long)]
        forget: bool,
    },

    /// Permanently delete the signed-in account
    DeleteAccount {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Search artists
    Search {
        /// Free-text query
        query: String,
    },

    /// Show an artist's detail
    Artist {
        /// Artist id
        id: String,
        /// Also list artworks
        #[arg(long)]
        artworks: bool,
        /// Also list similar artists (requires login)
        #[arg(long)]
        similar: bool,
    },

    /// List the categories of an artwork
    Categories {
        /// Artwork id
        artwork_id: String,
    },

    /// Manage favorites (requires login)
    Favorites {
        #[command(subcommand)]
        action: FavoritesCommand,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum FavoritesCommand {
    /// List favorites, newest first
    List,

    /// Add the artist if absent, remove it if present
    Toggle {
        /// Artist id
        artist_id: String,
        /// Title to store (fetched from the artist detail when omitted)
        #[arg(long)]
        title: Option<String>,
    },

    /// Remove an artist from favorites
    Remove {
        /// Artist id
        artist_id: String,
    },

    /// Ask the server whether an artist is a favorite
    Check {
        /// Artist id
        artist_id: String,
    },

    /// Keep printing the list as labels tick (Ctrl-C to stop)
    Watch {
        /// Stop after this many seconds
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..=86_400))]
        seconds: Option<u64>,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_login_parses_email_and_password() {
        let args =
            Args::try_parse_from(["art-catalog", "login", "ada@example.com", "--password", "pw"])
                .unwrap();
        assert_eq!(
            args.command,
            Command::Login {
                email: "ada@example.com".to_string(),
                password: Some("pw".to_string()),
            }
        );
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "art-catalog",
            "whoami",
            "-vv",
            "--base-url",
            "http://localhost:9000/api",
            "--ephemeral",
        ])
        .unwrap();
        assert_eq!(args.command, Command::Whoami);
        assert_eq!(args.verbose, 2);
        assert_eq!(args.base_url.as_deref(), Some("http://localhost:9000/api"));
        assert!(args.ephemeral);
    }

    #[test]
    fn test_cli_logout_forget_flag() {
        let args = Args::try_parse_from(["art-catalog", "logout", "--forget"]).unwrap();
        assert_eq!(args.command, Command::Logout { forget: true });
    }

    #[test]
    fn test_cli_favorites_toggle_and_watch() {
        let args = Args::try_parse_from([
            "art-catalog",
            "favorites",
            "toggle",
            "4d8b92b34eb68a1b2c0003f4",
            "--title",
            "Pablo Picasso",
        ])
        .unwrap();
        assert_eq!(
            args.command,
            Command::Favorites {
                action: FavoritesCommand::Toggle {
                    artist_id: "4d8b92b34eb68a1b2c0003f4".to_string(),
                    title: Some("Pablo Picasso".to_string()),
                }
            }
        );

        let args =
            Args::try_parse_from(["art-catalog", "favorites", "watch", "--seconds", "5"]).unwrap();
        assert_eq!(
            args.command,
            Command::Favorites {
                action: FavoritesCommand::Watch { seconds: Some(5) }
            }
        );
    }

    #[test]
    fn test_cli_watch_rejects_zero_seconds() {
        let result = Args::try_parse_from(["art-catalog", "favorites", "watch", "--seconds", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_ephemeral_conflicts_with_cookie_file() {
        let result = Args::try_parse_from([
            "art-catalog",
            "whoami",
            "--ephemeral",
            "--cookie-file",
            "/tmp/c.json",
        ]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ArgumentConflict
        );
    }

    #[test]
    fn test_cli_requires_subcommand() {
        let result = Args::try_parse_from(["art-catalog"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let result = Args::try_parse_from(["art-catalog", "--help"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::DisplayHelp
        );
    }
}
