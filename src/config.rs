//! Client configuration.
//!
//! Defaults are overridden by an optional `key = value` file at
//! `$XDG_CONFIG_HOME/art-catalog/config.toml` (falling back to
//! `$HOME/.config/art-catalog/config.toml`), and the cookie encryption key can
//! come from `ART_CATALOG_MASTER_KEY`. Command-line flags are applied on top by
//! the binary.

use std::env;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::api::HttpTimeouts;
use crate::favorites::RefreshFailurePolicy;

/// Production API root.
pub const DEFAULT_BASE_URL: &str = "https://csci571-a3-surin.uw.r.appspot.com/api/";

/// Environment variable holding the cookie encryption key.
pub const MASTER_KEY_ENV: &str = "ART_CATALOG_MASTER_KEY";

const APP_DIR: &str = "art-catalog";
const CONFIG_FILE: &str = "config.toml";
const COOKIE_FILE: &str = "cookies.json";

const DEFAULT_LABEL_TICK_MILLIS: u64 = 1_000;

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("failed to read config file '{path}': {source}")]
    Read {
        /// Config file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A line is not `key = value`.
    #[error("invalid config syntax on line {line}: expected key = value")]
    Syntax {
        /// 1-based line number.
        line: usize,
    },

    /// The key is not recognized.
    #[error("unknown configuration key '{key}' on line {line}")]
    UnknownKey {
        /// Offending key.
        key: String,
        /// 1-based line number.
        line: usize,
    },

    /// The value does not parse for its key.
    #[error("invalid `{key}` value on line {line}: {reason}")]
    InvalidValue {
        /// Key being set.
        key: String,
        /// 1-based line number.
        line: usize,
        /// Why the value was rejected.
        reason: String,
    },

    /// A numeric value is outside its allowed range.
    #[error("invalid config value for `{key}`: {value}. Expected range: {expected}")]
    OutOfRange {
        /// Key being validated.
        key: &'static str,
        /// Rejected value.
        value: u64,
        /// Allowed range, for display.
        expected: &'static str,
    },

    /// The base URL does not parse or is not HTTP(S).
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl {
        /// Rejected URL.
        url: String,
        /// Parse failure.
        reason: String,
    },
}

impl ConfigError {
    fn invalid_value(key: &str, line: usize, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            line,
            reason: reason.into(),
        }
    }
}

/// Values read from the config file. `None` means "not set".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// API root URL.
    pub base_url: Option<String>,
    /// Cookie store location.
    pub cookie_path: Option<PathBuf>,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// Whole-request timeout in seconds.
    pub read_timeout_secs: Option<u64>,
    /// Label recompute period in milliseconds.
    pub label_tick_millis: Option<u64>,
    /// What a failed favorites refresh does to the list.
    pub refresh_failure_policy: Option<RefreshFailurePolicy>,
}

/// Effective client settings.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API root URL.
    pub base_url: String,
    /// Cookie store file; `None` keeps cookies in memory only.
    pub cookie_path: Option<PathBuf>,
    /// Key material for encrypting the cookie file.
    pub master_key: Option<String>,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds.
    pub read_timeout_secs: u64,
    /// Label recompute period in milliseconds.
    pub label_tick_millis: u64,
    /// What a failed favorites refresh does to the list.
    pub refresh_failure_policy: RefreshFailurePolicy,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("cookie_path", &self.cookie_path)
            .field("master_key", &self.master_key.as_ref().map(|_| "[REDACTED]"))
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("read_timeout_secs", &self.read_timeout_secs)
            .field("label_tick_millis", &self.label_tick_millis)
            .field("refresh_failure_policy", &self.refresh_failure_policy)
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        let timeouts = HttpTimeouts::default();
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cookie_path: default_cookie_path(),
            master_key: None,
            connect_timeout_secs: timeouts.connect_secs,
            read_timeout_secs: timeouts.read_secs,
            label_tick_millis: DEFAULT_LABEL_TICK_MILLIS,
            refresh_failure_policy: RefreshFailurePolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Defaults, overlaid with the default config file (if present) and the
    /// master key from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or parsed, or a
    /// value fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(path) = resolve_default_config_path()
            && path.exists()
        {
            config.apply_file(load_file_config(&path)?);
            debug!(path = %path.display(), "Loaded config file");
        }
        if let Some(key) = master_key_from_env() {
            config.master_key = Some(key);
        }
        config.validate()?;
        Ok(config)
    }

    /// Overlays every value the file sets.
    pub fn apply_file(&mut self, file: FileConfig) {
        if let Some(base_url) = file.base_url {
            self.base_url = base_url;
        }
        if let Some(cookie_path) = file.cookie_path {
            self.cookie_path = Some(cookie_path);
        }
        if let Some(secs) = file.connect_timeout_secs {
            self.connect_timeout_secs = secs;
        }
        if let Some(secs) = file.read_timeout_secs {
            self.read_timeout_secs = secs;
        }
        if let Some(millis) = file.label_tick_millis {
            self.label_tick_millis = millis;
        }
        if let Some(policy) = file.refresh_failure_policy {
            self.refresh_failure_policy = policy;
        }
    }

    /// Checks ranges and the base URL.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_range(
            "connect_timeout_secs",
            self.connect_timeout_secs,
            1..=3600,
            "1..=3600",
        )?;
        validate_range(
            "read_timeout_secs",
            self.read_timeout_secs,
            1..=3600,
            "1..=3600",
        )?;
        validate_range(
            "label_tick_millis",
            self.label_tick_millis,
            100..=60_000,
            "100..=60000",
        )?;
        validate_base_url(&self.base_url)
    }

    /// HTTP timeouts for the API client.
    #[must_use]
    pub fn timeouts(&self) -> HttpTimeouts {
        HttpTimeouts {
            connect_secs: self.connect_timeout_secs,
            read_secs: self.read_timeout_secs,
        }
    }

    /// Label recompute period.
    #[must_use]
    pub fn label_tick(&self) -> Duration {
        Duration::from_millis(self.label_tick_millis)
    }
}

fn validate_range(
    key: &'static str,
    value: u64,
    range: std::ops::RangeInclusive<u64>,
    expected: &'static str,
) -> Result<(), ConfigError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            key,
            value,
            expected,
        })
    }
}

fn validate_base_url(raw: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw).map_err(|error| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: error.to_string(),
    })?;
    if matches!(url.scheme(), "http" | "https") {
        Ok(())
    } else {
        Err(ConfigError::InvalidBaseUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        })
    }
}

/// Per-user application directory.
///
/// Priority: `$XDG_CONFIG_HOME/art-catalog`, `$HOME/.config/art-catalog`,
/// `%APPDATA%/art-catalog`.
#[must_use]
pub fn resolve_config_dir(
    xdg_config_home: Option<PathBuf>,
    home: Option<PathBuf>,
    app_data: Option<PathBuf>,
) -> Option<PathBuf> {
    if let Some(xdg) = xdg_config_home {
        return Some(xdg.join(APP_DIR));
    }
    if let Some(home) = home {
        return Some(home.join(".config").join(APP_DIR));
    }
    app_data.map(|app_data| app_data.join(APP_DIR))
}

fn default_config_dir() -> Option<PathBuf> {
    resolve_config_dir(
        env_var_non_empty_os("XDG_CONFIG_HOME").map(PathBuf::from),
        env_var_non_empty_os("HOME").map(PathBuf::from),
        env_var_non_empty_os("APPDATA").map(PathBuf::from),
    )
}

/// Default config file location, if a base directory is known.
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|dir| dir.join(CONFIG_FILE))
}

/// Default cookie store location, if a base directory is known.
#[must_use]
pub fn default_cookie_path() -> Option<PathBuf> {
    default_config_dir().map(|dir| dir.join(COOKIE_FILE))
}

/// Master key from `ART_CATALOG_MASTER_KEY`, ignoring blank values.
#[must_use]
pub fn master_key_from_env() -> Option<String> {
    let value = env::var_os(MASTER_KEY_ENV)?;
    let key = value.to_string_lossy().trim().to_string();
    if key.is_empty() { None } else { Some(key) }
}

fn env_var_non_empty_os(name: &str) -> Option<OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Reads and parses a config file.
///
/// # Errors
///
/// Returns [`ConfigError::Read`] on I/O failure, or any parse error.
pub fn load_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config_str(&raw)
}

/// Parses `key = value` lines. Strings are double-quoted, `#` starts a
/// comment outside strings.
///
/// # Errors
///
/// Returns [`ConfigError`] for bad syntax, unknown keys or bad values.
pub fn parse_config_str(raw: &str) -> Result<FileConfig, ConfigError> {
    let mut cfg = FileConfig::default();
    for (index, raw_line) in raw.lines().enumerate() {
        let line_no = index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            return Err(ConfigError::Syntax { line: line_no });
        };
        let key = raw_key.trim();
        let value = raw_value.trim();

        match key {
            "base_url" => {
                cfg.base_url = Some(parse_string_literal(key, line_no, value)?);
            }
            "cookie_path" => {
                cfg.cookie_path = Some(PathBuf::from(parse_string_literal(key, line_no, value)?));
            }
            "connect_timeout_secs" => {
                cfg.connect_timeout_secs = Some(parse_integer(key, line_no, value)?);
            }
            "read_timeout_secs" => {
                cfg.read_timeout_secs = Some(parse_integer(key, line_no, value)?);
            }
            "label_tick_millis" => {
                cfg.label_tick_millis = Some(parse_integer(key, line_no, value)?);
            }
            "refresh_failure_policy" => {
                let literal = parse_string_literal(key, line_no, value)?;
                let policy = literal
                    .parse::<RefreshFailurePolicy>()
                    .map_err(|reason| ConfigError::invalid_value(key, line_no, reason))?;
                cfg.refresh_failure_policy = Some(policy);
            }
            unknown => {
                return Err(ConfigError::UnknownKey {
                    key: unknown.to_string(),
                    line: line_no,
                });
            }
        }
    }
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(key: &str, line: usize, value: &str) -> Result<String, ConfigError> {
    if value.len() < 2 || !value.starts_with('"') || !value.ends_with('"') {
        return Err(ConfigError::invalid_value(
            key,
            line,
            "expected double-quoted string",
        ));
    }
    Ok(value[1..value.len() - 1].to_string())
}

fn parse_integer(key: &str, line: usize, value: &str) -> Result<u64, ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::invalid_value(key, line, "expected integer value"));
    }
    value
        .replace('_', "")
        .parse::<u64>()
        .map_err(|error| ConfigError::invalid_value(key, line, error.to_string()))
}
