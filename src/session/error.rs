//! Session operation errors.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::api::ApiError;

/// Message shown when the server rejects a login.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid email or password";

/// Fallback when a registration failure carries no readable message.
const REGISTRATION_FALLBACK_MESSAGE: &str = "Registration failed. Please try again.";

/// Fallback when account deletion is rejected.
const DELETE_FAILED_MESSAGE: &str = "Failed to delete account.";

#[allow(clippy::expect_used)]
static EMAIL_TAKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)email.*(already|exists|taken|in use|registered)")
        .expect("email-taken regex is valid") // Static pattern, safe to panic
});

/// Errors returned by [`super::SessionManager`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The server rejected the email/password pair.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Registration failed because the email is already in use.
    #[error("{message}")]
    EmailAlreadyExists {
        /// Server message.
        message: String,
    },

    /// Registration failed for another reason.
    #[error("{0}")]
    RegistrationFailed(String),

    /// The server refused to delete the account.
    #[error("{0}")]
    DeleteFailed(String),

    /// Transport failure or unexpected API response.
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl SessionError {
    /// Maps a login failure. Anything the server answered is a credential
    /// rejection; transport failures stay API errors.
    pub(crate) fn from_login(error: ApiError) -> Self {
        match error {
            ApiError::Unauthorized { .. }
            | ApiError::NotFound { .. }
            | ApiError::Rejected { .. } => Self::InvalidCredentials,
            other => Self::Api(other),
        }
    }

    /// Maps a registration failure, classifying duplicate-email rejections.
    ///
    /// Every non-success answer is classified from its body whatever the
    /// status; only failures without a server answer stay API errors.
    pub(crate) fn from_register(error: ApiError) -> Self {
        let Some(body) = error.rejection_message() else {
            return Self::Api(error);
        };
        let message = registration_message(body);
        if EMAIL_TAKEN_PATTERN.is_match(&message) {
            Self::EmailAlreadyExists { message }
        } else {
            Self::RegistrationFailed(message)
        }
    }

    /// Maps an account deletion failure.
    pub(crate) fn from_delete(error: ApiError) -> Self {
        if error.is_network() {
            Self::Api(error)
        } else {
            Self::DeleteFailed(DELETE_FAILED_MESSAGE.to_string())
        }
    }

    /// Text stored in [`super::Session::last_error`].
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(error) if error.is_network() => format!("Error: {error}"),
            other => other.to_string(),
        }
    }
}

/// Extracts the server's `error` field, falling back to the raw body.
fn registration_message(body: &str) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("error")?.as_str().map(str::to_string));

    match from_json {
        Some(message) if !message.trim().is_empty() => message,
        _ if !body.trim().is_empty() => body.trim().to_string(),
        _ => REGISTRATION_FALLBACK_MESSAGE.to_string(),
    }
}
