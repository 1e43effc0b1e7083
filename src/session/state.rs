//! Observable authentication state.

use crate::api::Profile;

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    /// No valid session cookie is known to the server.
    #[default]
    Unauthenticated,
    /// A login call is in flight.
    Authenticating,
    /// The server accepted the session.
    Authenticated,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "unauthenticated"),
            Self::Authenticating => write!(f, "authenticating"),
            Self::Authenticated => write!(f, "authenticated"),
        }
    }
}

/// Snapshot of the authentication session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Lifecycle state.
    pub status: SessionStatus,
    /// Cached profile; present only while authenticated and fetched.
    pub profile: Option<Profile>,
    /// User-facing message from the last failed operation.
    pub last_error: Option<String>,
    /// One-shot flag raised by a successful login until reset.
    pub login_succeeded: bool,
    /// An operation is running.
    pub in_flight: bool,
}

impl Session {
    /// Returns `true` when the server accepted the session.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }

    /// Profile display name, if loaded.
    #[must_use]
    pub fn full_name(&self) -> Option<&str> {
        self.profile.as_ref().map(|profile| profile.full_name.as_str())
    }

    /// Profile image URL, if loaded.
    #[must_use]
    pub fn profile_image_url(&self) -> Option<&str> {
        self.profile
            .as_ref()
            .and_then(|profile| profile.profile_image_url.as_deref())
    }

    pub(crate) fn sign_out(&mut self) {
        self.status = SessionStatus::Unauthenticated;
        self.profile = None;
        self.login_succeeded = false;
    }
}
