//! Authentication session state machine.
//!
//! [`SessionManager`] owns the [`Session`] for one client instance and
//! publishes every change through a `tokio::sync::watch` channel. Operations
//! are serialized: a second call waits for the first to finish.
//!
//! ```text
//! Unauthenticated --login--> Authenticating --ok--> Authenticated
//! Authenticating --fail--> Unauthenticated (last_error set)
//! Authenticated --logout / delete_account(ok)--> Unauthenticated
//! any --check_auth_status ok--> Authenticated, fail--> Unauthenticated
//! ```

mod error;
mod state;

use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tracing::{debug, info, instrument, warn};

use crate::api::{AccountApi, Profile};

pub use error::{INVALID_CREDENTIALS_MESSAGE, SessionError};
pub use state::{Session, SessionStatus};

/// Read-only view of a [`SessionManager`]'s state.
///
/// Handed to components that are gated on authentication (the favorites
/// cache) without giving them the ability to change it.
#[derive(Debug, Clone)]
pub struct SessionView {
    receiver: watch::Receiver<Session>,
}

impl SessionView {
    /// Returns `true` when the session is currently authenticated.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.receiver.borrow().is_authenticated()
    }

    /// Copy of the current session.
    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.receiver.borrow().clone()
    }

    /// Waits for the next state change. Returns `false` once the manager
    /// has been dropped.
    pub async fn changed(&mut self) -> bool {
        self.receiver.changed().await.is_ok()
    }
}

/// Settles a session left mid-operation when the operation's future is
/// dropped before completing: clears `in_flight` and returns an unfinished
/// `Authenticating` to `Unauthenticated`. A no-op after normal completion.
struct InFlightGuard<'a> {
    state: &'a watch::Sender<Session>,
}

impl<'a> InFlightGuard<'a> {
    fn new(state: &'a watch::Sender<Session>) -> Self {
        Self { state }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.state.send_if_modified(|session| {
            let abandoned = session.status == SessionStatus::Authenticating;
            if !abandoned && !session.in_flight {
                return false;
            }
            if abandoned {
                debug!("Login abandoned before completion");
                session.sign_out();
            }
            session.in_flight = false;
            true
        });
    }
}

/// Owns the authentication session for one client.
pub struct SessionManager {
    api: Arc<dyn AccountApi>,
    state: watch::Sender<Session>,
    op_lock: Mutex<()>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Creates a manager in the `Unauthenticated` state.
    #[must_use]
    pub fn new(api: Arc<dyn AccountApi>) -> Self {
        let (state, _) = watch::channel(Session::default());
        Self {
            api,
            state,
            op_lock: Mutex::new(()),
        }
    }

    /// Copy of the current session.
    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Read-only handle that observes future changes.
    #[must_use]
    pub fn subscribe(&self) -> SessionView {
        SessionView {
            receiver: self.state.subscribe(),
        }
    }

    /// Signs in.
    ///
    /// On success the session becomes `Authenticated` and the profile is
    /// fetched; a failed profile fetch does not undo the login.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidCredentials`] when the server rejects the
    /// credentials, [`SessionError::Api`] for transport failures. Either way
    /// the session ends `Unauthenticated` with `last_error` set.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<(), SessionError> {
        let _guard = self.op_lock.lock().await;
        self.state.send_modify(|session| {
            session.status = SessionStatus::Authenticating;
            session.in_flight = true;
            session.last_error = None;
        });
        let _in_flight = InFlightGuard::new(&self.state);

        if let Err(error) = self.api.login(email, password).await {
            let error = SessionError::from_login(error);
            warn!(error = %error, "Login failed");
            self.state.send_modify(|session| {
                session.sign_out();
                session.last_error = Some(error.user_message());
                session.in_flight = false;
            });
            return Err(error);
        }

        info!("Login succeeded");
        self.state.send_modify(|session| {
            session.status = SessionStatus::Authenticated;
            session.login_succeeded = true;
        });

        if let Err(error) = self.load_profile().await {
            debug!(error = %error, "Profile unavailable after login");
        }
        self.state.send_modify(|session| session.in_flight = false);
        Ok(())
    }

    /// Creates an account. Does not sign in.
    ///
    /// # Errors
    ///
    /// [`SessionError::EmailAlreadyExists`] when the server reports a
    /// duplicate email, [`SessionError::RegistrationFailed`] for other
    /// rejections, [`SessionError::Api`] for transport failures.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        full_name: &str,
        email: &str,
        password: &str,
    ) -> Result<(), SessionError> {
        let _guard = self.op_lock.lock().await;
        self.state.send_modify(|session| {
            session.in_flight = true;
            session.last_error = None;
        });
        let _in_flight = InFlightGuard::new(&self.state);

        let result = self
            .api
            .register(full_name, email, password)
            .await
            .map_err(SessionError::from_register);

        self.state.send_modify(|session| {
            session.in_flight = false;
            if let Err(error) = &result {
                session.last_error = Some(error.user_message());
            }
        });
        match &result {
            Ok(()) => info!("Registration succeeded"),
            Err(error) => warn!(error = %error, "Registration failed"),
        }
        result
    }

    /// Asks the server who the current cookie belongs to.
    ///
    /// Fails closed: any error, including transport failures, leaves the
    /// session `Unauthenticated` with no profile. Returns whether the session
    /// is authenticated afterwards.
    #[instrument(skip(self))]
    pub async fn check_auth_status(&self) -> bool {
        let _guard = self.op_lock.lock().await;
        match self.api.who_am_i().await {
            Ok(profile) => {
                debug!(user_id = %profile.id, "Session is valid");
                self.state.send_modify(|session| {
                    session.status = SessionStatus::Authenticated;
                    session.profile = Some(profile);
                });
                true
            }
            Err(error) => {
                debug!(error = %error, "Session check failed; treating as signed out");
                self.state.send_modify(Session::sign_out);
                false
            }
        }
    }

    /// Re-fetches the profile without changing the authentication status.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Api`] when the profile cannot be fetched; the
    /// cached profile is cleared in that case.
    pub async fn refresh_profile(&self) -> Result<Profile, SessionError> {
        let _guard = self.op_lock.lock().await;
        self.load_profile().await
    }

    /// Ends the session. The remote call is best-effort; local state is
    /// cleared regardless of its outcome.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        let _guard = self.op_lock.lock().await;
        if let Err(error) = self.api.logout().await {
            warn!(error = %error, "Remote logout failed; clearing local session anyway");
        }
        self.state.send_modify(Session::sign_out);
        info!("Logged out");
    }

    /// Deletes the account. Local state is cleared only when the server
    /// confirms the deletion.
    ///
    /// # Errors
    ///
    /// [`SessionError::DeleteFailed`] or [`SessionError::Api`]; the session
    /// keeps its current state and `last_error` is set.
    #[instrument(skip(self))]
    pub async fn delete_account(&self) -> Result<(), SessionError> {
        let _guard = self.op_lock.lock().await;
        match self.api.delete_account().await {
            Ok(()) => {
                self.state.send_modify(|session| {
                    session.sign_out();
                    session.last_error = None;
                });
                info!("Account deleted");
                Ok(())
            }
            Err(error) => {
                let error = SessionError::from_delete(error);
                warn!(error = %error, "Account deletion failed");
                self.state
                    .send_modify(|session| session.last_error = Some(error.user_message()));
                Err(error)
            }
        }
    }

    /// Clears the one-shot `login_succeeded` flag and `last_error`.
    pub fn reset_transient_flags(&self) {
        self.state.send_modify(|session| {
            session.login_succeeded = false;
            session.last_error = None;
        });
    }

    async fn load_profile(&self) -> Result<Profile, SessionError> {
        match self.api.who_am_i().await {
            Ok(profile) => {
                self.state
                    .send_modify(|session| session.profile = Some(profile.clone()));
                Ok(profile)
            }
            Err(error) => {
                self.state.send_modify(|session| session.profile = None);
                Err(SessionError::Api(error))
            }
        }
    }
}
