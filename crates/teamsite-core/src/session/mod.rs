//! Client-side session and token lifecycle.
//!
//! [`SessionManager`] is the single source of truth for "is there a signed-in
//! member". It owns the token pair and cached profile, mirrors tokens to a
//! [`TokenStore`], installs the bearer header on the shared [`ApiClient`], and
//! keeps the access token fresh with a recurring background refresh.
//!
//! Handles are cheap to clone; every clone sees the same session.
//!
//! Identity changes (login, register, resume, logout) bump an epoch. Requests
//! capture the epoch when they start and drop their result if it moved, so a
//! refresh that completes after a logout cannot re-arm the bearer header.

mod refresh;
#[cfg(test)]
mod tests;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::Result;
use teamsite_types::{AuthResponse, EmailAvailability, Profile, RegisterRequest};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError, ApiResult, AuthApi};
use crate::config::{Config, SessionConfig};
use crate::storage::{FileTokenStore, TokenStore, mask_token};

use self::refresh::SharedRefresh;

/// Message returned in a degraded email verdict.
pub const EMAIL_CHECK_FAILED: &str = "Failed to check email";

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// No profile loaded.
    Anonymous,
    /// Login, registration or profile load in progress.
    Authenticating,
    /// Profile loaded and tokens held.
    Authenticated,
}

/// Point-in-time copy of the session.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<Profile>,
}

impl Session {
    /// True when no tokens and no profile are held.
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none() && self.user.is_none()
    }

    fn derived_status(&self) -> SessionStatus {
        if self.user.is_some() {
            SessionStatus::Authenticated
        } else {
            SessionStatus::Anonymous
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &self.access_token.as_deref().map(mask_token))
            .field("refresh_token", &self.refresh_token.as_deref().map(mask_token))
            .field("user", &self.user.as_ref().map(|u| u.id))
            .finish()
    }
}

/// Tunables for a [`SessionManager`].
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    /// Period of the silent refresh timer.
    pub refresh_interval: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(SessionConfig::DEFAULT_REFRESH_INTERVAL_SECS),
        }
    }
}

impl From<&SessionConfig> for SessionOptions {
    fn from(config: &SessionConfig) -> Self {
        Self {
            refresh_interval: config.refresh_interval(),
        }
    }
}

struct State {
    session: Session,
    status: SessionStatus,
    epoch: u64,
}

struct Inner {
    api: ApiClient,
    auth: AuthApi,
    store: Arc<dyn TokenStore>,
    state: Mutex<State>,
    status_tx: watch::Sender<SessionStatus>,
    refresh_interval: Duration,
    scheduler: Mutex<Option<JoinHandle<()>>>,
    in_flight: Mutex<Option<SharedRefresh>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.scheduler).take() {
            handle.abort();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared handle to the session.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("session", &self.snapshot())
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Creates an empty session over `api` and `store`.
    ///
    /// Nothing is read from the store until [`SessionManager::resume`].
    pub fn new(api: ApiClient, store: Arc<dyn TokenStore>, options: SessionOptions) -> Self {
        let (status_tx, _) = watch::channel(SessionStatus::Anonymous);
        let auth = AuthApi::new(api.clone());
        Self {
            inner: Arc::new(Inner {
                api,
                auth,
                store,
                state: Mutex::new(State {
                    session: Session::default(),
                    status: SessionStatus::Anonymous,
                    epoch: 0,
                }),
                status_tx,
                refresh_interval: options.refresh_interval,
                scheduler: Mutex::new(None),
                in_flight: Mutex::new(None),
            }),
        }
    }

    /// Session backed by the configured API and `<home>/tokens.json`.
    ///
    /// # Errors
    /// Returns an error if the API client cannot be built from config.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api = ApiClient::from_config(config)?;
        Ok(Self::new(
            api,
            Arc::new(FileTokenStore::default_location()),
            SessionOptions::from(&config.session),
        ))
    }

    /// The shared client. Resource APIs built from it use the session's token.
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    pub fn snapshot(&self) -> Session {
        lock(&self.inner.state).session.clone()
    }

    pub fn user(&self) -> Option<Profile> {
        lock(&self.inner.state).session.user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        lock(&self.inner.state).session.user.is_some()
    }

    pub fn is_team_leader(&self) -> bool {
        lock(&self.inner.state)
            .session
            .user
            .as_ref()
            .is_some_and(|user| user.is_team_leader)
    }

    pub fn status(&self) -> SessionStatus {
        lock(&self.inner.state).status
    }

    /// Receiver that observes every status transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.inner.status_tx.subscribe()
    }

    /// Installs tokens left in storage by a previous process, without any
    /// network call. Arms the refresh timer when a refresh token exists.
    ///
    /// Returns true if an access token was restored.
    pub fn restore(&self) -> bool {
        let stored = match self.inner.store.load() {
            Ok(stored) => stored,
            Err(e) => {
                warn!("Ignoring unreadable token storage: {e:#}");
                return false;
            }
        };
        if stored.is_empty() {
            return false;
        }

        let has_refresh = stored.refresh.is_some();
        let has_access = stored.access.is_some();
        {
            let mut state = lock(&self.inner.state);
            state.epoch += 1;
            match stored.access.as_deref() {
                Some(access) => self.inner.api.set_bearer(access),
                None => self.inner.api.clear_bearer(),
            }
            state.session = Session {
                access_token: stored.access,
                refresh_token: stored.refresh,
                user: None,
            };
            self.set_status(&mut state, SessionStatus::Anonymous);
        }
        debug!("Restored stored tokens");

        if has_refresh {
            self.restart_scheduler();
        }
        has_access
    }

    /// Restores stored tokens and loads the profile for them.
    ///
    /// Returns `Ok(None)` when no access token was stored.
    ///
    /// # Errors
    /// Returns the profile load error. Tokens stay in place unless it was a 401.
    pub async fn resume(&self) -> ApiResult<Option<Profile>> {
        if !self.restore() {
            return Ok(None);
        }
        self.load_user().await.map(Some)
    }

    /// Signs in with email and password.
    ///
    /// On failure the existing session is left untouched.
    ///
    /// # Errors
    /// Returns the backend's message, or "Login failed" when it gave none.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<Profile> {
        self.begin_authenticating();
        match self.inner.auth.login(email, password).await {
            Ok(response) => {
                let profile = self.commit(response);
                info!(member_id = profile.id, "Logged in");
                Ok(profile)
            }
            Err(e) => {
                self.end_authenticating();
                warn!("Login failed: {e}");
                Err(e.with_fallback_message("Login failed"))
            }
        }
    }

    /// Creates an account and signs in as it.
    ///
    /// Field validation is the caller's job and must happen first
    /// (see [`crate::validation::RegistrationForm`]).
    ///
    /// # Errors
    /// Returns the backend error; per-field messages are in `details`.
    pub async fn register(&self, request: &RegisterRequest) -> ApiResult<Profile> {
        self.begin_authenticating();
        match self.inner.auth.register(request).await {
            Ok(response) => {
                let profile = self.commit(response);
                info!(member_id = profile.id, "Registered");
                Ok(profile)
            }
            Err(e) => {
                self.end_authenticating();
                warn!("Registration failed: {e}");
                Err(e.with_fallback_message("Registration failed"))
            }
        }
    }

    /// Signs out.
    ///
    /// Asks the backend to blacklist the refresh token when one is held; that
    /// call is best-effort. Local state is cleared whatever it returns.
    /// Calling this on an empty session is a no-op.
    pub async fn logout(&self) {
        let refresh = lock(&self.inner.state).session.refresh_token.clone();
        if let Some(refresh) = refresh
            && let Err(e) = self.inner.auth.logout(&refresh).await
        {
            warn!("Logout request failed: {e}");
        }
        self.clear();
        info!("Logged out");
    }

    /// Exchanges the refresh token for a new access token.
    ///
    /// At most one exchange runs at a time; concurrent callers share its
    /// outcome. On failure the session is logged out.
    ///
    /// # Errors
    /// Returns `NotAuthenticated` without a refresh token, `SessionEnded` if
    /// the session changed while the request was in flight, or the backend
    /// error.
    pub async fn refresh_access_token(&self) -> ApiResult<String> {
        self.shared_refresh().await
    }

    /// Fetches the profile for the held access token.
    ///
    /// A 401 logs out. Any other failure drops the cached profile but keeps
    /// the tokens so a later attempt can succeed.
    ///
    /// # Errors
    /// Returns `NotAuthenticated` without an access token, or the backend error.
    pub async fn load_user(&self) -> ApiResult<Profile> {
        let epoch = {
            let mut state = lock(&self.inner.state);
            if state.session.access_token.is_none() {
                return Err(ApiError::not_authenticated());
            }
            if state.session.user.is_none() {
                self.set_status(&mut state, SessionStatus::Authenticating);
            }
            state.epoch
        };

        match self.inner.auth.me().await {
            Ok(profile) => {
                let mut state = lock(&self.inner.state);
                if state.epoch != epoch {
                    debug!("Discarding profile for a session that has ended");
                    return Err(ApiError::session_ended());
                }
                state.session.user = Some(profile.clone());
                self.set_status(&mut state, SessionStatus::Authenticated);
                Ok(profile)
            }
            Err(e) if e.is_unauthorized() => {
                warn!("Stored access token rejected: {e}");
                let current = lock(&self.inner.state).epoch == epoch;
                if current {
                    self.logout().await;
                }
                Err(e)
            }
            Err(e) => {
                warn!("Failed to load user: {e}");
                let mut state = lock(&self.inner.state);
                if state.epoch == epoch {
                    state.session.user = None;
                    self.set_status(&mut state, SessionStatus::Anonymous);
                }
                Err(e)
            }
        }
    }

    /// Asks whether `email` may register. Never fails; a failed check yields
    /// a degraded verdict that does not allow registration.
    pub async fn check_email_availability(&self, email: &str) -> EmailAvailability {
        match self.inner.auth.check_email(email.trim()).await {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!("Email check failed: {e}");
                EmailAvailability::degraded(EMAIL_CHECK_FAILED)
            }
        }
    }

    /// Changes the signed-in member's password. The session is unchanged.
    ///
    /// # Errors
    /// Returns `NotAuthenticated` without an access token, or the backend error.
    pub async fn change_password(&self, old_password: &str, new_password: &str) -> ApiResult<String> {
        if lock(&self.inner.state).session.access_token.is_none() {
            return Err(ApiError::not_authenticated());
        }
        match self
            .inner
            .auth
            .change_password(old_password, new_password)
            .await
        {
            Ok(response) => Ok(response.message),
            Err(e) => {
                warn!("Password change failed: {e}");
                Err(e.with_fallback_message("Password change failed"))
            }
        }
    }

    /// Stops the refresh timer. The session itself is kept.
    pub fn shutdown(&self) {
        self.stop_scheduler();
    }

    /// Whether the silent refresh timer is armed.
    pub fn is_refresh_scheduled(&self) -> bool {
        lock(&self.inner.scheduler)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn set_status(&self, state: &mut State, status: SessionStatus) {
        state.status = status;
        self.inner.status_tx.send_replace(status);
    }

    fn begin_authenticating(&self) {
        let mut state = lock(&self.inner.state);
        self.set_status(&mut state, SessionStatus::Authenticating);
    }

    /// Puts the status back to whatever the held session implies.
    fn end_authenticating(&self) {
        let mut state = lock(&self.inner.state);
        let status = state.session.derived_status();
        self.set_status(&mut state, status);
    }

    /// Installs a freshly issued session. Tokens and profile land together.
    fn commit(&self, response: AuthResponse) -> Profile {
        let AuthResponse { member, tokens, .. } = response;
        {
            let mut state = lock(&self.inner.state);
            if let Err(e) = self.inner.store.save(&tokens.access, &tokens.refresh) {
                warn!("Failed to persist tokens: {e:#}");
            }
            self.inner.api.set_bearer(&tokens.access);
            state.epoch += 1;
            state.session = Session {
                access_token: Some(tokens.access),
                refresh_token: Some(tokens.refresh),
                user: Some(member.clone()),
            };
            self.set_status(&mut state, SessionStatus::Authenticated);
        }
        self.restart_scheduler();
        member
    }

    /// Drops everything: memory, storage, bearer header, timer.
    fn clear(&self) {
        {
            let mut state = lock(&self.inner.state);
            state.epoch += 1;
            state.session = Session::default();
            self.inner.api.clear_bearer();
            if let Err(e) = self.inner.store.clear() {
                warn!("Failed to clear stored tokens: {e:#}");
            }
            self.set_status(&mut state, SessionStatus::Anonymous);
        }
        self.stop_scheduler();
    }
}
