use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError, AuthResponse, NewAccount};
use crate::storage::KeyValueStore;

use super::User;

/// Persisted credential keys. The session store is their only writer.
pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";
pub const EXPIRATION_KEY: &str = "expirationTime";

const SESSION_KEYS: [&str; 3] = [TOKEN_KEY, USER_KEY, EXPIRATION_KEY];

/// Session lifetime used when the server does not issue an expiration.
pub const DEFAULT_SESSION_LIFETIME_MINUTES: i64 = 60;

/// Why an authenticated session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    Manual,
    Idle,
    Expired,
    /// Persisted session was unreadable at restore.
    Invalid,
}

/// A token together with the identity it was issued for.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: User,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| now >= at).unwrap_or(false)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> Option<i64> {
        self.expires_at
            .map(|at| (at - Utc::now()).num_minutes().max(0))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// `restore()` has not completed yet; front ends must not render.
    Loading,
    Anonymous { reason: Option<LogoutReason> },
    Authenticated(Session),
}

impl SessionState {
    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Loading)
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Authenticated(session) => Some(session),
            _ => None,
        }
    }
}

/// Single source of truth for who is logged in.
///
/// Owns the persisted `token`/`user`/`expirationTime` keys and the API
/// client's default authorization header. State changes are published on
/// a watch channel; a transition to `Anonymous` is the signal for front
/// ends to return to their sign-in entry point.
pub struct SessionStore {
    api: ApiClient,
    storage: Arc<dyn KeyValueStore>,
    lifetime: Duration,
    state: watch::Sender<SessionState>,
}

impl SessionStore {
    pub fn new(api: ApiClient, storage: Arc<dyn KeyValueStore>) -> Self {
        let (state, _) = watch::channel(SessionState::Loading);
        Self {
            api,
            storage,
            lifetime: Duration::minutes(DEFAULT_SESSION_LIFETIME_MINUTES),
            state,
        }
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    // =========================================================================
    // Startup
    // =========================================================================

    /// Load the persisted session. Always resolves to `Anonymous` or
    /// `Authenticated`; unreadable state is cleared and logged.
    pub fn restore(&self) {
        let next = match self.read_persisted() {
            Ok(Some(session)) if session.is_expired() => {
                info!(user = %session.user.display_name(), "Persisted session already expired");
                self.clear_persisted();
                SessionState::Anonymous {
                    reason: Some(LogoutReason::Expired),
                }
            }
            Ok(Some(session)) => match self.api.set_bearer(&session.token) {
                Ok(()) => {
                    info!(user = %session.user.display_name(), "Session restored");
                    SessionState::Authenticated(session)
                }
                Err(e) => {
                    warn!(error = %e, "Persisted token unusable, starting signed out");
                    self.clear_persisted();
                    SessionState::Anonymous {
                        reason: Some(LogoutReason::Invalid),
                    }
                }
            },
            Ok(None) => {
                debug!("No persisted session");
                SessionState::Anonymous { reason: None }
            }
            Err(e) => {
                warn!(error = %e, "Failed to restore session, starting signed out");
                self.clear_persisted();
                self.api.clear_bearer();
                SessionState::Anonymous {
                    reason: Some(LogoutReason::Invalid),
                }
            }
        };
        self.state.send_replace(next);
    }

    fn read_persisted(&self) -> anyhow::Result<Option<Session>> {
        let token = self.storage.get(TOKEN_KEY)?;
        let user = self.storage.get(USER_KEY)?;

        let (token, user) = match (token, user) {
            (None, None) => return Ok(None),
            (Some(token), Some(user)) => (token, user),
            _ => anyhow::bail!("Persisted session has a token without a user or vice versa"),
        };
        if token.trim().is_empty() {
            anyhow::bail!("Persisted token is empty");
        }
        let user: User = serde_json::from_str(&user)?;

        let expires_at = match self.storage.get(EXPIRATION_KEY)? {
            Some(raw) => {
                let parsed = parse_epoch_millis(&raw);
                if parsed.is_none() {
                    warn!(value = %raw, "Ignoring malformed session expiration");
                }
                parsed
            }
            None => None,
        };

        Ok(Some(Session {
            token,
            user,
            expires_at,
        }))
    }

    /// Wait until `restore()` has resolved the initial state.
    pub async fn wait_until_ready(&self) -> SessionState {
        let mut rx = self.state.subscribe();
        let state = match rx.wait_for(|state| !state.is_loading()).await {
            Ok(state) => state.clone(),
            // Unreachable while `self` holds the sender
            Err(_) => self.state(),
        };
        state
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Authenticate against the API. On failure nothing is persisted and the
    /// API error is returned as-is.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let auth = self.api.authenticate(email, password).await?;
        info!(email, "Login successful");
        self.establish(auth)
    }

    /// Adopt a token issued out-of-band. No network call is made.
    ///
    /// A token that cannot be sent as an authorization header is rejected
    /// before anything is persisted.
    pub fn login_with_token(&self, user: User, token: String) -> Result<User, ApiError> {
        self.establish(AuthResponse {
            token,
            user,
            expiration_time: None,
        })
    }

    /// Create an account; signs in if the server returns a token right away.
    pub async fn register(&self, account: &NewAccount) -> Result<Option<User>, ApiError> {
        let response = self.api.register(account).await?;
        if let Some(message) = response.message.as_deref() {
            debug!(message, "Registration response");
        }
        response.into_auth().map(|auth| self.establish(auth)).transpose()
    }

    /// Confirm a registration code; signs in when the server issues a token.
    pub async fn verify(&self, email: &str, code: &str) -> Result<Option<User>, ApiError> {
        let response = self.api.verify(email, code).await?;
        response.into_auth().map(|auth| self.establish(auth)).transpose()
    }

    fn establish(&self, auth: AuthResponse) -> Result<User, ApiError> {
        // Header first: an unusable token must leave the current state alone
        self.api.set_bearer(&auth.token)?;

        let expires_at = auth
            .expiration_time
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .unwrap_or_else(|| Utc::now() + self.lifetime);

        let session = Session {
            token: auth.token,
            user: auth.user,
            expires_at: Some(expires_at),
        };

        if let Err(e) = self.persist(&session) {
            warn!(error = %e, "Failed to save session");
        }

        let user = session.user.clone();
        self.state.send_replace(SessionState::Authenticated(session));
        Ok(user)
    }

    fn persist(&self, session: &Session) -> anyhow::Result<()> {
        let user = serde_json::to_string(&session.user)?;
        self.storage.set(TOKEN_KEY, &session.token)?;
        self.storage.set(USER_KEY, &user)?;
        match session.expires_at {
            Some(at) => self
                .storage
                .set(EXPIRATION_KEY, &at.timestamp_millis().to_string())?,
            None => self.storage.remove(EXPIRATION_KEY)?,
        }
        Ok(())
    }

    // =========================================================================
    // Logout
    // =========================================================================

    /// End the session. Safe to call repeatedly; the reason of the first
    /// transition to `Anonymous` is kept. Before `restore()` has run only the
    /// persisted keys are cleared; the state stays `Loading`.
    pub fn logout(&self) {
        self.end_session(LogoutReason::Manual);
    }

    pub fn end_session(&self, reason: LogoutReason) {
        self.clear_persisted();
        self.api.clear_bearer();

        self.state.send_if_modified(|state| match state {
            SessionState::Loading | SessionState::Anonymous { .. } => false,
            _ => {
                info!(?reason, "Session ended");
                *state = SessionState::Anonymous {
                    reason: Some(reason),
                };
                true
            }
        });
    }

    fn clear_persisted(&self) {
        for key in SESSION_KEYS {
            if let Err(e) = self.storage.remove(key) {
                warn!(key, error = %e, "Failed to clear persisted session key");
            }
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().session().is_some()
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().session().map(|s| s.user.clone())
    }

    pub fn token(&self) -> Option<String> {
        self.state.borrow().session().map(|s| s.token.clone())
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.state.borrow().session().and_then(|s| s.expires_at)
    }

    pub fn is_admin(&self) -> bool {
        self.state
            .borrow()
            .session()
            .map(|s| s.user.is_admin())
            .unwrap_or(false)
    }
}

fn parse_epoch_millis(raw: &str) -> Option<DateTime<Utc>> {
    let millis: i64 = raw.trim().parse().ok()?;
    Utc.timestamp_millis_opt(millis).single()
}
