//! Session client: cookie pair codec, refresh, and the per-request handle.
//!
//! ARCHITECTURE
//! ============
//! The hosted auth service issues an access/refresh token pair. The pair
//! lives in two HttpOnly cookies. On every gated request the access token is
//! validated; when the service rejects it, the refresh token is exchanged
//! for a new pair. Either way the cookies are written back with a renewed
//! max-age so an active user never loses the session mid-visit.
//!
//! `SessionHandle` is built once per request by the route gate (init) and
//! handed to handlers through request extensions. Sign-out is its teardown.
//!
//! TRADE-OFFS
//! ==========
//! Transport failures while validating are treated as "no user" but leave
//! the cookies in place, so a brief service outage does not sign everyone
//! out. Only a definitive rejection removes them.

use std::sync::Arc;

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;
use time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::backend::{AuthError, AuthSession, Backend, ServiceUser};
use crate::config::AppConfig;

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

// =============================================================================
// COOKIES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookieSettings {
    pub secure: bool,
    pub max_age_secs: i64,
}

impl CookieSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self { secure: config.cookie_secure, max_age_secs: config.session_cookie_max_age_secs }
    }
}

/// Raw token cookies as sent by the browser. Either may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookiePair {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl CookiePair {
    #[must_use]
    pub fn from_jar(jar: &CookieJar) -> Self {
        let read = |name: &str| {
            jar.get(name)
                .map(Cookie::value)
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
        };
        Self { access_token: read(ACCESS_COOKIE), refresh_token: read(REFRESH_COOKIE) }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

/// Tokens of a validated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

impl From<&AuthSession> for SessionTokens {
    fn from(session: &AuthSession) -> Self {
        Self { access_token: session.access_token.clone(), refresh_token: Some(session.refresh_token.clone()) }
    }
}

fn session_cookie(name: &'static str, value: String, settings: CookieSettings, max_age: Duration) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(settings.secure)
        .max_age(max_age)
        .build()
}

/// Add (or replace) both session cookies with a fresh max-age.
#[must_use]
pub fn write_session_cookies(jar: CookieJar, tokens: &SessionTokens, settings: CookieSettings) -> CookieJar {
    let max_age = Duration::seconds(settings.max_age_secs);
    let jar = jar.add(session_cookie(ACCESS_COOKIE, tokens.access_token.clone(), settings, max_age));
    match &tokens.refresh_token {
        Some(refresh) => jar.add(session_cookie(REFRESH_COOKIE, refresh.clone(), settings, max_age)),
        None => jar,
    }
}

/// Expire both session cookies.
#[must_use]
pub fn remove_session_cookies(jar: CookieJar, settings: CookieSettings) -> CookieJar {
    jar.add(session_cookie(ACCESS_COOKIE, String::new(), settings, Duration::ZERO))
        .add(session_cookie(REFRESH_COOKIE, String::new(), settings, Duration::ZERO))
}

/// What the caller must do with the cookie pair after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieAction {
    /// Write the pair back (renewed or rotated).
    Write(SessionTokens),
    /// The service rejected the pair; expire it.
    Remove,
    /// Leave the browser's cookies untouched.
    Keep,
}

impl CookieAction {
    #[must_use]
    pub fn apply(&self, jar: CookieJar, settings: CookieSettings) -> CookieJar {
        match self {
            Self::Write(tokens) => write_session_cookies(jar, tokens, settings),
            Self::Remove => remove_session_cookies(jar, settings),
            Self::Keep => jar,
        }
    }
}

// =============================================================================
// RESOLUTION
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Active { user: ServiceUser, tokens: SessionTokens },
    Anonymous,
}

/// Validate the cookie pair, refreshing it if the access token is rejected.
/// Attempt-once: no retries.
pub async fn resolve(backend: &dyn Backend, pair: &CookiePair) -> (Resolution, CookieAction) {
    if pair.is_empty() {
        return (Resolution::Anonymous, CookieAction::Keep);
    }

    if let Some(access_token) = &pair.access_token {
        match backend.get_user(access_token).await {
            Ok(user) => {
                let tokens = SessionTokens { access_token: access_token.clone(), refresh_token: pair.refresh_token.clone() };
                return (Resolution::Active { user, tokens: tokens.clone() }, CookieAction::Write(tokens));
            }
            Err(AuthError::InvalidSession) => {}
            Err(e) => {
                tracing::warn!(error = %e, "session validation failed");
                return (Resolution::Anonymous, CookieAction::Keep);
            }
        }
    }

    let Some(refresh_token) = &pair.refresh_token else {
        return (Resolution::Anonymous, CookieAction::Remove);
    };

    match backend.refresh_session(refresh_token).await {
        Ok(session) => {
            tracing::debug!(user_id = %session.user.id, "session refreshed");
            let tokens = SessionTokens::from(&session);
            (Resolution::Active { user: session.user, tokens: tokens.clone() }, CookieAction::Write(tokens))
        }
        Err(AuthError::InvalidSession | AuthError::Rejected(_)) => (Resolution::Anonymous, CookieAction::Remove),
        Err(e) => {
            tracing::warn!(error = %e, "session refresh failed");
            (Resolution::Anonymous, CookieAction::Keep)
        }
    }
}

// =============================================================================
// SESSION HANDLE
// =============================================================================

/// Snapshot of the session as the UI sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
    pub loading: bool,
}

#[derive(Debug, Clone)]
enum SessionState {
    Loading,
    Active { user: ServiceUser, tokens: SessionTokens },
    SignedOut,
}

/// Explicitly passed session for one request/app instance.
pub struct SessionHandle {
    backend: Arc<dyn Backend>,
    state: RwLock<SessionState>,
}

impl SessionHandle {
    /// A handle in the loading state. Call [`SessionHandle::init`] next.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend, state: RwLock::new(SessionState::Loading) }
    }

    /// Fetch the current session from the cookie pair.
    pub async fn init(&self, pair: &CookiePair) -> CookieAction {
        let (resolution, action) = resolve(self.backend.as_ref(), pair).await;
        let mut state = self.state.write().await;
        *state = match resolution {
            Resolution::Active { user, tokens } => SessionState::Active { user, tokens },
            Resolution::Anonymous => SessionState::SignedOut,
        };
        action
    }

    /// Sign in with a password and adopt the new session.
    ///
    /// # Errors
    ///
    /// Returns the auth service's error; the handle state is unchanged.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SessionTokens, AuthError> {
        let session = self
            .backend
            .sign_in_with_password(email, password)
            .await?;
        let tokens = SessionTokens::from(&session);
        *self.state.write().await = SessionState::Active { user: session.user, tokens: tokens.clone() };
        Ok(tokens)
    }

    /// Tear the session down. Revocation is best effort: the local state is
    /// cleared even if the service call fails.
    pub async fn sign_out(&self) {
        let previous = std::mem::replace(&mut *self.state.write().await, SessionState::SignedOut);
        if let SessionState::Active { user, tokens } = previous {
            if let Err(e) = self.backend.sign_out(&tokens.access_token).await {
                tracing::warn!(user_id = %user.id, error = %e, "session revocation failed");
            }
        }
    }

    pub async fn snapshot(&self) -> Session {
        match &*self.state.read().await {
            SessionState::Loading => Session { user_id: None, email: None, loading: true },
            SessionState::Active { user, .. } => Session { user_id: Some(user.id), email: user.email.clone(), loading: false },
            SessionState::SignedOut => Session { user_id: None, email: None, loading: false },
        }
    }

    pub async fn user(&self) -> Option<ServiceUser> {
        match &*self.state.read().await {
            SessionState::Active { user, .. } => Some(user.clone()),
            SessionState::Loading | SessionState::SignedOut => None,
        }
    }

    /// User identity plus the bearer token data calls run under.
    pub async fn credentials(&self) -> Option<(ServiceUser, String)> {
        match &*self.state.read().await {
            SessionState::Active { user, tokens } => Some((user.clone(), tokens.access_token.clone())),
            SessionState::Loading | SessionState::SignedOut => None,
        }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
