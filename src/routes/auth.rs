//! Auth routes: sign-in/sign-up forms, sign-out, confirmation landing.

use axum::extract::{Extension, FromRequestParts, Query, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{Html, IntoResponse, Json, Redirect, Response};
use axum::Form;
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use std::sync::Arc;

use crate::backend::{AuthError, ServiceUser, SignUpOutcome};
use crate::routes::gate::{CurrentSession, SIGN_IN_PATH};
use crate::routes::pages::{self, AuthFeedback, AuthView};
use crate::services::auth::{self as auth_svc, Credentials, FormError};
use crate::services::session::{self as session_svc, Session, SessionHandle};
use crate::state::AppState;

const DASHBOARD_PATH: &str = "/dashboard";
const CONFIRMED_PATH: &str = "/auth?confirmed=1";
const CONFIRMED_NOTICE: &str = "Your email is confirmed. You can sign in now.";

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Signed-in user of the current request, as resolved by the gate.
/// Use as a handler parameter to require authentication.
pub struct AuthUser {
    pub user: ServiceUser,
    pub access_token: String,
    pub session: Arc<SessionHandle>,
}

impl AuthUser {
    #[must_use]
    pub fn email(&self) -> &str {
        self.user.email.as_deref().unwrap_or_default()
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let CurrentSession(session) = parts
            .extensions
            .get::<CurrentSession>()
            .cloned()
            .ok_or(StatusCode::UNAUTHORIZED)?;
        let (user, access_token) = session
            .credentials()
            .await
            .ok_or(StatusCode::UNAUTHORIZED)?;
        Ok(Self { user, access_token, session })
    }
}

pub(crate) fn form_error_to_status(err: &FormError) -> StatusCode {
    match err {
        FormError::InvalidEmail | FormError::MissingPassword | FormError::Policy(_) => StatusCode::UNPROCESSABLE_ENTITY,
        FormError::Auth(AuthError::Rejected(_) | AuthError::InvalidSession) => StatusCode::BAD_REQUEST,
        FormError::Auth(AuthError::Transport(_) | AuthError::UnexpectedResponse(_)) => StatusCode::BAD_GATEWAY,
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct AuthPageQuery {
    view: Option<String>,
    confirmed: Option<String>,
}

/// `GET /auth`: sign-in, sign-up, or forgot-password view.
pub async fn auth_page(Query(query): Query<AuthPageQuery>) -> Html<String> {
    let feedback = AuthFeedback { notice: query.confirmed.is_some().then_some(CONFIRMED_NOTICE), ..AuthFeedback::default() };
    Html(pages::render_auth(AuthView::from_query(query.view.as_deref()), feedback))
}

/// `POST /auth/sign-in`: set the session cookies and go to the dashboard,
/// or re-render the form with the error inline.
pub async fn sign_in(
    State(state): State<AppState>,
    Extension(CurrentSession(session)): Extension<CurrentSession>,
    jar: CookieJar,
    Form(credentials): Form<Credentials>,
) -> Response {
    match auth_svc::sign_in(&session, &credentials).await {
        Ok(tokens) => {
            let jar = session_svc::write_session_cookies(jar, &tokens, state.cookie_settings());
            (jar, Redirect::to(DASHBOARD_PATH)).into_response()
        }
        Err(e) => {
            if matches!(e, FormError::Auth(AuthError::Transport(_) | AuthError::UnexpectedResponse(_))) {
                tracing::error!(error = %e, "sign-in could not reach auth service");
            }
            let message = e.user_message();
            let html = pages::render_auth(
                AuthView::SignIn,
                AuthFeedback { email: &credentials.email, error: Some(&message), notice: None },
            );
            (form_error_to_status(&e), Html(html)).into_response()
        }
    }
}

/// `POST /auth/sign-up`: register and show the "check your email" state.
pub async fn sign_up(State(state): State<AppState>, Form(credentials): Form<Credentials>) -> Response {
    let redirect_to = state.config.email_redirect_url();
    match auth_svc::sign_up(state.backend.as_ref(), &credentials, &redirect_to).await {
        Ok(outcome) => {
            let user = match &outcome {
                SignUpOutcome::ConfirmationRequired(user) => user,
                SignUpOutcome::SignedIn(session) => {
                    tracing::debug!(user_id = %session.user.id, "sign-up returned a session; confirmation disabled upstream");
                    &session.user
                }
            };
            let email = user
                .email
                .as_deref()
                .unwrap_or(credentials.email.trim());
            Html(pages::render_sign_up_sent(email)).into_response()
        }
        Err(e) => {
            if matches!(e, FormError::Auth(AuthError::Transport(_) | AuthError::UnexpectedResponse(_))) {
                tracing::error!(error = %e, "sign-up could not reach auth service");
            }
            let message = e.user_message();
            let html = pages::render_auth(
                AuthView::SignUp,
                AuthFeedback { email: &credentials.email, error: Some(&message), notice: None },
            );
            (form_error_to_status(&e), Html(html)).into_response()
        }
    }
}

/// `POST /auth/sign-out`: revoke the session, clear cookies, go to `/auth`.
pub async fn sign_out(
    State(state): State<AppState>,
    Extension(CurrentSession(session)): Extension<CurrentSession>,
    jar: CookieJar,
) -> Response {
    session.sign_out().await;
    let jar = session_svc::remove_session_cookies(jar, state.cookie_settings());
    (jar, Redirect::to(SIGN_IN_PATH)).into_response()
}

/// `GET /auth/callback`: landing target of the confirmation email.
pub async fn auth_callback() -> Redirect {
    Redirect::temporary(CONFIRMED_PATH)
}

/// `GET /api/auth/me`: current session snapshot.
pub async fn me(auth: AuthUser) -> Json<Session> {
    Json(auth.session.snapshot().await)
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
