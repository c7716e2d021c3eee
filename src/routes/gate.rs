//! Route gate: per-request session refresh and protected-path redirect.
//!
//! SYSTEM CONTEXT
//! ==============
//! Runs in front of every route. Static assets skip it entirely. For
//! everything else it builds the request's `SessionHandle` from the cookie
//! pair (refreshing it with the auth service when needed), redirects
//! anonymous requests for protected prefixes to the sign-in page, and
//! otherwise forwards the request with the handle attached as an extension.
//!
//! Cookie updates are appended to the response unless the handler already
//! wrote the session cookies itself (sign-in, sign-out).

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::SET_COOKIE;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;

use crate::services::session::{ACCESS_COOKIE, CookiePair, REFRESH_COOKIE, SessionHandle};
use crate::state::AppState;

pub const PROTECTED_PREFIXES: &[&str] = &["/dashboard", "/tickets", "/queues"];
pub const SIGN_IN_PATH: &str = "/auth";

const EXCLUDED_PREFIXES: &[&str] = &["/_next/static", "/_next/image", "/favicon.ico"];
const EXCLUDED_EXTENSIONS: &[&str] = &[".svg", ".png", ".jpg", ".jpeg", ".gif", ".webp"];

/// Session resolved by the gate, available to handlers as an extension.
#[derive(Clone)]
pub struct CurrentSession(pub Arc<SessionHandle>);

/// Whether the gate runs for `path`. Static assets are skipped.
#[must_use]
pub fn is_gated(path: &str) -> bool {
    let excluded_prefix = EXCLUDED_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix));
    let excluded_ext = EXCLUDED_EXTENSIONS
        .iter()
        .any(|ext| path.ends_with(ext));
    !(excluded_prefix || excluded_ext)
}

/// Plain string-prefix match against the protected list.
#[must_use]
pub fn is_protected(path: &str) -> bool {
    PROTECTED_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix))
}

fn writes_session_cookies(response: &Response) -> bool {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.starts_with(&format!("{ACCESS_COOKIE}=")) || v.starts_with(&format!("{REFRESH_COOKIE}=")))
}

pub async fn gate(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    if !is_gated(&path) {
        return next.run(request).await;
    }

    let jar = CookieJar::from_headers(request.headers());
    let session = Arc::new(SessionHandle::new(state.backend.clone()));
    let action = session.init(&CookiePair::from_jar(&jar)).await;
    let jar = action.apply(jar, state.cookie_settings());

    if is_protected(&path) && session.user().await.is_none() {
        tracing::debug!(%path, "anonymous request to protected path redirected");
        return (jar, Redirect::temporary(SIGN_IN_PATH)).into_response();
    }

    request
        .extensions_mut()
        .insert(CurrentSession(session));
    let response = next.run(request).await;

    if writes_session_cookies(&response) {
        return response;
    }
    (jar, response).into_response()
}

#[cfg(test)]
#[path = "gate_test.rs"]
mod tests;
