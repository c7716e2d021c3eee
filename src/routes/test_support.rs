//! Helpers for driving the full router with `oneshot` in tests.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, header};
use axum::response::Response;
use tower::ServiceExt;

use crate::backend::AuthSession;
use crate::backend::memory::MemoryBackend;
use crate::state::test_helpers::test_app_state;

pub const PASSWORD: &str = "Valid1Pass!";

pub struct TestApp {
    pub backend: Arc<MemoryBackend>,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let backend = Arc::new(MemoryBackend::new());
        let router = super::app(test_app_state(backend.clone()));
        Self { backend, router }
    }

    /// Register a confirmed account and issue a token pair for it.
    pub fn signed_in(&self, email: &str) -> AuthSession {
        let user = self.backend.add_user(email, PASSWORD, true);
        self.backend.issue_session(&user)
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .unwrap()
    }
}

pub fn session_cookie(session: &AuthSession) -> String {
    cookie_header(&session.access_token, &session.refresh_token)
}

pub fn cookie_header(access_token: &str, refresh_token: &str) -> String {
    format!("access_token={access_token}; refresh_token={refresh_token}")
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn form_post(uri: &str, cookie: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_owned())).unwrap()
}

pub fn json_post(uri: &str, cookie: Option<&str>, body: &serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn location(response: &Response) -> Option<String> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

pub fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_owned)
        .collect()
}

/// Full `Set-Cookie` line for `name`, if the response sets it.
pub fn set_cookie(response: &Response, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    set_cookies(response)
        .into_iter()
        .find(|c| c.starts_with(&prefix))
}

/// Value part of the `Set-Cookie` line for `name`.
pub fn set_cookie_value(response: &Response, name: &str) -> Option<String> {
    let line = set_cookie(response, name)?;
    let pair = line.split(';').next()?;
    pair.split_once('=').map(|(_, v)| v.to_owned())
}

pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}
