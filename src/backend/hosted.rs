//! HTTP client for the hosted service (GoTrue auth + PostgREST data API).
//!
//! Thin wrapper over `reqwest`. Request building and response parsing are
//! pure functions so they can be tested without a live project.

use std::time::Duration;

use serde::Deserialize;

use super::{AuthError, AuthSession, Backend, DataError, Query, ServiceUser, SignUpOutcome};
use crate::config::BackendConfig;

const AUTH_PATH: &str = "/auth/v1";
const REST_PATH: &str = "/rest/v1";

#[derive(Debug, thiserror::Error)]
#[error("HTTP client build failed: {0}")]
pub struct ClientBuildError(#[from] reqwest::Error);

// =============================================================================
// CLIENT
// =============================================================================

pub struct HostedClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl HostedClient {
    /// Build a client for the configured project.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(config: &BackendConfig) -> Result<Self, ClientBuildError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()?;
        Ok(Self { http, base_url: config.url.clone(), anon_key: config.anon_key.clone() })
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}{AUTH_PATH}{path}", self.base_url)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}{REST_PATH}/{table}", self.base_url)
    }

    /// POST to the auth API; returns status and raw body.
    async fn auth_post(
        &self,
        path: &str,
        query: &[(&str, &str)],
        bearer: Option<&str>,
        body: &serde_json::Value,
    ) -> Result<(u16, String), AuthError> {
        let mut req = self
            .http
            .post(self.auth_url(path))
            .query(query)
            .header("apikey", &self.anon_key)
            .json(body);
        if let Some(token) = bearer {
            req = req.bearer_auth(token);
        }
        let response = req.send().await.map_err(|e| AuthError::Transport(e.to_string()))?;
        read_body(response).await.map_err(AuthError::Transport)
    }
}

async fn read_body(response: reqwest::Response) -> Result<(u16, String), String> {
    let status = response.status().as_u16();
    let text = response.text().await.map_err(|e| e.to_string())?;
    Ok((status, text))
}

#[async_trait::async_trait]
impl Backend for HostedClient {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let (status, text) = self
            .auth_post("/token", &[("grant_type", "password")], None, &body)
            .await?;
        if !is_success(status) {
            return Err(credential_failure(status, &text));
        }
        parse_session(&text)
    }

    async fn sign_up(&self, email: &str, password: &str, email_redirect_to: &str) -> Result<SignUpOutcome, AuthError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let (status, text) = self
            .auth_post("/signup", &[("redirect_to", email_redirect_to)], None, &body)
            .await?;
        if !is_success(status) {
            return Err(credential_failure(status, &text));
        }
        parse_sign_up(&text)
    }

    async fn get_user(&self, access_token: &str) -> Result<ServiceUser, AuthError> {
        let response = self
            .http
            .get(self.auth_url("/user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        let (status, text) = read_body(response).await.map_err(AuthError::Transport)?;
        if !is_success(status) {
            return Err(session_failure(status, &text));
        }
        serde_json::from_str(&text).map_err(|e| AuthError::UnexpectedResponse(e.to_string()))
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        let body = serde_json::json!({ "refresh_token": refresh_token });
        let (status, text) = self
            .auth_post("/token", &[("grant_type", "refresh_token")], None, &body)
            .await?;
        if !is_success(status) {
            return Err(session_failure(status, &text));
        }
        parse_session(&text)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let (status, text) = self
            .auth_post("/logout", &[], Some(access_token), &serde_json::json!({}))
            .await?;
        if !is_success(status) {
            return Err(session_failure(status, &text));
        }
        Ok(())
    }

    async fn select(&self, access_token: &str, query: &Query) -> Result<Vec<serde_json::Value>, DataError> {
        let response = self
            .http
            .get(self.rest_url(query.table_name()))
            .query(&select_params(query))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| DataError::Transport(e.to_string()))?;
        let (status, text) = read_body(response).await.map_err(DataError::Transport)?;
        if !is_success(status) {
            return Err(data_failure(status, &text));
        }
        parse_rows(&text)
    }

    async fn insert(
        &self,
        access_token: &str,
        table: &str,
        row: serde_json::Value,
    ) -> Result<serde_json::Value, DataError> {
        let response = self
            .http
            .post(self.rest_url(table))
            .header("apikey", &self.anon_key)
            .header("Prefer", "return=representation")
            .bearer_auth(access_token)
            .json(&row)
            .send()
            .await
            .map_err(|e| DataError::Transport(e.to_string()))?;
        let (status, text) = read_body(response).await.map_err(DataError::Transport)?;
        if !is_success(status) {
            return Err(data_failure(status, &text));
        }
        parse_rows(&text)?
            .into_iter()
            .next()
            .ok_or_else(|| DataError::EmptyInsert(table.to_owned()))
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    user: ServiceUser,
}

#[derive(Deserialize)]
struct SignUpResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    user: Option<ServiceUser>,
    #[serde(default)]
    id: Option<uuid::Uuid>,
    #[serde(default)]
    email: Option<String>,
}

// =============================================================================
// PURE HELPERS
// =============================================================================

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// PostgREST query parameters for a select.
pub(crate) fn select_params(query: &Query) -> Vec<(String, String)> {
    let mut params = vec![("select".to_owned(), "*".to_owned())];
    for (column, value) in query.filters() {
        params.push((column.clone(), format!("eq.{value}")));
    }
    if let Some((column, order)) = query.ordering() {
        params.push(("order".to_owned(), format!("{column}.{}", order.as_str())));
    }
    params
}

pub(crate) fn parse_session(text: &str) -> Result<AuthSession, AuthError> {
    let resp: TokenResponse =
        serde_json::from_str(text).map_err(|e| AuthError::UnexpectedResponse(format!("token response: {e}")))?;
    Ok(AuthSession { access_token: resp.access_token, refresh_token: resp.refresh_token, user: resp.user })
}

/// Sign-up answers with a session when confirmation is disabled and with the
/// bare user object otherwise.
pub(crate) fn parse_sign_up(text: &str) -> Result<SignUpOutcome, AuthError> {
    let resp: SignUpResponse =
        serde_json::from_str(text).map_err(|e| AuthError::UnexpectedResponse(format!("signup response: {e}")))?;

    match (resp.access_token, resp.refresh_token, resp.user, resp.id) {
        (Some(access_token), Some(refresh_token), Some(user), _) => {
            Ok(SignUpOutcome::SignedIn(AuthSession { access_token, refresh_token, user }))
        }
        (None, _, Some(user), _) => Ok(SignUpOutcome::ConfirmationRequired(user)),
        (None, _, None, Some(id)) => Ok(SignUpOutcome::ConfirmationRequired(ServiceUser { id, email: resp.email })),
        _ => Err(AuthError::UnexpectedResponse("signup response carried neither session nor user".into())),
    }
}

pub(crate) fn parse_rows(text: &str) -> Result<Vec<serde_json::Value>, DataError> {
    serde_json::from_str(text).map_err(|e| DataError::Decode(e.to_string()))
}

/// Pull a human-readable message out of an error body.
pub(crate) fn error_message(text: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(serde_json::Value::as_str))
        .map(str::to_owned)
}

/// Failure of a call made with user-supplied credentials.
pub(crate) fn credential_failure(status: u16, text: &str) -> AuthError {
    if status >= 500 {
        return AuthError::Transport(format!("auth service returned {status}"));
    }
    AuthError::Rejected(error_message(text).unwrap_or_else(|| "Authentication failed".to_owned()))
}

/// Failure of a call made with a stored token.
pub(crate) fn session_failure(status: u16, text: &str) -> AuthError {
    if status >= 500 {
        return AuthError::Transport(format!("auth service returned {status}"));
    }
    tracing::debug!(status, message = ?error_message(text), "session token rejected");
    AuthError::InvalidSession
}

pub(crate) fn data_failure(status: u16, text: &str) -> DataError {
    DataError::Rejected { status, message: error_message(text).unwrap_or_else(|| format!("status {status}")) }
}

#[cfg(test)]
#[path = "hosted_test.rs"]
mod tests;
