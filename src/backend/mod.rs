//! Hosted auth/database service: the seam every other module talks through.
//!
//! DESIGN
//! ======
//! `Backend` covers the two halves of the hosted service: password auth with
//! access/refresh tokens, and a generic table query interface (select with
//! equality filters and ordering, insert returning the inserted row). Rows
//! cross the trait as JSON so the trait stays object-safe; typed decoding
//! lives with the callers in `services::tickets`.
//!
//! Production uses `hosted::HostedClient`. Tests use the in-memory
//! `memory::MemoryBackend`.

pub mod hosted;
#[cfg(test)]
pub mod memory;

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// AUTH TYPES
// =============================================================================

/// Identity as reported by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// Token pair issued by the auth service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub user: ServiceUser,
}

/// Result of a successful sign-up call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// Account created but unverified until the email link is followed.
    ConfirmationRequired(ServiceUser),
    /// The service skipped confirmation and issued a session immediately.
    SignedIn(AuthSession),
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The service refused the request (bad credentials, unverified account,
    /// duplicate email). The message is meant for the end user.
    #[error("{0}")]
    Rejected(String),
    #[error("session is invalid or expired")]
    InvalidSession,
    #[error("auth request failed: {0}")]
    Transport(String),
    #[error("unexpected auth response: {0}")]
    UnexpectedResponse(String),
}

// =============================================================================
// DATA TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// A select against one table: equality filters plus an optional ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    table: String,
    filters: Vec<(String, String)>,
    order: Option<(String, Order)>,
}

impl Query {
    #[must_use]
    pub fn table(name: &str) -> Self {
        Self { table: name.to_owned(), filters: Vec::new(), order: None }
    }

    #[must_use]
    pub fn eq(mut self, column: &str, value: impl Display) -> Self {
        self.filters.push((column.to_owned(), value.to_string()));
        self
    }

    #[must_use]
    pub fn order(mut self, column: &str, order: Order) -> Self {
        self.order = Some((column.to_owned(), order));
        self
    }

    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub fn filters(&self) -> &[(String, String)] {
        &self.filters
    }

    #[must_use]
    pub fn ordering(&self) -> Option<(&str, Order)> {
        self.order.as_ref().map(|(col, ord)| (col.as_str(), *ord))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("data request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("data request failed: {0}")]
    Transport(String),
    #[error("unexpected data response: {0}")]
    Decode(String),
    #[error("insert into {0} returned no row")]
    EmptyInsert(String),
}

impl DataError {
    /// Whether repeating the same call later could succeed.
    #[must_use]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Rejected { status: 408 | 429 | 500..=599, .. })
    }
}

// =============================================================================
// TRAIT
// =============================================================================

#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;

    async fn sign_up(&self, email: &str, password: &str, email_redirect_to: &str) -> Result<SignUpOutcome, AuthError>;

    /// Validate an access token and return its user.
    async fn get_user(&self, access_token: &str) -> Result<ServiceUser, AuthError>;

    /// Exchange a refresh token for a fresh token pair.
    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, AuthError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;

    /// Run a select as the user owning `access_token`.
    async fn select(&self, access_token: &str, query: &Query) -> Result<Vec<serde_json::Value>, DataError>;

    /// Insert one row and return the row as stored (ids and defaults filled).
    async fn insert(
        &self,
        access_token: &str,
        table: &str,
        row: serde_json::Value,
    ) -> Result<serde_json::Value, DataError>;
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
