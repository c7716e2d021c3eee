//! Ticket and message data access over the generic query interface.
//!
//! All calls run with the caller's access token, so the hosted service's
//! row-level policies decide which rows are visible. Every function is
//! attempt-once and returns a typed error; callers choose whether to keep
//! stale state.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::backend::{Backend, DataError, Order, Query};

pub const REQUESTS_TABLE: &str = "requests";
pub const MESSAGES_TABLE: &str = "messages";
pub const DEFAULT_STATUS: &str = "new";
pub const DEFAULT_PRIORITY: &str = "medium";
/// Values offered by the create form. Stored rows may carry others.
pub const PRIORITIES: [&str; 4] = ["low", "medium", "high", "urgent"];

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderType {
    Customer,
    Agent,
}

/// A customer-opened support case. Mirrors the `requests` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Lifecycle status (`new`, `open`, `closed`, ...). Driven by agents.
    pub status: String,
    /// Free-form like `status`; agents may set values the form never offers.
    pub priority: String,
    #[serde(default)]
    pub category: Option<String>,
    pub customer_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A chat entry attached to a ticket. Mirrors the `messages` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub request_id: Uuid,
    pub content: String,
    pub sender_type: SenderType,
    #[serde(default)]
    pub sender_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewTicket {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum TicketError {
    #[error("ticket title is required")]
    EmptyTitle,
    #[error("message content is required")]
    EmptyContent,
    #[error(transparent)]
    Data(#[from] DataError),
    #[error("malformed {table} row: {reason}")]
    Decode { table: &'static str, reason: String },
}

impl TicketError {
    #[must_use]
    pub fn retryable(&self) -> bool {
        match self {
            Self::Data(e) => e.retryable(),
            Self::EmptyTitle | Self::EmptyContent | Self::Decode { .. } => false,
        }
    }
}

fn decode<T: DeserializeOwned>(table: &'static str, value: serde_json::Value) -> Result<T, TicketError> {
    serde_json::from_value(value).map_err(|e| TicketError::Decode { table, reason: e.to_string() })
}

fn blank_to_none(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// =============================================================================
// TICKETS
// =============================================================================

/// All tickets opened by `customer_id`, newest first.
///
/// # Errors
///
/// Returns a data error if the select fails or a row does not decode.
pub async fn list_tickets(backend: &dyn Backend, access_token: &str, customer_id: Uuid) -> Result<Vec<Ticket>, TicketError> {
    let query = Query::table(REQUESTS_TABLE)
        .eq("customer_id", customer_id)
        .order("created_at", Order::Desc);
    backend
        .select(access_token, &query)
        .await?
        .into_iter()
        .map(|row| decode(REQUESTS_TABLE, row))
        .collect()
}

/// Open a ticket with status `new` and, unless given, priority `medium`.
/// Returns the row as stored.
///
/// # Errors
///
/// Returns `EmptyTitle` without calling the service when the title is
/// blank; otherwise a data error if the insert fails.
pub async fn create_ticket(
    backend: &dyn Backend,
    access_token: &str,
    customer_id: Uuid,
    new: &NewTicket,
) -> Result<Ticket, TicketError> {
    if new.title.trim().is_empty() {
        return Err(TicketError::EmptyTitle);
    }

    let row = serde_json::json!({
        "title": new.title,
        "description": blank_to_none(new.description.as_deref()),
        "category": blank_to_none(new.category.as_deref()),
        "status": DEFAULT_STATUS,
        "priority": blank_to_none(new.priority.as_deref()).unwrap_or(DEFAULT_PRIORITY),
        "customer_id": customer_id,
    });
    let stored = backend.insert(access_token, REQUESTS_TABLE, row).await?;
    decode(REQUESTS_TABLE, stored)
}

// =============================================================================
// MESSAGES
// =============================================================================

/// Messages of one ticket, oldest first.
///
/// # Errors
///
/// Returns a data error if the select fails or a row does not decode.
pub async fn list_messages(backend: &dyn Backend, access_token: &str, ticket_id: Uuid) -> Result<Vec<Message>, TicketError> {
    let query = Query::table(MESSAGES_TABLE)
        .eq("request_id", ticket_id)
        .order("created_at", Order::Asc);
    backend
        .select(access_token, &query)
        .await?
        .into_iter()
        .map(|row| decode(MESSAGES_TABLE, row))
        .collect()
}

/// Post a customer message on a ticket. Returns the row as stored.
///
/// # Errors
///
/// Returns `EmptyContent` without calling the service when the content is
/// blank; otherwise a data error if the insert fails.
pub async fn send_message(
    backend: &dyn Backend,
    access_token: &str,
    ticket_id: Uuid,
    sender_id: Uuid,
    content: &str,
) -> Result<Message, TicketError> {
    if content.trim().is_empty() {
        return Err(TicketError::EmptyContent);
    }

    let row = serde_json::json!({
        "request_id": ticket_id,
        "content": content,
        "sender_type": SenderType::Customer,
        "sender_id": sender_id,
    });
    let stored = backend.insert(access_token, MESSAGES_TABLE, row).await?;
    decode(MESSAGES_TABLE, stored)
}

#[cfg(test)]
#[path = "tickets_test.rs"]
mod tests;
