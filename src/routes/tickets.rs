//! Ticket routes: server-rendered dashboard/chat pages and the JSON API.
//!
//! DESIGN
//! ======
//! Page handlers build a `ScreenController` for the request's session and
//! render its snapshot. Form posts follow post/redirect/get on success; on
//! failure the page is rendered directly with the error banner so the user
//! sees what went wrong next to the data that was already loaded.
//!
//! JSON handlers call the ticket service directly and map `TicketError` to
//! a status plus `{ "error", "retryable" }` body.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Redirect, Response};
use axum::Form;
use serde::Deserialize;
use uuid::Uuid;

use crate::backend::DataError;
use crate::routes::auth::AuthUser;
use crate::routes::pages;
use crate::services::screen::ScreenController;
use crate::services::tickets::{self as tickets_svc, Message, NewTicket, Ticket, TicketError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MessageBody {
    pub content: String,
}

fn controller(state: &AppState, auth: &AuthUser) -> ScreenController {
    ScreenController::new(state.backend.clone(), auth.session.clone())
}

pub(crate) fn ticket_error_to_status(err: &TicketError) -> StatusCode {
    match err {
        TicketError::EmptyTitle | TicketError::EmptyContent => StatusCode::UNPROCESSABLE_ENTITY,
        TicketError::Data(DataError::Rejected { status: 401, .. }) => StatusCode::UNAUTHORIZED,
        TicketError::Data(_) | TicketError::Decode { .. } => StatusCode::BAD_GATEWAY,
    }
}

fn ticket_error_response(err: &TicketError) -> Response {
    let body = serde_json::json!({ "error": err.to_string(), "retryable": err.retryable() });
    (ticket_error_to_status(err), Json(body)).into_response()
}

// =============================================================================
// PAGES
// =============================================================================

/// `GET /dashboard`: the caller's tickets plus the create form.
pub async fn dashboard(State(state): State<AppState>, auth: AuthUser) -> Response {
    let screen = controller(&state, &auth);
    let status = match screen.refresh_tickets().await {
        Ok(()) => StatusCode::OK,
        Err(e) => ticket_error_to_status(&e),
    };
    let snapshot = screen.snapshot().await;
    (status, Html(pages::render_dashboard(auth.email(), &snapshot))).into_response()
}

/// `POST /dashboard/tickets`: create then redirect back to the dashboard.
pub async fn create_ticket_form(State(state): State<AppState>, auth: AuthUser, Form(new): Form<NewTicket>) -> Response {
    let screen = controller(&state, &auth);
    if let Err(e) = screen.refresh_tickets().await {
        tracing::debug!(error = %e, "ticket list unavailable before create");
    }
    match screen.create_ticket(&new).await {
        Ok(_) => Redirect::to("/dashboard").into_response(),
        Err(e) => {
            let snapshot = screen.snapshot().await;
            (ticket_error_to_status(&e), Html(pages::render_dashboard(auth.email(), &snapshot))).into_response()
        }
    }
}

/// `GET /tickets/{id}`: ticket detail and conversation.
pub async fn ticket_page(State(state): State<AppState>, auth: AuthUser, Path(ticket_id): Path<Uuid>) -> Response {
    let screen = controller(&state, &auth);
    let mut status = match screen.refresh_tickets().await {
        Ok(()) => StatusCode::OK,
        Err(e) => ticket_error_to_status(&e),
    };
    if let Err(e) = screen.select_ticket(ticket_id).await {
        status = ticket_error_to_status(&e);
    }
    let snapshot = screen.snapshot().await;
    if status == StatusCode::OK && snapshot.selected_ticket().is_none() {
        status = StatusCode::NOT_FOUND;
    }
    (status, Html(pages::render_ticket(auth.email(), &snapshot))).into_response()
}

/// `POST /tickets/{id}/messages`: send then redirect back to the ticket.
/// Tickets missing from the caller's list are 404, as on the ticket page.
pub async fn send_message_form(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(ticket_id): Path<Uuid>,
    Form(body): Form<MessageBody>,
) -> Response {
    let screen = controller(&state, &auth);
    let refreshed = screen.refresh_tickets().await;
    if let Err(e) = screen.select_ticket(ticket_id).await {
        tracing::debug!(%ticket_id, error = %e, "message list unavailable before send");
    }
    let snapshot = screen.snapshot().await;
    if snapshot.selected_ticket().is_none() {
        let status = match &refreshed {
            Ok(()) => {
                tracing::warn!(user_id = %auth.user.id, %ticket_id, "message for a ticket outside the caller's list");
                StatusCode::NOT_FOUND
            }
            Err(e) => ticket_error_to_status(e),
        };
        return (status, Html(pages::render_ticket(auth.email(), &snapshot))).into_response();
    }
    match screen.send_message(&body.content).await {
        Ok(_) => Redirect::to(&format!("/tickets/{ticket_id}")).into_response(),
        Err(e) => {
            let snapshot = screen.snapshot().await;
            (ticket_error_to_status(&e), Html(pages::render_ticket(auth.email(), &snapshot))).into_response()
        }
    }
}

/// `GET /queues`: agent queues placeholder.
pub async fn queues(auth: AuthUser) -> Html<String> {
    Html(pages::render_queues(auth.email()))
}

// =============================================================================
// JSON API
// =============================================================================

/// `GET /api/tickets`
pub async fn list_tickets_api(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Vec<Ticket>>, Response> {
    tickets_svc::list_tickets(state.backend.as_ref(), &auth.access_token, auth.user.id)
        .await
        .map(Json)
        .map_err(|e| {
            tracing::warn!(user_id = %auth.user.id, error = %e, "ticket list failed");
            ticket_error_response(&e)
        })
}

/// `POST /api/tickets`
pub async fn create_ticket_api(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(new): Json<NewTicket>,
) -> Result<(StatusCode, Json<Ticket>), Response> {
    let ticket = tickets_svc::create_ticket(state.backend.as_ref(), &auth.access_token, auth.user.id, &new)
        .await
        .map_err(|e| {
            tracing::warn!(user_id = %auth.user.id, error = %e, "ticket create failed");
            ticket_error_response(&e)
        })?;
    tracing::info!(user_id = %auth.user.id, ticket_id = %ticket.id, "ticket created");
    Ok((StatusCode::CREATED, Json(ticket)))
}

/// `GET /api/tickets/{id}/messages`
pub async fn list_messages_api(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(ticket_id): Path<Uuid>,
) -> Result<Json<Vec<Message>>, Response> {
    tickets_svc::list_messages(state.backend.as_ref(), &auth.access_token, ticket_id)
        .await
        .map(Json)
        .map_err(|e| {
            tracing::warn!(user_id = %auth.user.id, %ticket_id, error = %e, "message list failed");
            ticket_error_response(&e)
        })
}

/// `POST /api/tickets/{id}/messages`
pub async fn send_message_api(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(ticket_id): Path<Uuid>,
    Json(body): Json<MessageBody>,
) -> Result<(StatusCode, Json<Message>), Response> {
    let message = tickets_svc::send_message(state.backend.as_ref(), &auth.access_token, ticket_id, auth.user.id, &body.content)
        .await
        .map_err(|e| {
            tracing::warn!(user_id = %auth.user.id, %ticket_id, error = %e, "message send failed");
            ticket_error_response(&e)
        })?;
    Ok((StatusCode::CREATED, Json(message)))
}

#[cfg(test)]
#[path = "tickets_test.rs"]
mod tests;
