//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! One Axum router serves the server-rendered pages and the JSON API. The
//! route gate wraps every route so session cookies are refreshed on each
//! request and protected pages redirect anonymous visitors to `/auth`.

pub mod auth;
pub mod gate;
pub mod pages;
pub mod tickets;

#[cfg(test)]
pub(crate) mod test_support;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::Redirect;
use axum::routing::{get, post};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// JSON API consumed by scripts and the pages' progressive enhancements.
fn api_routes() -> Router<AppState> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/auth/me", get(auth::me))
        .route(
            "/api/tickets",
            get(tickets::list_tickets_api).post(tickets::create_ticket_api),
        )
        .route(
            "/api/tickets/{id}/messages",
            get(tickets::list_messages_api).post(tickets::send_message_api),
        )
        .layer(cors)
}

/// Full application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(redirect_root))
        .route("/auth", get(auth::auth_page))
        .route("/auth/sign-in", post(auth::sign_in))
        .route("/auth/sign-up", post(auth::sign_up))
        .route("/auth/sign-out", post(auth::sign_out))
        .route("/auth/callback", get(auth::auth_callback))
        .route("/dashboard", get(tickets::dashboard))
        .route("/dashboard/tickets", post(tickets::create_ticket_form))
        .route("/tickets/{id}", get(tickets::ticket_page))
        .route("/tickets/{id}/messages", post(tickets::send_message_form))
        .route("/queues", get(tickets::queues))
        .route("/healthz", get(healthz))
        .merge(api_routes())
        .layer(middleware::from_fn_with_state(state.clone(), gate::gate))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn redirect_root() -> Redirect {
    Redirect::temporary("/dashboard")
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
