//! Ticket/message screen: local view state mirroring the hosted service.
//!
//! DESIGN
//! ======
//! `TicketScreen` is a plain state machine:
//!
//! ```text
//! NoTickets -> TicketsLoaded -> MessagesLoading -> MessagesLoaded
//!                                      ^   |            |
//!                                      |   v            |
//!                                      | MessagesFailed |
//!                                      +----select------+
//! ```
//!
//! Lists are caches of server state and are replaced wholesale on each
//! fetch. Creates and sends wait for the row echoed by the insert before
//! touching the lists.
//!
//! Every `select` bumps a generation counter and returns a `MessageFetch`
//! token. A message response is applied only if its token is still the
//! current one, so a slow fetch for a ticket the user already left cannot
//! overwrite the list of the ticket they are looking at.
//!
//! `ScreenController` drives the state machine against a `Backend`. The
//! screen lock is never held across a service call.
//!
//! ERROR HANDLING
//! ==============
//! Failed calls keep whatever was on screen, set a retryable banner, and
//! return the typed error to the caller. The next successful operation
//! clears the banner.

use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::backend::Backend;
use crate::services::session::SessionHandle;
use crate::services::tickets::{self, Message, NewTicket, Ticket, TicketError};

// =============================================================================
// STATE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NoTickets,
    TicketsLoaded,
    MessagesLoading,
    MessagesLoaded,
    MessagesFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessagesState {
    Loading,
    Loaded(Vec<Message>),
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub ticket_id: Uuid,
    pub messages: MessagesState,
    generation: u64,
}

/// Recoverable error shown above the lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub message: String,
    pub retryable: bool,
}

/// Token carried by an in-flight message fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageFetch {
    pub ticket_id: Uuid,
    generation: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketScreen {
    tickets: Option<Vec<Ticket>>,
    selection: Option<Selection>,
    banner: Option<Banner>,
    generation: u64,
}

impl TicketScreen {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        match (&self.tickets, &self.selection) {
            (_, Some(sel)) => match sel.messages {
                MessagesState::Loading => Phase::MessagesLoading,
                MessagesState::Loaded(_) => Phase::MessagesLoaded,
                MessagesState::Failed => Phase::MessagesFailed,
            },
            (Some(_), None) => Phase::TicketsLoaded,
            (None, None) => Phase::NoTickets,
        }
    }

    #[must_use]
    pub fn tickets(&self) -> &[Ticket] {
        self.tickets.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn selected_ticket_id(&self) -> Option<Uuid> {
        self.selection.as_ref().map(|s| s.ticket_id)
    }

    #[must_use]
    pub fn selected_ticket(&self) -> Option<&Ticket> {
        let id = self.selected_ticket_id()?;
        self.tickets().iter().find(|t| t.id == id)
    }

    /// Loaded messages of the selected ticket; empty while loading.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        match self.selection.as_ref().map(|s| &s.messages) {
            Some(MessagesState::Loaded(messages)) => messages,
            _ => &[],
        }
    }

    #[must_use]
    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref()
    }

    /// Replace the ticket list wholesale.
    pub fn apply_tickets(&mut self, tickets: Vec<Ticket>) {
        self.tickets = Some(tickets);
        self.banner = None;
    }

    pub fn prepend_ticket(&mut self, ticket: Ticket) {
        self.tickets.get_or_insert_with(Vec::new).insert(0, ticket);
        self.banner = None;
    }

    /// Select a ticket, discarding the previous message list.
    pub fn select(&mut self, ticket_id: Uuid) -> MessageFetch {
        self.generation += 1;
        self.selection = Some(Selection { ticket_id, messages: MessagesState::Loading, generation: self.generation });
        MessageFetch { ticket_id, generation: self.generation }
    }

    #[must_use]
    pub fn is_current(&self, fetch: MessageFetch) -> bool {
        self.selection
            .as_ref()
            .is_some_and(|s| s.generation == fetch.generation && s.ticket_id == fetch.ticket_id)
    }

    /// Apply a message response. Returns `false` if the fetch is stale.
    pub fn apply_messages(&mut self, fetch: MessageFetch, messages: Vec<Message>) -> bool {
        if !self.is_current(fetch) {
            return false;
        }
        if let Some(sel) = self.selection.as_mut() {
            sel.messages = MessagesState::Loaded(messages);
        }
        self.banner = None;
        true
    }

    /// Record a failed message fetch. Returns `false` if the fetch is stale.
    pub fn fail_messages(&mut self, fetch: MessageFetch, err: &TicketError) -> bool {
        if !self.is_current(fetch) {
            return false;
        }
        if let Some(sel) = self.selection.as_mut() {
            sel.messages = MessagesState::Failed;
        }
        self.record_error(err);
        true
    }

    /// Append a sent message if its ticket is still the selected one.
    pub fn append_message(&mut self, message: Message) -> bool {
        self.banner = None;
        match self.selection.as_mut() {
            Some(Selection { ticket_id, messages: MessagesState::Loaded(messages), .. })
                if *ticket_id == message.request_id =>
            {
                messages.push(message);
                true
            }
            _ => false,
        }
    }

    pub fn record_error(&mut self, err: &TicketError) {
        self.banner = Some(Banner { message: err.to_string(), retryable: err.retryable() });
    }
}

// =============================================================================
// CONTROLLER
// =============================================================================

/// Runs screen operations against the hosted service for one session.
pub struct ScreenController {
    backend: Arc<dyn Backend>,
    session: Arc<SessionHandle>,
    screen: Mutex<TicketScreen>,
}

impl ScreenController {
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, session: Arc<SessionHandle>) -> Self {
        Self { backend, session, screen: Mutex::new(TicketScreen::new()) }
    }

    pub async fn snapshot(&self) -> TicketScreen {
        self.screen.lock().await.clone()
    }

    /// Fetch the caller's tickets and replace the list.
    ///
    /// # Errors
    ///
    /// Returns the data error after recording it on the banner; the
    /// previous list stays in place.
    pub async fn refresh_tickets(&self) -> Result<(), TicketError> {
        let Some((user, token)) = self.session.credentials().await else {
            tracing::debug!("refresh_tickets without a session ignored");
            return Ok(());
        };

        let result = tickets::list_tickets(self.backend.as_ref(), &token, user.id).await;
        let mut screen = self.screen.lock().await;
        match result {
            Ok(list) => {
                screen.apply_tickets(list);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "ticket list fetch failed");
                screen.record_error(&e);
                Err(e)
            }
        }
    }

    /// Create a ticket and prepend the stored row.
    ///
    /// Returns `Ok(None)` without calling the service when the title is
    /// blank or nobody is signed in.
    ///
    /// # Errors
    ///
    /// Returns the data error after recording it on the banner.
    pub async fn create_ticket(&self, new: &NewTicket) -> Result<Option<Ticket>, TicketError> {
        if new.title.trim().is_empty() {
            return Ok(None);
        }
        let Some((user, token)) = self.session.credentials().await else {
            return Ok(None);
        };

        let result = tickets::create_ticket(self.backend.as_ref(), &token, user.id, new).await;
        let mut screen = self.screen.lock().await;
        match result {
            Ok(ticket) => {
                tracing::info!(user_id = %user.id, ticket_id = %ticket.id, "ticket created");
                screen.prepend_ticket(ticket.clone());
                Ok(Some(ticket))
            }
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "ticket create failed");
                screen.record_error(&e);
                Err(e)
            }
        }
    }

    /// Select a ticket and load its messages.
    ///
    /// Returns `Ok(true)` if the response was applied and `Ok(false)` if it
    /// arrived after another selection (or nobody is signed in).
    ///
    /// # Errors
    ///
    /// Returns the data error of a current fetch after recording it.
    pub async fn select_ticket(&self, ticket_id: Uuid) -> Result<bool, TicketError> {
        let Some((user, token)) = self.session.credentials().await else {
            return Ok(false);
        };

        let fetch = self.screen.lock().await.select(ticket_id);
        let result = tickets::list_messages(self.backend.as_ref(), &token, ticket_id).await;
        let mut screen = self.screen.lock().await;
        match result {
            Ok(messages) => {
                let applied = screen.apply_messages(fetch, messages);
                if !applied {
                    tracing::debug!(%ticket_id, "discarded stale message list");
                }
                Ok(applied)
            }
            Err(e) => {
                if !screen.fail_messages(fetch, &e) {
                    tracing::debug!(%ticket_id, error = %e, "discarded stale message fetch failure");
                    return Ok(false);
                }
                tracing::warn!(user_id = %user.id, %ticket_id, error = %e, "message list fetch failed");
                Err(e)
            }
        }
    }

    /// Send a customer message on the selected ticket.
    ///
    /// Returns `Ok(None)` without calling the service when the content is
    /// blank, nobody is signed in, or no ticket from the loaded list is
    /// selected.
    ///
    /// # Errors
    ///
    /// Returns the data error after recording it on the banner.
    pub async fn send_message(&self, content: &str) -> Result<Option<Message>, TicketError> {
        if content.trim().is_empty() {
            return Ok(None);
        }
        let Some(ticket_id) = self.screen.lock().await.selected_ticket().map(|t| t.id) else {
            return Ok(None);
        };
        let Some((user, token)) = self.session.credentials().await else {
            return Ok(None);
        };

        let result = tickets::send_message(self.backend.as_ref(), &token, ticket_id, user.id, content).await;
        let mut screen = self.screen.lock().await;
        match result {
            Ok(message) => {
                screen.append_message(message.clone());
                Ok(Some(message))
            }
            Err(e) => {
                tracing::warn!(user_id = %user.id, %ticket_id, error = %e, "message send failed");
                screen.record_error(&e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
#[path = "screen_test.rs"]
mod tests;
