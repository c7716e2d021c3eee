//! Server-rendered HTML pages.
//!
//! Every page shares `templates/layout.html`. Bodies are assembled here and
//! dropped into the layout with `{{PLACEHOLDER}}` substitution. All text that
//! came from a user or the hosted service goes through [`escape_html`].

use std::fmt::Write as _;

use time::OffsetDateTime;
use time::macros::format_description;

use crate::services::password::POLICY_HINT;
use crate::services::screen::{Phase, TicketScreen};
use crate::services::tickets::{DEFAULT_PRIORITY, Message, PRIORITIES, SenderType, Ticket};

const LAYOUT_TEMPLATE: &str = include_str!("../../templates/layout.html");

/// Escape text for HTML element and attribute context. Braces are encoded
/// too so user text can never form a layout placeholder.
#[must_use]
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '{' => out.push_str("&#123;"),
            '}' => out.push_str("&#125;"),
            other => out.push(other),
        }
    }
    out
}

fn format_timestamp(at: OffsetDateTime) -> String {
    at.format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
        .unwrap_or_default()
}

fn layout(title: &str, account: Option<&str>, body: &str) -> String {
    let (nav, account) = match account {
        Some(email) => (
            r#"<a href="/dashboard">Dashboard</a><a href="/queues">Queues</a>"#.to_owned(),
            format!(
                r#"<span class="muted">{}</span> <form method="post" action="/auth/sign-out" style="display:inline"><button type="submit">Sign out</button></form>"#,
                escape_html(email)
            ),
        ),
        None => (String::new(), String::new()),
    };
    LAYOUT_TEMPLATE
        .replace("{{TITLE}}", &escape_html(title))
        .replace("{{NAV}}", &nav)
        .replace("{{ACCOUNT}}", &account)
        .replace("{{BODY}}", body)
}

fn banner_html(screen: &TicketScreen) -> String {
    match screen.banner() {
        Some(banner) if banner.retryable => format!(
            r#"<div class="banner">{} Please try again.</div>"#,
            escape_html(&banner.message)
        ),
        Some(banner) => format!(r#"<div class="banner">{}</div>"#, escape_html(&banner.message)),
        None => String::new(),
    }
}

// =============================================================================
// AUTH
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthView {
    SignIn,
    SignUp,
    Forgot,
}

impl AuthView {
    /// Unknown or missing values fall back to sign-in.
    #[must_use]
    pub fn from_query(view: Option<&str>) -> Self {
        match view {
            Some("signup") => Self::SignUp,
            Some("forgot") => Self::Forgot,
            _ => Self::SignIn,
        }
    }
}

/// Inline feedback shown above an auth form.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthFeedback<'a> {
    pub email: &'a str,
    pub error: Option<&'a str>,
    pub notice: Option<&'a str>,
}

#[must_use]
pub fn render_auth(view: AuthView, feedback: AuthFeedback<'_>) -> String {
    let mut body = String::from(r#"<div class="card">"#);
    if let Some(notice) = feedback.notice {
        let _ = write!(body, r#"<div class="notice">{}</div>"#, escape_html(notice));
    }
    if let Some(error) = feedback.error {
        let _ = write!(body, r#"<div class="banner">{}</div>"#, escape_html(error));
    }
    let email = escape_html(feedback.email);

    let title = match view {
        AuthView::SignIn => {
            let _ = write!(
                body,
                r#"<h1>Sign in</h1>
<form method="post" action="/auth/sign-in">
  <label for="email">Email</label><input id="email" name="email" type="email" value="{email}" required>
  <label for="password">Password</label><input id="password" name="password" type="password" required>
  <button type="submit">Sign in</button>
</form>
<p><a href="/auth?view=signup">Create an account</a> · <a href="/auth?view=forgot">Forgot password?</a></p>"#
            );
            "Sign in"
        }
        AuthView::SignUp => {
            let _ = write!(
                body,
                r#"<h1>Create an account</h1>
<form method="post" action="/auth/sign-up">
  <label for="email">Email</label><input id="email" name="email" type="email" value="{email}" required>
  <label for="password">Password</label><input id="password" name="password" type="password" required>
  <p class="muted">{hint}</p>
  <button type="submit">Sign up</button>
</form>
<p><a href="/auth">Already have an account? Sign in</a></p>"#,
                hint = escape_html(POLICY_HINT)
            );
            "Sign up"
        }
        AuthView::Forgot => {
            body.push_str(
                r#"<h1>Reset password</h1>
<p class="muted">Password reset is not available yet. Please contact support.</p>
<p><a href="/auth">Back to sign in</a></p>"#,
            );
            "Reset password"
        }
    };
    body.push_str("</div>");
    layout(title, None, &body)
}

/// Shown after a sign-up that needs email confirmation.
#[must_use]
pub fn render_sign_up_sent(email: &str) -> String {
    let body = format!(
        r#"<div class="card"><h1>Check your email</h1>
<p>We sent a confirmation link to <strong>{}</strong>. Follow it to activate your account, then sign in.</p>
<p><a href="/auth">Back to sign in</a></p></div>"#,
        escape_html(email)
    );
    layout("Check your email", None, &body)
}

// =============================================================================
// TICKETS
// =============================================================================

fn priority_options(selected: &str) -> String {
    PRIORITIES
        .iter()
        .map(|p| {
            let marker = if *p == selected { " selected" } else { "" };
            format!(r#"<option value="{p}"{marker}>{p}</option>"#)
        })
        .collect()
}

fn ticket_row(ticket: &Ticket) -> String {
    format!(
        r#"<li><a href="/tickets/{id}">{title}</a> <span class="muted">{status} · {priority} · {created}</span></li>"#,
        id = ticket.id,
        title = escape_html(&ticket.title),
        status = escape_html(&ticket.status),
        priority = escape_html(&ticket.priority),
        created = format_timestamp(ticket.created_at),
    )
}

#[must_use]
pub fn render_dashboard(email: &str, screen: &TicketScreen) -> String {
    let mut body = banner_html(screen);
    let _ = write!(
        body,
        r#"<div class="card"><h2>New ticket</h2>
<form method="post" action="/dashboard/tickets">
  <label for="title">Title</label><input id="title" name="title" required>
  <label for="description">Description</label><textarea id="description" name="description" rows="4"></textarea>
  <label for="category">Category</label><input id="category" name="category">
  <label for="priority">Priority</label><select id="priority" name="priority">{}</select>
  <button type="submit">Create ticket</button>
</form></div>"#,
        priority_options(DEFAULT_PRIORITY)
    );

    body.push_str(r#"<div class="card"><h2>Your tickets</h2>"#);
    if screen.tickets().is_empty() {
        body.push_str(r#"<p class="muted">No tickets yet.</p>"#);
    } else {
        body.push_str(r#"<ul class="tickets">"#);
        for ticket in screen.tickets() {
            body.push_str(&ticket_row(ticket));
        }
        body.push_str("</ul>");
    }
    body.push_str("</div>");
    layout("Dashboard", Some(email), &body)
}

fn message_html(message: &Message) -> String {
    let (class, sender) = match message.sender_type {
        SenderType::Customer => ("customer", "You"),
        SenderType::Agent => ("agent", "Support"),
    };
    format!(
        r#"<div class="message {class}"><strong>{sender}</strong> <span class="muted">{created}</span><p>{content}</p></div>"#,
        created = format_timestamp(message.created_at),
        content = escape_html(&message.content),
    )
}

/// Detail page of the selected ticket. Callers make sure a ticket is
/// selected and present in the list.
#[must_use]
pub fn render_ticket(email: &str, screen: &TicketScreen) -> String {
    let mut body = banner_html(screen);
    body.push_str(r#"<p><a href="/dashboard">&larr; All tickets</a></p>"#);

    let Some(ticket) = screen.selected_ticket() else {
        body.push_str(r#"<div class="card"><p class="muted">Ticket not found.</p></div>"#);
        return layout("Ticket", Some(email), &body);
    };

    let _ = write!(
        body,
        r#"<div class="card"><h1>{title}</h1><p class="muted">{status} · {priority}{category} · opened {created}</p>{description}</div>"#,
        title = escape_html(&ticket.title),
        status = escape_html(&ticket.status),
        priority = escape_html(&ticket.priority),
        category = ticket
            .category
            .as_deref()
            .map(|c| format!(" · {}", escape_html(c)))
            .unwrap_or_default(),
        created = format_timestamp(ticket.created_at),
        description = ticket
            .description
            .as_deref()
            .map(|d| format!("<p>{}</p>", escape_html(d)))
            .unwrap_or_default(),
    );

    body.push_str(r#"<div class="card"><h2>Conversation</h2>"#);
    match screen.phase() {
        Phase::MessagesLoaded if screen.messages().is_empty() => {
            body.push_str(r#"<p class="muted">No messages yet.</p>"#);
        }
        Phase::MessagesLoaded => {
            for message in screen.messages() {
                body.push_str(&message_html(message));
            }
        }
        Phase::MessagesFailed => body.push_str(r#"<p class="muted">Messages could not be loaded.</p>"#),
        Phase::MessagesLoading | Phase::TicketsLoaded | Phase::NoTickets => {
            body.push_str(r#"<p class="muted">Loading messages…</p>"#);
        }
    }
    let _ = write!(
        body,
        r#"<form method="post" action="/tickets/{}/messages">
  <label for="content">Reply</label><textarea id="content" name="content" rows="3" required></textarea>
  <button type="submit">Send</button>
</form></div>"#,
        ticket.id
    );
    layout(&ticket.title, Some(email), &body)
}

/// Placeholder for the agent queue views.
#[must_use]
pub fn render_queues(email: &str) -> String {
    let body = r#"<div class="card"><h1>Queues</h1><p class="muted">Queue management is a work in progress.</p></div>"#;
    layout("Queues", Some(email), body)
}

#[cfg(test)]
#[path = "pages_test.rs"]
mod tests;
