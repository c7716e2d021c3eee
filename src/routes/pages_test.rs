use super::*;
use time::macros::datetime;
use uuid::Uuid;

fn ticket(title: &str) -> Ticket {
    Ticket {
        id: Uuid::new_v4(),
        title: title.into(),
        description: Some("Printer <b>jammed</b>".into()),
        status: "new".into(),
        priority: "high".into(),
        category: Some("hardware".into()),
        customer_id: Uuid::new_v4(),
        created_at: datetime!(2024-03-05 14:30 UTC),
    }
}

fn message(request_id: Uuid, content: &str, sender_type: SenderType) -> Message {
    Message { id: Uuid::new_v4(), request_id, content: content.into(), sender_type, sender_id: None, created_at: datetime!(2024-03-05 15:00 UTC) }
}

#[test]
fn escape_html_encodes_markup_and_placeholders() {
    assert_eq!(escape_html(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
    assert_eq!(escape_html("{{BODY}}"), "&#123;&#123;BODY&#125;&#125;");
    assert_eq!(escape_html("plain"), "plain");
}

#[test]
fn auth_view_parses_query_values() {
    assert_eq!(AuthView::from_query(None), AuthView::SignIn);
    assert_eq!(AuthView::from_query(Some("signup")), AuthView::SignUp);
    assert_eq!(AuthView::from_query(Some("forgot")), AuthView::Forgot);
    assert_eq!(AuthView::from_query(Some("bogus")), AuthView::SignIn);
}

#[test]
fn sign_in_page_shows_error_and_keeps_email() {
    let html = render_auth(
        AuthView::SignIn,
        AuthFeedback { email: "a@b.com", error: Some("Invalid login credentials"), notice: None },
    );
    assert!(html.contains(r#"action="/auth/sign-in""#));
    assert!(html.contains(r#"value="a@b.com""#));
    assert!(html.contains("Invalid login credentials"));
}

#[test]
fn sign_up_page_lists_password_policy() {
    let html = render_auth(AuthView::SignUp, AuthFeedback::default());
    assert!(html.contains(r#"action="/auth/sign-up""#));
    assert!(html.contains("at least 8 characters"));
}

#[test]
fn forgot_view_is_a_placeholder_without_form() {
    let html = render_auth(AuthView::Forgot, AuthFeedback::default());
    assert!(html.contains("not available yet"));
    assert!(!html.contains("<form"));
}

#[test]
fn dashboard_lists_tickets_escaped() {
    let mut screen = TicketScreen::new();
    let t = ticket("<script>alert(1)</script>");
    screen.apply_tickets(vec![t.clone()]);

    let html = render_dashboard("user@example.com", &screen);
    assert!(html.contains(&format!("/tickets/{}", t.id)));
    assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    assert!(!html.contains("<script>alert"));
    assert!(html.contains("2024-03-05 14:30"));
    assert!(html.contains("user@example.com"));
}

#[test]
fn dashboard_empty_state() {
    let mut screen = TicketScreen::new();
    screen.apply_tickets(Vec::new());
    assert!(render_dashboard("u@example.com", &screen).contains("No tickets yet."));
}

#[test]
fn ticket_page_renders_conversation() {
    let mut screen = TicketScreen::new();
    let t = ticket("Printer broken");
    screen.apply_tickets(vec![t.clone()]);
    let fetch = screen.select(t.id);
    screen.apply_messages(
        fetch,
        vec![message(t.id, "It smokes", SenderType::Customer), message(t.id, "On our way", SenderType::Agent)],
    );

    let html = render_ticket("u@example.com", &screen);
    assert!(html.contains("Printer broken"));
    assert!(html.contains("Printer &lt;b&gt;jammed&lt;/b&gt;"));
    assert!(html.contains("hardware"));
    assert!(html.contains(r#"class="message customer""#));
    assert!(html.contains(r#"class="message agent""#));
    assert!(html.contains(&format!(r#"action="/tickets/{}/messages""#, t.id)));
}

#[test]
fn ticket_page_without_messages_shows_empty_state() {
    let mut screen = TicketScreen::new();
    let t = ticket("Quiet");
    screen.apply_tickets(vec![t.clone()]);
    let fetch = screen.select(t.id);
    screen.apply_messages(fetch, Vec::new());
    assert!(render_ticket("u@example.com", &screen).contains("No messages yet."));
}

#[test]
fn ticket_page_unknown_ticket_is_not_found() {
    let mut screen = TicketScreen::new();
    screen.apply_tickets(Vec::new());
    screen.select(Uuid::new_v4());
    assert!(render_ticket("u@example.com", &screen).contains("Ticket not found."));
}
