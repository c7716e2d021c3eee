//! In-memory `Backend` used by tests in place of the hosted service.
//!
//! Emulates just enough of the service: password accounts with optional
//! email confirmation, rotating refresh tokens, tables of JSON rows with
//! generated `id`/`created_at`, failure injection, and per-filter gates that
//! hold a select until the test releases it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use time::format_description::well_known::Rfc3339;
use time::macros::datetime;
use tokio::sync::Notify;
use uuid::Uuid;

use super::{AuthError, AuthSession, Backend, DataError, Order, Query, ServiceUser, SignUpOutcome};

struct Account {
    user: ServiceUser,
    password: String,
    confirmed: bool,
}

/// Holds a gated select until `release` is notified.
#[derive(Default)]
pub struct SelectGate {
    pub entered: Notify,
    pub release: Notify,
}

#[derive(Default)]
struct Inner {
    accounts: Vec<Account>,
    access_tokens: HashMap<String, Uuid>,
    refresh_tokens: HashMap<String, Uuid>,
    tables: HashMap<String, Vec<serde_json::Value>>,
    gates: HashMap<String, Arc<SelectGate>>,
    seq: i64,
    auto_confirm: bool,
    offline: bool,
    fail_next_data: Option<DataError>,
    fail_next_insert: Option<DataError>,
    inserts: usize,
    selects: usize,
    last_redirect: Option<String>,
}

#[derive(Default)]
pub struct MemoryBackend {
    inner: Mutex<Inner>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an account directly, bypassing sign-up.
    pub fn add_user(&self, email: &str, password: &str, confirmed: bool) -> ServiceUser {
        let user = ServiceUser { id: Uuid::new_v4(), email: Some(email.to_owned()) };
        self.lock().accounts.push(Account { user: user.clone(), password: password.to_owned(), confirmed });
        user
    }

    /// Issue a fresh token pair for an existing user.
    pub fn issue_session(&self, user: &ServiceUser) -> AuthSession {
        let mut inner = self.lock();
        issue(&mut inner, user.clone())
    }

    /// Forget an access token, as if it had expired.
    pub fn expire_access_token(&self, token: &str) {
        self.lock().access_tokens.remove(token);
    }

    pub fn set_auto_confirm(&self, on: bool) {
        self.lock().auto_confirm = on;
    }

    /// Make every call fail with a transport error.
    pub fn set_offline(&self, on: bool) {
        self.lock().offline = on;
    }

    /// Fail the next select or insert with `err`.
    pub fn fail_next_data(&self, err: DataError) {
        self.lock().fail_next_data = Some(err);
    }

    /// Fail the next insert with `err`; selects are unaffected.
    pub fn fail_next_insert(&self, err: DataError) {
        self.lock().fail_next_insert = Some(err);
    }

    /// Hold selects filtered on `value` until the returned gate is released.
    pub fn gate_select(&self, value: impl std::fmt::Display) -> Arc<SelectGate> {
        let gate = Arc::new(SelectGate::default());
        self.lock().gates.insert(value.to_string(), gate.clone());
        gate
    }

    /// Seed a row as if another party (e.g. an agent) had inserted it.
    pub fn seed_row(&self, table: &str, row: serde_json::Value) -> serde_json::Value {
        let mut inner = self.lock();
        store_row(&mut inner, table, row)
    }

    #[must_use]
    pub fn rows(&self, table: &str) -> Vec<serde_json::Value> {
        self.lock().tables.get(table).cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn insert_count(&self) -> usize {
        self.lock().inserts
    }

    #[must_use]
    pub fn select_count(&self) -> usize {
        self.lock().selects
    }

    #[must_use]
    pub fn last_redirect(&self) -> Option<String> {
        self.lock().last_redirect.clone()
    }

    #[must_use]
    pub fn is_access_token_live(&self, token: &str) -> bool {
        self.lock().access_tokens.contains_key(token)
    }

    fn check_online(&self) -> Result<(), String> {
        if self.lock().offline { Err("connection refused".to_owned()) } else { Ok(()) }
    }

    fn data_preflight(&self, access_token: &str) -> Result<Uuid, DataError> {
        let mut inner = self.lock();
        if inner.offline {
            return Err(DataError::Transport("connection refused".into()));
        }
        if let Some(err) = inner.fail_next_data.take() {
            return Err(err);
        }
        inner
            .access_tokens
            .get(access_token)
            .copied()
            .ok_or(DataError::Rejected { status: 401, message: "JWT expired".into() })
    }
}

fn issue(inner: &mut Inner, user: ServiceUser) -> AuthSession {
    let access_token = format!("at-{}", Uuid::new_v4().simple());
    let refresh_token = format!("rt-{}", Uuid::new_v4().simple());
    inner.access_tokens.insert(access_token.clone(), user.id);
    inner.refresh_tokens.insert(refresh_token.clone(), user.id);
    AuthSession { access_token, refresh_token, user }
}

fn store_row(inner: &mut Inner, table: &str, mut row: serde_json::Value) -> serde_json::Value {
    inner.seq += 1;
    let created_at = (datetime!(2024-01-01 0:00 UTC) + time::Duration::seconds(inner.seq))
        .format(&Rfc3339)
        .unwrap_or_default();
    if let Some(obj) = row.as_object_mut() {
        obj.entry("id")
            .or_insert_with(|| serde_json::json!(Uuid::new_v4()));
        obj.entry("created_at")
            .or_insert_with(|| serde_json::json!(created_at));
    }
    inner
        .tables
        .entry(table.to_owned())
        .or_default()
        .push(row.clone());
    row
}

fn cell_text(value: Option<&serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn user_for(inner: &Inner, id: Uuid) -> Option<ServiceUser> {
    inner
        .accounts
        .iter()
        .find(|a| a.user.id == id)
        .map(|a| a.user.clone())
}

#[async_trait::async_trait]
impl Backend for MemoryBackend {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        self.check_online().map_err(AuthError::Transport)?;
        let mut inner = self.lock();
        let Some(account) = inner
            .accounts
            .iter()
            .find(|a| a.user.email.as_deref() == Some(email) && a.password == password)
        else {
            return Err(AuthError::Rejected("Invalid login credentials".into()));
        };
        if !account.confirmed {
            return Err(AuthError::Rejected("Email not confirmed".into()));
        }
        let user = account.user.clone();
        Ok(issue(&mut inner, user))
    }

    async fn sign_up(&self, email: &str, password: &str, email_redirect_to: &str) -> Result<SignUpOutcome, AuthError> {
        self.check_online().map_err(AuthError::Transport)?;
        let mut inner = self.lock();
        inner.last_redirect = Some(email_redirect_to.to_owned());
        if inner
            .accounts
            .iter()
            .any(|a| a.user.email.as_deref() == Some(email))
        {
            return Err(AuthError::Rejected("User already registered".into()));
        }
        let user = ServiceUser { id: Uuid::new_v4(), email: Some(email.to_owned()) };
        let confirmed = inner.auto_confirm;
        inner.accounts.push(Account { user: user.clone(), password: password.to_owned(), confirmed });
        if confirmed { Ok(SignUpOutcome::SignedIn(issue(&mut inner, user))) } else { Ok(SignUpOutcome::ConfirmationRequired(user)) }
    }

    async fn get_user(&self, access_token: &str) -> Result<ServiceUser, AuthError> {
        self.check_online().map_err(AuthError::Transport)?;
        let inner = self.lock();
        inner
            .access_tokens
            .get(access_token)
            .and_then(|id| user_for(&inner, *id))
            .ok_or(AuthError::InvalidSession)
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        self.check_online().map_err(AuthError::Transport)?;
        let mut inner = self.lock();
        let id = inner
            .refresh_tokens
            .remove(refresh_token)
            .ok_or(AuthError::InvalidSession)?;
        let user = user_for(&inner, id).ok_or(AuthError::InvalidSession)?;
        Ok(issue(&mut inner, user))
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        self.check_online().map_err(AuthError::Transport)?;
        let mut inner = self.lock();
        let id = inner
            .access_tokens
            .remove(access_token)
            .ok_or(AuthError::InvalidSession)?;
        inner.access_tokens.retain(|_, uid| *uid != id);
        inner.refresh_tokens.retain(|_, uid| *uid != id);
        Ok(())
    }

    async fn select(&self, access_token: &str, query: &Query) -> Result<Vec<serde_json::Value>, DataError> {
        self.data_preflight(access_token)?;

        let gate = {
            let mut inner = self.lock();
            inner.selects += 1;
            query
                .filters()
                .iter()
                .find_map(|(_, value)| inner.gates.get(value).cloned())
        };
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        let inner = self.lock();
        let mut rows: Vec<serde_json::Value> = inner
            .tables
            .get(query.table_name())
            .map(|rows| {
                rows.iter()
                    .filter(|row| {
                        query
                            .filters()
                            .iter()
                            .all(|(col, value)| cell_text(row.get(col)) == *value)
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some((column, order)) = query.ordering() {
            rows.sort_by(|a, b| {
                let ord = cell_text(a.get(column)).cmp(&cell_text(b.get(column)));
                match order {
                    Order::Asc => ord,
                    Order::Desc => ord.reverse(),
                }
            });
        }
        Ok(rows)
    }

    async fn insert(
        &self,
        access_token: &str,
        table: &str,
        row: serde_json::Value,
    ) -> Result<serde_json::Value, DataError> {
        self.data_preflight(access_token)?;
        let mut inner = self.lock();
        if let Some(err) = inner.fail_next_insert.take() {
            return Err(err);
        }
        inner.inserts += 1;
        Ok(store_row(&mut inner, table, row))
    }
}
