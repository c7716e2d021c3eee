//! Sign-in and sign-up form flows.
//!
//! Validation that can be done locally (email shape, password policy) runs
//! before any network round-trip. Service rejections come back as
//! `FormError::Auth` carrying the service's user-facing message.

use serde::Deserialize;

use crate::backend::{AuthError, Backend, SignUpOutcome};
use crate::services::password::{self, PolicyViolation};
use crate::services::session::{SessionHandle, SessionTokens};

const SERVICE_UNAVAILABLE_MESSAGE: &str = "Could not reach the authentication service. Please try again.";

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Password is required")]
    MissingPassword,
    #[error(transparent)]
    Policy(#[from] PolicyViolation),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl FormError {
    /// Text to show inline on the form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Auth(AuthError::Transport(_) | AuthError::UnexpectedResponse(_)) => SERVICE_UNAVAILABLE_MESSAGE.to_owned(),
            Self::Auth(AuthError::InvalidSession) => "Your session has expired. Please sign in again.".to_owned(),
            other => other.to_string(),
        }
    }
}

#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    let (local, domain) = normalized.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return None;
    }
    Some(normalized)
}

/// Sign in and adopt the session on `session`.
///
/// # Errors
///
/// Returns a form error for a malformed email or empty password, or the
/// auth service's rejection.
pub async fn sign_in(session: &SessionHandle, credentials: &Credentials) -> Result<SessionTokens, FormError> {
    let email = normalize_email(&credentials.email).ok_or(FormError::InvalidEmail)?;
    if credentials.password.is_empty() {
        return Err(FormError::MissingPassword);
    }

    let tokens = session.sign_in(&email, &credentials.password).await?;
    tracing::info!(%email, "user signed in");
    Ok(tokens)
}

/// Register a new account. The password policy is checked first; nothing
/// is sent to the service when it fails.
///
/// # Errors
///
/// Returns the first policy violation, a malformed-email error, or the
/// auth service's rejection.
pub async fn sign_up(
    backend: &dyn Backend,
    credentials: &Credentials,
    email_redirect_to: &str,
) -> Result<SignUpOutcome, FormError> {
    let email = normalize_email(&credentials.email).ok_or(FormError::InvalidEmail)?;
    password::validate_password(&credentials.password)?;

    let outcome = backend
        .sign_up(&email, &credentials.password, email_redirect_to)
        .await?;
    tracing::info!(%email, "account registered");
    Ok(outcome)
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
