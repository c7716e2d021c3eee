//! Local password policy applied before sign-up reaches the auth service.
//!
//! Rules run in a fixed order and only the first violation is reported, so
//! the user fixes one thing at a time.

pub const MIN_LENGTH: usize = 8;
pub const SPECIAL_CHARS: &str = "!@#$%^&*";

/// Shown under the sign-up form.
pub const POLICY_HINT: &str =
    "Password must be at least 8 characters long and contain uppercase, lowercase, number, and special character.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PolicyViolation {
    #[error("Password must be at least 8 characters long")]
    TooShort,
    #[error("Password must contain at least one uppercase letter")]
    MissingUppercase,
    #[error("Password must contain at least one lowercase letter")]
    MissingLowercase,
    #[error("Password must contain at least one number")]
    MissingNumber,
    #[error("Password must contain at least one special character")]
    MissingSpecialChar,
}

/// Check `password` against the policy.
///
/// # Errors
///
/// Returns the first rule the password breaks, in the order length,
/// uppercase, lowercase, number, special character.
pub fn validate_password(password: &str) -> Result<(), PolicyViolation> {
    if password.chars().count() < MIN_LENGTH {
        return Err(PolicyViolation::TooShort);
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(PolicyViolation::MissingUppercase);
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(PolicyViolation::MissingLowercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(PolicyViolation::MissingNumber);
    }
    if !password.chars().any(|c| SPECIAL_CHARS.contains(c)) {
        return Err(PolicyViolation::MissingSpecialChar);
    }
    Ok(())
}

#[cfg(test)]
#[path = "password_test.rs"]
mod tests;
