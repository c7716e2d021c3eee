//! Process configuration parsed from environment variables.
//!
//! SYSTEM CONTEXT
//! ==============
//! Startup builds one `AppConfig` before anything else. The hosted service
//! URL and public key are required: without them there is no session client,
//! so parsing fails and `main` exits instead of serving with a dead backend.

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SESSION_COOKIE_MAX_AGE_SECS: i64 = 7 * 24 * 60 * 60;
pub const DEFAULT_BACKEND_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_BACKEND_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required env var {var}: {hint}")]
    Missing { var: &'static str, hint: &'static str },
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

/// Connection settings for the hosted auth/database service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Base URL without trailing slash, e.g. `https://abc.supabase.co`.
    pub url: String,
    /// Public (anon) API key sent as `apikey` on every call.
    pub anon_key: String,
    pub timeouts: BackendTimeouts,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    /// Origin used to build absolute links handed to the auth service.
    pub public_origin: String,
    pub cookie_secure: bool,
    pub session_cookie_max_age_secs: i64,
    pub backend: BackendConfig,
}

impl AppConfig {
    /// Build typed config from environment variables.
    ///
    /// Required:
    /// - `SUPABASE_URL`
    /// - `SUPABASE_ANON_KEY`
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `PUBLIC_ORIGIN`: default `http://localhost:{PORT}`
    /// - `COOKIE_SECURE`: inferred from the `PUBLIC_ORIGIN` scheme
    /// - `SESSION_COOKIE_MAX_AGE_SECS`: default one week
    /// - `BACKEND_REQUEST_TIMEOUT_SECS`: default 30
    /// - `BACKEND_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value does
    /// not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = required("SUPABASE_URL", "set it to the hosted project URL")?;
        let url = parse_base_url(&url)?;
        let anon_key = required("SUPABASE_ANON_KEY", "set it to the project's public anon key")?;

        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| ConfigError::Invalid { var: "PORT", reason: e.to_string() })?,
            Err(_) => DEFAULT_PORT,
        };

        let public_origin = std::env::var("PUBLIC_ORIGIN")
            .ok()
            .map(|v| v.trim().trim_end_matches('/').to_owned())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| format!("http://localhost:{port}"));

        let cookie_secure = env_bool("COOKIE_SECURE").unwrap_or_else(|| public_origin.starts_with("https://"));

        let session_cookie_max_age_secs =
            env_parse("SESSION_COOKIE_MAX_AGE_SECS", DEFAULT_SESSION_COOKIE_MAX_AGE_SECS).max(1);

        let timeouts = BackendTimeouts {
            request_secs: env_parse("BACKEND_REQUEST_TIMEOUT_SECS", DEFAULT_BACKEND_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse("BACKEND_CONNECT_TIMEOUT_SECS", DEFAULT_BACKEND_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self {
            port,
            public_origin,
            cookie_secure,
            session_cookie_max_age_secs,
            backend: BackendConfig { url, anon_key, timeouts },
        })
    }

    /// Where the auth service sends users after they confirm their email.
    #[must_use]
    pub fn email_redirect_url(&self) -> String {
        format!("{}/auth/callback", self.public_origin)
    }
}

fn required(var: &'static str, hint: &'static str) -> Result<String, ConfigError> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing { var, hint })
}

fn parse_base_url(raw: &str) -> Result<String, ConfigError> {
    let url = raw.trim_end_matches('/');
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::Invalid { var: "SUPABASE_URL", reason: format!("expected http(s) URL, got '{raw}'") });
    }
    Ok(url.to_owned())
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
