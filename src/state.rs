//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the hosted-service client and the parsed config. Nothing here is
//! per-user: sessions and screen state are built per request by the gate
//! and handlers.

use std::sync::Arc;

use crate::backend::Backend;
use crate::config::AppConfig;
use crate::services::session::CookieSettings;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn Backend>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, config: AppConfig) -> Self {
        Self { backend, config: Arc::new(config) }
    }

    #[must_use]
    pub fn cookie_settings(&self) -> CookieSettings {
        CookieSettings::from_config(&self.config)
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
