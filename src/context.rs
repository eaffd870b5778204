//! Application context: one API client and the stores that share it.
//!
//! Views receive an `AppContext` (or a clone of one of its stores) instead of
//! reaching for globals, so tests can build as many isolated contexts as they
//! need.

#[cfg(test)]
#[path = "context_test.rs"]
mod context_test;

use std::sync::Arc;

use tracing::info;

use crate::config::{ClientConfig, ConfigError};
use crate::net::api::{ApiClient, AuthApi};
use crate::state::admin_ui::AdminUiStore;
use crate::state::session::SessionStore;
use crate::util::debounce::Debouncer;
use crate::util::ui_persistence::{FilePreferences, MemoryPreferences, PreferenceStore};

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ClientConfig>,
    pub api: Arc<ApiClient>,
    pub session: SessionStore,
    pub admin: AdminUiStore,
}

impl AppContext {
    /// Build the client and stores from `config`. Preferences live in the
    /// configured JSON file, or in memory when none is set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        let prefs: Arc<dyn PreferenceStore> = match &config.prefs_path {
            Some(path) => Arc::new(FilePreferences::open_or_empty(path.clone())),
            None => Arc::new(MemoryPreferences::new()),
        };
        let api = Arc::new(ApiClient::from_config(&config)?);
        Ok(Self::with_parts(config, api, prefs))
    }

    #[must_use]
    pub fn with_parts(config: ClientConfig, api: Arc<ApiClient>, prefs: Arc<dyn PreferenceStore>) -> Self {
        let auth: Arc<dyn AuthApi> = api.clone();
        Self {
            session: SessionStore::new(auth),
            admin: AdminUiStore::with_toast_duration(prefs, config.toast_duration_ms),
            config: Arc::new(config),
            api,
        }
    }

    /// Load saved preferences and resolve the session.
    pub async fn start(&self) {
        self.admin.init_theme();
        self.admin.init_sidebar();
        self.session.init_auth().await;
        info!(
            api_url = %self.config.api_url,
            authenticated = self.session.is_authenticated(),
            theme = %self.admin.theme(),
            "admin console ready"
        );
    }

    /// Debouncer for a list view's search box, using the configured window.
    #[must_use]
    pub fn search_debouncer<F>(&self, on_search: F) -> Debouncer
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        Debouncer::new(self.config.search_debounce(), on_search)
    }

    /// Return every store to its initial state and forget tokens.
    pub fn reset(&self) {
        self.api.clear_tokens();
        self.session.reset();
        self.admin.reset();
    }
}
