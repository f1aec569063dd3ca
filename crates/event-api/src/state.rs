//! # Application State
//!
//! Shared state handed to every route handler.

use std::sync::Arc;

use event_core::EventStore;

use crate::config::AppConfig;

/// Shared application state passed to all route handlers.
///
/// Cloned per request; both fields are reference-counted.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EventStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn EventStore>, config: Arc<AppConfig>) -> Self {
        Self { store, config }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("environment", &self.config.environment)
            .field("database", &self.config.database_name)
            .finish_non_exhaustive()
    }
}
