//! # Composition Root
//!
//! Builds every collaborator explicitly and hands them to the pipeline.
//!
//! ## Startup Sequence
//!
//! 1. **Persistence context**: named in-memory event store.
//! 2. **Seed**: insert the sample events before any request is accepted.
//! 3. **Validator**: HS256 JWT validator from the configured settings.
//! 4. **Formatters**: JSON (default) and CSV.
//! 5. **CORS policies**: standard rules with the configured default.
//! 6. **Exception filter**: panic details exposed in development only.
//! 7. **Pipeline**: assemble the route table behind the stages.

use std::sync::Arc;

use chrono::Utc;
use event_core::{seed_events, EventStore, InMemoryEventStore, SeedOutcome, StoreError};

use crate::auth::JwtValidator;
use crate::config::AppConfig;
use crate::cors::{CorsError, CorsPolicies};
use crate::filter::ExceptionFilter;
use crate::formatter::FormatterRegistry;
use crate::pipeline::{assemble, PipelineComponents, PipelineError, RouteTable};
use crate::routes;
use crate::state::AppState;

/// Errors during application composition.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// Seeding the persistence context failed.
    #[error("seeding event store failed: {0}")]
    Seed(#[from] StoreError),

    /// The configured default CORS policy does not exist.
    #[error("CORS configuration: {0}")]
    Cors(#[from] CorsError),

    /// The route table could not be assembled.
    #[error("route assembly: {0}")]
    Pipeline(#[from] PipelineError),
}

/// A fully wired application, ready to serve.
pub struct Application {
    pub router: axum::Router,
    pub store: Arc<dyn EventStore>,
    pub config: Arc<AppConfig>,
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Compose the application with the standard route table.
pub fn compose(config: AppConfig) -> Result<Application, BootstrapError> {
    let table = routes::table(config.environment);
    compose_with(config, table)
}

/// Compose the application serving `table`.
pub fn compose_with(config: AppConfig, table: RouteTable) -> Result<Application, BootstrapError> {
    let config = Arc::new(config);

    let store: Arc<dyn EventStore> =
        Arc::new(InMemoryEventStore::named(config.database_name.as_str()));
    match seed_events(store.as_ref(), Utc::now())? {
        SeedOutcome::Inserted(records) => tracing::info!(
            database = %config.database_name,
            records = records.len(),
            "event store ready"
        ),
        SeedOutcome::Skipped { existing } => tracing::info!(
            database = %config.database_name,
            existing,
            "event store ready, seed skipped"
        ),
    }

    let cors = CorsPolicies::standard().with_default(&config.cors_default_policy)?;
    let components = PipelineComponents {
        validator: JwtValidator::new(&config.jwt),
        formatters: Arc::new(FormatterRegistry::default()),
        cors: Arc::new(cors),
        filter: ExceptionFilter::new(config.environment.is_development()),
    };

    let state = AppState::new(store.clone(), config.clone());
    let router = assemble(&components, state, table)?;

    tracing::info!(
        environment = %config.environment,
        cors_default = %config.cors_default_policy,
        "application composed"
    );

    Ok(Application {
        router,
        store,
        config,
    })
}
