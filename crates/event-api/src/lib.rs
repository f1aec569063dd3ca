//! # event-api — Event API Host
//!
//! Axum service over the event records of `event-core`. The composition
//! root ([`bootstrap::compose`]) wires an explicit set of collaborators into
//! one router:
//!
//! - `/api/events/*` — CRUD over event records, bearer-token protected
//! - `/swagger/*` — OpenAPI document and Swagger UI (development only)
//!
//! ## Request Pipeline (Tower)
//!
//! TraceLayer → Cors → Authentication → Format → ExceptionFilter → handler
//!
//! ## Crate Policy
//!
//! - No storage logic in route handlers: they delegate to `EventStore`.
//! - All errors map to the structured body of [`AppError`].
//! - Configuration is read once into an immutable [`config::AppConfig`].

pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod cors;
pub mod error;
pub mod extractors;
pub mod filter;
pub mod formatter;
pub mod openapi;
pub mod pipeline;
pub mod routes;
pub mod state;

pub use bootstrap::{compose, compose_with, Application};
pub use error::AppError;
pub use state::AppState;
