//! # event-core — Event Records and their Persistence Context
//!
//! Web-framework-free building blocks of the Event API:
//!
//! - [`event`] — the [`EventRecord`] entity and its caller-controlled
//!   [`EventFields`].
//! - [`store`] — the [`EventStore`] data-access trait and the memory-backed
//!   [`InMemoryEventStore`].
//! - [`seed`] — the fixed demonstration records inserted at startup.
//!
//! Enable the `schema` feature to derive `utoipa::ToSchema` on the public
//! record types.

pub mod error;
pub mod event;
pub mod seed;
pub mod store;

pub use error::StoreError;
pub use event::{EventFields, EventId, EventRecord};
pub use seed::{sample_events, seed_events, SeedOutcome};
pub use store::{Durability, EventStore, InMemoryEventStore};
