//! # Startup Seeding
//!
//! Inserts the two demonstration events once, after the persistence context
//! is built and before the server accepts requests.
//!
//! Against a [`Durability::Volatile`] store the seed is inserted
//! unconditionally, so every process start begins with exactly the two
//! sample records. Against a [`Durability::Durable`] store that would
//! duplicate rows on every restart, so seeding only runs when the store is
//! empty.

use chrono::{DateTime, Duration, Utc};

use crate::error::StoreError;
use crate::event::{EventFields, EventRecord};
use crate::store::{Durability, EventStore};

/// Result of a seeding pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The sample events were inserted.
    Inserted(Vec<EventRecord>),
    /// A durable store already held records; nothing was written.
    Skipped { existing: usize },
}

/// The fixed demonstration events, dated relative to `now`.
pub fn sample_events(now: DateTime<Utc>) -> Vec<EventFields> {
    vec![
        EventFields {
            title: "Sample Event1".to_string(),
            start_date: now,
            end_date: now + Duration::days(2),
            start_time: "9:00 AM".to_string(),
            end_time: "5:00 PM".to_string(),
            host: "Microsoft".to_string(),
            speaker: "Rajni".to_string(),
            registration_url: "https://events.microsoft.com/3223".to_string(),
        },
        EventFields {
            title: "Sample Event2".to_string(),
            start_date: now,
            end_date: now + Duration::days(3),
            start_time: "9:00 AM".to_string(),
            end_time: "5:00 PM".to_string(),
            host: "Goggle".to_string(),
            speaker: "Rahul".to_string(),
            registration_url: "https://events.microsoft.com/3226".to_string(),
        },
    ]
}

/// Seed `store` with [`sample_events`] in a single commit.
pub fn seed_events(
    store: &dyn EventStore,
    now: DateTime<Utc>,
) -> Result<SeedOutcome, StoreError> {
    if store.durability() == Durability::Durable {
        let existing = store.count()?;
        if existing > 0 {
            tracing::info!(existing, "durable event store already populated, skipping seed");
            return Ok(SeedOutcome::Skipped { existing });
        }
    }

    let records = store.insert_all(sample_events(now))?;
    tracing::info!(inserted = records.len(), "seeded sample events");
    Ok(SeedOutcome::Inserted(records))
}
