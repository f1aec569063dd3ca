//! # Persistence Context
//!
//! [`EventStore`] is the data-access abstraction every other component talks
//! to. It exclusively owns all [`EventRecord`]s; callers only ever receive
//! clones.
//!
//! [`InMemoryEventStore`] is the memory-backed implementation. Its contents
//! live for the lifetime of the process.
//!
//! ## Concurrency
//!
//! The table sits behind a `parking_lot::RwLock`: concurrent readers proceed
//! in parallel and writers are serialized. The lock is never held across an
//! `.await`, so the store is safe to share between request handlers as an
//! `Arc<dyn EventStore>`. `parking_lot` locks do not poison, so a panicking
//! handler cannot wedge the table.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::StoreError;
use crate::event::{EventFields, EventId, EventRecord};

/// Whether a store's contents survive a process restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Durability {
    /// Contents vanish when the process exits.
    Volatile,
    /// Contents persist across restarts.
    Durable,
}

/// Typed access to the event record set.
///
/// All operations are synchronous and commit immediately. Implementations
/// must be safe for concurrent reads and must serialize concurrent writes.
pub trait EventStore: Send + Sync + 'static {
    /// Assign the next identifier to `fields` and commit the new record.
    fn insert(&self, fields: EventFields) -> Result<EventRecord, StoreError>;

    /// Insert several records in one commit. Either all are stored or none.
    fn insert_all(&self, batch: Vec<EventFields>) -> Result<Vec<EventRecord>, StoreError>;

    /// Fetch a record by identifier.
    fn get(&self, id: EventId) -> Result<Option<EventRecord>, StoreError>;

    /// All records, ordered by ascending identifier.
    fn list(&self) -> Result<Vec<EventRecord>, StoreError>;

    /// Replace every attribute of an existing record, keeping its identifier.
    /// Returns `None` when no record has that identifier.
    fn replace(&self, id: EventId, fields: EventFields)
        -> Result<Option<EventRecord>, StoreError>;

    /// Delete a record, returning it if it existed.
    fn remove(&self, id: EventId) -> Result<Option<EventRecord>, StoreError>;

    /// Number of stored records.
    fn count(&self) -> Result<usize, StoreError>;

    /// Whether this store's contents outlive the process.
    fn durability(&self) -> Durability;
}

#[derive(Debug)]
struct Table {
    next_id: u64,
    rows: BTreeMap<EventId, EventRecord>,
}

impl Table {
    fn allocate(&mut self) -> Result<EventId, StoreError> {
        let id = EventId::new(self.next_id);
        self.next_id = self
            .next_id
            .checked_add(1)
            .ok_or(StoreError::IdSpaceExhausted)?;
        Ok(id)
    }
}

/// Memory-backed [`EventStore`].
///
/// Cloning yields another handle to the same table.
#[derive(Debug, Clone)]
pub struct InMemoryEventStore {
    name: Arc<str>,
    table: Arc<RwLock<Table>>,
}

impl InMemoryEventStore {
    /// Name used when none is configured.
    pub const DEFAULT_NAME: &'static str = "EventDb";

    /// Create an empty store with the given database name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Arc::from(name.into()),
            table: Arc::new(RwLock::new(Table {
                next_id: 1,
                rows: BTreeMap::new(),
            })),
        }
    }

    /// Name of the in-memory database this store represents.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::named(Self::DEFAULT_NAME)
    }
}

impl EventStore for InMemoryEventStore {
    fn insert(&self, fields: EventFields) -> Result<EventRecord, StoreError> {
        let mut table = self.table.write();
        let id = table.allocate()?;
        let record = EventRecord::from_fields(id, fields);
        table.rows.insert(id, record.clone());
        Ok(record)
    }

    fn insert_all(&self, batch: Vec<EventFields>) -> Result<Vec<EventRecord>, StoreError> {
        let mut table = self.table.write();
        let start = table.next_id;
        let mut records = Vec::with_capacity(batch.len());
        for fields in batch {
            match table.allocate() {
                Ok(id) => records.push(EventRecord::from_fields(id, fields)),
                Err(err) => {
                    // Nothing has been written yet; rewind the counter.
                    table.next_id = start;
                    return Err(err);
                }
            }
        }
        for record in &records {
            table.rows.insert(record.id, record.clone());
        }
        Ok(records)
    }

    fn get(&self, id: EventId) -> Result<Option<EventRecord>, StoreError> {
        Ok(self.table.read().rows.get(&id).cloned())
    }

    fn list(&self) -> Result<Vec<EventRecord>, StoreError> {
        Ok(self.table.read().rows.values().cloned().collect())
    }

    fn replace(
        &self,
        id: EventId,
        fields: EventFields,
    ) -> Result<Option<EventRecord>, StoreError> {
        let mut table = self.table.write();
        Ok(table.rows.get_mut(&id).map(|row| {
            *row = EventRecord::from_fields(id, fields);
            row.clone()
        }))
    }

    fn remove(&self, id: EventId) -> Result<Option<EventRecord>, StoreError> {
        Ok(self.table.write().rows.remove(&id))
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.table.read().rows.len())
    }

    fn durability(&self) -> Durability {
        Durability::Volatile
    }
}
