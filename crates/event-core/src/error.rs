//! # Error Types
//!
//! Errors raised by the persistence context. The memory-backed store only
//! fails when its identifier space runs out; `Unavailable` exists for store
//! implementations that sit in front of a real database.

use thiserror::Error;

/// Failure of a persistence context operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No further identifiers can be assigned.
    #[error("event identifier space exhausted")]
    IdSpaceExhausted,

    /// The backing store could not serve the request.
    #[error("event store unavailable: {0}")]
    Unavailable(String),
}
