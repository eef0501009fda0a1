//! Append-only record storage.
//!
//! Every backend serializes its own access: an append, count, load or clear
//! never observes another one half-done.

pub mod memory;

pub use memory::MemoryStore;

use crate::types::DataPoint;

/// Failures surfaced by a [`DataPointStore`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("Storage open error: {0}")]
    Open(String),
    #[error("Storage write error: {0}")]
    Write(String),
    #[error("Storage read error: {0}")]
    Read(String),
    #[error("Storage handler disconnected")]
    Disconnected,
}

/// An ordered, appendable log of [`DataPoint`]s.
pub trait DataPointStore: Send + Sync {
    /// Persist one record at the end of the log. A rejected record is dropped.
    fn append(&self, data_point: &DataPoint) -> Result<(), StoreError>;

    /// Number of persisted records.
    fn count(&self) -> Result<usize, StoreError>;

    /// Every record in append order. Each call performs a fresh read.
    fn all(&self) -> Result<Vec<DataPoint>, StoreError>;

    /// Delete every record. Clearing an empty store succeeds.
    fn clear(&self) -> Result<(), StoreError>;
}
