use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{DataPointStore, StoreError};
use crate::types::DataPoint;

/// Volatile store backed by a mutex-guarded vector.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<DataPoint>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> MutexGuard<'_, Vec<DataPoint>> {
        // 记录只做追加，毒化后内容仍然完整
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DataPointStore for MemoryStore {
    fn append(&self, data_point: &DataPoint) -> Result<(), StoreError> {
        self.records().push(*data_point);
        Ok(())
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.records().len())
    }

    fn all(&self) -> Result<Vec<DataPoint>, StoreError> {
        Ok(self.records().clone())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.records().clear();
        Ok(())
    }
}
