use std::sync::Mutex;

use crate::store::domain::count_store::{CountStore, StoreError};

/// In-process count record for runs that do not need the count on disk.
#[derive(Default)]
pub struct MemoryCountStore {
    value: Mutex<Option<String>>,
}

impl MemoryCountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CountStore for MemoryCountStore {
    fn write(&self, count: usize) -> Result<(), StoreError> {
        let mut value = self.value.lock().map_err(|_| StoreError::Poisoned)?;
        *value = Some(count.to_string());
        Ok(())
    }

    fn read(&self) -> Result<Option<String>, StoreError> {
        let value = self.value.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(value.clone())
    }
}
