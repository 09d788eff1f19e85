//! In-memory preference store.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::core::{KeyValueStore, StoreError};

/// Preference store kept in process memory. Contents do not survive exit.
#[derive(Debug, Default)]
pub struct InMemoryPreferences {
    values: RwLock<BTreeMap<String, String>>,
}

impl InMemoryPreferences {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

impl KeyValueStore for InMemoryPreferences {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.write().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.values.write().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.values.read().keys().cloned().collect())
    }
}
