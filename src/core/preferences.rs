//! Persistent string-keyed preference store abstraction.

use serde::{Deserialize, Serialize};

use super::error::StoreError;

/// Host preference store. Values written must survive process exit.
pub trait KeyValueStore: Send + Sync {
    /// Read a value.
    ///
    /// # Errors
    /// Backend read failures.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    /// Backend write failures.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove a value. Removing a missing key is not an error.
    ///
    /// # Errors
    /// Backend write failures.
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// All keys currently present.
    ///
    /// # Errors
    /// Backend read failures.
    fn keys(&self) -> Result<Vec<String>, StoreError>;
}

/// Dispatcher handle and debug flag recorded by `initialize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherRecord {
    /// Opaque handle locating the business-logic entry point.
    pub handle: i64,
    /// Diagnostic flag.
    pub debug_mode: bool,
}

impl DispatcherRecord {
    /// Load the record stored under `key`.
    ///
    /// # Errors
    /// Backend failures, or a stored value that is not a valid record.
    pub fn load(store: &dyn KeyValueStore, key: &str) -> Result<Option<Self>, StoreError> {
        store
            .get(key)?
            .map(|raw| serde_json::from_str(&raw).map_err(|e| StoreError::Codec(e.to_string())))
            .transpose()
    }

    /// Store this record under `key`.
    ///
    /// # Errors
    /// Backend write failures.
    pub fn save(&self, store: &dyn KeyValueStore, key: &str) -> Result<(), StoreError> {
        let raw = serde_json::to_string(self).map_err(|e| StoreError::Codec(e.to_string()))?;
        store.set(key, &raw)
    }
}
