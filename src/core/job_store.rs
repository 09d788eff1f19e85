//! Persisted job store.
//!
//! Each task keeps two entries in the preference store: the raw payload under
//! `<payload_prefix><name>` and the JSON descriptor under
//! `<descriptor_prefix><name>`. One reserved key holds the dispatcher record.
//! Every per-name operation runs under that name's lock.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::adapter::map_fault;
use super::descriptor::TaskDescriptor;
use super::error::{SchedulerError, StoreError};
use super::locks::NameLocks;
use super::preferences::{DispatcherRecord, KeyValueStore};
use super::scheduler::JobScheduler;

/// Key naming inside the preference store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyLayout {
    /// Prefix of payload entries.
    pub payload_prefix: String,
    /// Prefix of descriptor entries.
    pub descriptor_prefix: String,
    /// Reserved key of the dispatcher record.
    pub dispatcher_key: String,
}

impl Default for KeyLayout {
    fn default() -> Self {
        Self {
            payload_prefix: "WmPayload_".into(),
            descriptor_prefix: "WmDescriptor_".into(),
            dispatcher_key: "WMANAGER_DISPATCHER_HANDLE_KEY".into(),
        }
    }
}

impl KeyLayout {
    /// Payload key for `name`.
    #[must_use]
    pub fn payload_key(&self, name: &str) -> String {
        format!("{}{name}", self.payload_prefix)
    }

    /// Descriptor key for `name`.
    #[must_use]
    pub fn descriptor_key(&self, name: &str) -> String {
        format!("{}{name}", self.descriptor_prefix)
    }

    /// Task name owning `key`, if `key` is a payload or descriptor entry.
    #[must_use]
    pub fn task_name<'a>(&self, key: &'a str) -> Option<&'a str> {
        key.strip_prefix(self.payload_prefix.as_str())
            .or_else(|| key.strip_prefix(self.descriptor_prefix.as_str()))
    }

    /// Validate that the three namespaces cannot collide.
    ///
    /// # Errors
    /// A description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.payload_prefix.is_empty() || self.descriptor_prefix.is_empty() {
            return Err("key prefixes must not be empty".into());
        }
        if self.payload_prefix.starts_with(&self.descriptor_prefix)
            || self.descriptor_prefix.starts_with(&self.payload_prefix)
        {
            return Err("payload and descriptor prefixes must not overlap".into());
        }
        if self.dispatcher_key.is_empty() || self.task_name(&self.dispatcher_key).is_some() {
            return Err("dispatcher key must be non-empty and outside the task namespaces".into());
        }
        Ok(())
    }
}

/// A task's persisted payload and descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedJobRecord {
    /// Payload handed to the sink when the job runs.
    pub payload: String,
    /// Descriptor used to re-register the job after a restart.
    pub descriptor: TaskDescriptor,
}

/// Key-value persistence of task payloads and descriptors.
pub struct JobStore<S> {
    kv: Arc<dyn KeyValueStore>,
    scheduler: Arc<S>,
    locks: NameLocks,
    layout: KeyLayout,
}

impl<S> Clone for JobStore<S> {
    fn clone(&self) -> Self {
        Self {
            kv: Arc::clone(&self.kv),
            scheduler: Arc::clone(&self.scheduler),
            locks: self.locks.clone(),
            layout: self.layout.clone(),
        }
    }
}

impl<S: JobScheduler> JobStore<S> {
    /// Create a store over `kv`, enumerating jobs through `scheduler`.
    pub fn new(kv: Arc<dyn KeyValueStore>, scheduler: Arc<S>, layout: KeyLayout) -> Self {
        Self {
            kv,
            scheduler,
            locks: NameLocks::new(),
            layout,
        }
    }

    /// Per-name lock table shared with the adapter.
    #[must_use]
    pub const fn locks(&self) -> &NameLocks {
        &self.locks
    }

    /// Key layout in use.
    #[must_use]
    pub const fn layout(&self) -> &KeyLayout {
        &self.layout
    }

    /// Underlying preference store.
    #[must_use]
    pub fn preferences(&self) -> Arc<dyn KeyValueStore> {
        Arc::clone(&self.kv)
    }

    /// Persist `payload` and `descriptor` under `name`, replacing any record.
    ///
    /// # Errors
    /// Encoding or backend failures.
    pub fn put(
        &self,
        name: &str,
        payload: &str,
        descriptor: &TaskDescriptor,
    ) -> Result<(), StoreError> {
        let encoded =
            serde_json::to_string(descriptor).map_err(|e| StoreError::Codec(e.to_string()))?;
        self.locks.with(name, || -> Result<(), StoreError> {
            self.kv.set(&self.layout.payload_key(name), payload)?;
            self.kv.set(&self.layout.descriptor_key(name), &encoded)?;
            tracing::debug!(job = name, "persisted job record");
            Ok(())
        })
    }

    /// Full record for `name`, if both entries are present.
    ///
    /// # Errors
    /// Backend failures or an undecodable descriptor.
    pub fn get(&self, name: &str) -> Result<Option<PersistedJobRecord>, StoreError> {
        let (payload, descriptor) = self.locks.with(name, || {
            Ok::<_, StoreError>((
                self.kv.get(&self.layout.payload_key(name))?,
                self.kv.get(&self.layout.descriptor_key(name))?,
            ))
        })?;
        match (payload, descriptor) {
            (Some(payload), Some(raw)) => {
                let descriptor =
                    serde_json::from_str(&raw).map_err(|e| StoreError::Codec(e.to_string()))?;
                Ok(Some(PersistedJobRecord { payload, descriptor }))
            }
            (None, None) => Ok(None),
            _ => {
                tracing::warn!(job = name, "incomplete job record");
                Ok(None)
            }
        }
    }

    /// Payload for `name`.
    ///
    /// # Errors
    /// Backend failures.
    pub fn get_payload(&self, name: &str) -> Result<Option<String>, StoreError> {
        self.locks.with(name, || self.kv.get(&self.layout.payload_key(name)))
    }

    /// Remove the record for `name`. Missing records are fine.
    ///
    /// # Errors
    /// Backend failures.
    pub fn delete(&self, name: &str) -> Result<(), StoreError> {
        self.locks.with(name, || -> Result<(), StoreError> {
            self.kv.remove(&self.layout.payload_key(name))?;
            self.kv.remove(&self.layout.descriptor_key(name))?;
            tracing::debug!(job = name, "deleted job record");
            Ok(())
        })
    }

    /// Remove every task record, one name at a time. Returns how many names
    /// were removed. The dispatcher record is kept.
    ///
    /// # Errors
    /// Backend failures; records removed before the failure stay removed.
    pub fn delete_all(&self) -> Result<usize, StoreError> {
        let names = self.record_names()?;
        for name in &names {
            self.delete(name)?;
        }
        Ok(names.len())
    }

    /// Names with at least one persisted entry.
    ///
    /// # Errors
    /// Backend failures.
    pub fn record_names(&self) -> Result<BTreeSet<String>, StoreError> {
        Ok(self
            .kv
            .keys()?
            .iter()
            .filter_map(|key| self.layout.task_name(key))
            .map(str::to_owned)
            .collect())
    }

    /// Names the scheduler currently has scheduled.
    ///
    /// # Errors
    /// Scheduler enumeration failure.
    pub fn list_names(&self) -> Result<BTreeSet<String>, SchedulerError> {
        self.scheduler
            .job_ids()
            .map(|ids| ids.into_iter().collect())
            .map_err(|fault| map_fault("*", &fault))
    }

    /// Dispatcher record stored by `initialize`.
    ///
    /// # Errors
    /// Backend failures or an undecodable record.
    pub fn dispatcher(&self) -> Result<Option<DispatcherRecord>, StoreError> {
        DispatcherRecord::load(self.kv.as_ref(), &self.layout.dispatcher_key)
    }

    /// Store the dispatcher record under the reserved key.
    ///
    /// # Errors
    /// Backend failures.
    pub fn save_dispatcher(&self, record: &DispatcherRecord) -> Result<(), StoreError> {
        record.save(self.kv.as_ref(), &self.layout.dispatcher_key)
    }
}
