//! Per-name mutual exclusion.
//!
//! Operations on the same unique name are serialized; operations on different
//! names only share the brief table lookup. Locks are re-entrant so the
//! adapter can hold a name across a composite operation while the job store
//! takes the same lock underneath it. A name's entry lives only while some
//! caller holds or waits for it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};

type NameLock = Arc<ReentrantMutex<()>>;

/// Shared table of per-name locks.
#[derive(Debug, Default, Clone)]
pub struct NameLocks {
    table: Arc<Mutex<HashMap<String, NameLock>>>,
}

impl NameLocks {
    /// Empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` holding the lock for `name`.
    pub fn with<T>(&self, name: &str, f: impl FnOnce() -> T) -> T {
        let lock = self.acquire(name);
        let result = {
            let _guard = lock.lock();
            f()
        };
        self.release(name, lock);
        result
    }

    fn acquire(&self, name: &str) -> NameLock {
        let mut table = self.table.lock();
        Arc::clone(
            table
                .entry(name.to_owned())
                .or_insert_with(|| Arc::new(ReentrantMutex::new(()))),
        )
    }

    // Handles are only cloned under the table lock, so a count of two (the
    // table's and ours) means nobody else holds or waits on this name.
    fn release(&self, name: &str, lock: NameLock) {
        let mut table = self.table.lock();
        if Arc::strong_count(&lock) == 2 {
            table.remove(name);
        }
    }

    /// Number of names currently held or awaited.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    /// Whether no names are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
