//! File-backed preference store.
//!
//! The whole store is one JSON object shared by every process that opens the
//! same path. Nothing is cached: reads load the document from disk, and each
//! mutation re-reads it, applies one change, writes a sibling temp file and
//! renames it over the document. A sibling `.lock` file carries an advisory
//! OS lock (shared for reads, exclusive for mutations), so concurrent writers
//! in different processes never lose each other's keys.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::core::{KeyValueStore, StoreError};

type Document = BTreeMap<String, String>;

/// Preference store persisted as a JSON document.
#[derive(Debug)]
pub struct FilePreferences {
    path: PathBuf,
    lock_path: PathBuf,
    local: Mutex<()>,
}

fn io_err(e: &std::io::Error) -> StoreError {
    StoreError::Io(e.to_string())
}

fn read_document(path: &Path) -> Result<Document, StoreError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Document::new()),
        Err(e) => return Err(io_err(&e)),
    };
    if raw.trim().is_empty() {
        return Ok(Document::new());
    }
    serde_json::from_str(&raw).map_err(|e| StoreError::Codec(e.to_string()))
}

impl FilePreferences {
    /// Open the store at `path`, checking any existing document.
    ///
    /// # Errors
    /// The parent directory cannot be created or the document is unreadable.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| io_err(&e))?;
        }
        let store = Self {
            lock_path: path.with_extension("lock"),
            path,
            local: Mutex::new(()),
        };
        let keys = store.read(Document::len)?;
        tracing::debug!(path = %store.path.display(), keys, "opened preference file");
        Ok(store)
    }

    /// Location of the document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_file(&self) -> Result<File, StoreError> {
        OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(|e| io_err(&e))
    }

    fn read<T>(&self, f: impl FnOnce(&Document) -> T) -> Result<T, StoreError> {
        let _local = self.local.lock();
        let lock = self.lock_file()?;
        lock.lock_shared().map_err(|e| io_err(&e))?;
        let document = read_document(&self.path)?;
        Ok(f(&document))
    }

    /// Apply `change` to the current document; it returns whether anything
    /// changed and therefore needs writing.
    fn update(&self, change: impl FnOnce(&mut Document) -> bool) -> Result<(), StoreError> {
        let _local = self.local.lock();
        let lock = self.lock_file()?;
        lock.lock().map_err(|e| io_err(&e))?;
        let mut document = read_document(&self.path)?;
        if change(&mut document) {
            self.flush(&document)?;
        }
        Ok(())
    }

    fn flush(&self, values: &Document) -> Result<(), StoreError> {
        let encoded =
            serde_json::to_string_pretty(values).map_err(|e| StoreError::Codec(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp)
            .map_err(|e| io_err(&e))?;
        file.write_all(encoded.as_bytes()).map_err(|e| io_err(&e))?;
        file.sync_all().map_err(|e| io_err(&e))?;
        fs::rename(&tmp, &self.path).map_err(|e| io_err(&e))
    }
}

impl KeyValueStore for FilePreferences {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.read(|document| document.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.update(|document| {
            document.insert(key.to_owned(), value.to_owned()).as_deref() != Some(value)
        })
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.update(|document| document.remove(key).is_some())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        self.read(|document| document.keys().cloned().collect())
    }
}
