//! File spool transport.
//!
//! Publishers append one JSON object per line to `<dir>/<stream>.jsonl`. The
//! owning process drains by renaming the file aside and reading the renamed
//! copy, so lines appended during a drain land in a fresh file.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use uuid::Uuid;

use crate::core::{Message, MessageSource, MessageTransport, TransportError};

/// Directory-backed message spool usable from several processes.
#[derive(Debug)]
pub struct FileSpool {
    dir: PathBuf,
    stream: String,
    guard: Mutex<()>,
}

fn backend(e: impl std::fmt::Display) -> TransportError {
    TransportError::Backend(e.to_string())
}

impl FileSpool {
    /// Open or create the spool `stream` inside `dir`.
    ///
    /// # Errors
    /// The directory cannot be created.
    pub fn open(dir: impl AsRef<Path>, stream: impl Into<String>) -> Result<Self, TransportError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(backend)?;
        Ok(Self {
            dir,
            stream: stream.into(),
            guard: Mutex::new(()),
        })
    }

    fn file_path(&self) -> PathBuf {
        self.dir.join(format!("{}.jsonl", self.stream))
    }

    fn read_lines(path: &Path) -> Result<Vec<Message>, TransportError> {
        let file = OpenOptions::new().read(true).open(path).map_err(backend)?;
        let mut messages = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(backend)?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(message) => messages.push(message),
                Err(e) => tracing::warn!(error = %e, "skipping malformed spool line"),
            }
        }
        Ok(messages)
    }
}

impl MessageTransport for FileSpool {
    fn publish(&self, message: &Message) -> Result<(), TransportError> {
        let line = serde_json::to_string(message).map_err(backend)?;
        let _guard = self.guard.lock();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.file_path())
            .map_err(|e| TransportError::Unreachable(e.to_string()))?;
        writeln!(file, "{line}").map_err(backend)
    }
}

impl MessageSource for FileSpool {
    fn poll(&self) -> Result<Vec<Message>, TransportError> {
        let _guard = self.guard.lock();
        let draining = self
            .dir
            .join(format!("{}.{}.draining", self.stream, Uuid::new_v4()));
        match fs::rename(self.file_path(), &draining) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(backend(e)),
        }
        let messages = Self::read_lines(&draining)?;
        fs::remove_file(&draining).map_err(backend)?;
        tracing::debug!(count = messages.len(), stream = %self.stream, "drained spool");
        Ok(messages)
    }
}
