//! Work manager configuration.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::{AppResult, KeyLayout};

/// Environment variable selecting a file-backed preference store.
pub const ENV_PREFERENCES_PATH: &str = "WORKMANAGER_PREFERENCES_PATH";
/// Environment variable selecting a file spool transport.
pub const ENV_SPOOL_DIR: &str = "WORKMANAGER_SPOOL_DIR";
/// Environment variable overriding the poll interval.
pub const ENV_POLL_INTERVAL_MS: &str = "WORKMANAGER_POLL_INTERVAL_MS";
/// Environment variable holding the whitespace-separated owner launch command.
pub const ENV_OWNER_COMMAND: &str = "WORKMANAGER_OWNER_COMMAND";

/// Default interval between message source polls.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

/// Spool stream name used by the file transport.
pub const SPOOL_STREAM: &str = "dispatch";

/// Preference store backend selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferenceBackendConfig {
    /// In-memory store for development/testing.
    #[default]
    InMemory,
    /// JSON document on disk.
    File {
        /// Document path.
        path: PathBuf,
    },
}

/// Message transport backend selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportBackendConfig {
    /// In-process channel.
    #[default]
    InMemory,
    /// JSON-lines spool directory shared between processes.
    File {
        /// Spool directory.
        spool_dir: PathBuf,
    },
}

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkManagerConfig {
    /// Preference store backend.
    pub preferences: PreferenceBackendConfig,
    /// Message transport backend.
    pub transport: TransportBackendConfig,
    /// Key naming inside the preference store.
    pub keys: KeyLayout,
    /// Interval between message source polls, in milliseconds.
    pub poll_interval_ms: u64,
    /// Program and arguments that start the owning process. Empty disables
    /// launching on `initialize`.
    pub owner_command: Vec<String>,
}

impl Default for WorkManagerConfig {
    fn default() -> Self {
        Self {
            preferences: PreferenceBackendConfig::default(),
            transport: TransportBackendConfig::default(),
            keys: KeyLayout::default(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            owner_command: Vec::new(),
        }
    }
}

impl WorkManagerConfig {
    /// Validate configuration values.
    ///
    /// # Errors
    /// A description of the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.poll_interval_ms == 0 {
            return Err("poll_interval_ms must be greater than 0".into());
        }
        if let PreferenceBackendConfig::File { path } = &self.preferences {
            if path.as_os_str().is_empty() {
                return Err("preferences path must not be empty".into());
            }
        }
        if let TransportBackendConfig::File { spool_dir } = &self.transport {
            if spool_dir.as_os_str().is_empty() {
                return Err("transport spool_dir must not be empty".into());
            }
        }
        if self.owner_command.first().is_some_and(|p| p.trim().is_empty()) {
            return Err("owner_command program must not be empty".into());
        }
        self.keys.validate().map_err(|e| format!("keys invalid: {e}"))
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    /// Parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from the process environment after reading any `.env` file.
    ///
    /// # Errors
    /// An unparseable variable or an invalid result.
    pub fn from_env() -> AppResult<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from a variable lookup; unset variables keep their defaults.
    ///
    /// # Errors
    /// An unparseable variable or an invalid result.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let mut cfg = Self::default();
        if let Some(path) = lookup(ENV_PREFERENCES_PATH).filter(|v| !v.is_empty()) {
            cfg.preferences = PreferenceBackendConfig::File { path: path.into() };
        }
        if let Some(dir) = lookup(ENV_SPOOL_DIR).filter(|v| !v.is_empty()) {
            cfg.transport = TransportBackendConfig::File {
                spool_dir: dir.into(),
            };
        }
        if let Some(raw) = lookup(ENV_POLL_INTERVAL_MS) {
            cfg.poll_interval_ms = raw
                .trim()
                .parse()
                .with_context(|| format!("invalid {ENV_POLL_INTERVAL_MS}: {raw}"))?;
        }
        if let Some(raw) = lookup(ENV_OWNER_COMMAND) {
            cfg.owner_command = raw.split_whitespace().map(str::to_string).collect();
        }
        cfg.validate().map_err(anyhow::Error::msg)?;
        Ok(cfg)
    }

    /// Poll interval as a duration.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
