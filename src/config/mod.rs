//! Configuration models for backends, key layout, polling and owner launch.

pub mod manager;

pub use manager::{
    PreferenceBackendConfig, TransportBackendConfig, WorkManagerConfig, DEFAULT_POLL_INTERVAL_MS,
    ENV_OWNER_COMMAND, ENV_POLL_INTERVAL_MS, ENV_PREFERENCES_PATH, ENV_SPOOL_DIR, SPOOL_STREAM,
};
