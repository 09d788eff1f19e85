//! Builders to construct backends and the worker service from configuration.

use std::sync::Arc;

use anyhow::{anyhow, Context};

use crate::config::{
    PreferenceBackendConfig, TransportBackendConfig, WorkManagerConfig, SPOOL_STREAM,
};
use crate::core::{
    AppResult, DeviceState, ExecutionSink, JobScheduler, KeyValueStore, LaunchError,
    MessageSource, MessageTransport, OwnerLauncher, StoreError, TransportError,
};
use crate::infra::{
    in_memory_channel, CommandLauncher, FilePreferences, FileSpool, InMemoryPreferences,
    StaticDeviceState,
};
use crate::runtime::WorkerService;

/// Publishing and receiving ends of the configured transport.
pub struct TransportPair {
    /// Used by registering processes.
    pub publisher: Arc<dyn MessageTransport>,
    /// Polled by the owning process.
    pub source: Arc<dyn MessageSource>,
}

/// Build the configured preference store.
///
/// # Errors
/// The file store cannot be opened.
pub fn build_preferences(cfg: &WorkManagerConfig) -> Result<Arc<dyn KeyValueStore>, StoreError> {
    match &cfg.preferences {
        PreferenceBackendConfig::InMemory => Ok(Arc::new(InMemoryPreferences::new())),
        PreferenceBackendConfig::File { path } => Ok(Arc::new(FilePreferences::open(path)?)),
    }
}

/// Build the configured transport.
///
/// # Errors
/// The spool directory cannot be created.
pub fn build_transport(cfg: &WorkManagerConfig) -> Result<TransportPair, TransportError> {
    match &cfg.transport {
        TransportBackendConfig::InMemory => {
            let (publisher, subscriber) = in_memory_channel();
            Ok(TransportPair {
                publisher: Arc::new(publisher),
                source: Arc::new(subscriber),
            })
        }
        TransportBackendConfig::File { spool_dir } => {
            let spool = Arc::new(FileSpool::open(spool_dir, SPOOL_STREAM)?);
            Ok(TransportPair {
                publisher: Arc::clone(&spool) as Arc<dyn MessageTransport>,
                source: spool,
            })
        }
    }
}

/// Build the configured owner launcher.
///
/// # Errors
/// [`LaunchError::NotConfigured`] when no owner command is set.
pub fn build_launcher(cfg: &WorkManagerConfig) -> Result<Arc<dyn OwnerLauncher>, LaunchError> {
    Ok(Arc::new(CommandLauncher::from_argv(&cfg.owner_command)?))
}

/// Assembles a [`WorkerService`] from configuration and host collaborators.
pub struct WorkerServiceBuilder<S> {
    config: WorkManagerConfig,
    scheduler: Option<Arc<S>>,
    preferences: Option<Arc<dyn KeyValueStore>>,
    device: Option<Arc<dyn DeviceState>>,
    sink: Option<Arc<dyn ExecutionSink>>,
}

impl<S: JobScheduler> WorkerServiceBuilder<S> {
    /// Start from `config`.
    #[must_use]
    pub fn new(config: WorkManagerConfig) -> Self {
        Self {
            config,
            scheduler: None,
            preferences: None,
            device: None,
            sink: None,
        }
    }

    /// Host scheduler. Required.
    #[must_use]
    pub fn with_scheduler(mut self, scheduler: Arc<S>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Preference store, overriding the configured backend.
    #[must_use]
    pub fn with_preferences(mut self, preferences: Arc<dyn KeyValueStore>) -> Self {
        self.preferences = Some(preferences);
        self
    }

    /// Device state. Defaults to a full, non-charging battery.
    #[must_use]
    pub fn with_device_state(mut self, device: Arc<dyn DeviceState>) -> Self {
        self.device = Some(device);
        self
    }

    /// Business-logic sink. Required.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ExecutionSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Build the service. Does not call [`WorkerService::start`].
    ///
    /// # Errors
    /// Invalid configuration, a missing scheduler or sink, or a preference
    /// store that cannot be opened.
    pub fn build(self) -> AppResult<WorkerService<S>> {
        self.config
            .validate()
            .map_err(|e| anyhow!("config invalid: {e}"))?;
        let scheduler = self.scheduler.ok_or_else(|| anyhow!("a job scheduler is required"))?;
        let sink = self.sink.ok_or_else(|| anyhow!("an execution sink is required"))?;
        let preferences = match self.preferences {
            Some(preferences) => preferences,
            None => build_preferences(&self.config).context("opening preference store")?,
        };
        let device = self
            .device
            .unwrap_or_else(|| Arc::new(StaticDeviceState::default()) as Arc<dyn DeviceState>);
        Ok(WorkerService::new(
            scheduler,
            preferences,
            self.config.keys,
            device,
            sink,
        ))
    }
}
