//! Registering-process side: argument parsing, the initialization gate and
//! command dispatch.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use super::api::{CallResult, MethodCall};
use crate::core::{
    encode, parse_command, Command, DispatcherRecord, KeyValueStore, MessageTransport,
    OwnerLauncher, StoreError, WorkError,
};

/// Delivers parsed commands to whatever owns the scheduler.
pub trait CommandDispatcher: Send + Sync {
    /// Deliver one command.
    ///
    /// # Errors
    /// The command could not be delivered or, for in-process delivery,
    /// could not be applied.
    fn dispatch(&self, command: &Command) -> Result<(), WorkError>;
}

impl<T: CommandDispatcher + ?Sized> CommandDispatcher for Arc<T> {
    fn dispatch(&self, command: &Command) -> Result<(), WorkError> {
        (**self).dispatch(command)
    }
}

/// Dispatcher that encodes commands and publishes them on a transport.
#[derive(Debug, Clone)]
pub struct RemoteDispatcher<T> {
    transport: T,
}

impl<T: MessageTransport> RemoteDispatcher<T> {
    /// Dispatcher over `transport`.
    pub const fn new(transport: T) -> Self {
        Self { transport }
    }
}

impl<T: MessageTransport> CommandDispatcher for RemoteDispatcher<T> {
    fn dispatch(&self, command: &Command) -> Result<(), WorkError> {
        let message = encode(command);
        match self.transport.publish(&message) {
            Ok(()) => {
                info!(
                    method = command.method_name(),
                    message_id = message.message_id().unwrap_or_default(),
                    "published dispatch message"
                );
                Ok(())
            }
            Err(err) => {
                warn!(
                    method = command.method_name(),
                    error = %err,
                    "failed to publish dispatch message"
                );
                Err(err.into())
            }
        }
    }
}

/// Registering-process facade.
pub struct WorkManager<D> {
    dispatcher: D,
    preferences: Arc<dyn KeyValueStore>,
    dispatcher_key: String,
    launcher: Option<Arc<dyn OwnerLauncher>>,
}

impl<D: CommandDispatcher> WorkManager<D> {
    /// Facade recording the dispatcher handle in `preferences` under
    /// `dispatcher_key`.
    pub fn new(
        dispatcher: D,
        preferences: Arc<dyn KeyValueStore>,
        dispatcher_key: impl Into<String>,
    ) -> Self {
        Self {
            dispatcher,
            preferences,
            dispatcher_key: dispatcher_key.into(),
            launcher: None,
        }
    }

    /// Start the owning process through `launcher` on `initialize` when it
    /// is not already running.
    #[must_use]
    pub fn with_launcher(mut self, launcher: Arc<dyn OwnerLauncher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    /// The underlying dispatcher.
    #[must_use]
    pub const fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    /// Whether `initialize` has been recorded.
    ///
    /// # Errors
    /// Preference store failures.
    pub fn is_initialized(&self) -> Result<bool, StoreError> {
        Ok(DispatcherRecord::load(self.preferences.as_ref(), &self.dispatcher_key)?.is_some())
    }

    /// Handle one inbound call.
    ///
    /// # Errors
    /// `invalid-argument`, `not-initialized` or `operation-failed`.
    pub fn handle_call(&self, call: &MethodCall) -> CallResult {
        self.execute(&call.method, &call.arguments).map_err(Into::into)
    }

    /// Parse, gate and dispatch one call.
    ///
    /// `initialize` records the dispatcher handle and starts the owning
    /// process if a launcher is set and the owner is down. Every
    /// registration, one-off and periodic alike, needs that record first.
    /// Cancellation is never gated.
    ///
    /// # Errors
    /// See [`WorkError`]. Launch failures are logged, not returned.
    pub fn execute(&self, method: &str, arguments: &Value) -> Result<(), WorkError> {
        let command = parse_command(method, arguments)?;
        match &command {
            Command::Initialize(init) => {
                let record = DispatcherRecord {
                    handle: init.dispatcher_handle,
                    debug_mode: init.debug_mode,
                };
                record.save(self.preferences.as_ref(), &self.dispatcher_key)?;
                info!(debug_mode = init.debug_mode, "work manager initialized");
                self.ensure_owner_running();
            }
            Command::Register(descriptor) => {
                if !self.is_initialized()? {
                    warn!(job = %descriptor.unique_name, "registration before initialize");
                    return Err(WorkError::NotInitialized);
                }
            }
            Command::Cancel(_) => {}
        }
        self.dispatcher.dispatch(&command)
    }

    fn ensure_owner_running(&self) {
        let Some(launcher) = &self.launcher else {
            return;
        };
        if launcher.is_running() {
            return;
        }
        match launcher.launch() {
            Ok(()) => info!("requested owner process launch"),
            Err(err) => warn!(error = %err, "failed to launch owner process"),
        }
    }
}
