//! Owning-process side: applies commands against the scheduler adapter and
//! routes lifecycle callbacks through the bridge.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::client::CommandDispatcher;
use crate::core::{
    decode, BridgeOutcome, CallbackBridge, CancelRequest, Command, DeviceState, DispatcherRecord,
    ExecutionSink, JobScheduler, JobSchedulerAdapter, JobService, JobStore, KeyLayout,
    KeyValueStore, Message, MessageSource, Registration, TransportError, WorkError,
};

/// Where a command came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Same process; errors are returned to the caller.
    Local,
    /// Decoded from a dispatch message; errors are only logged.
    Remote,
}

/// What applying a command did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The dispatcher record was stored.
    Initialized,
    /// The task went through the scheduler adapter.
    Registered(Registration),
    /// A cross-process one-off task went straight to the bridge.
    Bridged(BridgeOutcome),
    /// This many scheduled jobs were cancelled. Tag cancellation, and
    /// cancelling a name that was not scheduled, report zero.
    Cancelled(usize),
}

/// Owning-process composition root.
pub struct WorkerService<S: JobScheduler> {
    adapter: JobSchedulerAdapter<S>,
    bridge: Arc<CallbackBridge<S>>,
}

impl<S: JobScheduler> WorkerService<S> {
    /// Assemble the adapter, job store and bridge around `scheduler`.
    pub fn new(
        scheduler: Arc<S>,
        preferences: Arc<dyn KeyValueStore>,
        layout: KeyLayout,
        device: Arc<dyn DeviceState>,
        sink: Arc<dyn ExecutionSink>,
    ) -> Self {
        let store = JobStore::new(preferences, Arc::clone(&scheduler), layout);
        let bridge = Arc::new(CallbackBridge::new(store.clone(), device, sink));
        Self {
            adapter: JobSchedulerAdapter::new(scheduler, store),
            bridge,
        }
    }

    /// Scheduler adapter.
    #[must_use]
    pub const fn adapter(&self) -> &JobSchedulerAdapter<S> {
        &self.adapter
    }

    /// Job store.
    #[must_use]
    pub const fn store(&self) -> &JobStore<S> {
        self.adapter.store()
    }

    /// Callback bridge.
    #[must_use]
    pub const fn bridge(&self) -> &Arc<CallbackBridge<S>> {
        &self.bridge
    }

    fn callback(&self) -> Arc<dyn JobService> {
        Arc::clone(&self.bridge) as Arc<dyn JobService>
    }

    /// Reattach the bridge to every persisted, still-scheduled job. Call once
    /// when the owning process starts.
    ///
    /// # Errors
    /// Scheduler enumeration or store failures.
    pub fn start(&self) -> Result<usize, WorkError> {
        let attached = self.adapter.reattach(&self.callback())?;
        info!(attached, "worker service started");
        Ok(attached)
    }

    /// Record the sink's one-time "initialized" acknowledgment.
    pub fn acknowledge_initialized(&self) {
        self.bridge.acknowledge_initialized();
    }

    /// Apply one command.
    ///
    /// Remote one-off registrations are checked against the device state and
    /// dispatched at once; every other registration goes through the
    /// scheduler.
    ///
    /// # Errors
    /// Store, scheduler or argument failures.
    pub fn apply(&self, command: Command, origin: Origin) -> Result<Applied, WorkError> {
        match command {
            Command::Initialize(init) => {
                self.store().save_dispatcher(&DispatcherRecord {
                    handle: init.dispatcher_handle,
                    debug_mode: init.debug_mode,
                })?;
                Ok(Applied::Initialized)
            }
            Command::Register(descriptor)
                if origin == Origin::Remote && !descriptor.is_periodic() =>
            {
                debug!(job = %descriptor.unique_name, "one-off task from another process");
                Ok(Applied::Bridged(self.bridge.dispatch_decoded(&descriptor)))
            }
            Command::Register(descriptor) => {
                let outcome = self.adapter.register(&descriptor, Some(self.callback()))?;
                if outcome != Registration::KeptExisting {
                    self.bridge.track(&descriptor.unique_name);
                }
                Ok(Applied::Registered(outcome))
            }
            Command::Cancel(CancelRequest::ByUniqueName(name)) => {
                let cancelled = self.adapter.cancel_by_name(&name)?;
                self.bridge.forget(&name);
                Ok(Applied::Cancelled(usize::from(cancelled)))
            }
            Command::Cancel(CancelRequest::ByTag(tag)) => {
                self.adapter.cancel_by_tag(&tag)?;
                Ok(Applied::Cancelled(0))
            }
            Command::Cancel(CancelRequest::All) => {
                let cancelled = self.adapter.cancel_all()?;
                self.bridge.forget_all();
                Ok(Applied::Cancelled(cancelled))
            }
        }
    }

    /// Decode and apply one dispatch message. Failures are logged; there is
    /// nobody to return them to.
    pub fn handle_message(&self, message: &Message) -> Option<Applied> {
        let message_id = message.message_id().unwrap_or_default();
        let command = match decode(message) {
            Ok(command) => command,
            Err(err) => {
                warn!(message_id, error = %err, "dropping undecodable dispatch message");
                return None;
            }
        };
        let method = command.method_name();
        match self.apply(command, Origin::Remote) {
            Ok(applied) => {
                debug!(message_id, method, applied = ?applied, "applied dispatch message");
                Some(applied)
            }
            Err(err) => {
                warn!(
                    message_id,
                    method,
                    code = %err.code(),
                    error = %err,
                    "dispatch message failed"
                );
                None
            }
        }
    }

    /// Drain `source` once. Returns how many messages were received.
    ///
    /// # Errors
    /// The source failed.
    pub fn pump(&self, source: &dyn MessageSource) -> Result<usize, TransportError> {
        let messages = source.poll()?;
        for message in &messages {
            let _ = self.handle_message(message);
        }
        Ok(messages.len())
    }
}

impl<S: JobScheduler> CommandDispatcher for WorkerService<S> {
    fn dispatch(&self, command: &Command) -> Result<(), WorkError> {
        self.apply(command.clone(), Origin::Local).map(|_| ())
    }
}
