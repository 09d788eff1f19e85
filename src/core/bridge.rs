//! Lifecycle callback bridge.
//!
//! Turns scheduler start/stop notifications, and one-off tasks delivered
//! through the cross-process path, into execution notifications for the
//! business-logic sink. Per job the bridge walks
//! `Scheduled -> Started -> Dispatched | Suppressed -> Stopped`. Only jobs
//! that are still live are tracked: a stop releases the entry, and a one-off
//! task from another process is released as soon as its single dispatch
//! attempt is over.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::descriptor::TaskDescriptor;
use super::error::SinkError;
use super::job_store::JobStore;
use super::options::ConstraintSet;
use super::scheduler::{JobScheduler, JobService};

/// Coarse battery charge level reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatteryLevel {
    /// Battery is empty.
    Empty,
    /// Battery is critically low.
    Critical,
    /// Battery is low.
    Low,
    /// Battery is comfortably charged.
    High,
    /// Battery is full.
    Full,
}

impl BatteryLevel {
    /// Whether this level violates a battery-not-low requirement.
    #[must_use]
    pub const fn is_low(self) -> bool {
        matches!(self, Self::Empty | Self::Critical | Self::Low)
    }
}

/// Current device state, queried at guard time.
pub trait DeviceState: Send + Sync {
    /// Current battery level.
    fn battery_level(&self) -> BatteryLevel;
    /// Whether the device is charging.
    fn is_charging(&self) -> bool;
}

/// Request to run a task's business logic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionNotification {
    /// Job name.
    pub task_name: String,
    /// Persisted payload, or empty when none was found.
    pub payload: String,
}

/// The application's business-logic entry point.
pub trait ExecutionSink: Send + Sync {
    /// Deliver one notification.
    ///
    /// # Errors
    /// The sink is not ready or has gone away.
    fn deliver(&self, notification: ExecutionNotification) -> Result<(), SinkError>;
}

/// Bridge-local state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    /// Registered, not yet started.
    Scheduled,
    /// Start received; dispatch pending or failed.
    Started,
    /// Notification delivered to the sink.
    Dispatched,
    /// A guard condition failed; nothing was delivered.
    Suppressed,
    /// Stop received.
    Stopped,
}

/// Guard condition that suppressed a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressionReason {
    /// Battery-not-low was required but the battery is at this level.
    BatteryLow(BatteryLevel),
    /// Charging was required but the device is not charging.
    NotCharging,
}

/// What happened to a start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeOutcome {
    /// The sink accepted the notification.
    Dispatched,
    /// A guard failed.
    Suppressed(SuppressionReason),
    /// The sink refused the notification.
    Undelivered,
}

/// Scheduler callback bridge.
pub struct CallbackBridge<S> {
    store: JobStore<S>,
    device: Arc<dyn DeviceState>,
    sink: Arc<dyn ExecutionSink>,
    states: Mutex<HashMap<String, JobState>>,
    acknowledged: AtomicBool,
}

impl<S: JobScheduler> CallbackBridge<S> {
    /// Create a bridge reading payloads from `store`.
    pub fn new(
        store: JobStore<S>,
        device: Arc<dyn DeviceState>,
        sink: Arc<dyn ExecutionSink>,
    ) -> Self {
        Self {
            store,
            device,
            sink,
            states: Mutex::new(HashMap::new()),
            acknowledged: AtomicBool::new(false),
        }
    }

    fn set_state(&self, name: &str, state: JobState) {
        self.states.lock().insert(name.to_owned(), state);
    }

    /// Record that `name` was registered.
    pub fn track(&self, name: &str) {
        self.set_state(name, JobState::Scheduled);
    }

    /// Current state of `name`.
    #[must_use]
    pub fn state(&self, name: &str) -> Option<JobState> {
        self.states.lock().get(name).copied()
    }

    /// Drop bookkeeping for `name`.
    pub fn forget(&self, name: &str) {
        self.states.lock().remove(name);
    }

    /// Drop all bookkeeping.
    pub fn forget_all(&self) {
        self.states.lock().clear();
    }

    /// Number of jobs with bridge-local state.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.states.lock().len()
    }

    fn finish(&self, name: &str, state: JobState) {
        debug!(job = name, state = ?state, "releasing job state");
        self.forget(name);
    }

    /// Record the sink's one-time "initialized" acknowledgment.
    pub fn acknowledge_initialized(&self) {
        if !self.acknowledged.swap(true, Ordering::SeqCst) {
            info!("execution sink acknowledged initialization");
        }
    }

    /// Whether the sink has acknowledged initialization.
    #[must_use]
    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged.load(Ordering::SeqCst)
    }

    /// Scheduler-fired start. No guard is evaluated; a missing payload
    /// dispatches as empty.
    pub fn on_job_started(&self, name: &str) -> BridgeOutcome {
        self.set_state(name, JobState::Started);
        let payload = match self.store.get_payload(name) {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                warn!(job = name, "no persisted payload; dispatching empty payload");
                String::new()
            }
            Err(err) => {
                warn!(job = name, error = %err, "payload lookup failed; dispatching empty payload");
                String::new()
            }
        };
        self.deliver(name, payload)
    }

    /// Task delivered through the cross-process path. One-off tasks are
    /// re-checked against the current device state first. Nothing is
    /// tracked afterwards; no stop will follow.
    pub fn dispatch_decoded(&self, descriptor: &TaskDescriptor) -> BridgeOutcome {
        let name = descriptor.unique_name.as_str();
        self.set_state(name, JobState::Started);

        if !descriptor.is_periodic() {
            if let Some(reason) = self.check_guards(&descriptor.constraints) {
                info!(job = name, reason = ?reason, "dispatch suppressed by device state");
                self.finish(name, JobState::Suppressed);
                return BridgeOutcome::Suppressed(reason);
            }
        }
        let outcome = self.deliver(name, descriptor.payload.clone());
        let terminal = match outcome {
            BridgeOutcome::Dispatched => JobState::Dispatched,
            BridgeOutcome::Suppressed(_) => JobState::Suppressed,
            BridgeOutcome::Undelivered => JobState::Started,
        };
        self.finish(name, terminal);
        outcome
    }

    /// Scheduler-fired stop. Releases the job's state.
    pub fn on_job_stopped(&self, name: &str) {
        self.finish(name, JobState::Stopped);
    }

    fn check_guards(&self, constraints: &ConstraintSet) -> Option<SuppressionReason> {
        if constraints.battery_not_low {
            let level = self.device.battery_level();
            if level.is_low() {
                return Some(SuppressionReason::BatteryLow(level));
            }
        }
        if constraints.charging && !self.device.is_charging() {
            return Some(SuppressionReason::NotCharging);
        }
        None
    }

    fn deliver(&self, name: &str, payload: String) -> BridgeOutcome {
        let notification = ExecutionNotification {
            task_name: name.to_owned(),
            payload,
        };
        match self.sink.deliver(notification) {
            Ok(()) => {
                info!(job = name, "dispatched to execution sink");
                self.set_state(name, JobState::Dispatched);
                BridgeOutcome::Dispatched
            }
            Err(err) => {
                warn!(job = name, error = %err, "execution sink refused notification");
                BridgeOutcome::Undelivered
            }
        }
    }
}

impl<S: JobScheduler> JobService for CallbackBridge<S> {
    fn on_start(&self, job_id: &str) {
        let _ = self.on_job_started(job_id);
    }

    fn on_stop(&self, job_id: &str) {
        self.on_job_stopped(job_id);
    }
}
