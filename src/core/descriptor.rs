//! Task descriptors and the typed commands built from inbound calls.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::options::{
    BackoffPolicyConfig, ConstraintSet, ExistingWorkPolicy, OutOfQuotaPolicy, TaskKind,
};

/// Longest delay or period a descriptor carries; its whole milliseconds
/// still fit a `u64` on the wire.
pub const MAX_DURATION: Duration = Duration::from_secs(u64::MAX / 1000);

/// When a task runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSchedule {
    /// Run at most once.
    OneOff,
    /// Run every `frequency`, subject to the scheduler's own floor.
    Periodic {
        /// Requested interval between runs.
        frequency: Duration,
    },
}

/// Canonical description of a registered task.
///
/// Built once from an inbound request and never mutated afterwards.
/// `unique_name` is the sole identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    /// Identity key.
    pub unique_name: String,
    /// Name reported to the business-logic sink's caller.
    pub display_name: String,
    /// Grouping label, used only for bulk cancellation.
    pub tag: Option<String>,
    /// Delay before the first run.
    pub initial_delay: Duration,
    /// Preconditions.
    pub constraints: ConstraintSet,
    /// Opaque caller-defined payload.
    pub payload: String,
    /// Diagnostic flag.
    pub debug_mode: bool,
    /// Conflict resolution on re-registration.
    pub existing_work_policy: ExistingWorkPolicy,
    /// Retry backoff configuration.
    pub backoff_policy: Option<BackoffPolicyConfig>,
    /// Behaviour once expedited quota is exhausted.
    pub out_of_quota_policy: Option<OutOfQuotaPolicy>,
    /// One-off or periodic.
    pub schedule: TaskSchedule,
}

impl TaskDescriptor {
    /// A one-off task with default policies.
    pub fn one_off(unique_name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self::with_schedule(unique_name.into(), display_name.into(), TaskSchedule::OneOff)
    }

    /// A periodic task with default policies.
    pub fn periodic(
        unique_name: impl Into<String>,
        display_name: impl Into<String>,
        frequency: Duration,
    ) -> Self {
        Self::with_schedule(
            unique_name.into(),
            display_name.into(),
            TaskSchedule::Periodic { frequency },
        )
    }

    fn with_schedule(unique_name: String, display_name: String, schedule: TaskSchedule) -> Self {
        Self {
            unique_name,
            display_name,
            tag: None,
            initial_delay: Duration::ZERO,
            constraints: ConstraintSet::default(),
            payload: String::new(),
            debug_mode: false,
            existing_work_policy: ExistingWorkPolicy::default(),
            backoff_policy: None,
            out_of_quota_policy: None,
            schedule,
        }
    }

    /// Task kind derived from the schedule.
    #[must_use]
    pub const fn kind(&self) -> TaskKind {
        match self.schedule {
            TaskSchedule::OneOff => TaskKind::OneOff,
            TaskSchedule::Periodic { .. } => TaskKind::Periodic,
        }
    }

    /// Whether this is a periodic task.
    #[must_use]
    pub const fn is_periodic(&self) -> bool {
        matches!(self.schedule, TaskSchedule::Periodic { .. })
    }

    /// Set the tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Set the payload.
    #[must_use]
    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Set the constraints.
    #[must_use]
    pub fn with_constraints(mut self, constraints: ConstraintSet) -> Self {
        self.constraints = constraints;
        self
    }

    /// Set the existing-work policy.
    #[must_use]
    pub fn with_existing_work_policy(mut self, policy: ExistingWorkPolicy) -> Self {
        self.existing_work_policy = policy;
        self
    }

    /// Set the initial delay.
    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the backoff configuration.
    #[must_use]
    pub fn with_backoff_policy(mut self, backoff: BackoffPolicyConfig) -> Self {
        self.backoff_policy = Some(backoff);
        self
    }

    /// Set the out-of-quota policy.
    #[must_use]
    pub fn with_out_of_quota_policy(mut self, policy: OutOfQuotaPolicy) -> Self {
        self.out_of_quota_policy = Some(policy);
        self
    }

    /// Set the debug flag.
    #[must_use]
    pub fn with_debug_mode(mut self, debug_mode: bool) -> Self {
        self.debug_mode = debug_mode;
        self
    }
}

/// Cancellation request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelRequest {
    /// Cancel the task with this unique name.
    ByUniqueName(String),
    /// Cancel tasks carrying this tag. Accepted but not acted on.
    ByTag(String),
    /// Cancel every task.
    All,
}

/// One-time initialization carrying the business-logic entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InitializeRequest {
    /// Opaque dispatcher handle.
    pub dispatcher_handle: i64,
    /// Diagnostic flag.
    pub debug_mode: bool,
}

/// Method names of the inbound command surface.
pub mod methods {
    /// Initialize the work manager.
    pub const INITIALIZE: &str = "initialize";
    /// Register a one-off task.
    pub const REGISTER_ONE_OFF_TASK: &str = "registerOneOffTask";
    /// Register a periodic task.
    pub const REGISTER_PERIODIC_TASK: &str = "registerPeriodicTask";
    /// Cancel by unique name.
    pub const CANCEL_TASK_BY_UNIQUE_NAME: &str = "cancelTaskByUniqueName";
    /// Cancel by tag.
    pub const CANCEL_TASK_BY_TAG: &str = "cancelTaskByTag";
    /// Cancel everything.
    pub const CANCEL_ALL_TASKS: &str = "cancelAllTasks";
}

/// A fully parsed inbound command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Record the dispatcher handle.
    Initialize(InitializeRequest),
    /// Register a one-off or periodic task.
    Register(TaskDescriptor),
    /// Cancel one, none or all tasks.
    Cancel(CancelRequest),
}

impl Command {
    /// Method name this command travels under.
    #[must_use]
    pub const fn method_name(&self) -> &'static str {
        match self {
            Self::Initialize(_) => methods::INITIALIZE,
            Self::Register(d) if d.is_periodic() => methods::REGISTER_PERIODIC_TASK,
            Self::Register(_) => methods::REGISTER_ONE_OFF_TASK,
            Self::Cancel(CancelRequest::ByUniqueName(_)) => methods::CANCEL_TASK_BY_UNIQUE_NAME,
            Self::Cancel(CancelRequest::ByTag(_)) => methods::CANCEL_TASK_BY_TAG,
            Self::Cancel(CancelRequest::All) => methods::CANCEL_ALL_TASKS,
        }
    }
}
