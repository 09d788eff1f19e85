//! Policy and constraint extraction from loosely typed caller arguments.
//!
//! Optional keys are permissive: a missing or mistyped value falls back to its
//! documented default and never fails the call, since the host scheduler is
//! the final validator. Only the identity keys of a command are required.

use std::time::Duration;

use serde_json::{Map, Value};

use super::descriptor::{
    methods, CancelRequest, Command, InitializeRequest, TaskDescriptor, TaskSchedule, MAX_DURATION,
};
use super::error::WorkError;
use super::options::{
    BackoffPolicy, BackoffPolicyConfig, ConstraintSet, ExistingWorkPolicy, NetworkType,
    OutOfQuotaPolicy, TaskKind,
};

/// Caller argument map.
pub type ArgumentMap = Map<String, Value>;

/// Frequency used when a periodic registration names none.
pub const DEFAULT_PERIODIC_FREQUENCY: Duration = Duration::from_secs(15 * 60);

/// Argument keys recognised by the extractor.
pub mod keys {
    /// Dispatcher handle passed to `initialize`.
    pub const CALLBACK_HANDLE: &str = "callbackHandle";
    /// Debug flag.
    pub const IS_IN_DEBUG_MODE: &str = "isInDebugMode";
    /// Task identity.
    pub const UNIQUE_NAME: &str = "uniqueName";
    /// Display name.
    pub const TASK_NAME: &str = "taskName";
    /// Grouping tag.
    pub const TAG: &str = "tag";
    /// Conflict policy.
    pub const EXISTING_WORK_POLICY: &str = "existingWorkPolicy";
    /// Initial delay in seconds.
    pub const INITIAL_DELAY_SECONDS: &str = "initialDelaySeconds";
    /// Periodic frequency in seconds.
    pub const FREQUENCY_SECONDS: &str = "frequency";
    /// Network requirement.
    pub const NETWORK_TYPE: &str = "networkType";
    /// Battery-not-low requirement.
    pub const REQUIRES_BATTERY_NOT_LOW: &str = "requiresBatteryNotLow";
    /// Charging requirement.
    pub const REQUIRES_CHARGING: &str = "requiresCharging";
    /// Device-idle requirement.
    pub const REQUIRES_DEVICE_IDLE: &str = "requiresDeviceIdle";
    /// Storage-not-low requirement.
    pub const REQUIRES_STORAGE_NOT_LOW: &str = "requiresStorageNotLow";
    /// Backoff curve.
    pub const BACKOFF_POLICY_TYPE: &str = "backoffPolicyType";
    /// Backoff delay in milliseconds.
    pub const BACKOFF_DELAY_MILLIS: &str = "backoffDelayInMilliseconds";
    /// Out-of-quota policy.
    pub const OUT_OF_QUOTA_POLICY: &str = "outOfQuotaPolicy";
    /// Task payload.
    pub const INPUT_DATA: &str = "inputData";
}

fn get_str<'a>(args: &'a ArgumentMap, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}

fn get_bool(args: &ArgumentMap, key: &str) -> Option<bool> {
    args.get(key).and_then(Value::as_bool)
}

fn get_i64(args: &ArgumentMap, key: &str) -> Option<i64> {
    args.get(key).and_then(Value::as_i64)
}

/// Whole seconds, negative clamped to zero and huge values to [`MAX_DURATION`].
fn seconds(args: &ArgumentMap, key: &str) -> Option<Duration> {
    let secs = u64::try_from(get_i64(args, key)?).unwrap_or(0);
    Some(Duration::from_secs(secs).min(MAX_DURATION))
}

/// Existing-work policy; defaults to [`ExistingWorkPolicy::Keep`].
#[must_use]
pub fn extract_existing_work_policy(args: &ArgumentMap) -> ExistingWorkPolicy {
    get_str(args, keys::EXISTING_WORK_POLICY)
        .and_then(ExistingWorkPolicy::parse_lenient)
        .unwrap_or_default()
}

/// Network requirement; defaults to [`NetworkType::NotRequired`].
#[must_use]
pub fn extract_network_type(args: &ArgumentMap) -> NetworkType {
    get_str(args, keys::NETWORK_TYPE)
        .and_then(NetworkType::parse_lenient)
        .unwrap_or_default()
}

/// Full constraint set; every flag defaults to `false`.
#[must_use]
pub fn extract_constraints(args: &ArgumentMap) -> ConstraintSet {
    ConstraintSet {
        network_type: extract_network_type(args),
        battery_not_low: get_bool(args, keys::REQUIRES_BATTERY_NOT_LOW).unwrap_or(false),
        charging: get_bool(args, keys::REQUIRES_CHARGING).unwrap_or(false),
        device_idle: get_bool(args, keys::REQUIRES_DEVICE_IDLE).unwrap_or(false),
        storage_not_low: get_bool(args, keys::REQUIRES_STORAGE_NOT_LOW).unwrap_or(false),
    }
}

/// Backoff configuration for `kind`.
///
/// Without a policy type the kind's defaults are returned. The delay arrives
/// in milliseconds and is truncated to whole seconds.
#[must_use]
pub fn extract_backoff_policy(args: &ArgumentMap, kind: TaskKind) -> BackoffPolicyConfig {
    let Some(raw) = get_str(args, keys::BACKOFF_POLICY_TYPE) else {
        return BackoffPolicyConfig::default_for(kind);
    };
    let policy = BackoffPolicy::parse_lenient(raw).unwrap_or_default();
    let requested_delay = get_i64(args, keys::BACKOFF_DELAY_MILLIS)
        .map_or_else(
            || kind.default_backoff_delay(),
            |ms| Duration::from_secs(u64::try_from(ms / 1000).unwrap_or(0)),
        );
    BackoffPolicyConfig {
        policy,
        requested_delay,
        minimum_delay: kind.minimum_backoff_delay(),
    }
}

/// Out-of-quota policy; absent or unknown yields `None`.
#[must_use]
pub fn extract_out_of_quota_policy(args: &ArgumentMap) -> Option<OutOfQuotaPolicy> {
    let raw = get_str(args, keys::OUT_OF_QUOTA_POLICY)?;
    let policy = OutOfQuotaPolicy::parse_lenient(raw);
    if policy.is_none() {
        tracing::debug!(value = raw, "ignoring unknown out-of-quota policy");
    }
    policy
}

fn required_str(args: &ArgumentMap, key: &str) -> Result<String, WorkError> {
    match get_str(args, key) {
        Some(s) if !s.is_empty() => Ok(s.to_owned()),
        Some(_) => Err(WorkError::InvalidArgument(format!("`{key}` must not be empty"))),
        None => Err(WorkError::InvalidArgument(format!("no `{key}` provided"))),
    }
}

/// Builds a task descriptor of `kind` from registration arguments.
///
/// # Errors
/// [`WorkError::InvalidArgument`] when `uniqueName` or `taskName` is missing,
/// empty or not a string.
pub fn extract_descriptor(args: &ArgumentMap, kind: TaskKind) -> Result<TaskDescriptor, WorkError> {
    let unique_name = required_str(args, keys::UNIQUE_NAME)?;
    let display_name = required_str(args, keys::TASK_NAME)?;

    let schedule = match kind {
        TaskKind::OneOff => TaskSchedule::OneOff,
        TaskKind::Periodic => TaskSchedule::Periodic {
            frequency: seconds(args, keys::FREQUENCY_SECONDS).unwrap_or(DEFAULT_PERIODIC_FREQUENCY),
        },
    };

    Ok(TaskDescriptor {
        unique_name,
        display_name,
        tag: get_str(args, keys::TAG).map(str::to_owned),
        initial_delay: seconds(args, keys::INITIAL_DELAY_SECONDS).unwrap_or_default(),
        constraints: extract_constraints(args),
        payload: get_str(args, keys::INPUT_DATA).unwrap_or_default().to_owned(),
        debug_mode: get_bool(args, keys::IS_IN_DEBUG_MODE).unwrap_or(false),
        existing_work_policy: extract_existing_work_policy(args),
        backoff_policy: Some(extract_backoff_policy(args, kind)),
        out_of_quota_policy: extract_out_of_quota_policy(args),
        schedule,
    })
}

/// Parses an inbound `(method, arguments)` pair into a typed [`Command`].
///
/// `cancelAllTasks` accepts any arguments; every other method needs a map.
///
/// # Errors
/// [`WorkError::InvalidArgument`] for unknown methods, non-map arguments and
/// missing required keys.
pub fn parse_command(method: &str, arguments: &Value) -> Result<Command, WorkError> {
    if method == methods::CANCEL_ALL_TASKS {
        return Ok(Command::Cancel(CancelRequest::All));
    }

    let Value::Object(args) = arguments else {
        return Err(WorkError::InvalidArgument("no argument map provided".into()));
    };

    match method {
        methods::INITIALIZE => {
            let dispatcher_handle = get_i64(args, keys::CALLBACK_HANDLE).ok_or_else(|| {
                WorkError::InvalidArgument(format!("no `{}` provided", keys::CALLBACK_HANDLE))
            })?;
            Ok(Command::Initialize(InitializeRequest {
                dispatcher_handle,
                debug_mode: get_bool(args, keys::IS_IN_DEBUG_MODE).unwrap_or(false),
            }))
        }
        methods::REGISTER_ONE_OFF_TASK => {
            extract_descriptor(args, TaskKind::OneOff).map(Command::Register)
        }
        methods::REGISTER_PERIODIC_TASK => {
            extract_descriptor(args, TaskKind::Periodic).map(Command::Register)
        }
        methods::CANCEL_TASK_BY_UNIQUE_NAME => required_str(args, keys::UNIQUE_NAME)
            .map(|name| Command::Cancel(CancelRequest::ByUniqueName(name))),
        methods::CANCEL_TASK_BY_TAG => {
            required_str(args, keys::TAG).map(|tag| Command::Cancel(CancelRequest::ByTag(tag)))
        }
        other => Err(WorkError::InvalidArgument(format!("unknown method `{other}`"))),
    }
}
