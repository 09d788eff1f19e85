//! Cross-process dispatch protocol.
//!
//! A [`Message`] is a flat string-to-string map. Every message carries a
//! header (`wm.version`, `wm.messageId`, `wm.sentAtMs`) and the method name;
//! the remaining keys depend on the command. Optional fields are present or
//! absent keys, booleans are `true`/`false`, enums use their wire names and
//! durations are whole milliseconds.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::descriptor::{
    methods, CancelRequest, Command, InitializeRequest, TaskDescriptor, TaskSchedule,
};
use super::error::ProtocolError;
use super::options::{
    BackoffPolicy, BackoffPolicyConfig, ConstraintSet, ExistingWorkPolicy, NetworkType,
    OutOfQuotaPolicy,
};
use crate::util::clock::now_ms;

/// Protocol version written by [`encode`] and required by [`decode`].
pub const PROTOCOL_VERSION: &str = "1";

/// Message keys.
pub mod fields {
    /// Protocol version.
    pub const VERSION: &str = "wm.version";
    /// Per-message id for log correlation.
    pub const MESSAGE_ID: &str = "wm.messageId";
    /// Send time in Unix milliseconds.
    pub const SENT_AT_MS: &str = "wm.sentAtMs";
    /// Method name.
    pub const METHOD: &str = "method";
    /// Dispatcher handle.
    pub const CALLBACK_HANDLE: &str = "callbackHandle";
    /// Debug flag.
    pub const DEBUG_MODE: &str = "isInDebugMode";
    /// Unique name.
    pub const UNIQUE_NAME: &str = "uniqueName";
    /// Display name.
    pub const TASK_NAME: &str = "taskName";
    /// Tag.
    pub const TAG: &str = "tag";
    /// Initial delay.
    pub const INITIAL_DELAY_MS: &str = "initialDelayMs";
    /// Periodic frequency.
    pub const FREQUENCY_MS: &str = "frequencyMs";
    /// Network requirement.
    pub const NETWORK_TYPE: &str = "networkType";
    /// Battery-not-low requirement.
    pub const BATTERY_NOT_LOW: &str = "requiresBatteryNotLow";
    /// Charging requirement.
    pub const CHARGING: &str = "requiresCharging";
    /// Device-idle requirement.
    pub const DEVICE_IDLE: &str = "requiresDeviceIdle";
    /// Storage-not-low requirement.
    pub const STORAGE_NOT_LOW: &str = "requiresStorageNotLow";
    /// Payload.
    pub const INPUT_DATA: &str = "inputData";
    /// Existing-work policy.
    pub const EXISTING_WORK_POLICY: &str = "existingWorkPolicy";
    /// Backoff curve.
    pub const BACKOFF_POLICY: &str = "backoffPolicyType";
    /// Requested backoff delay.
    pub const BACKOFF_DELAY_MS: &str = "backoffDelayMs";
    /// Backoff floor.
    pub const BACKOFF_MINIMUM_MS: &str = "backoffMinimumMs";
    /// Out-of-quota policy.
    pub const OUT_OF_QUOTA_POLICY: &str = "outOfQuotaPolicy";
}

/// Flat key/value dispatch message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Message {
    entries: BTreeMap<String, String>,
}

impl Message {
    /// Empty message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Value under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Set `key`, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Remove `key`.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the message has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Method name, if present.
    #[must_use]
    pub fn method_name(&self) -> Option<&str> {
        self.get(fields::METHOD)
    }

    /// Message id, if present.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        self.get(fields::MESSAGE_ID)
    }

    fn put_bool(&mut self, key: &str, value: bool) {
        self.insert(key, if value { "true" } else { "false" });
    }

    // Saturates at `u64::MAX` milliseconds; the extractor never produces
    // anything past `MAX_DURATION`.
    fn put_duration(&mut self, key: &str, value: Duration) {
        let millis = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        self.insert(key, millis.to_string());
    }

    fn required(&self, key: &'static str) -> Result<&str, ProtocolError> {
        self.get(key).ok_or(ProtocolError::MissingField(key))
    }

    fn parsed<T: std::str::FromStr>(&self, key: &'static str) -> Result<Option<T>, ProtocolError> {
        self.get(key)
            .map(|raw| {
                raw.parse().map_err(|_| ProtocolError::InvalidField {
                    field: key,
                    value: raw.to_owned(),
                })
            })
            .transpose()
    }

    fn bool_or_false(&self, key: &'static str) -> Result<bool, ProtocolError> {
        Ok(self.parsed(key)?.unwrap_or(false))
    }

    fn duration(&self, key: &'static str) -> Result<Option<Duration>, ProtocolError> {
        Ok(self.parsed::<u64>(key)?.map(Duration::from_millis))
    }

    fn wire_enum<T>(
        &self,
        key: &'static str,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Result<Option<T>, ProtocolError> {
        self.get(key)
            .map(|raw| {
                parse(raw).ok_or_else(|| ProtocolError::InvalidField {
                    field: key,
                    value: raw.to_owned(),
                })
            })
            .transpose()
    }
}

impl FromIterator<(String, String)> for Message {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

fn header(method: &str) -> Message {
    let mut message = Message::new();
    message.insert(fields::VERSION, PROTOCOL_VERSION);
    message.insert(fields::MESSAGE_ID, Uuid::new_v4().to_string());
    message.insert(fields::SENT_AT_MS, now_ms().to_string());
    message.insert(fields::METHOD, method);
    message
}

fn encode_descriptor(message: &mut Message, d: &TaskDescriptor) {
    message.insert(fields::UNIQUE_NAME, d.unique_name.as_str());
    message.insert(fields::TASK_NAME, d.display_name.as_str());
    if let Some(tag) = &d.tag {
        message.insert(fields::TAG, tag.as_str());
    }
    message.put_duration(fields::INITIAL_DELAY_MS, d.initial_delay);
    if let TaskSchedule::Periodic { frequency } = d.schedule {
        message.put_duration(fields::FREQUENCY_MS, frequency);
    }
    message.insert(fields::NETWORK_TYPE, d.constraints.network_type.as_str());
    message.put_bool(fields::BATTERY_NOT_LOW, d.constraints.battery_not_low);
    message.put_bool(fields::CHARGING, d.constraints.charging);
    message.put_bool(fields::DEVICE_IDLE, d.constraints.device_idle);
    message.put_bool(fields::STORAGE_NOT_LOW, d.constraints.storage_not_low);
    message.insert(fields::INPUT_DATA, d.payload.as_str());
    message.put_bool(fields::DEBUG_MODE, d.debug_mode);
    message.insert(fields::EXISTING_WORK_POLICY, d.existing_work_policy.as_str());
    if let Some(backoff) = &d.backoff_policy {
        message.insert(fields::BACKOFF_POLICY, backoff.policy.as_str());
        message.put_duration(fields::BACKOFF_DELAY_MS, backoff.requested_delay);
        message.put_duration(fields::BACKOFF_MINIMUM_MS, backoff.minimum_delay);
    }
    if let Some(policy) = d.out_of_quota_policy {
        message.insert(fields::OUT_OF_QUOTA_POLICY, policy.as_str());
    }
}

/// Encode `command` as a dispatch message with a fresh header.
#[must_use]
pub fn encode(command: &Command) -> Message {
    let mut message = header(command.method_name());
    match command {
        Command::Initialize(init) => {
            message.insert(fields::CALLBACK_HANDLE, init.dispatcher_handle.to_string());
            message.put_bool(fields::DEBUG_MODE, init.debug_mode);
        }
        Command::Register(descriptor) => encode_descriptor(&mut message, descriptor),
        Command::Cancel(CancelRequest::ByUniqueName(name)) => {
            message.insert(fields::UNIQUE_NAME, name.as_str());
        }
        Command::Cancel(CancelRequest::ByTag(tag)) => {
            message.insert(fields::TAG, tag.as_str());
        }
        Command::Cancel(CancelRequest::All) => {}
    }
    message
}

fn decode_descriptor(message: &Message, periodic: bool) -> Result<TaskDescriptor, ProtocolError> {
    let schedule = if periodic {
        TaskSchedule::Periodic {
            frequency: message
                .duration(fields::FREQUENCY_MS)?
                .ok_or(ProtocolError::MissingField(fields::FREQUENCY_MS))?,
        }
    } else {
        TaskSchedule::OneOff
    };

    let backoff_policy = match message
        .wire_enum(fields::BACKOFF_POLICY, BackoffPolicy::parse_lenient)?
    {
        Some(policy) => Some(BackoffPolicyConfig {
            policy,
            requested_delay: message
                .duration(fields::BACKOFF_DELAY_MS)?
                .ok_or(ProtocolError::MissingField(fields::BACKOFF_DELAY_MS))?,
            minimum_delay: message
                .duration(fields::BACKOFF_MINIMUM_MS)?
                .ok_or(ProtocolError::MissingField(fields::BACKOFF_MINIMUM_MS))?,
        }),
        None => None,
    };

    Ok(TaskDescriptor {
        unique_name: message.required(fields::UNIQUE_NAME)?.to_owned(),
        display_name: message.required(fields::TASK_NAME)?.to_owned(),
        tag: message.get(fields::TAG).map(str::to_owned),
        initial_delay: message.duration(fields::INITIAL_DELAY_MS)?.unwrap_or_default(),
        constraints: ConstraintSet {
            network_type: message
                .wire_enum(fields::NETWORK_TYPE, NetworkType::parse_lenient)?
                .unwrap_or_default(),
            battery_not_low: message.bool_or_false(fields::BATTERY_NOT_LOW)?,
            charging: message.bool_or_false(fields::CHARGING)?,
            device_idle: message.bool_or_false(fields::DEVICE_IDLE)?,
            storage_not_low: message.bool_or_false(fields::STORAGE_NOT_LOW)?,
        },
        payload: message.get(fields::INPUT_DATA).unwrap_or_default().to_owned(),
        debug_mode: message.bool_or_false(fields::DEBUG_MODE)?,
        existing_work_policy: message
            .wire_enum(fields::EXISTING_WORK_POLICY, ExistingWorkPolicy::parse_lenient)?
            .unwrap_or_default(),
        backoff_policy,
        out_of_quota_policy: message
            .wire_enum(fields::OUT_OF_QUOTA_POLICY, OutOfQuotaPolicy::parse_lenient)?,
        schedule,
    })
}

/// Decode a dispatch message back into a [`Command`].
///
/// # Errors
/// Wrong or missing version, unknown method, missing required fields or
/// unparseable values.
pub fn decode(message: &Message) -> Result<Command, ProtocolError> {
    match message.get(fields::VERSION) {
        Some(PROTOCOL_VERSION) => {}
        Some(other) => return Err(ProtocolError::UnsupportedVersion(other.to_owned())),
        None => return Err(ProtocolError::UnsupportedVersion("<absent>".into())),
    }

    let method = message.required(fields::METHOD)?;
    match method {
        methods::INITIALIZE => Ok(Command::Initialize(InitializeRequest {
            dispatcher_handle: message
                .parsed(fields::CALLBACK_HANDLE)?
                .ok_or(ProtocolError::MissingField(fields::CALLBACK_HANDLE))?,
            debug_mode: message.bool_or_false(fields::DEBUG_MODE)?,
        })),
        methods::REGISTER_ONE_OFF_TASK => decode_descriptor(message, false).map(Command::Register),
        methods::REGISTER_PERIODIC_TASK => decode_descriptor(message, true).map(Command::Register),
        methods::CANCEL_TASK_BY_UNIQUE_NAME => Ok(Command::Cancel(CancelRequest::ByUniqueName(
            message.required(fields::UNIQUE_NAME)?.to_owned(),
        ))),
        methods::CANCEL_TASK_BY_TAG => Ok(Command::Cancel(CancelRequest::ByTag(
            message.required(fields::TAG)?.to_owned(),
        ))),
        methods::CANCEL_ALL_TASKS => Ok(Command::Cancel(CancelRequest::All)),
        other => Err(ProtocolError::UnknownMethod(other.to_owned())),
    }
}
