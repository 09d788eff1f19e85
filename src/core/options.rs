//! Scheduling policies and constraints.
//!
//! Every enum has a canonical wire name (`as_str`) and a lenient parser
//! ([`parse_lenient`](NetworkType::parse_lenient)) that accepts any casing and
//! treats `-` and spaces as `_`. The parsers return `None` for unknown input so
//! callers decide the fallback.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Folds caller-supplied enum text into the canonical upper snake case form.
#[must_use]
pub fn normalize_enum_name(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            other => other.to_ascii_uppercase(),
        })
        .collect()
}

macro_rules! wire_enum {
    ($ty:ident { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            /// Canonical wire name.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }

            /// Parses a caller-supplied name, ignoring case and separators.
            #[must_use]
            pub fn parse_lenient(raw: &str) -> Option<Self> {
                match normalize_enum_name(raw).as_str() {
                    $($name => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// Network requirement for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkType {
    /// No network needed.
    #[default]
    NotRequired,
    /// Any working connection.
    Connected,
    /// A metered connection.
    Metered,
    /// An unmetered connection.
    Unmetered,
    /// A connection that is not roaming.
    NotRoaming,
    /// A connection that is temporarily unmetered.
    TemporarilyUnmetered,
}

wire_enum!(NetworkType {
    NotRequired => "NOT_REQUIRED",
    Connected => "CONNECTED",
    Metered => "METERED",
    Unmetered => "UNMETERED",
    NotRoaming => "NOT_ROAMING",
    TemporarilyUnmetered => "TEMPORARILY_UNMETERED",
});

/// Conflict resolution when a registration reuses a unique name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExistingWorkPolicy {
    /// Cancel the existing job and install the new one.
    Replace,
    /// Same as [`Replace`](Self::Replace).
    Update,
    /// Leave the existing job in place and drop the new registration.
    #[default]
    Keep,
    /// Accepted as a distinct value; scheduled like [`Keep`](Self::Keep).
    Append,
}

wire_enum!(ExistingWorkPolicy {
    Replace => "REPLACE",
    Update => "UPDATE",
    Keep => "KEEP",
    Append => "APPEND",
});

impl ExistingWorkPolicy {
    /// Whether a conflicting job should be cancelled and replaced.
    #[must_use]
    pub const fn replaces_existing(self) -> bool {
        matches!(self, Self::Replace | Self::Update)
    }
}

/// What the scheduler should do with expedited work once quota runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutOfQuotaPolicy {
    /// Run the work as regular, non-expedited work.
    RunAsNonExpedited,
    /// Drop the work.
    Drop,
}

wire_enum!(OutOfQuotaPolicy {
    RunAsNonExpedited => "RUN_AS_NON_EXPEDITED_WORK_REQUEST",
    Drop => "DROP_WORK_REQUEST",
});

/// Backoff curve between retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffPolicy {
    /// Delay grows linearly.
    #[default]
    Linear,
    /// Delay doubles each attempt.
    Exponential,
}

wire_enum!(BackoffPolicy {
    Linear => "LINEAR",
    Exponential => "EXPONENTIAL",
});

/// Preconditions evaluated before a task may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ConstraintSet {
    /// Network requirement.
    pub network_type: NetworkType,
    /// Battery must not be low.
    pub battery_not_low: bool,
    /// Device must be charging.
    pub charging: bool,
    /// Device must be idle. Carried through, not enforced.
    pub device_idle: bool,
    /// Storage must not be low. Carried through, not enforced.
    pub storage_not_low: bool,
}

impl ConstraintSet {
    /// Whether the constraints require the scheduler's wifi-connection flag.
    #[must_use]
    pub const fn requires_wifi(&self) -> bool {
        matches!(
            self.network_type,
            NetworkType::Connected | NetworkType::Unmetered
        )
    }
}

/// Task kind, which decides the backoff floor and default delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Runs at most once.
    OneOff,
    /// Runs on a recurring interval.
    Periodic,
}

impl TaskKind {
    /// Backoff floor imposed by this kind.
    #[must_use]
    pub const fn minimum_backoff_delay(self) -> Duration {
        match self {
            Self::OneOff => Duration::from_secs(10),
            Self::Periodic => Duration::from_secs(15 * 60),
        }
    }

    /// Requested backoff delay used when the caller supplies none.
    #[must_use]
    pub const fn default_backoff_delay(self) -> Duration {
        self.minimum_backoff_delay()
    }
}

/// Retry backoff configuration. Only modelled; the scheduler times retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BackoffPolicyConfig {
    /// Backoff curve.
    pub policy: BackoffPolicy,
    /// Delay the caller asked for.
    pub requested_delay: Duration,
    /// Floor imposed by the task kind.
    pub minimum_delay: Duration,
}

impl BackoffPolicyConfig {
    /// Default configuration for a task kind.
    #[must_use]
    pub const fn default_for(kind: TaskKind) -> Self {
        Self {
            policy: BackoffPolicy::Linear,
            requested_delay: kind.default_backoff_delay(),
            minimum_delay: kind.minimum_backoff_delay(),
        }
    }

    /// Requested delay clamped to the floor.
    #[must_use]
    pub fn effective_delay(&self) -> Duration {
        self.requested_delay.max(self.minimum_delay)
    }
}
