//! Error types for registration, scheduling, persistence and transport.
//!
//! Each layer owns a narrow error enum. [`WorkError`] rolls them up for the
//! caller-facing surface and maps every failure onto one of the three
//! machine-readable [`ErrorCode`]s.

use std::fmt;

use thiserror::Error;

/// Raw failure reported by the host job scheduler.
///
/// These never cross the adapter boundary; see [`SchedulerError`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerFault {
    /// A job with the requested id is already scheduled.
    #[error("job already exists")]
    AlreadyExists,
    /// No job with the requested id is scheduled.
    #[error("no such job")]
    NotFound,
    /// The scheduler rejected a parameter.
    #[error("invalid parameter")]
    InvalidParameter,
    /// The caller lacks the privilege to schedule jobs.
    #[error("permission denied")]
    PermissionDenied,
    /// The scheduler does not support the requested feature.
    #[error("not supported")]
    NotSupported,
    /// The scheduler ran out of memory.
    #[error("out of memory")]
    OutOfMemory,
    /// The scheduler failed to talk to its backing service.
    #[error("I/O error")]
    Io,
    /// Any other numeric error code.
    #[error("scheduler error code {0}")]
    Other(i32),
}

/// Errors produced by the persistent key-value layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing medium could not be read or written.
    #[error("storage I/O error: {0}")]
    Io(String),
    /// A stored value could not be encoded or decoded.
    #[error("storage codec error: {0}")]
    Codec(String),
}

/// Scheduler failures after mapping at the adapter boundary.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The scheduler could not allocate a job handle.
    #[error("failed to create job handle: {0}")]
    HandleCreation(String),
    /// The job handle rejected a constraint or periodicity setting.
    #[error("failed to configure job `{name}`: {reason}")]
    Configuration {
        /// Unique name of the job.
        name: String,
        /// Scheduler-provided reason.
        reason: String,
    },
    /// The job still exists after conflict resolution.
    #[error("job `{0}` already exists")]
    AlreadyExists(String),
    /// The scheduler refused the job (quota, permission or unsupported setting).
    #[error("scheduler rejected job `{name}`: {reason}")]
    Rejected {
        /// Unique name of the job.
        name: String,
        /// Scheduler-provided reason.
        reason: String,
    },
    /// The scheduler failed for a reason outside the caller's control.
    #[error("scheduler unavailable: {0}")]
    Unavailable(String),
    /// The job was scheduled but its record could not be persisted.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors produced while decoding a dispatch message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The message carries no or an unknown protocol version.
    #[error("unsupported message version: {0}")]
    UnsupportedVersion(String),
    /// The message names a method this protocol does not know.
    #[error("unknown method: {0}")]
    UnknownMethod(String),
    /// A required field is absent.
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    /// A field is present but cannot be parsed.
    #[error("invalid value `{value}` for field `{field}`")]
    InvalidField {
        /// Field key.
        field: &'static str,
        /// Offending raw value.
        value: String,
    },
}

/// Errors produced when handing a message to the event-delivery mechanism.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No owning process is listening.
    #[error("no receiver for dispatch messages: {0}")]
    Unreachable(String),
    /// The event bus itself failed.
    #[error("transport backend error: {0}")]
    Backend(String),
}

/// Errors produced when delivering an execution notification.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The business-logic sink is not ready to receive notifications.
    #[error("execution sink is not ready")]
    NotReady,
    /// The sink went away.
    #[error("execution sink disconnected")]
    Disconnected,
}

/// Errors produced while starting the owning process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// No launch command is configured.
    #[error("no owner launch command configured")]
    NotConfigured,
    /// The process could not be spawned.
    #[error("failed to spawn owner process: {0}")]
    Spawn(String),
}

/// Machine-readable error code reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// A required argument was missing or mistyped.
    InvalidArgument,
    /// The operation could not be carried out.
    OperationFailed,
    /// `initialize` has not been called yet.
    NotInitialized,
}

impl ErrorCode {
    /// Wire representation of the code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid-argument",
            Self::OperationFailed => "operation-failed",
            Self::NotInitialized => "not-initialized",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level error for the command surface.
#[derive(Debug, Error)]
pub enum WorkError {
    /// A required argument was missing or had the wrong type.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Registration was attempted before `initialize`.
    #[error("work manager is not initialized; call `initialize` first")]
    NotInitialized,
    /// The scheduler rejected the operation.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    /// Persistent storage failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A dispatch message could not be decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// The dispatch message could not be published.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl WorkError {
    /// Caller-facing code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::NotInitialized => ErrorCode::NotInitialized,
            Self::Scheduler(_) | Self::Store(_) | Self::Protocol(_) | Self::Transport(_) => {
                ErrorCode::OperationFailed
            }
        }
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
