//! Core task model, scheduling seams and dispatch logic.

pub mod adapter;
pub mod bridge;
pub mod descriptor;
pub mod error;
pub mod extractor;
pub mod job_store;
pub mod launcher;
pub mod locks;
pub mod options;
pub mod preferences;
pub mod protocol;
pub mod scheduler;
pub mod transport;

pub use adapter::{map_fault, JobSchedulerAdapter, Registration};
pub use bridge::{
    BatteryLevel, BridgeOutcome, CallbackBridge, DeviceState, ExecutionNotification,
    ExecutionSink, JobState, SuppressionReason,
};
pub use descriptor::{
    CancelRequest, Command, InitializeRequest, TaskDescriptor, TaskSchedule, MAX_DURATION,
};
pub use error::{
    AppResult, ErrorCode, LaunchError, ProtocolError, SchedulerError, SchedulerFault, SinkError,
    StoreError, TransportError, WorkError,
};
pub use extractor::{parse_command, ArgumentMap};
pub use job_store::{JobStore, KeyLayout, PersistedJobRecord};
pub use launcher::OwnerLauncher;
pub use locks::NameLocks;
pub use options::{
    BackoffPolicy, BackoffPolicyConfig, ConstraintSet, ExistingWorkPolicy, NetworkType,
    OutOfQuotaPolicy, TaskKind,
};
pub use preferences::{DispatcherRecord, KeyValueStore};
pub use protocol::{decode, encode, Message};
pub use scheduler::{JobHandle, JobScheduler, JobService};
pub use transport::{MessageSource, MessageTransport};
