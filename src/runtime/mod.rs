//! Command surface, owning-process service and runtime adapters.

pub mod api;
pub mod client;
pub mod service;
#[cfg(feature = "tokio-runtime")]
pub mod tokio_pump;

pub use api::{CallError, CallResult, MethodCall};
pub use client::{CommandDispatcher, RemoteDispatcher, WorkManager};
pub use service::{Applied, Origin, WorkerService};
#[cfg(feature = "tokio-runtime")]
pub use tokio_pump::MessagePump;
