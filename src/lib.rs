//! # Prometheus Work Manager
//!
//! Persistent deferred-task registration and cross-process dispatch on top of
//! a host job scheduler.
//!
//! Callers register one-off or periodic tasks by unique name. The library
//! turns loosely typed arguments into a typed task descriptor, hands it to the
//! process that owns the host scheduler (directly, or through a message
//! transport), schedules it there, persists its payload so it survives a
//! restart, and forwards an execution notification to the application's
//! business-logic sink when the scheduler starts the job.
//!
//! ## Key Features
//!
//! - **Lenient extraction**: unknown or missing optional arguments fall back
//!   to defaults; only task identity is required
//! - **Conflict resolution**: `REPLACE`/`UPDATE` cancel and retry once,
//!   `KEEP`/`APPEND` leave the existing job authoritative
//! - **Persistence**: payload and descriptor per task in a key-value store,
//!   serialized per unique name
//! - **Cross-process dispatch**: versioned flat key/value messages over an
//!   in-memory channel or a file spool
//! - **Lifecycle bridge**: scheduler starts become execution notifications;
//!   cross-process one-off tasks are re-checked against battery and charging
//!   state first
//!
//! ## Owning process
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use prometheus_workmanager::builders::WorkerServiceBuilder;
//! use prometheus_workmanager::config::WorkManagerConfig;
//! use prometheus_workmanager::infra::{ChannelSink, InMemoryJobScheduler};
//!
//! let (sink, notifications) = ChannelSink::new();
//! let service = WorkerServiceBuilder::new(WorkManagerConfig::from_env()?)
//!     .with_scheduler(Arc::new(InMemoryJobScheduler::new()))
//!     .with_sink(Arc::new(sink))
//!     .build()?;
//! service.start()?;
//! ```
//!
//! ## Registering process
//!
//! ```rust,ignore
//! use prometheus_workmanager::runtime::{MethodCall, RemoteDispatcher, WorkManager};
//! use serde_json::json;
//!
//! let manager = WorkManager::new(RemoteDispatcher::new(publisher), preferences, dispatcher_key);
//! manager.handle_call(&MethodCall::new("initialize", json!({ "callbackHandle": 42 })))?;
//! manager.handle_call(&MethodCall::new(
//!     "registerPeriodicTask",
//!     json!({ "uniqueName": "sync", "taskName": "sync", "frequency": 3600 }),
//! ))?;
//! ```
//!
//! For complete examples, see `tests/end_to_end_test.rs`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core task model, scheduling seams and dispatch logic.
pub mod core;
/// Configuration models for backends, key layout, polling and owner launch.
pub mod config;
/// Builders to construct backends and services from configuration.
pub mod builders;
/// Infrastructure backends for preferences, transports, scheduler, device, sink and launcher.
pub mod infra;
/// Command surface, owning-process service and runtime adapters.
pub mod runtime;
/// Shared utilities.
pub mod util;
