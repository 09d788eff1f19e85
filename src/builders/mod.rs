//! Builders to construct backends and services from configuration.

pub mod service_builder;

pub use service_builder::{
    build_launcher, build_preferences, build_transport, TransportPair, WorkerServiceBuilder,
};
