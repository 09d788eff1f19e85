//! Job scheduler backends.

pub mod memory;

pub use memory::{InMemoryJobScheduler, MemoryJobHandle, MemoryServiceToken};
