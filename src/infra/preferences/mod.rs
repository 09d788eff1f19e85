//! Preference store backends.

pub mod file;
pub mod memory;

pub use file::FilePreferences;
pub use memory::InMemoryPreferences;
