//! Dispatch message transports.

pub mod file;
pub mod memory;

pub use file::FileSpool;
pub use memory::{in_memory_channel, ChannelPublisher, ChannelSubscriber};
