//! Infrastructure backends for preferences, transports, the scheduler, the
//! device, the execution sink and the owner launcher.

pub mod device;
pub mod launcher;
pub mod preferences;
pub mod scheduler;
pub mod sink;
pub mod transport;

pub use device::StaticDeviceState;
pub use launcher::CommandLauncher;
pub use preferences::{FilePreferences, InMemoryPreferences};
pub use scheduler::{InMemoryJobScheduler, MemoryJobHandle, MemoryServiceToken};
pub use sink::{next_notification, ChannelSink};
pub use transport::{in_memory_channel, ChannelPublisher, ChannelSubscriber, FileSpool};
