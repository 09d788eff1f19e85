//! Event-delivery seams between registering and owning processes.

use super::error::TransportError;
use super::protocol::Message;

/// Publishes dispatch messages toward the owning process. Fire-and-forget:
/// success means the message was handed to the bus, not that it was applied.
pub trait MessageTransport: Send + Sync {
    /// Publish one message.
    ///
    /// # Errors
    /// The bus is unreachable or failed.
    fn publish(&self, message: &Message) -> Result<(), TransportError>;
}

/// Receives dispatch messages in the owning process.
pub trait MessageSource: Send + Sync {
    /// Take every message published since the last poll, oldest first.
    ///
    /// # Errors
    /// The bus failed.
    fn poll(&self) -> Result<Vec<Message>, TransportError>;
}

impl<T: MessageTransport + ?Sized> MessageTransport for std::sync::Arc<T> {
    fn publish(&self, message: &Message) -> Result<(), TransportError> {
        (**self).publish(message)
    }
}

impl<T: MessageSource + ?Sized> MessageSource for std::sync::Arc<T> {
    fn poll(&self) -> Result<Vec<Message>, TransportError> {
        (**self).poll()
    }
}
