//! In-process transport over a crossbeam channel.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::core::{Message, MessageSource, MessageTransport, TransportError};

/// Publishing half of an in-memory transport.
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    tx: Sender<Message>,
}

/// Receiving half of an in-memory transport.
#[derive(Debug)]
pub struct ChannelSubscriber {
    rx: Receiver<Message>,
}

/// Create a connected publisher/subscriber pair.
#[must_use]
pub fn in_memory_channel() -> (ChannelPublisher, ChannelSubscriber) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (ChannelPublisher { tx }, ChannelSubscriber { rx })
}

impl MessageTransport for ChannelPublisher {
    fn publish(&self, message: &Message) -> Result<(), TransportError> {
        self.tx
            .send(message.clone())
            .map_err(|_| TransportError::Unreachable("subscriber dropped".into()))
    }
}

impl ChannelSubscriber {
    /// Wait up to `timeout` for one message.
    ///
    /// # Errors
    /// Every publisher has been dropped.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<Message>, TransportError> {
        match self.rx.recv_timeout(timeout) {
            Ok(message) => Ok(Some(message)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                Err(TransportError::Backend("all publishers dropped".into()))
            }
        }
    }

    /// Messages waiting to be polled.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl MessageSource for ChannelSubscriber {
    fn poll(&self) -> Result<Vec<Message>, TransportError> {
        Ok(self.rx.try_iter().collect())
    }
}
