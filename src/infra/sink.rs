//! Execution sink backed by a crossbeam channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use crate::core::{ExecutionNotification, ExecutionSink, SinkError};

/// Sink forwarding notifications to a receiver owned by the business logic.
#[derive(Debug)]
pub struct ChannelSink {
    tx: Sender<ExecutionNotification>,
    ready: AtomicBool,
}

impl ChannelSink {
    /// Create a ready sink and the receiver its notifications arrive on.
    #[must_use]
    pub fn new() -> (Self, Receiver<ExecutionNotification>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (
            Self {
                tx,
                ready: AtomicBool::new(true),
            },
            rx,
        )
    }

    /// Mark the sink ready or not. A sink that is not ready refuses delivery.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }
}

impl ExecutionSink for ChannelSink {
    fn deliver(&self, notification: ExecutionNotification) -> Result<(), SinkError> {
        if !self.ready.load(Ordering::SeqCst) {
            return Err(SinkError::NotReady);
        }
        self.tx.send(notification).map_err(|_| SinkError::Disconnected)
    }
}

/// Receive one notification, waiting at most `timeout`.
#[must_use]
pub fn next_notification(
    rx: &Receiver<ExecutionNotification>,
    timeout: Duration,
) -> Option<ExecutionNotification> {
    rx.recv_timeout(timeout).ok()
}
