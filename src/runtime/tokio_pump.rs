//! Tokio-driven message pump for the owning process.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::service::WorkerService;
use crate::core::{JobScheduler, MessageSource};

/// Background task polling a message source into a worker service.
pub struct MessagePump {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<usize>,
}

impl MessagePump {
    /// Start polling `source` every `interval` on the current tokio runtime.
    #[must_use]
    pub fn spawn<S: JobScheduler>(
        service: Arc<WorkerService<S>>,
        source: Arc<dyn MessageSource>,
        interval: Duration,
    ) -> Self {
        let (shutdown, mut stop) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut handled = 0;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match service.pump(source.as_ref()) {
                            Ok(count) => handled += count,
                            Err(err) => tracing::warn!(error = %err, "message source poll failed"),
                        }
                    }
                    changed = stop.changed() => {
                        if changed.is_err() || *stop.borrow() {
                            break;
                        }
                    }
                }
            }
            match service.pump(source.as_ref()) {
                Ok(count) => handled += count,
                Err(err) => tracing::warn!(error = %err, "final message source poll failed"),
            }
            tracing::debug!(handled, "message pump stopped");
            handled
        });
        Self { shutdown, handle }
    }

    /// Stop polling after one last drain. Returns how many messages the pump
    /// received in total.
    pub async fn shutdown(self) -> usize {
        let _ = self.shutdown.send(true);
        match self.handle.await {
            Ok(handled) => handled,
            Err(err) => {
                tracing::warn!(error = %err, "message pump task failed");
                0
            }
        }
    }
}
