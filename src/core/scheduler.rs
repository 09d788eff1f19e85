//! Host job scheduler capability traits.
//!
//! The scheduler owns its job handles and decides when jobs run. This crate
//! only creates, configures, schedules, cancels and enumerates them, and
//! attaches lifecycle services that receive start/stop notifications.

use std::sync::Arc;
use std::time::Duration;

use super::error::SchedulerFault;

/// A job handle being configured before it is scheduled.
pub trait JobHandle: Send {
    /// Require the battery not to be low.
    ///
    /// # Errors
    /// Scheduler rejection of the setting.
    fn set_requires_battery_not_low(&mut self, required: bool) -> Result<(), SchedulerFault>;

    /// Require the device to be charging.
    ///
    /// # Errors
    /// Scheduler rejection of the setting.
    fn set_requires_charging(&mut self, required: bool) -> Result<(), SchedulerFault>;

    /// Require a wifi connection.
    ///
    /// # Errors
    /// Scheduler rejection of the setting.
    fn set_requires_wifi_connection(&mut self, required: bool) -> Result<(), SchedulerFault>;

    /// Run the job every `interval`; the scheduler may raise it to its floor.
    ///
    /// # Errors
    /// Scheduler rejection of the setting.
    fn set_periodic(&mut self, interval: Duration) -> Result<(), SchedulerFault>;

    /// Run the job once.
    ///
    /// # Errors
    /// Scheduler rejection of the setting.
    fn set_once(&mut self, once: bool) -> Result<(), SchedulerFault>;

    /// Keep the job across device reboots.
    ///
    /// # Errors
    /// Scheduler rejection of the setting.
    fn set_persistent(&mut self, persistent: bool) -> Result<(), SchedulerFault>;
}

/// Receives scheduler-fired lifecycle notifications. May be invoked on any
/// scheduler thread.
pub trait JobService: Send + Sync {
    /// The job is starting.
    fn on_start(&self, job_id: &str);
    /// The job is being stopped.
    fn on_stop(&self, job_id: &str);
}

/// The host job scheduler.
pub trait JobScheduler: Send + Sync + 'static {
    /// Handle type produced by [`create_job`](Self::create_job).
    type Handle: JobHandle;
    /// Registration token produced by [`add_service`](Self::add_service).
    type Service: Send;

    /// Allocate a new, unconfigured job handle.
    ///
    /// # Errors
    /// Allocation failure.
    fn create_job(&self) -> Result<Self::Handle, SchedulerFault>;

    /// Schedule a configured job under `job_id`.
    ///
    /// # Errors
    /// [`SchedulerFault::AlreadyExists`] if `job_id` is taken, or any other
    /// scheduler failure.
    fn schedule(&self, job: &Self::Handle, job_id: &str) -> Result<(), SchedulerFault>;

    /// Cancel the job scheduled under `job_id`.
    ///
    /// # Errors
    /// [`SchedulerFault::NotFound`] if no such job exists, or any other
    /// scheduler failure.
    fn cancel(&self, job_id: &str) -> Result<(), SchedulerFault>;

    /// Ids of every scheduled job.
    ///
    /// # Errors
    /// Scheduler failure.
    fn job_ids(&self) -> Result<Vec<String>, SchedulerFault>;

    /// Attach a lifecycle service to `job_id`.
    ///
    /// # Errors
    /// Scheduler failure.
    fn add_service(
        &self,
        job_id: &str,
        service: Arc<dyn JobService>,
    ) -> Result<Self::Service, SchedulerFault>;

    /// Detach a previously attached service.
    ///
    /// # Errors
    /// Scheduler failure.
    fn remove_service(&self, service: Self::Service) -> Result<(), SchedulerFault>;
}
