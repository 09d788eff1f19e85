//! Job scheduler adapter.
//!
//! Translates task descriptors into host scheduler jobs, resolves name
//! conflicts according to the existing-work policy, keeps the job store in
//! step with the scheduler and owns the lifecycle callback attached to each
//! job. Raw [`SchedulerFault`]s are mapped to [`SchedulerError`] here and go
//! no further.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::descriptor::{TaskDescriptor, TaskSchedule};
use super::error::{SchedulerError, SchedulerFault};
use super::job_store::JobStore;
use super::scheduler::{JobHandle, JobScheduler, JobService};

/// Result of a successful [`JobSchedulerAdapter::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The job was new and is now scheduled.
    Scheduled,
    /// An existing job was cancelled and the new one scheduled in its place.
    Replaced,
    /// An existing job was kept; the new registration was dropped.
    KeptExisting,
}

/// Map a raw scheduler fault for job `name`.
#[must_use]
pub fn map_fault(name: &str, fault: &SchedulerFault) -> SchedulerError {
    match fault {
        SchedulerFault::AlreadyExists => SchedulerError::AlreadyExists(name.to_owned()),
        SchedulerFault::InvalidParameter
        | SchedulerFault::PermissionDenied
        | SchedulerFault::NotSupported => SchedulerError::Rejected {
            name: name.to_owned(),
            reason: fault.to_string(),
        },
        SchedulerFault::NotFound
        | SchedulerFault::OutOfMemory
        | SchedulerFault::Io
        | SchedulerFault::Other(_) => SchedulerError::Unavailable(format!("job `{name}`: {fault}")),
    }
}

/// Adapter over a host [`JobScheduler`].
pub struct JobSchedulerAdapter<S: JobScheduler> {
    scheduler: Arc<S>,
    store: JobStore<S>,
    callbacks: Mutex<HashMap<String, S::Service>>,
}

impl<S: JobScheduler> JobSchedulerAdapter<S> {
    /// Create an adapter. `store` must enumerate through the same scheduler.
    pub fn new(scheduler: Arc<S>, store: JobStore<S>) -> Self {
        Self {
            scheduler,
            store,
            callbacks: Mutex::new(HashMap::new()),
        }
    }

    /// Job store kept in step with the scheduler.
    #[must_use]
    pub const fn store(&self) -> &JobStore<S> {
        &self.store
    }

    /// Underlying scheduler.
    #[must_use]
    pub const fn scheduler(&self) -> &Arc<S> {
        &self.scheduler
    }

    /// Number of names with an attached lifecycle callback.
    #[must_use]
    pub fn attached_callbacks(&self) -> usize {
        self.callbacks.lock().len()
    }

    fn configure(&self, descriptor: &TaskDescriptor) -> Result<S::Handle, SchedulerError> {
        let name = descriptor.unique_name.as_str();
        let mut job = self
            .scheduler
            .create_job()
            .map_err(|f| SchedulerError::HandleCreation(f.to_string()))?;
        let rejected = |f: SchedulerFault| SchedulerError::Configuration {
            name: name.to_owned(),
            reason: f.to_string(),
        };

        let constraints = &descriptor.constraints;
        job.set_requires_battery_not_low(constraints.battery_not_low)
            .map_err(rejected)?;
        job.set_requires_charging(constraints.charging).map_err(rejected)?;
        job.set_requires_wifi_connection(constraints.requires_wifi())
            .map_err(rejected)?;

        match descriptor.schedule {
            TaskSchedule::Periodic { frequency } => {
                job.set_periodic(frequency).map_err(rejected)?;
                job.set_persistent(true).map_err(rejected)?;
            }
            TaskSchedule::OneOff => {
                job.set_once(true).map_err(rejected)?;
                job.set_persistent(false).map_err(rejected)?;
            }
        }
        Ok(job)
    }

    /// Schedule `descriptor`, persist its record and attach `callback`.
    ///
    /// When the name is taken, `Replace`/`Update` cancel the existing job and
    /// retry once; `Keep`/`Append` leave the existing job and its payload in
    /// place and report [`Registration::KeptExisting`].
    ///
    /// # Errors
    /// Handle creation, configuration or scheduling failures. Nothing is
    /// persisted in that case. A persistence failure after scheduling cancels
    /// the job again and is reported as [`SchedulerError::Store`].
    pub fn register(
        &self,
        descriptor: &TaskDescriptor,
        callback: Option<Arc<dyn JobService>>,
    ) -> Result<Registration, SchedulerError> {
        let name = descriptor.unique_name.as_str();
        self.store
            .locks()
            .with(name, || self.register_locked(name, descriptor, callback))
    }

    fn register_locked(
        &self,
        name: &str,
        descriptor: &TaskDescriptor,
        callback: Option<Arc<dyn JobService>>,
    ) -> Result<Registration, SchedulerError> {
        let job = self.configure(descriptor)?;
        let outcome = match self.scheduler.schedule(&job, name) {
            Ok(()) => Registration::Scheduled,
            Err(SchedulerFault::AlreadyExists)
                if descriptor.existing_work_policy.replaces_existing() =>
            {
                info!(
                    job = name,
                    policy = %descriptor.existing_work_policy,
                    "job exists; replacing"
                );
                self.cancel_locked(name)?;
                self.scheduler
                    .schedule(&job, name)
                    .map_err(|fault| map_fault(name, &fault))?;
                Registration::Replaced
            }
            Err(SchedulerFault::AlreadyExists) => {
                info!(
                    job = name,
                    policy = %descriptor.existing_work_policy,
                    "job exists; keeping existing registration"
                );
                return Ok(Registration::KeptExisting);
            }
            Err(fault) => {
                warn!(job = name, error = %fault, "scheduler refused job");
                return Err(map_fault(name, &fault));
            }
        };

        if let Err(err) = self.store.put(name, &descriptor.payload, descriptor) {
            warn!(job = name, error = %err, "failed to persist job record; cancelling");
            if let Err(fault) = self.scheduler.cancel(name) {
                warn!(job = name, error = %fault, "rollback cancel failed");
            }
            return Err(err.into());
        }

        if let Some(callback) = callback {
            self.attach(name, callback);
        }

        info!(
            job = name,
            periodic = descriptor.is_periodic(),
            outcome = ?outcome,
            "job registered"
        );
        Ok(outcome)
    }

    /// Attach `callback` to `name`, replacing any previous callback.
    /// Returns whether the scheduler accepted it.
    pub fn attach(&self, name: &str, callback: Arc<dyn JobService>) -> bool {
        match self.scheduler.add_service(name, callback) {
            Ok(service) => {
                let previous = self.callbacks.lock().insert(name.to_owned(), service);
                if let Some(previous) = previous {
                    self.release(name, previous);
                }
                true
            }
            Err(fault) => {
                warn!(job = name, error = %fault, "failed to attach lifecycle callback");
                false
            }
        }
    }

    fn detach(&self, name: &str) {
        let service = self.callbacks.lock().remove(name);
        if let Some(service) = service {
            self.release(name, service);
        }
    }

    fn release(&self, name: &str, service: S::Service) {
        if let Err(fault) = self.scheduler.remove_service(service) {
            debug!(job = name, error = %fault, "failed to detach lifecycle callback");
        }
    }

    /// Cancel `name` and delete its record. Cancelling an unknown name
    /// succeeds. Returns whether a scheduled job was actually cancelled.
    ///
    /// # Errors
    /// Scheduler failures other than "not found"; the record is kept then.
    pub fn cancel_by_name(&self, name: &str) -> Result<bool, SchedulerError> {
        self.store.locks().with(name, || self.cancel_locked(name))
    }

    /// Cancel, detach and forget `name`. Returns whether a scheduled job was
    /// cancelled. Callers hold the name's lock.
    fn cancel_locked(&self, name: &str) -> Result<bool, SchedulerError> {
        let cancelled = match self.scheduler.cancel(name) {
            Ok(()) => {
                info!(job = name, "job cancelled");
                true
            }
            Err(SchedulerFault::NotFound) => {
                debug!(job = name, "no scheduled job to cancel");
                false
            }
            Err(fault) => {
                warn!(job = name, error = %fault, "failed to cancel job");
                return Err(map_fault(name, &fault));
            }
        };
        self.detach(name);
        self.store.delete(name)?;
        Ok(cancelled)
    }

    /// Tag-based cancellation is accepted and ignored.
    ///
    /// # Errors
    /// Never fails.
    pub fn cancel_by_tag(&self, tag: &str) -> Result<(), SchedulerError> {
        info!(tag, "cancel by tag is not supported; ignoring");
        Ok(())
    }

    /// Cancel every scheduled job, then delete every record. Returns how many
    /// jobs were cancelled.
    ///
    /// # Errors
    /// Enumeration failure, or the first cancel failure. Records of jobs that
    /// could not be cancelled are kept.
    pub fn cancel_all(&self) -> Result<usize, SchedulerError> {
        let names = self.list_names()?;
        let mut cancelled = 0;
        let mut failed = BTreeSet::new();
        let mut first_error = None;

        for name in &names {
            let result = self.store.locks().with(name, || match self.scheduler.cancel(name) {
                Ok(()) => {
                    self.detach(name);
                    self.store.delete(name).map(|()| true).map_err(SchedulerError::from)
                }
                Err(SchedulerFault::NotFound) => {
                    self.detach(name);
                    self.store.delete(name).map(|()| false).map_err(SchedulerError::from)
                }
                Err(fault) => {
                    warn!(job = %name, error = %fault, "failed to cancel job");
                    Err(map_fault(name, &fault))
                }
            });
            match result {
                Ok(true) => cancelled += 1,
                Ok(false) => {}
                Err(err) => {
                    failed.insert(name.clone());
                    first_error.get_or_insert(err);
                }
            }
        }

        for name in self.store.record_names()?.difference(&failed) {
            self.store.delete(name)?;
        }

        info!(cancelled, failed = failed.len(), "cancelled all jobs");
        first_error.map_or(Ok(cancelled), Err)
    }

    /// Names the scheduler currently has scheduled.
    ///
    /// # Errors
    /// Enumeration failure.
    pub fn list_names(&self) -> Result<BTreeSet<String>, SchedulerError> {
        self.store.list_names()
    }

    /// Attach `callback` to every scheduled job that has a persisted record.
    /// Returns how many callbacks were attached.
    ///
    /// # Errors
    /// Enumeration or store failures.
    pub fn reattach(&self, callback: &Arc<dyn JobService>) -> Result<usize, SchedulerError> {
        let mut attached = 0;
        for name in self.list_names()? {
            let reattached = self.store.locks().with(&name, || {
                if self.store.get(&name)?.is_none() {
                    debug!(job = %name, "scheduled job has no persisted record; skipping");
                    return Ok::<_, SchedulerError>(false);
                }
                Ok(self.attach(&name, Arc::clone(callback)))
            })?;
            if reattached {
                attached += 1;
            }
        }
        info!(attached, "reattached lifecycle callbacks");
        Ok(attached)
    }
}
