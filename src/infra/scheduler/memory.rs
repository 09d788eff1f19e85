//! In-memory job scheduler.
//!
//! Keeps a job table and a service table behind one mutex. Jobs never fire
//! on their own; [`InMemoryJobScheduler::fire_start`] and
//! [`InMemoryJobScheduler::fire_stop`] play the host's role. Faults can be
//! queued to exercise error paths.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::core::{JobHandle, JobScheduler, JobService, SchedulerFault};

/// Shortest period the scheduler accepts by default.
pub const DEFAULT_PERIOD_FLOOR: Duration = Duration::from_secs(15 * 60);

/// Configuration captured by a job handle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryJobHandle {
    /// Battery-not-low requirement.
    pub requires_battery_not_low: bool,
    /// Charging requirement.
    pub requires_charging: bool,
    /// Wifi requirement.
    pub requires_wifi_connection: bool,
    /// Effective period, after the floor.
    pub period: Option<Duration>,
    /// Run-once flag.
    pub once: bool,
    /// Survives reboot.
    pub persistent: bool,
    floor: Duration,
}

impl JobHandle for MemoryJobHandle {
    fn set_requires_battery_not_low(&mut self, required: bool) -> Result<(), SchedulerFault> {
        self.requires_battery_not_low = required;
        Ok(())
    }

    fn set_requires_charging(&mut self, required: bool) -> Result<(), SchedulerFault> {
        self.requires_charging = required;
        Ok(())
    }

    fn set_requires_wifi_connection(&mut self, required: bool) -> Result<(), SchedulerFault> {
        self.requires_wifi_connection = required;
        Ok(())
    }

    fn set_periodic(&mut self, interval: Duration) -> Result<(), SchedulerFault> {
        if interval.is_zero() {
            return Err(SchedulerFault::InvalidParameter);
        }
        self.period = Some(interval.max(self.floor));
        Ok(())
    }

    fn set_once(&mut self, once: bool) -> Result<(), SchedulerFault> {
        self.once = once;
        Ok(())
    }

    fn set_persistent(&mut self, persistent: bool) -> Result<(), SchedulerFault> {
        self.persistent = persistent;
        Ok(())
    }
}

/// Token returned by [`InMemoryJobScheduler::add_service`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryServiceToken {
    job_id: String,
    id: u64,
}

#[derive(Default)]
struct Tables {
    jobs: BTreeMap<String, MemoryJobHandle>,
    services: HashMap<String, Vec<(u64, Arc<dyn JobService>)>>,
    next_service: u64,
    schedule_faults: VecDeque<SchedulerFault>,
    cancel_faults: VecDeque<SchedulerFault>,
}

/// Host scheduler stand-in for development and tests.
pub struct InMemoryJobScheduler {
    tables: Mutex<Tables>,
    floor: Duration,
}

impl Default for InMemoryJobScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryJobScheduler {
    /// Scheduler with the default period floor.
    #[must_use]
    pub fn new() -> Self {
        Self::with_period_floor(DEFAULT_PERIOD_FLOOR)
    }

    /// Scheduler raising every period to at least `floor`.
    #[must_use]
    pub fn with_period_floor(floor: Duration) -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            floor,
        }
    }

    /// Configuration of the job scheduled under `job_id`.
    #[must_use]
    pub fn job(&self, job_id: &str) -> Option<MemoryJobHandle> {
        self.tables.lock().jobs.get(job_id).cloned()
    }

    /// Number of scheduled jobs.
    #[must_use]
    pub fn job_count(&self) -> usize {
        self.tables.lock().jobs.len()
    }

    /// Number of services attached to `job_id`.
    #[must_use]
    pub fn service_count(&self, job_id: &str) -> usize {
        self.tables.lock().services.get(job_id).map_or(0, Vec::len)
    }

    /// Make the next `schedule` call fail with `fault`.
    pub fn fail_next_schedule(&self, fault: SchedulerFault) {
        self.tables.lock().schedule_faults.push_back(fault);
    }

    /// Make the next `cancel` call fail with `fault`.
    pub fn fail_next_cancel(&self, fault: SchedulerFault) {
        self.tables.lock().cancel_faults.push_back(fault);
    }

    fn services_for(&self, job_id: &str) -> Option<Vec<Arc<dyn JobService>>> {
        let tables = self.tables.lock();
        tables.jobs.get(job_id)?;
        Some(
            tables
                .services
                .get(job_id)
                .map(|list| list.iter().map(|(_, s)| Arc::clone(s)).collect())
                .unwrap_or_default(),
        )
    }

    /// Fire a start for `job_id`. Returns how many services were notified,
    /// or `None` if no such job is scheduled. Run-once jobs are removed
    /// after firing.
    pub fn fire_start(&self, job_id: &str) -> Option<usize> {
        let services = self.services_for(job_id)?;
        for service in &services {
            service.on_start(job_id);
        }
        let mut tables = self.tables.lock();
        if tables.jobs.get(job_id).is_some_and(|job| job.once) {
            tables.jobs.remove(job_id);
        }
        Some(services.len())
    }

    /// Fire a stop for `job_id`. Services are notified even if the job has
    /// already been removed.
    pub fn fire_stop(&self, job_id: &str) -> usize {
        let services: Vec<_> = self
            .tables
            .lock()
            .services
            .get(job_id)
            .map(|list| list.iter().map(|(_, s)| Arc::clone(s)).collect())
            .unwrap_or_default();
        for service in &services {
            service.on_stop(job_id);
        }
        services.len()
    }
}

impl JobScheduler for InMemoryJobScheduler {
    type Handle = MemoryJobHandle;
    type Service = MemoryServiceToken;

    fn create_job(&self) -> Result<Self::Handle, SchedulerFault> {
        Ok(MemoryJobHandle {
            floor: self.floor,
            ..MemoryJobHandle::default()
        })
    }

    fn schedule(&self, job: &Self::Handle, job_id: &str) -> Result<(), SchedulerFault> {
        let mut tables = self.tables.lock();
        if let Some(fault) = tables.schedule_faults.pop_front() {
            return Err(fault);
        }
        if tables.jobs.contains_key(job_id) {
            return Err(SchedulerFault::AlreadyExists);
        }
        tables.jobs.insert(job_id.to_owned(), job.clone());
        Ok(())
    }

    fn cancel(&self, job_id: &str) -> Result<(), SchedulerFault> {
        let mut tables = self.tables.lock();
        if let Some(fault) = tables.cancel_faults.pop_front() {
            return Err(fault);
        }
        tables
            .jobs
            .remove(job_id)
            .map(|_| ())
            .ok_or(SchedulerFault::NotFound)
    }

    fn job_ids(&self) -> Result<Vec<String>, SchedulerFault> {
        Ok(self.tables.lock().jobs.keys().cloned().collect())
    }

    fn add_service(
        &self,
        job_id: &str,
        service: Arc<dyn JobService>,
    ) -> Result<Self::Service, SchedulerFault> {
        let mut tables = self.tables.lock();
        tables.next_service += 1;
        let id = tables.next_service;
        tables
            .services
            .entry(job_id.to_owned())
            .or_default()
            .push((id, service));
        Ok(MemoryServiceToken {
            job_id: job_id.to_owned(),
            id,
        })
    }

    fn remove_service(&self, service: Self::Service) -> Result<(), SchedulerFault> {
        let mut tables = self.tables.lock();
        let list = tables
            .services
            .get_mut(&service.job_id)
            .ok_or(SchedulerFault::NotFound)?;
        let before = list.len();
        list.retain(|(id, _)| *id != service.id);
        if list.len() == before {
            return Err(SchedulerFault::NotFound);
        }
        if list.is_empty() {
            tables.services.remove(&service.job_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl JobService for Counter {
        fn on_start(&self, _job_id: &str) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
        fn on_stop(&self, _job_id: &str) {}
    }

    #[test]
    fn duplicate_schedule_is_already_exists() {
        let scheduler = InMemoryJobScheduler::new();
        let job = scheduler.create_job().unwrap();
        scheduler.schedule(&job, "a").unwrap();
        assert_eq!(scheduler.schedule(&job, "a"), Err(SchedulerFault::AlreadyExists));
        assert_eq!(scheduler.cancel("b"), Err(SchedulerFault::NotFound));
    }

    #[test]
    fn period_is_raised_to_floor() {
        let scheduler = InMemoryJobScheduler::with_period_floor(Duration::from_secs(60));
        let mut job = scheduler.create_job().unwrap();
        job.set_periodic(Duration::from_secs(5)).unwrap();
        assert_eq!(job.period, Some(Duration::from_secs(60)));
        assert_eq!(job.set_periodic(Duration::ZERO), Err(SchedulerFault::InvalidParameter));
    }

    #[test]
    fn once_jobs_are_removed_after_start() {
        let scheduler = InMemoryJobScheduler::new();
        let counter = Arc::new(Counter::default());
        let mut job = scheduler.create_job().unwrap();
        job.set_once(true).unwrap();
        scheduler.schedule(&job, "once").unwrap();
        let token = scheduler.add_service("once", counter.clone()).unwrap();

        assert_eq!(scheduler.fire_start("once"), Some(1));
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.fire_start("once"), None);

        scheduler.remove_service(token.clone()).unwrap();
        assert_eq!(scheduler.remove_service(token), Err(SchedulerFault::NotFound));
    }

    #[test]
    fn queued_faults_fire_once() {
        let scheduler = InMemoryJobScheduler::new();
        let job = scheduler.create_job().unwrap();
        scheduler.fail_next_schedule(SchedulerFault::PermissionDenied);
        assert_eq!(scheduler.schedule(&job, "a"), Err(SchedulerFault::PermissionDenied));
        scheduler.schedule(&job, "a").unwrap();
    }
}
