//! Integration tests for the job scheduler adapter.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use prometheus_workmanager::core::{
    ConstraintSet, ExistingWorkPolicy, JobScheduler, JobSchedulerAdapter, JobService, JobStore,
    KeyLayout, KeyValueStore, NetworkType, Registration, SchedulerError, SchedulerFault,
    TaskDescriptor,
};
use prometheus_workmanager::infra::{InMemoryJobScheduler, InMemoryPreferences};

#[derive(Default)]
struct CountingService {
    starts: AtomicUsize,
}

impl JobService for CountingService {
    fn on_start(&self, _job_id: &str) {
        self.starts.fetch_add(1, Ordering::SeqCst);
    }

    fn on_stop(&self, _job_id: &str) {}
}

fn counting() -> Option<Arc<dyn JobService>> {
    Some(Arc::new(CountingService::default()))
}

struct Fixture {
    scheduler: Arc<InMemoryJobScheduler>,
    kv: Arc<dyn KeyValueStore>,
    adapter: JobSchedulerAdapter<InMemoryJobScheduler>,
}

fn fixture() -> Fixture {
    let scheduler = Arc::new(InMemoryJobScheduler::with_period_floor(Duration::from_secs(60)));
    let kv: Arc<dyn KeyValueStore> = Arc::new(InMemoryPreferences::new());
    let store = JobStore::new(Arc::clone(&kv), Arc::clone(&scheduler), KeyLayout::default());
    let adapter = JobSchedulerAdapter::new(Arc::clone(&scheduler), store);
    Fixture { scheduler, kv, adapter }
}

#[test]
fn test_periodic_job_is_persistent() {
    let f = fixture();
    let d = TaskDescriptor::periodic("sync", "sync", Duration::from_secs(3600))
        .with_constraints(ConstraintSet {
            network_type: NetworkType::Unmetered,
            battery_not_low: true,
            ..ConstraintSet::default()
        })
        .with_payload("{\"v\":1}");

    assert_eq!(f.adapter.register(&d, None).unwrap(), Registration::Scheduled);
    let job = f.scheduler.job("sync").unwrap();
    assert!(job.persistent);
    assert!(!job.once);
    assert_eq!(job.period, Some(Duration::from_secs(3600)));
    assert!(job.requires_wifi_connection);
    assert!(job.requires_battery_not_low);
    assert!(!job.requires_charging);
    assert_eq!(f.kv.get("WmPayload_sync").unwrap().as_deref(), Some("{\"v\":1}"));
}

#[test]
fn test_one_off_job_runs_once() {
    let f = fixture();
    let d = TaskDescriptor::one_off("upload", "upload").with_constraints(ConstraintSet {
        network_type: NetworkType::Metered,
        charging: true,
        ..ConstraintSet::default()
    });
    f.adapter.register(&d, None).unwrap();
    let job = f.scheduler.job("upload").unwrap();
    assert!(job.once);
    assert!(!job.persistent);
    assert!(!job.requires_wifi_connection);
    assert!(job.requires_charging);
}

#[test]
fn test_short_period_is_raised_by_scheduler() {
    let f = fixture();
    let d = TaskDescriptor::periodic("fast", "fast", Duration::from_secs(5));
    f.adapter.register(&d, None).unwrap();
    assert_eq!(f.scheduler.job("fast").unwrap().period, Some(Duration::from_secs(60)));
}

#[test]
fn test_keep_leaves_existing_job() {
    let f = fixture();
    let first = TaskDescriptor::one_off("a", "a").with_payload("first");
    let second = TaskDescriptor::one_off("a", "a")
        .with_payload("second")
        .with_existing_work_policy(ExistingWorkPolicy::Keep);

    f.adapter.register(&first, None).unwrap();
    assert_eq!(f.adapter.register(&second, None).unwrap(), Registration::KeptExisting);
    assert_eq!(f.adapter.store().get_payload("a").unwrap().as_deref(), Some("first"));
    assert_eq!(f.scheduler.job_count(), 1);

    let append = second.with_existing_work_policy(ExistingWorkPolicy::Append);
    assert_eq!(f.adapter.register(&append, None).unwrap(), Registration::KeptExisting);
    assert_eq!(f.adapter.store().get_payload("a").unwrap().as_deref(), Some("first"));
}

#[test]
fn test_replace_swaps_job_and_callback() {
    let f = fixture();
    let old_cb = Arc::new(CountingService::default());
    let new_cb = Arc::new(CountingService::default());
    let first = TaskDescriptor::one_off("a", "a").with_payload("first");
    let second = TaskDescriptor::periodic("a", "a", Duration::from_secs(120))
        .with_payload("second")
        .with_existing_work_policy(ExistingWorkPolicy::Replace);

    f.adapter.register(&first, Some(old_cb.clone() as Arc<dyn JobService>)).unwrap();
    assert_eq!(
        f.adapter.register(&second, Some(new_cb.clone() as Arc<dyn JobService>)).unwrap(),
        Registration::Replaced
    );
    assert_eq!(f.adapter.store().get_payload("a").unwrap().as_deref(), Some("second"));
    assert!(f.scheduler.job("a").unwrap().persistent);
    assert_eq!(f.scheduler.service_count("a"), 1);
    assert_eq!(f.adapter.attached_callbacks(), 1);

    f.scheduler.fire_start("a");
    assert_eq!(old_cb.starts.load(Ordering::SeqCst), 0);
    assert_eq!(new_cb.starts.load(Ordering::SeqCst), 1);
}

#[test]
fn test_update_retry_failure_is_surfaced() {
    let f = fixture();
    f.adapter.register(&TaskDescriptor::one_off("a", "a"), None).unwrap();

    f.scheduler.fail_next_schedule(SchedulerFault::AlreadyExists);
    f.scheduler.fail_next_schedule(SchedulerFault::AlreadyExists);
    let update =
        TaskDescriptor::one_off("a", "a").with_existing_work_policy(ExistingWorkPolicy::Update);
    assert!(matches!(
        f.adapter.register(&update, None),
        Err(SchedulerError::AlreadyExists(name)) if name == "a"
    ));
}

#[test]
fn test_failed_replacement_leaves_no_stale_record() {
    let f = fixture();
    let old_cb = Arc::new(CountingService::default());
    f.adapter
        .register(
            &TaskDescriptor::one_off("a", "a").with_payload("first"),
            Some(old_cb as Arc<dyn JobService>),
        )
        .unwrap();

    f.scheduler.fail_next_schedule(SchedulerFault::AlreadyExists);
    f.scheduler.fail_next_schedule(SchedulerFault::Io);
    let replacement = TaskDescriptor::one_off("a", "a")
        .with_payload("second")
        .with_existing_work_policy(ExistingWorkPolicy::Replace);
    assert!(matches!(
        f.adapter.register(&replacement, None),
        Err(SchedulerError::Unavailable(_))
    ));

    assert!(f.adapter.list_names().unwrap().is_empty());
    assert!(f.adapter.store().get("a").unwrap().is_none());
    assert!(f.adapter.store().get_payload("a").unwrap().is_none());
    assert_eq!(f.adapter.attached_callbacks(), 0);
}

#[test]
fn test_scheduler_refusal_persists_nothing() {
    let f = fixture();
    f.scheduler.fail_next_schedule(SchedulerFault::PermissionDenied);
    let d = TaskDescriptor::one_off("denied", "denied").with_payload("p");
    assert!(matches!(
        f.adapter.register(&d, counting()),
        Err(SchedulerError::Rejected { .. })
    ));
    assert!(f.adapter.store().get("denied").unwrap().is_none());
    assert_eq!(f.scheduler.job_count(), 0);
    assert_eq!(f.adapter.attached_callbacks(), 0);
}

#[test]
fn test_zero_period_is_a_configuration_error() {
    let f = fixture();
    let d = TaskDescriptor::periodic("zero", "zero", Duration::ZERO);
    assert!(matches!(
        f.adapter.register(&d, None),
        Err(SchedulerError::Configuration { .. })
    ));
    assert!(f.adapter.store().get("zero").unwrap().is_none());
}

#[test]
fn test_cancel_by_name_is_idempotent() {
    let f = fixture();
    f.adapter
        .register(&TaskDescriptor::one_off("a", "a"), counting())
        .unwrap();
    assert!(f.adapter.cancel_by_name("a").unwrap());
    assert_eq!(f.scheduler.job_count(), 0);
    assert_eq!(f.scheduler.service_count("a"), 0);
    assert!(f.adapter.store().get("a").unwrap().is_none());
    assert!(!f.adapter.cancel_by_name("a").unwrap());
    assert!(!f.adapter.cancel_by_name("never-registered").unwrap());
    assert!(f.adapter.store().locks().is_empty());
}

#[test]
fn test_cancel_failure_keeps_record() {
    let f = fixture();
    f.adapter.register(&TaskDescriptor::one_off("a", "a"), None).unwrap();
    f.scheduler.fail_next_cancel(SchedulerFault::Io);
    assert!(matches!(
        f.adapter.cancel_by_name("a"),
        Err(SchedulerError::Unavailable(_))
    ));
    assert!(f.adapter.store().get("a").unwrap().is_some());
}

#[test]
fn test_cancel_by_tag_is_a_no_op() {
    let f = fixture();
    f.adapter
        .register(&TaskDescriptor::one_off("a", "a").with_tag("net"), None)
        .unwrap();
    f.adapter.cancel_by_tag("net").unwrap();
    assert_eq!(f.scheduler.job_count(), 1);
    assert!(f.adapter.store().get("a").unwrap().is_some());
}

#[test]
fn test_cancel_all_clears_everything() {
    let f = fixture();
    for name in ["a", "b", "c"] {
        f.adapter
            .register(&TaskDescriptor::one_off(name, name), counting())
            .unwrap();
    }
    assert_eq!(f.adapter.cancel_all().unwrap(), 3);
    assert!(f.adapter.list_names().unwrap().is_empty());
    assert!(f.adapter.store().record_names().unwrap().is_empty());
    assert_eq!(f.adapter.attached_callbacks(), 0);
    assert!(f.adapter.store().locks().is_empty());
    assert_eq!(f.adapter.cancel_all().unwrap(), 0);
}

#[test]
fn test_reattach_only_persisted_jobs() {
    let f = fixture();
    f.adapter
        .register(&TaskDescriptor::periodic("p", "p", Duration::from_secs(600)), None)
        .unwrap();
    let stray = f.scheduler.create_job().unwrap();
    f.scheduler.schedule(&stray, "stray").unwrap();

    let callback: Arc<dyn JobService> = Arc::new(CountingService::default());
    assert_eq!(f.adapter.reattach(&callback).unwrap(), 1);
    assert_eq!(f.scheduler.service_count("p"), 1);
    assert_eq!(f.scheduler.service_count("stray"), 0);
}
