//! Tests for the dispatch message codec

use std::time::Duration;

use prometheus_workmanager::core::protocol::{fields, PROTOCOL_VERSION};
use prometheus_workmanager::core::{
    decode, encode, parse_command, BackoffPolicy, BackoffPolicyConfig, CancelRequest, Command,
    ConstraintSet, ExistingWorkPolicy, InitializeRequest, Message, NetworkType, OutOfQuotaPolicy,
    ProtocolError, TaskDescriptor, TaskSchedule, MAX_DURATION,
};
use rand::Rng;
use serde_json::json;

const NETWORKS: [NetworkType; 6] = [
    NetworkType::NotRequired,
    NetworkType::Connected,
    NetworkType::Metered,
    NetworkType::Unmetered,
    NetworkType::NotRoaming,
    NetworkType::TemporarilyUnmetered,
];

const POLICIES: [ExistingWorkPolicy; 4] = [
    ExistingWorkPolicy::Replace,
    ExistingWorkPolicy::Update,
    ExistingWorkPolicy::Keep,
    ExistingWorkPolicy::Append,
];

fn random_descriptor(rng: &mut impl Rng, i: usize) -> TaskDescriptor {
    let name = format!("task-{i}");
    let mut d = if rng.random_bool(0.5) {
        let frequency = Duration::from_secs(rng.random_range(1..100_000));
        TaskDescriptor::periodic(&name, "display", frequency)
    } else {
        TaskDescriptor::one_off(&name, "display")
    };
    d = d
        .with_constraints(ConstraintSet {
            network_type: NETWORKS[rng.random_range(0..NETWORKS.len())],
            battery_not_low: rng.random_bool(0.5),
            charging: rng.random_bool(0.5),
            device_idle: rng.random_bool(0.5),
            storage_not_low: rng.random_bool(0.5),
        })
        .with_existing_work_policy(POLICIES[rng.random_range(0..POLICIES.len())])
        .with_initial_delay(Duration::from_millis(rng.random_range(0..10_000_000)))
        .with_payload(format!("{{\"n\":{}}}", rng.random_range(0..1000)))
        .with_debug_mode(rng.random_bool(0.5));
    if rng.random_bool(0.5) {
        d = d.with_tag(format!("tag-{}", rng.random_range(0..5)));
    }
    if rng.random_bool(0.5) {
        let kind = d.kind();
        d = d.with_backoff_policy(BackoffPolicyConfig {
            policy: if rng.random_bool(0.5) {
                BackoffPolicy::Linear
            } else {
                BackoffPolicy::Exponential
            },
            requested_delay: Duration::from_secs(rng.random_range(0..5000)),
            minimum_delay: kind.minimum_backoff_delay(),
        });
    }
    if rng.random_bool(0.5) {
        d = d.with_out_of_quota_policy(if rng.random_bool(0.5) {
            OutOfQuotaPolicy::Drop
        } else {
            OutOfQuotaPolicy::RunAsNonExpedited
        });
    }
    d
}

#[test]
fn test_random_descriptors_survive_the_wire() {
    let mut rng = rand::rng();
    for i in 0..200 {
        let command = Command::Register(random_descriptor(&mut rng, i));
        let message = encode(&command);
        assert_eq!(decode(&message).unwrap(), command);
    }
}

#[test]
fn test_initialize_and_cancel_messages() {
    let init = Command::Initialize(InitializeRequest {
        dispatcher_handle: -9_007_199_254,
        debug_mode: true,
    });
    let message = encode(&init);
    assert_eq!(message.get(fields::CALLBACK_HANDLE), Some("-9007199254"));
    assert_eq!(decode(&message).unwrap(), init);

    for cancel in [
        CancelRequest::ByUniqueName("a".into()),
        CancelRequest::ByTag("t".into()),
        CancelRequest::All,
    ] {
        let command = Command::Cancel(cancel);
        assert_eq!(decode(&encode(&command)).unwrap(), command);
    }
}

#[test]
fn test_durations_are_millis() {
    let d = TaskDescriptor::periodic("p", "p", Duration::from_secs(3600))
        .with_initial_delay(Duration::from_millis(1500));
    let message = encode(&Command::Register(d));
    assert_eq!(message.get(fields::FREQUENCY_MS), Some("3600000"));
    assert_eq!(message.get(fields::INITIAL_DELAY_MS), Some("1500"));
}

#[test]
fn test_extreme_durations_survive_the_wire() {
    let args = json!({
        "uniqueName": "far",
        "taskName": "far",
        "initialDelaySeconds": i64::MAX,
        "frequency": i64::MAX,
    });
    for method in ["registerOneOffTask", "registerPeriodicTask"] {
        let command = parse_command(method, &args).unwrap();
        assert_eq!(decode(&encode(&command)).unwrap(), command);
    }

    let Command::Register(d) = parse_command("registerPeriodicTask", &args).unwrap() else {
        panic!("expected a registration");
    };
    assert_eq!(d.initial_delay, MAX_DURATION);
    assert_eq!(d.schedule, TaskSchedule::Periodic { frequency: MAX_DURATION });

    let beyond = TaskDescriptor::one_off("x", "x").with_initial_delay(Duration::MAX);
    let message = encode(&Command::Register(beyond));
    assert_eq!(message.get(fields::INITIAL_DELAY_MS), Some(u64::MAX.to_string().as_str()));
}

#[test]
fn test_version_is_enforced() {
    let mut message = encode(&Command::Cancel(CancelRequest::All));
    assert_eq!(message.get(fields::VERSION), Some(PROTOCOL_VERSION));
    message.insert(fields::VERSION, "2");
    assert_eq!(
        decode(&message),
        Err(ProtocolError::UnsupportedVersion("2".into()))
    );
    message.remove(fields::VERSION);
    assert!(matches!(decode(&message), Err(ProtocolError::UnsupportedVersion(_))));
}

#[test]
fn test_missing_and_unknown_fields() {
    let mut message = encode(&Command::Register(TaskDescriptor::one_off("a", "b")));
    message.remove(fields::UNIQUE_NAME);
    assert_eq!(decode(&message), Err(ProtocolError::MissingField(fields::UNIQUE_NAME)));

    let mut periodic = encode(&Command::Register(TaskDescriptor::periodic(
        "a",
        "b",
        Duration::from_secs(60),
    )));
    periodic.remove(fields::FREQUENCY_MS);
    assert_eq!(decode(&periodic), Err(ProtocolError::MissingField(fields::FREQUENCY_MS)));

    let mut unknown = Message::new();
    unknown.insert(fields::VERSION, PROTOCOL_VERSION);
    unknown.insert(fields::METHOD, "explode");
    assert_eq!(decode(&unknown), Err(ProtocolError::UnknownMethod("explode".into())));
}

#[test]
fn test_message_ids_are_unique() {
    let a = encode(&Command::Cancel(CancelRequest::All));
    let b = encode(&Command::Cancel(CancelRequest::All));
    assert_ne!(a.message_id(), b.message_id());
}
