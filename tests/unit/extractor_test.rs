//! Tests for argument extraction and command parsing

use std::time::Duration;

use prometheus_workmanager::core::extractor::{
    extract_backoff_policy, extract_constraints, extract_descriptor, extract_existing_work_policy,
    extract_out_of_quota_policy, DEFAULT_PERIODIC_FREQUENCY,
};
use prometheus_workmanager::core::{
    parse_command, ArgumentMap, BackoffPolicy, CancelRequest, Command, ErrorCode,
    ExistingWorkPolicy, NetworkType, OutOfQuotaPolicy, TaskKind, TaskSchedule,
};
use serde_json::{json, Value};

fn args(value: Value) -> ArgumentMap {
    match value {
        Value::Object(map) => map,
        _ => panic!("test arguments must be an object"),
    }
}

#[test]
fn test_existing_work_policy_defaults_to_keep() {
    assert_eq!(extract_existing_work_policy(&args(json!({}))), ExistingWorkPolicy::Keep);
    assert_eq!(
        extract_existing_work_policy(&args(json!({ "existingWorkPolicy": "bogus" }))),
        ExistingWorkPolicy::Keep
    );
    assert_eq!(
        extract_existing_work_policy(&args(json!({ "existingWorkPolicy": "replace" }))),
        ExistingWorkPolicy::Replace
    );
    assert_eq!(
        extract_existing_work_policy(&args(json!({ "existingWorkPolicy": 3 }))),
        ExistingWorkPolicy::Keep
    );
}

#[test]
fn test_constraints_default_to_unconstrained() {
    let constraints = extract_constraints(&args(json!({})));
    assert_eq!(constraints.network_type, NetworkType::NotRequired);
    assert!(!constraints.battery_not_low);
    assert!(!constraints.charging);
    assert!(!constraints.device_idle);
    assert!(!constraints.storage_not_low);
}

#[test]
fn test_constraints_are_read() {
    let constraints = extract_constraints(&args(json!({
        "networkType": "not_roaming",
        "requiresBatteryNotLow": true,
        "requiresCharging": true,
        "requiresDeviceIdle": true,
        "requiresStorageNotLow": "yes",
    })));
    assert_eq!(constraints.network_type, NetworkType::NotRoaming);
    assert!(constraints.battery_not_low);
    assert!(constraints.charging);
    assert!(constraints.device_idle);
    assert!(!constraints.storage_not_low);
}

#[test]
fn test_backoff_defaults_depend_on_kind() {
    let one_off = extract_backoff_policy(&args(json!({})), TaskKind::OneOff);
    assert_eq!(one_off.policy, BackoffPolicy::Linear);
    assert_eq!(one_off.requested_delay, Duration::from_secs(10));

    let periodic = extract_backoff_policy(&args(json!({})), TaskKind::Periodic);
    assert_eq!(periodic.policy, BackoffPolicy::Linear);
    assert_eq!(periodic.requested_delay, Duration::from_secs(15 * 60));
}

#[test]
fn test_backoff_millis_truncate_to_seconds() {
    let cfg = extract_backoff_policy(
        &args(json!({ "backoffPolicyType": "exponential", "backoffDelayInMilliseconds": 12_999 })),
        TaskKind::OneOff,
    );
    assert_eq!(cfg.policy, BackoffPolicy::Exponential);
    assert_eq!(cfg.requested_delay, Duration::from_secs(12));
    assert_eq!(cfg.effective_delay(), Duration::from_secs(12));

    let short = extract_backoff_policy(
        &args(json!({ "backoffPolicyType": "LINEAR", "backoffDelayInMilliseconds": 500 })),
        TaskKind::OneOff,
    );
    assert_eq!(short.effective_delay(), Duration::from_secs(10));
}

#[test]
fn test_out_of_quota_is_optional() {
    assert_eq!(extract_out_of_quota_policy(&args(json!({}))), None);
    assert_eq!(
        extract_out_of_quota_policy(&args(json!({ "outOfQuotaPolicy": "drop_work_request" }))),
        Some(OutOfQuotaPolicy::Drop)
    );
    assert_eq!(
        extract_out_of_quota_policy(&args(json!({ "outOfQuotaPolicy": "later" }))),
        None
    );
}

#[test]
fn test_descriptor_requires_identity() {
    let err = extract_descriptor(&args(json!({ "taskName": "t" })), TaskKind::OneOff).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidArgument);

    let empty = args(json!({ "uniqueName": "", "taskName": "t" }));
    let err = extract_descriptor(&empty, TaskKind::OneOff).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidArgument);

    let mistyped = args(json!({ "uniqueName": 5, "taskName": "t" }));
    let err = extract_descriptor(&mistyped, TaskKind::OneOff).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidArgument);
}

#[test]
fn test_periodic_descriptor() {
    let d = extract_descriptor(
        &args(json!({
            "uniqueName": "sync",
            "taskName": "syncTask",
            "tag": "net",
            "frequency": 3600,
            "initialDelaySeconds": -4,
            "networkType": "unmetered",
            "inputData": "{\"v\":1}",
        })),
        TaskKind::Periodic,
    )
    .unwrap();
    assert_eq!(d.unique_name, "sync");
    assert_eq!(d.display_name, "syncTask");
    assert_eq!(d.tag.as_deref(), Some("net"));
    assert_eq!(d.initial_delay, Duration::ZERO);
    assert_eq!(d.schedule, TaskSchedule::Periodic { frequency: Duration::from_secs(3600) });
    assert_eq!(d.payload, "{\"v\":1}");
    assert!(d.constraints.requires_wifi());
}

#[test]
fn test_periodic_frequency_defaults() {
    let bare = args(json!({ "uniqueName": "a", "taskName": "a" }));
    let d = extract_descriptor(&bare, TaskKind::Periodic).unwrap();
    assert_eq!(d.schedule, TaskSchedule::Periodic { frequency: DEFAULT_PERIODIC_FREQUENCY });
    assert_eq!(d.payload, "");
}

#[test]
fn test_parse_command_methods() {
    assert_eq!(
        parse_command("cancelAllTasks", &Value::Null).unwrap(),
        Command::Cancel(CancelRequest::All)
    );
    assert_eq!(
        parse_command("cancelTaskByTag", &json!({ "tag": "net" })).unwrap(),
        Command::Cancel(CancelRequest::ByTag("net".into()))
    );
    assert_eq!(
        parse_command("cancelTaskByUniqueName", &json!({ "uniqueName": "a" })).unwrap(),
        Command::Cancel(CancelRequest::ByUniqueName("a".into()))
    );
    let init = json!({ "callbackHandle": 77, "isInDebugMode": true });
    match parse_command("initialize", &init).unwrap() {
        Command::Initialize(init) => {
            assert_eq!(init.dispatcher_handle, 77);
            assert!(init.debug_mode);
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn test_parse_command_rejects_bad_input() {
    assert_eq!(
        parse_command("initialize", &json!({})).unwrap_err().code(),
        ErrorCode::InvalidArgument
    );
    assert_eq!(
        parse_command("registerOneOffTask", &json!("nope")).unwrap_err().code(),
        ErrorCode::InvalidArgument
    );
    assert_eq!(
        parse_command("launchRockets", &json!({})).unwrap_err().code(),
        ErrorCode::InvalidArgument
    );
}
