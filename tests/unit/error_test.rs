//! Tests for error codes and caller-facing errors

use prometheus_workmanager::core::{
    ErrorCode, ProtocolError, SchedulerError, StoreError, TransportError, WorkError,
};
use prometheus_workmanager::runtime::CallError;

#[test]
fn test_error_code_strings() {
    assert_eq!(ErrorCode::InvalidArgument.as_str(), "invalid-argument");
    assert_eq!(ErrorCode::OperationFailed.to_string(), "operation-failed");
    assert_eq!(ErrorCode::NotInitialized.as_str(), "not-initialized");
}

#[test]
fn test_work_error_codes() {
    assert_eq!(WorkError::InvalidArgument("x".into()).code(), ErrorCode::InvalidArgument);
    assert_eq!(WorkError::NotInitialized.code(), ErrorCode::NotInitialized);
    assert_eq!(
        WorkError::from(SchedulerError::AlreadyExists("a".into())).code(),
        ErrorCode::OperationFailed
    );
    assert_eq!(
        WorkError::from(StoreError::Io("disk".into())).code(),
        ErrorCode::OperationFailed
    );
    assert_eq!(
        WorkError::from(ProtocolError::MissingField("uniqueName")).code(),
        ErrorCode::OperationFailed
    );
    assert_eq!(
        WorkError::from(TransportError::Unreachable("gone".into())).code(),
        ErrorCode::OperationFailed
    );
}

#[test]
fn test_call_error_from_work_error() {
    let err = CallError::from(WorkError::NotInitialized);
    assert_eq!(err.code, ErrorCode::NotInitialized);
    let body = err.to_json();
    assert_eq!(body["code"], "not-initialized");
    assert!(body["message"].as_str().unwrap().contains("initialize"));
}

#[test]
fn test_scheduler_error_display() {
    let err = SchedulerError::Rejected {
        name: "sync".into(),
        reason: "permission denied".into(),
    };
    assert_eq!(err.to_string(), "scheduler rejected job `sync`: permission denied");
}
