//! Caller-facing request/response models.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::{ErrorCode, WorkError};

/// An inbound `(method, arguments)` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    /// Method name.
    pub method: String,
    /// Argument map, or any value for methods without arguments.
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    /// Build a call.
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }
}

/// Failure reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallError {
    /// Machine-readable code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

impl CallError {
    /// JSON body `{ "code": ..., "message": ... }`.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({ "code": self.code.as_str(), "message": self.message })
    }
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for CallError {}

impl From<WorkError> for CallError {
    fn from(err: WorkError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

/// Result of a call.
pub type CallResult = Result<(), CallError>;
