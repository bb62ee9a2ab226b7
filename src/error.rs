//! Error types for tasktrack
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, invalid entity, unknown epic)
//! - 3: Conflict (time interval overlaps an existing task)
//! - 4: Operation failed (I/O, malformed data file, lock contention)
//!
//! A missing record is not an error: lookups return `Option` and deletes
//! return `bool`.

use std::path::PathBuf;
use thiserror::Error;

use crate::task::{TaskId, TaskType};

/// Exit codes for the tt CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const CONFLICT: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for tasktrack operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Task {0} cannot reference itself as its epic or subtask")]
    SelfReference(TaskId),

    #[error("Epic not found: {0}")]
    EpicNotFound(TaskId),

    #[error("Expected {expected} record, got {actual}")]
    KindMismatch { expected: TaskType, actual: TaskType },

    #[error("Subtask {subtask} belongs to epic {current} and cannot move to epic {requested}")]
    EpicReassignment {
        subtask: TaskId,
        current: TaskId,
        requested: TaskId,
    },

    // Conflicts (exit code 3)
    #[error("Task {id} overlaps in time with task {conflicting}")]
    Overlap { id: TaskId, conflicting: TaskId },

    // Operation failures (exit code 4)
    #[error("Failed to load data file at line {line}: {reason}")]
    Load { line: usize, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidArgument(_)
            | Error::InvalidConfig(_)
            | Error::SelfReference(_)
            | Error::EpicNotFound(_)
            | Error::KindMismatch { .. }
            | Error::EpicReassignment { .. } => exit_codes::USER_ERROR,

            Error::Overlap { .. } => exit_codes::CONFLICT,

            Error::Load { .. }
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::LockFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Error class reported in JSON output, one per exit code.
    pub fn kind(&self) -> &'static str {
        match self.exit_code() {
            exit_codes::USER_ERROR => "user_error",
            exit_codes::CONFLICT => "conflict",
            _ => "operation_failed",
        }
    }

    /// Structured details for JSON output, when the variant carries ids.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::Overlap { id, conflicting } => Some(serde_json::json!({
                "id": id,
                "conflicting": conflicting,
            })),
            Error::Load { line, .. } => Some(serde_json::json!({ "line": line })),
            Error::EpicReassignment {
                subtask,
                current,
                requested,
            } => Some(serde_json::json!({
                "subtask": subtask,
                "current": current,
                "requested": requested,
            })),
            _ => None,
        }
    }
}

/// Result type alias for tasktrack operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            details: err.details(),
        }
    }
}
