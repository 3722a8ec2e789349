use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Computed delta is empty; nothing to save.
    NoOpEdit,
    /// Permission check failed; no state change.
    NotAuthorized,
    /// Base snapshot is stale relative to the log tail; reload and retry.
    ConcurrentAppendConflict,
    /// Inverse-delta replay hit a key-state assumption that does not hold.
    InvalidRemoveTarget,
    /// steps_back outside [0, log length].
    OutOfRangeCursor,
    NotFound,
    InvalidInput,
    Io,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurationError {
    pub code: ErrorCode,
    pub message: String,
}

impl CurationError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn no_op_edit(entity_id: &str) -> Self {
        Self::new(
            ErrorCode::NoOpEdit,
            format!("No attribute changes to save for '{entity_id}'"),
        )
    }

    pub fn not_authorized(user_id: &str, entity_id: &str) -> Self {
        Self::new(
            ErrorCode::NotAuthorized,
            format!("User '{user_id}' is not permitted to modify '{entity_id}'"),
        )
    }

    pub fn append_conflict(entity_id: &str, expected_tail: u64, actual_tail: u64) -> Self {
        Self::new(
            ErrorCode::ConcurrentAppendConflict,
            format!(
                "Edit of '{entity_id}' was based on version {expected_tail} but the log tail is \
                 {actual_tail}; reload the current annotation and re-apply your changes"
            ),
        )
    }

    pub fn invalid_remove_target(entity_id: &str, key: &str) -> Self {
        Self::new(
            ErrorCode::InvalidRemoveTarget,
            format!("Replay for '{entity_id}' removes absent attribute key '{key}'"),
        )
    }

    pub fn out_of_range_cursor(steps_back: usize, history_len: usize) -> Self {
        Self::new(
            ErrorCode::OutOfRangeCursor,
            format!("steps_back {steps_back} outside history range 0..={history_len}"),
        )
    }

    pub fn not_found(entity_id: &str) -> Self {
        Self::new(
            ErrorCode::NotFound,
            format!("Unknown annotation '{entity_id}'"),
        )
    }
}

impl fmt::Display for CurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl Error for CurationError {}
