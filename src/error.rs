//! Error types for the workout core.
//!
//! `StoreError` is what the record-store port reports; `CoreError` is the
//! domain-level error surfaced to callers, with `#[from]` conversion so
//! store failures propagate through `?` without ceremony.

use thiserror::Error;
use uuid::Uuid;

/// Failure reported by a `WorkoutStore` implementation.
///
/// Carries the logical operation name so a caller's log line says which
/// round trip went wrong without the store leaking backend types.
#[derive(Error, Debug, Clone)]
#[error("store operation '{op}' failed: {message}")]
pub struct StoreError {
    pub op: &'static str,
    pub message: String,
}

impl StoreError {
    pub fn new(op: &'static str, message: impl Into<String>) -> Self {
        Self {
            op,
            message: message.into(),
        }
    }
}

/// Main error type for the workout core.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("a session is already active: {0}")]
    SessionAlreadyActive(Uuid),

    #[error("no session is currently active")]
    NoActiveSession,

    #[error("session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("exercise not found: {0}")]
    ExerciseNotFound(Uuid),

    #[error("set not found: {0}")]
    SetNotFound(Uuid),

    #[error("template not found: {0}")]
    TemplateNotFound(Uuid),
}

/// Result alias used throughout the crate.
pub type CoreResult<T> = Result<T, CoreError>;
