//! Error taxonomy
//!
//! - [`SceneError`]: raised inside scripts. `EventAlreadyEnded` is the authored
//!   dead end, recoverable and reported to the content author.
//! - [`WaitError`]: `Cancelled` is navigation control flow, never a failure.
//! - [`EngineError`]: engine faults, caught by the outer loop.

use thiserror::Error;

use crate::runtime::coordinator::WaitKind;
use crate::types::{BranchId, EventRef, LocationId};

/// Errors raised while a script runs against a scene
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SceneError {
    #[error("event '{source_ref}' already ended; '{call}' was called after a choice, jump or custom action")]
    EventAlreadyEnded { source_ref: EventRef, call: &'static str },

    #[error("script error in '{source_ref}': {message}")]
    Script { source_ref: EventRef, message: String },
}

impl SceneError {
    pub fn is_dead_end(&self) -> bool {
        matches!(self, SceneError::EventAlreadyEnded { .. })
    }
}

/// Errors from the wait coordinator
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum WaitError {
    #[error("navigation cancelled")]
    Cancelled,

    #[error("a {0:?} wait is already outstanding")]
    AlreadyWaiting(WaitKind),

    #[error("wait resolved with a value of the wrong kind")]
    WrongKind,
}

impl WaitError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, WaitError::Cancelled)
    }
}

/// Errors from custom action dispatchers
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CustomActionError {
    #[error("unknown custom action '{0}'")]
    Unknown(String),

    #[error("invalid arguments for custom action '{id}': {reason}")]
    InvalidArgs { id: String, reason: String },

    #[error("custom action '{id}' failed: {reason}")]
    Failed { id: String, reason: String },
}

/// Engine faults
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("branch '{branch}' is not defined in event '{event}'")]
    UnknownBranch { event: String, branch: BranchId },

    #[error("event '{0}' not found")]
    UnknownEvent(String),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    CustomAction(#[from] CustomActionError),

    #[error("wait failed: {0}")]
    Wait(#[from] WaitError),

    #[error("location '{0}' is not in the catalog")]
    UnknownLocation(LocationId),

    #[error("save data does not match: {0}")]
    SaveMismatch(String),

    #[error("too many consecutive faults ({0})")]
    TooManyFaults(u32),
}

impl EngineError {
    pub fn unknown_branch(event: impl Into<String>, branch: BranchId) -> Self {
        Self::UnknownBranch {
            event: event.into(),
            branch,
        }
    }
}
