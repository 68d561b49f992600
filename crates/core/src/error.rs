use thiserror::Error;

use crate::process::EntryId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedError {
    #[error("process {0} not found")]
    NotFound(EntryId),

    #[error("process {0} is already blocked")]
    AlreadyBlocked(EntryId),

    #[error("process {0} is not blocked")]
    AlreadyReady(EntryId),

    #[error("process name '{name}' is longer than {limit} characters")]
    NameTooLong { name: String, limit: usize },

    #[error("could not launch '{target}': {reason}")]
    LaunchFailed { target: String, reason: String },

    #[error("idle worker is no longer alive, scheduler cannot make progress")]
    IdleLost,

    #[error("scheduler actor is not running")]
    ActorGone,
}

impl SchedError {
    /// Only the loss of the idle worker is unrecoverable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SchedError::IdleLost)
    }
}

pub type SchedResult<T> = Result<T, SchedError>;
