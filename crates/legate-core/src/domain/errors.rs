//! Error taxonomy.
//!
//! Three families, matching where each can occur:
//! - [`ValidationError`]: task-spec construction; always surfaced to the
//!   constructing caller, never recovered internally.
//! - [`AgentError`]: raised by the agent collaborator during execution.
//! - [`ExecutionError`]: everything an execution can fail with (agent
//!   failure, deadline elapse, abandoned completion channel).
//!
//! Decode failures are deliberately absent here: an undecodable raw result is
//! a status on the output ([`DecodeStatus::Failed`]), not an error.
//!
//! [`DecodeStatus::Failed`]: super::output::DecodeStatus

use std::time::Duration;
use thiserror::Error;

/// Rejections raised while building a task spec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("id is assigned by the engine and may not be supplied")]
    IdNotSettable,

    #[error("{0} must be provided directly or through overrides")]
    MissingRequiredField(&'static str),

    #[error("at least one output format must be selected")]
    NoOutputFormatSelected,
}

/// Failure reported by the agent collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("agent '{role}' failed: {message}")]
pub struct AgentError {
    pub role: String,
    pub message: String,
}

impl AgentError {
    pub fn new(role: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            message: message.into(),
        }
    }
}

/// Failure of one task execution.
///
/// Synchronous callers receive this directly; asynchronous callers receive it
/// through the completion handle, which always resolves.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error("agent call exceeded the {0:?} deadline")]
    DeadlineExceeded(Duration),

    #[error("execution ended before delivering a result")]
    Abandoned,
}
