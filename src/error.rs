use thiserror::Error;

use crate::state_machine::MachineResult;

/// A domain failure raised by a wizard state while guessing or parsing an
/// answer. The message is shown to the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct UserFacingFailure {
    message: String,
}

impl UserFacingFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Host contract violations. None of these are recoverable by the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsistencyError {
    #[error("session result is WAIT, but no state is pending")]
    WaitWithoutPendingState,

    #[error("an aborted session cannot be resumed")]
    ResumeAborted,

    #[error("session resumed before it was ever evaluated")]
    ResumeUndefined,

    #[error("session has already finished")]
    SessionFinished,

    #[error("no question is pending")]
    NoPendingQuestion,

    #[error("conversation is already over, start the work phase")]
    ConversationOver,

    #[error("work cannot start while the session result is {0}")]
    WorkNotReady(MachineResult),

    #[error("work phase is already running")]
    WorkAlreadyRunning,

    #[error("no states left to work on")]
    NothingToWork,
}

/// Problems detected while validating a state graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("state graph is empty")]
    Empty,

    #[error("duplicate state name: {0}")]
    DuplicateState(String),

    #[error("state `{from}` points to unknown state `{to}`")]
    UnknownState { from: String, to: String },

    #[error("auto-resolve chain loops: {}", .0.join(" -> "))]
    Cycle(Vec<String>),
}
