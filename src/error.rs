//! Error types used by the task hierarchy engine.
//!
//! Every failure raised by this crate belongs to one family, [`TaskError`],
//! tagged by [`ErrorKind`]:
//!
//! - **State**: usage errors (re-entering a context, reading identity after exit,
//!   logging from an exited or static context, refilling a result slot).
//! - **Concurrency**: hierarchy violations (dead parent on attach, children still
//!   active on exit, sibling policy violation under `Error` mode).
//! - **Body**: failures raised by user-supplied task bodies, including panics.
//!
//! Like the rest of the crate, errors are never retried; they are recorded,
//! reported through events and returned to the caller.

use thiserror::Error;

/// Coarse classification of a [`TaskError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Programming-usage error.
    State,
    /// Hierarchy/lifecycle violation.
    Concurrency,
    /// Failure raised by a task body.
    Body,
}

/// # Errors produced by task contexts and task bodies.
///
/// `TaskError` is `Clone` so the same cause can be stored as a context's
/// failure cause, copied into snapshots and [`Fail`](crate::TaskEvent::Fail)
/// events, and returned to the caller.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Invalid use of a context, logger or result slot.
    #[error("invalid task state: {reason}")]
    State {
        /// What was attempted and why it is not allowed.
        reason: String,
    },

    /// Structured-concurrency rule violated.
    #[error("concurrency violation: {reason} (tasks: {tasks:?})")]
    Concurrency {
        /// Description of the violation.
        reason: String,
        /// Display names of the offending tasks.
        tasks: Vec<String>,
    },

    /// Task body returned an error.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Task body panicked.
    #[error("task panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },
}

impl TaskError {
    /// Builds a [`TaskError::State`].
    pub fn state(reason: impl Into<String>) -> Self {
        TaskError::State {
            reason: reason.into(),
        }
    }

    /// Builds a [`TaskError::Concurrency`] naming the offending tasks.
    pub fn concurrency<I, S>(reason: impl Into<String>, tasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        TaskError::Concurrency {
            reason: reason.into(),
            tasks: tasks.into_iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Builds a body failure ([`TaskError::Fail`]).
    ///
    /// # Example
    /// ```
    /// use tasknest::{ErrorKind, TaskError};
    ///
    /// let err = TaskError::fail("connection refused");
    /// assert_eq!(err.kind(), ErrorKind::Body);
    /// assert_eq!(err.to_string(), "execution failed: connection refused");
    /// ```
    pub fn fail(error: impl std::fmt::Display) -> Self {
        TaskError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns the family tag of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TaskError::State { .. } => ErrorKind::State,
            TaskError::Concurrency { .. } => ErrorKind::Concurrency,
            TaskError::Fail { .. } | TaskError::Panicked { .. } => ErrorKind::Body,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use tasknest::TaskError;
    ///
    /// let err = TaskError::state("already entered");
    /// assert_eq!(err.as_label(), "task_state");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::State { .. } => "task_state",
            TaskError::Concurrency { .. } => "task_concurrency",
            TaskError::Fail { .. } => "task_failed",
            TaskError::Panicked { .. } => "task_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TaskError::State { reason } => format!("state: {reason}"),
            TaskError::Concurrency { reason, tasks } => {
                format!("concurrency: {reason}; tasks={tasks:?}")
            }
            TaskError::Fail { error } => format!("error: {error}"),
            TaskError::Panicked { info } => format!("panic: {info}"),
        }
    }

    /// Names of the tasks involved in a concurrency violation (empty otherwise).
    pub fn offending_tasks(&self) -> &[String] {
        match self {
            TaskError::Concurrency { tasks, .. } => tasks,
            _ => &[],
        }
    }

    /// Indicates whether this error came from a task body rather than the engine.
    pub fn is_body_failure(&self) -> bool {
        self.kind() == ErrorKind::Body
    }

    /// Renders a caught panic payload, as produced by `catch_unwind`.
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let info = if let Some(msg) = payload.downcast_ref::<&'static str>() {
            (*msg).to_string()
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            msg.clone()
        } else {
            "unknown panic".to_string()
        };
        TaskError::Panicked { info }
    }
}
