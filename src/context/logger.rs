//! # Task-scoped logging.
//!
//! A [`TaskLogger`] is bound to exactly one context. Logging through a live
//! context emits a [`TaskEvent::Log`](crate::TaskEvent::Log) carrying a
//! [`LogLevel`] and a [`LogMessage`]; a snapshot's logger always fails.
//!
//! ## Rules
//! - Messages are **lazy**: a closure passed to [`TaskLogger::log_with`] runs
//!   only when a consumer reads the message, never when nobody listens.
//! - Levels compare by **rank only**; the display name is cosmetic, so a custom
//!   level can coexist with a built-in one of the same rank.
//! - [`LogLevel::OFF`] is a threshold, never an emitted level: logging at `OFF`
//!   is a no-op, and a context whose threshold is `OFF` emits no log events.
//! - Logging after the context exited is a state error.
//!
//! ## Example
//! ```rust
//! use tasknest::{LogLevel, TaskError, TaskRunnable};
//!
//! # async fn demo() -> Result<(), TaskError> {
//! let job = TaskRunnable::named("indexer", |scope| async move {
//!     let log = scope.task_logger();
//!     log.info("starting").await?;
//!     log.log_with(LogLevel::DEBUG, || format!("{} shards", 4)).await?;
//!     Ok(())
//! });
//! job.run().await?;
//! # Ok(())
//! # }
//! ```

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, LazyLock, Weak};

use crate::context::live::LiveTaskContext;
use crate::error::TaskError;

/// Severity of a log message, ordered by numeric rank.
#[derive(Clone, Debug)]
pub struct LogLevel {
    rank: u16,
    name: Cow<'static, str>,
}

impl LogLevel {
    pub const TRACE: LogLevel = LogLevel::builtin(100, "trace");
    pub const DEBUG: LogLevel = LogLevel::builtin(200, "debug");
    pub const INFO: LogLevel = LogLevel::builtin(300, "info");
    pub const WARN: LogLevel = LogLevel::builtin(400, "warn");
    pub const ERROR: LogLevel = LogLevel::builtin(500, "error");
    pub const FATAL: LogLevel = LogLevel::builtin(600, "fatal");
    /// Suppression threshold; never emitted.
    pub const OFF: LogLevel = LogLevel::builtin(u16::MAX, "off");

    const fn builtin(rank: u16, name: &'static str) -> Self {
        Self {
            rank,
            name: Cow::Borrowed(name),
        }
    }

    /// Creates a custom level.
    ///
    /// ```
    /// use tasknest::LogLevel;
    ///
    /// let notice = LogLevel::custom("notice", 300);
    /// assert_eq!(notice, LogLevel::INFO);
    /// assert!(notice < LogLevel::WARN);
    /// assert_eq!(notice.name(), "notice");
    /// ```
    pub fn custom(name: impl Into<Cow<'static, str>>, rank: u16) -> Self {
        Self {
            rank,
            name: name.into(),
        }
    }

    pub fn rank(&self) -> u16 {
        self.rank
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True for the suppression-only level (rank of [`LogLevel::OFF`]).
    pub fn is_off(&self) -> bool {
        self.rank == Self::OFF.rank
    }
}

impl PartialEq for LogLevel {
    fn eq(&self, other: &Self) -> bool {
        self.rank == other.rank
    }
}

impl Eq for LogLevel {}

impl PartialOrd for LogLevel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LogLevel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank.cmp(&other.rank)
    }
}

impl Hash for LogLevel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank.hash(state);
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

type Thunk = Box<dyn FnOnce() -> String + Send>;

/// A log message evaluated on first read.
///
/// Cloning shares the same underlying value: the thunk runs at most once no
/// matter how many consumers observe the event.
#[derive(Clone)]
pub struct LogMessage {
    inner: Arc<LazyLock<String, Thunk>>,
}

impl LogMessage {
    /// Wraps a closure producing the message on demand.
    pub fn lazy<F>(f: F) -> Self
    where
        F: FnOnce() -> String + Send + 'static,
    {
        Self {
            inner: Arc::new(LazyLock::new(Box::new(f) as Thunk)),
        }
    }

    /// Forces evaluation and returns the text.
    pub fn as_str(&self) -> &str {
        LazyLock::force(&self.inner).as_str()
    }
}

impl From<String> for LogMessage {
    fn from(s: String) -> Self {
        LogMessage::lazy(move || s)
    }
}

impl From<&'static str> for LogMessage {
    fn from(s: &'static str) -> Self {
        LogMessage::lazy(move || s.to_string())
    }
}

impl fmt::Display for LogMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for LogMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LogMessage(..)")
    }
}

#[derive(Clone)]
enum LoggerTarget {
    Live(Weak<LiveTaskContext>),
    Snapshot { context_id: u64 },
}

/// Logger bound to a single task context.
#[derive(Clone)]
pub struct TaskLogger {
    target: LoggerTarget,
}

impl TaskLogger {
    pub(crate) fn live(ctx: Weak<LiveTaskContext>) -> Self {
        Self {
            target: LoggerTarget::Live(ctx),
        }
    }

    pub(crate) fn snapshot(context_id: u64) -> Self {
        Self {
            target: LoggerTarget::Snapshot { context_id },
        }
    }

    /// True if this logger belongs to a live context (it may still have exited).
    pub fn is_live(&self) -> bool {
        matches!(self.target, LoggerTarget::Live(_))
    }

    /// Emits a log event at `level`.
    pub async fn log(
        &self,
        level: LogLevel,
        message: impl Into<LogMessage>,
    ) -> Result<(), TaskError> {
        match &self.target {
            LoggerTarget::Snapshot { context_id } => Err(TaskError::state(format!(
                "context-{context_id} is a snapshot; snapshots cannot log"
            ))),
            LoggerTarget::Live(ctx) => match ctx.upgrade() {
                Some(ctx) => ctx.log(level, message.into()).await,
                None => Err(TaskError::state("task context no longer exists")),
            },
        }
    }

    /// Emits a log event whose text is produced by `f` only if someone reads it.
    pub async fn log_with<F>(&self, level: LogLevel, f: F) -> Result<(), TaskError>
    where
        F: FnOnce() -> String + Send + 'static,
    {
        self.log(level, LogMessage::lazy(f)).await
    }

    pub async fn trace(&self, message: impl Into<LogMessage>) -> Result<(), TaskError> {
        self.log(LogLevel::TRACE, message).await
    }

    pub async fn debug(&self, message: impl Into<LogMessage>) -> Result<(), TaskError> {
        self.log(LogLevel::DEBUG, message).await
    }

    pub async fn info(&self, message: impl Into<LogMessage>) -> Result<(), TaskError> {
        self.log(LogLevel::INFO, message).await
    }

    pub async fn warn(&self, message: impl Into<LogMessage>) -> Result<(), TaskError> {
        self.log(LogLevel::WARN, message).await
    }

    pub async fn error(&self, message: impl Into<LogMessage>) -> Result<(), TaskError> {
        self.log(LogLevel::ERROR, message).await
    }

    pub async fn fatal(&self, message: impl Into<LogMessage>) -> Result<(), TaskError> {
        self.log(LogLevel::FATAL, message).await
    }
}

impl fmt::Debug for TaskLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            LoggerTarget::Live(_) => f.write_str("TaskLogger(live)"),
            LoggerTarget::Snapshot { context_id } => {
                write!(f, "TaskLogger(snapshot of context-{context_id})")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TaskContext;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    #[test]
    fn levels_are_totally_ordered_by_rank() {
        let levels = [
            LogLevel::TRACE,
            LogLevel::DEBUG,
            LogLevel::INFO,
            LogLevel::WARN,
            LogLevel::ERROR,
            LogLevel::FATAL,
            LogLevel::OFF,
        ];
        for pair in levels.windows(2) {
            assert!(pair[0] < pair[1], "{} < {}", pair[0], pair[1]);
        }
        assert!(LogLevel::OFF.is_off());
    }

    #[test]
    fn custom_level_equals_builtin_of_same_rank() {
        let verbose = LogLevel::custom("verbose", LogLevel::DEBUG.rank());
        assert_eq!(verbose, LogLevel::DEBUG);
        assert_eq!(verbose.to_string(), "verbose");
        assert_ne!(verbose.name(), LogLevel::DEBUG.name());
    }

    #[test]
    fn lazy_message_runs_once_on_first_read() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let msg = LogMessage::lazy(move || {
            counter.fetch_add(1, AtomicOrdering::SeqCst);
            "expensive".to_string()
        });
        let copy = msg.clone();
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 0);
        assert_eq!(msg.as_str(), "expensive");
        assert_eq!(copy.to_string(), "expensive");
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);
    }

    #[tokio::test]
    async fn snapshot_logger_always_fails() {
        let logger = TaskLogger::snapshot(7);
        assert!(!logger.is_live());
        let err = logger.info("nope").await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::State);
    }

    #[tokio::test]
    async fn logger_of_dropped_context_fails() {
        let logger = LiveTaskContext::new().logger();
        let err = logger.warn("gone").await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::State);
    }
}
