//! # Lifecycle and log events emitted by task contexts.
//!
//! A [`TaskEvent`] is one of four variants:
//! - **Begin**: the body is about to run
//! - **Log**: the body logged a message at some [`LogLevel`]
//! - **Finish**: the body returned a value and no child was left running
//! - **Fail**: the body failed, panicked, or broke a hierarchy rule
//!
//! Every event carries [`EventMeta`]: a global sequence number, a wall-clock
//! timestamp, the originating [`Task`], and a [`StaticTaskContext`] copied at
//! the moment of emission.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Per context, `Begin` precedes every `Log`, and exactly one of
//! `Finish`/`Fail` comes last.
//!
//! ## Example
//! ```rust
//! use tasknest::{EventKind, TaskEvent};
//!
//! fn describe(ev: &TaskEvent) -> String {
//!     match ev {
//!         TaskEvent::Log { level, message, .. } => format!("[{level}] {message}"),
//!         other => format!("[{}] {}", other.kind().as_label(), other.meta().task),
//!     }
//! }
//! # let _ = describe;
//! # let _ = EventKind::Begin;
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::context::{LogLevel, LogMessage, StaticTaskContext};
use crate::error::TaskError;
use crate::tasks::Task;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of task events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Begin,
    Log,
    Finish,
    Fail,
}

impl EventKind {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            EventKind::Begin => "begin",
            EventKind::Log => "log",
            EventKind::Finish => "finish",
            EventKind::Fail => "fail",
        }
    }
}

/// Data shared by every event variant.
#[derive(Clone, Debug)]
pub struct EventMeta {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Task that emitted the event.
    pub task: Task,
    /// Copy of the emitting context at emission time.
    pub context: StaticTaskContext,
}

impl EventMeta {
    /// Stamps a new sequence number and timestamp.
    pub(crate) fn capture(task: Task, context: StaticTaskContext) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            task,
            context,
        }
    }
}

/// Type-erased successful result carried by [`TaskEvent::Finish`].
#[derive(Clone)]
pub struct TaskOutput {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl TaskOutput {
    pub(crate) fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// The result, if it has type `T`.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    pub fn is<T: 'static>(&self) -> bool {
        self.value.is::<T>()
    }

    /// Name of the concrete result type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for TaskOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TaskOutput<{}>", self.type_name)
    }
}

/// Event emitted by a live task context.
#[derive(Clone, Debug)]
pub enum TaskEvent {
    /// Body is about to start.
    Begin { meta: EventMeta },

    /// Message logged by the body.
    ///
    /// `message` is evaluated the first time any consumer reads it.
    Log {
        meta: EventMeta,
        level: LogLevel,
        message: LogMessage,
    },

    /// Body returned successfully with no child left running.
    Finish { meta: EventMeta, result: TaskOutput },

    /// Execution failed; `error` is also the context's failure cause.
    Fail { meta: EventMeta, error: TaskError },
}

impl TaskEvent {
    #[inline]
    pub fn meta(&self) -> &EventMeta {
        match self {
            TaskEvent::Begin { meta }
            | TaskEvent::Log { meta, .. }
            | TaskEvent::Finish { meta, .. }
            | TaskEvent::Fail { meta, .. } => meta,
        }
    }

    #[inline]
    pub fn kind(&self) -> EventKind {
        match self {
            TaskEvent::Begin { .. } => EventKind::Begin,
            TaskEvent::Log { .. } => EventKind::Log,
            TaskEvent::Finish { .. } => EventKind::Finish,
            TaskEvent::Fail { .. } => EventKind::Fail,
        }
    }

    #[inline]
    pub fn task(&self) -> &Task {
        &self.meta().task
    }

    /// Snapshot of the emitting context.
    #[inline]
    pub fn context(&self) -> &StaticTaskContext {
        &self.meta().context
    }

    /// True for `Finish` and `Fail`, the last event of a context.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskEvent::Finish { .. } | TaskEvent::Fail { .. })
    }
}
