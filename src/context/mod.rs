//! Task contexts: live execution state, snapshots, and the ambient scope.
//!
//! ## Contents
//! - [`LiveTaskContext`] mutable per-execution record and entry/exit protocol
//! - [`StaticTaskContext`] immutable copy handed to event consumers
//! - [`TaskContext`] read-only view shared by both
//! - [`ConcurrentTaskBehavior`] sibling policy
//! - [`TaskScope`] handle a body receives; ambient parent for nested tasks
//! - [`TaskLogger`], [`LogLevel`], [`LogMessage`] task-scoped logging
//!
//! ## Ownership
//! ```text
//! parent ──(Arc, children list)──► child
//! child  ──(Weak, parent link)───► parent
//! ```
//! Parents own their running children; the reverse edge never keeps a parent
//! alive.

mod behavior;
mod live;
mod logger;
mod scope;
mod snapshot;

pub use behavior::ConcurrentTaskBehavior;
pub use live::{ContextSettings, LiveTaskContext};
pub(crate) use live::Entry;
pub use logger::{LogLevel, LogMessage, TaskLogger};
pub use scope::{TaskScope, current_scope};
pub use snapshot::StaticTaskContext;

use crate::error::TaskError;
use crate::tasks::Task;

/// Read-only view over a task context, live or snapshot.
pub trait TaskContext: Send + Sync {
    /// Process-unique id of the underlying live context.
    fn context_id(&self) -> u64;

    /// Task being executed; a state error once the context exited.
    fn task(&self) -> Result<Task, TaskError>;

    /// Distance to the topmost ancestor (0 for roots and settled contexts).
    fn level(&self) -> usize;

    fn is_active(&self) -> bool;

    /// True once settled with no child still registered.
    fn is_completed(&self) -> bool;

    fn is_failed(&self) -> bool {
        self.failure_cause().is_some()
    }

    /// Local failure cause: own body error or own concurrency error.
    fn failure_cause(&self) -> Option<TaskError>;

    /// Number of children registered at the time of the call.
    fn child_count(&self) -> usize;

    /// Logger bound to this context.
    fn logger(&self) -> TaskLogger;
}
