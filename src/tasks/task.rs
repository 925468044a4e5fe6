//! # Task identity.
//!
//! A [`Task`] names a unit of work. It carries no behavior: the body lives in
//! [`TaskRunnable`](crate::TaskRunnable), the execution state in
//! [`LiveTaskContext`](crate::LiveTaskContext).
//!
//! Equality is **identity**, not structure: two tasks created with the same
//! name are different tasks. Cloning a `Task` shares the same identity.
//!
//! ```rust
//! use tasknest::Task;
//!
//! let a = Task::named("fetch");
//! let b = Task::named("fetch");
//! assert_ne!(a, b);
//! assert_eq!(a, a.clone());
//! assert_eq!(a.to_string(), "fetch");
//! ```

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

/// Source of numeric ids used to render anonymous tasks.
static TASK_SEQ: AtomicU64 = AtomicU64::new(1);

struct TaskInner {
    id: u64,
    name: Option<Cow<'static, str>>,
}

/// Opaque, optionally-named identity of a unit of work.
#[derive(Clone)]
pub struct Task {
    inner: Arc<TaskInner>,
}

impl Task {
    /// Creates a task without a display name.
    pub fn anonymous() -> Self {
        Self::build(None)
    }

    /// Creates a task with a display name.
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self::build(Some(name.into()))
    }

    fn build(name: Option<Cow<'static, str>>) -> Self {
        Self {
            inner: Arc::new(TaskInner {
                id: TASK_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
                name,
            }),
        }
    }

    /// Process-unique numeric id.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Display name, if the task is named.
    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    pub fn is_anonymous(&self) -> bool {
        self.inner.name.is_none()
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Task {}

impl Hash for Task {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner.name {
            Some(name) => f.write_str(name),
            None => write!(f, "task-{}", self.inner.id),
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .finish()
    }
}
