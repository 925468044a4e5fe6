//! # Handles to spawned task executions.

use std::fmt;
use std::future::Future;

use tokio::task::{JoinError, JoinHandle};

use crate::context::Entry;
use crate::error::TaskError;
use crate::tasks::{Task, TaskRunnable};

/// Maps a tokio join failure onto the task error family.
pub(crate) fn join_error(task: &Task, err: JoinError) -> TaskError {
    if err.is_panic() {
        TaskError::from_panic(err.into_panic())
    } else {
        TaskError::state(format!("execution of task {task} was aborted"))
    }
}

/// Handle to a task execution spawned onto the tokio runtime.
///
/// Dropping the handle detaches the execution; it keeps running.
pub struct TaskHandle<T> {
    task: Task,
    inner: JoinHandle<Result<T, TaskError>>,
}

impl<T> TaskHandle<T>
where
    T: Send + 'static,
{
    pub(crate) fn spawn<F>(task: Task, fut: F) -> Self
    where
        F: Future<Output = Result<T, TaskError>> + Send + 'static,
    {
        Self {
            task,
            inner: tokio::spawn(fut),
        }
    }

    /// Spawns the body of an already attached context.
    ///
    /// A failed attachment still yields a handle, whose `join` returns the error.
    pub(crate) fn spawn_attached(
        attached: Result<Entry, TaskError>,
        runnable: &TaskRunnable<T>,
    ) -> Self
    where
        T: Clone + Sync,
    {
        let task = runnable.task().clone();
        match attached {
            Ok(entry) => {
                let runnable = runnable.clone();
                Self::spawn(task, async move { entry.run(&runnable).await })
            }
            Err(err) => Self::spawn(task, async move { Err(err) }),
        }
    }

    /// Waits for the execution and returns its result.
    ///
    /// An aborted execution yields a state error; a panic that escaped the
    /// context yields [`TaskError::Panicked`].
    pub async fn join(self) -> Result<T, TaskError> {
        match self.inner.await {
            Ok(res) => res,
            Err(err) => Err(join_error(&self.task, err)),
        }
    }
}

impl<T> TaskHandle<T> {
    pub fn task(&self) -> &Task {
        &self.task
    }

    /// Cancels the execution; its context settles with a state failure.
    pub fn abort(&self) {
        self.inner.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }
}

impl<T> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("task", &self.task)
            .field("finished", &self.inner.is_finished())
            .finish()
    }
}
