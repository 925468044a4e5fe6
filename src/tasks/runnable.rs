//! # Function-backed runnable (`TaskRunnable`)
//!
//! [`TaskRunnable`] pairs a [`Task`] with a closure `F: Fn(TaskScope) -> Fut`,
//! producing a fresh future per execution.
//!
//! ## Execution semantics
//! - Each execution (run, spawn, stream subscription) calls the closure again
//!   and gets a **new** future with its own state and its own live context.
//! - Nothing is mutated between executions; shared state goes through an
//!   explicit `Arc<...>` captured by the closure.
//!
//! ## Example
//! ```rust
//! use tasknest::{TaskError, TaskRunnable};
//!
//! # async fn demo() -> Result<(), TaskError> {
//! let double = TaskRunnable::named("double", |_scope| async { Ok(21 * 2) });
//! assert_eq!(double.run().await?, 42);
//! assert_eq!(double.run().await?, 42);
//! # Ok(())
//! # }
//! ```

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::context::TaskScope;
use crate::core::{Launcher, TaskHandle};
use crate::error::TaskError;
use crate::events::EventStream;
use crate::tasks::task::Task;

type Body<T> = dyn Fn(TaskScope) -> BoxFuture<'static, Result<T, TaskError>> + Send + Sync;

/// A task identity paired with its body.
pub struct TaskRunnable<T> {
    task: Task,
    body: Arc<Body<T>>,
}

impl<T> TaskRunnable<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Pairs an existing task with a body.
    pub fn new<F, Fut>(task: Task, f: F) -> Self
    where
        F: Fn(TaskScope) -> Fut + Send + Sync + 'static, // Fn, not FnMut
        Fut: Future<Output = Result<T, TaskError>> + Send + 'static,
    {
        Self {
            task,
            body: Arc::new(
                move |scope: TaskScope| -> BoxFuture<'static, Result<T, TaskError>> {
                    Box::pin(f(scope))
                },
            ),
        }
    }

    /// Creates a runnable for a new named task.
    pub fn named<F, Fut>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(TaskScope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, TaskError>> + Send + 'static,
    {
        Self::new(Task::named(name), f)
    }

    /// Creates a runnable for a new anonymous task.
    pub fn anonymous<F, Fut>(f: F) -> Self
    where
        F: Fn(TaskScope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, TaskError>> + Send + 'static,
    {
        Self::new(Task::anonymous(), f)
    }

    /// Runs to completion under the ambient task, or as a root with default settings.
    pub async fn run(&self) -> Result<T, TaskError> {
        Launcher::default().run(self).await
    }

    /// Spawns onto the tokio runtime under the ambient task, if any.
    pub fn spawn(&self) -> TaskHandle<T> {
        Launcher::default().spawn(self)
    }

    /// Runs on a private current-thread runtime, blocking the caller.
    ///
    /// Fails with a state error when called from within a tokio runtime.
    pub fn run_blocking(&self) -> Result<T, TaskError> {
        Launcher::default().run_blocking(self)
    }

    /// Cold event stream over executions of this runnable.
    pub fn events(&self) -> EventStream<T> {
        Launcher::default().events(self)
    }
}

impl<T> TaskRunnable<T> {
    pub fn task(&self) -> &Task {
        &self.task
    }

    /// Starts one execution of the body.
    pub(crate) fn call(&self, scope: TaskScope) -> BoxFuture<'static, Result<T, TaskError>> {
        (self.body)(scope)
    }
}

impl<T> Clone for TaskRunnable<T> {
    fn clone(&self) -> Self {
        Self {
            task: self.task.clone(),
            body: Arc::clone(&self.body),
        }
    }
}

impl<T> fmt::Debug for TaskRunnable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRunnable")
            .field("task", &self.task)
            .field("output", &std::any::type_name::<T>())
            .finish()
    }
}
