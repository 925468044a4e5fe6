//! # Ambient task scope.
//!
//! Every body runs with a [`TaskScope`] installed in a tokio task-local slot.
//! Builders that are not handed a scope explicitly look it up with
//! [`current_scope`] and attach the new task underneath it.
//!
//! ```text
//! body of "outer"                       CURRENT = scope(outer)
//!   ├─► scope.run(&inner)              explicit parent
//!   ├─► inner_runnable.run()           ambient parent via current_scope()
//!   └─► scope.spawn(&inner)            child attached before tokio::spawn
//! ```
//!
//! The slot follows the future, not the thread: anything spawned with plain
//! `tokio::spawn` loses it, which is why [`TaskScope::spawn`] attaches the
//! child to its parent before crossing the spawn boundary.

use std::future::Future;
use std::sync::Arc;

use crate::context::TaskContext;
use crate::context::live::LiveTaskContext;
use crate::context::logger::TaskLogger;
use crate::core::TaskHandle;
use crate::error::TaskError;
use crate::tasks::TaskRunnable;

tokio::task_local! {
    static CURRENT: TaskScope;
}

/// Returns the scope of the task currently running on this future, if any.
pub fn current_scope() -> Option<TaskScope> {
    CURRENT.try_with(TaskScope::clone).ok()
}

/// Runs `fut` with `scope` installed as the ambient scope.
pub(crate) fn with_current<F>(scope: TaskScope, fut: F) -> impl Future<Output = F::Output>
where
    F: Future,
{
    CURRENT.scope(scope, fut)
}

/// Handle a running body gets to its own context.
#[derive(Clone)]
pub struct TaskScope {
    ctx: Arc<LiveTaskContext>,
}

impl TaskScope {
    pub(crate) fn new(ctx: Arc<LiveTaskContext>) -> Self {
        Self { ctx }
    }

    /// Live context of the running task.
    pub fn task_context(&self) -> &Arc<LiveTaskContext> {
        &self.ctx
    }

    /// Logger bound to the running task.
    pub fn task_logger(&self) -> TaskLogger {
        self.ctx.logger()
    }

    /// Runs `runnable` to completion as a child of this task.
    pub async fn run<T>(&self, runnable: &TaskRunnable<T>) -> Result<T, TaskError>
    where
        T: Clone + Send + Sync + 'static,
    {
        LiveTaskContext::new()
            .enter(Some(Arc::clone(&self.ctx)), None, self.ctx.settings(), runnable)
            .await
    }

    /// Spawns `runnable` as a concurrently running child of this task.
    ///
    /// The child is registered before this call returns, so siblings keep
    /// call order. Join the handle before this body returns, otherwise this
    /// task fails its running-children check.
    pub fn spawn<T>(&self, runnable: &TaskRunnable<T>) -> TaskHandle<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let attached = LiveTaskContext::new().attach(
            Some(Arc::clone(&self.ctx)),
            None,
            self.ctx.settings(),
            runnable.task(),
        );
        TaskHandle::spawn_attached(attached, runnable)
    }
}

impl std::fmt::Debug for TaskScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TaskScope").field(&self.ctx.id()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn no_scope_outside_a_task() {
        assert!(current_scope().is_none());
    }

    #[tokio::test]
    async fn scope_is_visible_inside_the_body() {
        let job: TaskRunnable<bool> = TaskRunnable::named("probe", |scope| async move {
            let ambient = current_scope().map(|s| s.task_context().id());
            Ok(ambient == Some(scope.task_context().id()))
        });
        assert_eq!(
            LiveTaskContext::new()
                .enter(None, None, Default::default(), &job)
                .await,
            Ok(true)
        );
        assert!(current_scope().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn spawned_child_attaches_to_scope() {
        let child: TaskRunnable<usize> = TaskRunnable::named("child", |scope| async move {
            Ok(scope.task_context().level())
        });
        let parent: TaskRunnable<(usize, usize)> =
            TaskRunnable::named("parent", move |scope| {
                let child = child.clone();
                async move {
                    let spawned = scope.spawn(&child).join().await?;
                    let inline = scope.run(&child).await?;
                    Ok((spawned, inline))
                }
            });
        let ctx = LiveTaskContext::new();
        let levels = ctx
            .enter(None, None, Default::default(), &parent)
            .await
            .unwrap();
        assert_eq!(levels, (1, 1));
        assert!(ctx.is_completed());
    }
}
