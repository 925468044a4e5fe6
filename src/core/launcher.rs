//! # Launcher: creates task contexts and hands them to tokio.
//!
//! The [`Launcher`] is the adapter between runnables and the runtime. Every
//! operation creates a fresh [`LiveTaskContext`] and enters it, either under
//! the ambient task (looked up with [`current_scope`]) or as a new root.
//!
//! ## Operations
//! ```text
//! run(&r)          ──► enter(ambient parent | root) on the caller's future
//! spawn(&r)        ──► attach under ambient parent ──► tokio::spawn(run body) ──► TaskHandle
//! run_blocking(&r) ──► new current-thread runtime ──► block_on(run(&r))
//! events(&r)       ──► EventStream factory (always a new root per subscription)
//! ```
//!
//! ## Rules
//! - `Config` only shapes roots; children inherit from their parent.
//! - Launcher sinks, if any, replace the inherited sink for the subtree.
//!   Without sinks a child reports to its parent's sink.
//! - `run_blocking` from inside a tokio runtime is a state error.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use tasknest::{ConcurrentTaskBehavior, Config, Launcher, TaskRunnable};
//!
//! let mut cfg = Config::default();
//! cfg.behavior = ConcurrentTaskBehavior::Await;
//!
//! #[cfg(feature = "logging")]
//! let sinks: Vec<Arc<dyn tasknest::EventSink>> = vec![Arc::new(tasknest::LogWriter)];
//! #[cfg(not(feature = "logging"))]
//! let sinks: Vec<Arc<dyn tasknest::EventSink>> = Vec::new();
//!
//! let launcher = Launcher::builder(cfg).with_sinks(sinks).build();
//! let job = TaskRunnable::named("hello", |scope| async move {
//!     scope.task_logger().info("hello from a task").await?;
//!     Ok("done")
//! });
//! assert_eq!(launcher.run_blocking(&job), Ok("done"));
//! ```

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::builder::LauncherBuilder;
use super::handle::TaskHandle;
use crate::config::Config;
use crate::context::{LiveTaskContext, current_scope};
use crate::error::TaskError;
use crate::events::EventStream;
use crate::sinks::EventSink;
use crate::tasks::TaskRunnable;

/// Entry point for running runnables.
#[derive(Clone)]
pub struct Launcher {
    cfg: Config,
    sink: Option<Arc<dyn EventSink>>,
}

impl Launcher {
    /// Creates a launcher without sinks.
    pub fn new(cfg: Config) -> Self {
        Self::new_internal(cfg, None)
    }

    pub(crate) fn new_internal(cfg: Config, sink: Option<Arc<dyn EventSink>>) -> Self {
        Self { cfg, sink }
    }

    /// Creates a builder for attaching sinks.
    pub fn builder(cfg: Config) -> LauncherBuilder {
        LauncherBuilder::new(cfg)
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Runs `runnable` to completion on the current future.
    pub async fn run<T>(&self, runnable: &TaskRunnable<T>) -> Result<T, TaskError>
    where
        T: Clone + Send + Sync + 'static,
    {
        let parent = current_scope().map(|scope| Arc::clone(scope.task_context()));
        LiveTaskContext::new()
            .enter(parent, self.sink.clone(), self.cfg.settings(), runnable)
            .await
    }

    /// Spawns `runnable` onto the tokio runtime.
    ///
    /// The new context is attached under the ambient task here, before the
    /// spawn boundary, so it is registered in call order and its parent
    /// counts it as running from this point on.
    ///
    /// # Panics
    /// If called outside a tokio runtime, like `tokio::spawn`.
    pub fn spawn<T>(&self, runnable: &TaskRunnable<T>) -> TaskHandle<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let parent = current_scope().map(|scope| Arc::clone(scope.task_context()));
        let attached = LiveTaskContext::new().attach(
            parent,
            self.sink.clone(),
            self.cfg.settings(),
            runnable.task(),
        );
        TaskHandle::spawn_attached(attached, runnable)
    }

    /// Runs `runnable` on a private current-thread runtime, blocking the caller.
    pub fn run_blocking<T>(&self, runnable: &TaskRunnable<T>) -> Result<T, TaskError>
    where
        T: Clone + Send + Sync + 'static,
    {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(TaskError::state(format!(
                "run_blocking of task {} called from within a tokio runtime",
                runnable.task()
            )));
        }
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| TaskError::state(format!("failed to start runtime: {e}")))?;
        debug!(task = %runnable.task(), "running task on a blocking runtime");
        rt.block_on(self.run(runnable))
    }

    /// Event-stream factory over `runnable`, using this launcher's settings.
    pub fn events<T>(&self, runnable: &TaskRunnable<T>) -> EventStream<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        EventStream::new(
            runnable.clone(),
            self.cfg.settings(),
            self.cfg.stream_capacity_clamped(),
            self.sink.clone(),
        )
    }
}

impl Default for Launcher {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl fmt::Debug for Launcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Launcher")
            .field("cfg", &self.cfg)
            .field("sink", &self.sink.as_ref().map(|s| s.name()))
            .finish()
    }
}
