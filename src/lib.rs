//! # tasknest
//!
//! **tasknest** is a structured-concurrency layer for tokio.
//!
//! Tasks form a strict parent/child hierarchy: a parent cannot finish while
//! a child is still running, a child cannot attach to a parent that already
//! finished, and siblings follow a configurable overlap policy. Every
//! transition is reported as a [`TaskEvent`] carrying an immutable
//! [`StaticTaskContext`] copy, so consumers never race the live state.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ TaskRunnable │   │ TaskRunnable │   │ TaskRunnable │
//!     │ (task + body)│   │ (task + body)│   │ (task + body)│
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Launcher (task-builder surface)                                  │
//! │  - run / spawn / run_blocking / events                            │
//! │  - ambient parent lookup (tokio task-local TaskScope)             │
//! │  - Config for roots, EventSink(s) for reporting                   │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │LiveTaskContext│  │LiveTaskContext│  │LiveTaskContext│
//!     │  (root)      │──►│  (child)     │──►│ (grandchild) │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘
//!      │ Begin / Log /    │                  │
//!      │ Finish / Fail    │                  │
//!      ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │         EventSink (SinkSet / ChannelSink / Bus / LogWriter)       │
//! │             each event: seq, at, task, StaticTaskContext          │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! LiveTaskContext::enter(parent, sink, settings, runnable)
//!   ├─► re-entry?            ─► State error (nothing emitted)
//!   ├─► parent dead/closing? ─► Concurrency error (nothing emitted)
//!   ├─► register in parent's children, mark active
//!   ├─► elder sibling active?
//!   │       ├─ Ignore ─► proceed
//!   │       ├─ Await  ─► wait until the elder settles
//!   │       └─ Error  ─► Fail{Concurrency}, settle
//!   ├─► Begin
//!   ├─► body(TaskScope)       (Log events)
//!   ├─► children still registered? ─► Fail{Concurrency}
//!   ├─► Finish{result} | Fail{error}
//!   └─► settle: deregister, inactive, clear task/parent/sink
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                         |
//! |-------------------|--------------------------------------------------------------|--------------------------------------------|
//! | **Tasks**         | Identity and bodies, re-runnable.                            | [`Task`], [`TaskRunnable`]                 |
//! | **Contexts**      | Live hierarchy engine and immutable snapshots.               | [`LiveTaskContext`], [`StaticTaskContext`] |
//! | **Policies**      | Sibling overlap rules.                                       | [`ConcurrentTaskBehavior`]                 |
//! | **Events**        | Lifecycle/log events and cold event streams.                 | [`TaskEvent`], [`EventStream`]             |
//! | **Sinks**         | Hook into events (channels, broadcast, tracing).             | [`EventSink`], [`SinkSet`], [`Bus`]        |
//! | **Logging**       | Task-scoped lazy logging with ranked levels.                 | [`TaskLogger`], [`LogLevel`]               |
//! | **Errors**        | One error family tagged by kind.                             | [`TaskError`], [`ErrorKind`]               |
//! | **Configuration** | Root policy, log threshold, stream capacity.                 | [`Config`]                                 |
//!
//! ## Optional features
//! - `logging` (default): exports the [`LogWriter`] sink that renders events through `tracing`.
//!
//! ## Example
//! ```rust
//! use tasknest::{Config, Launcher, TaskContext, TaskError, TaskRunnable};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), TaskError> {
//!     let leaf = TaskRunnable::named("leaf", |scope| async move {
//!         scope.task_logger().info("working").await?;
//!         Ok(scope.task_context().level())
//!     });
//!     let root = TaskRunnable::named("root", move |scope| {
//!         let leaf = leaf.clone();
//!         async move {
//!             let a = scope.spawn(&leaf);
//!             let b = scope.spawn(&leaf);
//!             Ok(a.join().await? + b.join().await?)
//!         }
//!     });
//!
//!     let launcher = Launcher::new(Config::default());
//!     assert_eq!(launcher.run(&root).await?, 2);
//!     Ok(())
//! }
//! ```
mod config;
mod context;
mod core;
mod error;
mod events;
mod sinks;
mod tasks;

// ---- Public re-exports ----

pub use config::Config;
pub use context::{
    ConcurrentTaskBehavior, ContextSettings, LiveTaskContext, LogLevel, LogMessage,
    StaticTaskContext, TaskContext, TaskLogger, TaskScope, current_scope,
};
pub use core::{Launcher, LauncherBuilder, TaskHandle};
pub use error::{ErrorKind, TaskError};
pub use events::{Bus, EventItem, EventKind, EventMeta, EventStream, TaskEvent, TaskOutput};
pub use sinks::{ChannelSink, EventSink, SinkSet};
pub use tasks::{ResultSlot, Task, TaskRunnable};

// Optional: expose a built-in tracing sink.
// Enabled by default; disable with `default-features = false`.
#[cfg(feature = "logging")]
pub use sinks::LogWriter;
