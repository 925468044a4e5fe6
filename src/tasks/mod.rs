//! # Task identity, runnables and result slots.
//!
//! This module provides the task-related types:
//! - [`Task`] - opaque, optionally-named identity
//! - [`TaskRunnable`] - task paired with its async body
//! - [`ResultSlot`] - write-once capture of a task's result

mod runnable;
mod slot;
mod task;

pub use runnable::TaskRunnable;
pub use slot::ResultSlot;
pub use task::Task;
