//! Task-builder surface: launching runnables onto tokio.
//!
//! The only types public from this module are [`Launcher`],
//! [`LauncherBuilder`] and [`TaskHandle`].
//!
//! Internal modules:
//! - [`launcher`]: creates live contexts and hands them to the runtime;
//! - [`builder`]: collects config and sinks;
//! - [`handle`]: wraps `JoinHandle` and maps join failures.

mod builder;
mod handle;
mod launcher;

pub use builder::LauncherBuilder;
pub use handle::TaskHandle;
pub use launcher::Launcher;

pub(crate) use handle::join_error;
