//! # Sibling concurrency policy
//!
//! A task has an **elder sibling** when, at the moment it attaches to its
//! parent, the parent's children list already has a first entry. The policy
//! decides what happens if that elder is still active.
//!
//! ## Variants
//! - `Ignore`: proceed immediately; siblings may overlap.
//! - `Await`: suspend until the elder sibling has settled, then proceed.
//! - `Error`: fail immediately with a concurrency error naming the elder.
//!
//! ## Inheritance
//! The policy is fixed at the root (from [`Config::behavior`](crate::Config))
//! and inherited by every descendant at entry time.

/// Policy applied when a task starts while its elder sibling is still active.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ConcurrentTaskBehavior {
    /// Siblings may run concurrently (default).
    ///
    /// Use when:
    /// - The parent deliberately fans out work
    /// - Example: fetching several independent resources
    #[default]
    Ignore,

    /// Wait for the elder sibling to settle before starting.
    ///
    /// Use when:
    /// - Children must run strictly one after another
    /// - Example: migration steps spawned from a loop
    Await,

    /// Refuse to start while the elder sibling is active.
    ///
    /// Use when:
    /// - Overlap indicates a bug in the caller
    /// - Example: tests asserting sequential pipelines
    Error,
}

impl ConcurrentTaskBehavior {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConcurrentTaskBehavior::Ignore => "ignore",
            ConcurrentTaskBehavior::Await => "await",
            ConcurrentTaskBehavior::Error => "error",
        }
    }
}
