//! # Launcher configuration.
//!
//! Provides [`Config`], the settings a [`Launcher`](crate::Launcher) applies
//! to the **root** contexts it creates. Children never read it: they inherit
//! behavior and log threshold from their parent at entry.
//!
//! # Example
//! ```
//! use tasknest::{Config, ConcurrentTaskBehavior, LogLevel};
//!
//! let mut cfg = Config::default();
//! cfg.behavior = ConcurrentTaskBehavior::Await;
//! cfg.log_threshold = LogLevel::INFO;
//! cfg.stream_capacity = 0;
//!
//! assert_eq!(cfg.stream_capacity_clamped(), 1);
//! ```

use crate::context::{ConcurrentTaskBehavior, ContextSettings, LogLevel};

/// Settings for root task contexts and event streams.
///
/// ## Field semantics
/// - `behavior`: sibling policy for the whole tree below a root
/// - `log_threshold`: minimum level emitted as a `Log` event (`OFF` = none)
/// - `stream_capacity`: per-subscription channel size (min 1; clamped)
#[derive(Clone, Debug)]
pub struct Config {
    /// Policy applied when a task starts while its elder sibling is active.
    pub behavior: ConcurrentTaskBehavior,

    /// Messages below this level are dropped before emission.
    pub log_threshold: LogLevel,

    /// Capacity of the channel between a running task and its event-stream
    /// subscriber. A full channel holds the task at its next event.
    pub stream_capacity: usize,
}

impl Config {
    /// Returns a stream capacity clamped to a minimum of 1.
    #[inline]
    pub fn stream_capacity_clamped(&self) -> usize {
        self.stream_capacity.max(1)
    }

    /// Settings handed to root contexts.
    #[inline]
    pub fn settings(&self) -> ContextSettings {
        ContextSettings {
            behavior: self.behavior,
            log_threshold: self.log_threshold.clone(),
        }
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `behavior = Ignore` (siblings may overlap)
    /// - `log_threshold = TRACE` (emit everything)
    /// - `stream_capacity = 64`
    fn default() -> Self {
        Self {
            behavior: ConcurrentTaskBehavior::default(),
            log_threshold: LogLevel::TRACE,
            stream_capacity: 64,
        }
    }
}
