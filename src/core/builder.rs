use std::sync::Arc;

use super::launcher::Launcher;
use crate::config::Config;
use crate::sinks::{EventSink, SinkSet};

/// Builder for constructing a [`Launcher`] with optional sinks.
pub struct LauncherBuilder {
    cfg: Config,
    sinks: Vec<Arc<dyn EventSink>>,
}

impl LauncherBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            sinks: Vec::new(),
        }
    }

    /// Sets the event sinks attached to every root this launcher creates.
    ///
    /// Sinks are awaited in order for each event (see [`SinkSet`]).
    pub fn with_sinks(mut self, sinks: Vec<Arc<dyn EventSink>>) -> Self {
        self.sinks = sinks;
        self
    }

    /// Adds one sink after the ones already configured.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Builds the launcher, collapsing the sinks into a single one.
    pub fn build(self) -> Launcher {
        Launcher::new_internal(self.cfg, SinkSet::combine(self.sinks))
    }
}
