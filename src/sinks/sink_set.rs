//! # SinkSet: sequential fan-out over multiple sinks
//!
//! [`SinkSet`] hands each [`TaskEvent`] to several sinks, one after
//! another, awaiting each.
//!
//! ## What it guarantees
//! - Every sink sees every event, in the order they were registered.
//! - The emitting task waits for all sinks (back-pressure is preserved).
//! - Panics inside sinks are caught and logged (isolation).
//!
//! ## Diagram
//! ```text
//!    on_event(&TaskEvent)
//!        ├──► S1.on_event().await
//!        ├──► S2.on_event().await
//!        └──► SN.on_event().await
//! ```

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tracing::error;

use super::EventSink;
use crate::events::TaskEvent;
use crate::error::TaskError;

/// Composite sink that forwards to every member in turn.
pub struct SinkSet {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl SinkSet {
    #[must_use]
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }

    /// Collapses `sinks` into a single sink: `None` when empty, the sink
    /// itself when there is one, a set otherwise.
    pub fn combine(mut sinks: Vec<Arc<dyn EventSink>>) -> Option<Arc<dyn EventSink>> {
        match sinks.len() {
            0 => None,
            1 => sinks.pop(),
            _ => Some(Arc::new(Self::new(sinks))),
        }
    }

    /// True if there are no sinks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Number of sinks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }
}

#[async_trait]
impl EventSink for SinkSet {
    async fn on_event(&self, event: &TaskEvent) {
        for sink in &self.sinks {
            let fut = sink.on_event(event);
            if let Err(panic) = AssertUnwindSafe(fut).catch_unwind().await {
                let err = TaskError::from_panic(panic);
                error!(sink = sink.name(), error = %err, "event sink panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "sink_set"
    }
}
