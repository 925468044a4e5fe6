//! # Core sink trait
//!
//! `EventSink` is the extension point for observing task events. A live
//! context hands each event to its sink and **awaits** the call, so a slow
//! sink slows the task that emits to it. This is the back-pressure the event
//! stream relies on; sinks that must never hold a task up should forward
//! into a queue of their own (see [`Bus`](crate::Bus)).
//!
//! ## Contract
//! - Called once per event, in emission order for a given context.
//! - Events of sibling tasks may interleave.
//! - Implementations should not block the async runtime.
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use async_trait::async_trait;
//! use tasknest::{EventSink, TaskEvent};
//!
//! #[derive(Default)]
//! struct FailureCounter(AtomicUsize);
//!
//! #[async_trait]
//! impl EventSink for FailureCounter {
//!     async fn on_event(&self, event: &TaskEvent) {
//!         if let TaskEvent::Fail { .. } = event {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//!     fn name(&self) -> &'static str { "failure-counter" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::TaskEvent;

/// Contract for event consumers attached to task contexts.
#[async_trait]
pub trait EventSink: Send + Sync + 'static {
    /// Handle a single event.
    ///
    /// # Parameters
    /// - `event`: Reference to the event (does not transfer ownership)
    async fn on_event(&self, event: &TaskEvent);

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
