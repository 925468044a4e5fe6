//! # Event sinks.
//!
//! This module provides the [`EventSink`] trait and built-in implementations
//! for consuming events emitted by task contexts.
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   LiveTaskContext ── emit(TaskEvent) ──► sink.on_event(&TaskEvent).await
//!                                              │
//!                                 ┌────────────┼──────────────┬─────────────┐
//!                                 ▼            ▼              ▼             ▼
//!                              SinkSet     ChannelSink       Bus        LogWriter
//!                            (fan-out)   (event streams)  (broadcast)   (tracing)
//! ```
//!
//! Children inherit their parent's sink, so a sink attached to a root sees
//! the events of the whole tree.

mod channel;
#[cfg(feature = "logging")]
mod log;
mod sink;
mod sink_set;

pub use channel::ChannelSink;
#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use sink::EventSink;
pub use sink_set::SinkSet;
