//! Task events: types, broadcast bus and event streams.
//!
//! ## Contents
//! - [`TaskEvent`], [`EventKind`], [`EventMeta`], [`TaskOutput`] event data model
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`, usable as a sink
//! - [`EventStream`] cold, restartable stream over executions of a runnable
//!
//! ## Quick reference
//! - **Publishers**: live contexts, through whatever [`EventSink`](crate::EventSink)
//!   they were entered with (inherited by children).
//! - **Consumers**: sinks given to a [`Launcher`](crate::Launcher), `Bus`
//!   receivers, and event-stream subscribers.

mod bus;
mod event;
mod stream;

pub use bus::Bus;
pub use event::{EventKind, EventMeta, TaskEvent, TaskOutput};
pub use stream::{EventItem, EventStream};
