//! # Broadcast bus for task events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`]. It implements
//! [`EventSink`], so it can be handed to a [`Launcher`](crate::Launcher) and
//! observed by any number of independent receivers.
//!
//! ## Architecture
//! ```text
//! Contexts (many):                 Receivers (many):
//!   root  ──┐                   ┌──► rx 1
//!   child ──┼──► Bus ───────────┼──► rx 2
//!   child ──┘ (broadcast chan)  └──► rx N
//! ```
//!
//! ## Rules
//! - `publish()` never waits; a task emitting into the bus is not slowed by receivers.
//! - The ring buffer is shared: a receiver that falls behind gets
//!   `RecvError::Lagged(n)` and loses the `n` oldest events.
//! - Events sent while nobody is subscribed are dropped.
//!
//! Use [`ChannelSink`](crate::ChannelSink) instead when the producer must wait
//! for a slow consumer.

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::event::TaskEvent;
use crate::sinks::EventSink;

/// Broadcast channel for task events. Clones share the same channel.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<TaskEvent>,
}

impl Bus {
    /// Creates a bus buffering up to `capacity` events (at least 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<TaskEvent>(capacity);
        Self { tx }
    }

    /// Sends `ev` to every receiver attached right now.
    pub fn publish(&self, ev: TaskEvent) {
        let _ = self.tx.send(ev);
    }

    /// New independent receiver; it sees events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.tx.subscribe()
    }

    /// Number of receivers currently attached.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[async_trait]
impl EventSink for Bus {
    async fn on_event(&self, event: &TaskEvent) {
        self.publish(event.clone());
    }

    fn name(&self) -> &'static str {
        "bus"
    }
}
