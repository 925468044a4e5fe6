//! # Channel-backed sink.
//!
//! [`ChannelSink`] forwards events into a bounded tokio `mpsc` channel and
//! waits for room, so a consumer that stops reading holds the emitting task
//! at its next event. Once the receiver is gone, events are dropped.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::EventSink;
use crate::events::TaskEvent;

/// Sink writing into a bounded `mpsc` channel.
#[derive(Clone, Debug)]
pub struct ChannelSink {
    tx: mpsc::Sender<TaskEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<TaskEvent>) -> Self {
        Self { tx }
    }

    /// Creates a sink and the receiver paired with it (capacity clamped to 1).
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<TaskEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn on_event(&self, event: &TaskEvent) {
        let _ = self.tx.send(event.clone()).await;
    }

    fn name(&self) -> &'static str {
        "channel"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Config, EventKind, Launcher, TaskRunnable};
    use std::sync::Arc;

    #[tokio::test]
    async fn closed_receiver_does_not_fail_the_task() {
        let (sink, rx) = ChannelSink::channel(1);
        drop(rx);
        let launcher = Launcher::builder(Config::default())
            .with_sinks(vec![Arc::new(sink)])
            .build();
        let job = TaskRunnable::named("orphan", |_scope| async { Ok(1) });
        assert_eq!(launcher.run(&job).await, Ok(1));
    }

    #[tokio::test]
    async fn events_arrive_in_emission_order() {
        let (sink, mut rx) = ChannelSink::channel(8);
        let launcher = Launcher::builder(Config::default())
            .with_sinks(vec![Arc::new(sink)])
            .build();
        let job = TaskRunnable::named("ordered", |scope| async move {
            scope.task_logger().info("one").await?;
            scope.task_logger().info("two").await?;
            Ok(())
        });
        launcher.run(&job).await.unwrap();
        drop(launcher);

        let mut seqs = Vec::new();
        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            seqs.push(ev.meta().seq);
            kinds.push(ev.kind());
        }
        assert_eq!(
            kinds,
            [EventKind::Begin, EventKind::Log, EventKind::Log, EventKind::Finish]
        );
        assert!(seqs.windows(2).all(|w| w[0] < w[1]));
    }
}
