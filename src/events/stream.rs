//! # Cold, restartable event streams.
//!
//! An [`EventStream`] is a **factory**, not a stored sequence: every call to
//! [`EventStream::subscribe`] returns a new stream, and the runnable only
//! starts when that stream is first polled. Each subscription runs the body
//! from scratch in a new root context.
//!
//! ## Flow
//! ```text
//! subscribe()
//!   ├─► bound slot already filled? ──► Err(State), nothing runs
//!   └─► stream (cold)
//!         first poll:
//!           ├─► spawn producer: LiveTaskContext::enter(sink = channel [+ launcher sinks])
//!           ├─► forward every event as Ok(event)    (bounded channel = back-pressure)
//!           └─► producer finished:
//!                 ├─ Ok(value) ──► fill bound slot  (already filled ──► Err(State) item)
//!                 └─ Err(e)    ──► Err(e) item, right after the Fail event
//! ```
//!
//! Dropping the stream cancels the producer; its context still settles.
//!
//! ## Example
//! ```rust
//! use futures::StreamExt;
//! use tasknest::{ResultSlot, TaskError, TaskRunnable};
//!
//! # async fn demo() -> Result<(), TaskError> {
//! let job = TaskRunnable::named("answer", |scope| async move {
//!     scope.task_logger().info("thinking").await?;
//!     Ok(42)
//! });
//! let slot = ResultSlot::new();
//! let mut events = job.events().bind(slot.clone()).subscribe()?;
//! while let Some(item) = events.next().await {
//!     let event = item?;
//!     println!("{} {}", event.kind().as_label(), event.task());
//! }
//! assert_eq!(slot.get(), Some(42));
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use futures::stream::BoxStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::event::TaskEvent;
use crate::context::{ContextSettings, LiveTaskContext};
use crate::core::join_error;
use crate::error::TaskError;
use crate::sinks::{ChannelSink, EventSink, SinkSet};
use crate::tasks::{ResultSlot, TaskRunnable};

/// Stream items: events, and a final error if the execution failed.
pub type EventItem = Result<TaskEvent, TaskError>;

enum Step<T> {
    Event(Option<TaskEvent>),
    Done(T),
}

/// Factory of event streams over executions of one runnable.
pub struct EventStream<T> {
    runnable: TaskRunnable<T>,
    settings: ContextSettings,
    capacity: usize,
    extra: Option<Arc<dyn EventSink>>,
    slot: Option<ResultSlot<T>>,
}

impl<T> EventStream<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(
        runnable: TaskRunnable<T>,
        settings: ContextSettings,
        capacity: usize,
        extra: Option<Arc<dyn EventSink>>,
    ) -> Self {
        Self {
            runnable,
            settings,
            capacity: capacity.max(1),
            extra,
            slot: None,
        }
    }

    /// Writes the result of successful executions into `slot`.
    pub fn bind(mut self, slot: ResultSlot<T>) -> Self {
        self.slot = Some(slot);
        self
    }

    /// Slot this factory writes into, if bound.
    pub fn slot(&self) -> Option<&ResultSlot<T>> {
        self.slot.as_ref()
    }

    /// Returns a new cold stream; nothing runs until it is polled.
    ///
    /// Fails immediately if the bound slot is already filled.
    pub fn subscribe(&self) -> Result<BoxStream<'static, EventItem>, TaskError> {
        if self.slot.as_ref().is_some_and(ResultSlot::is_filled) {
            return Err(TaskError::state(format!(
                "result slot bound to task {} is already filled",
                self.runnable.task()
            )));
        }

        let runnable = self.runnable.clone();
        let settings = self.settings.clone();
        let capacity = self.capacity;
        let extra = self.extra.clone();
        let slot = self.slot.clone();

        Ok(Box::pin(async_stream::stream! {
            let (tx, mut rx) = mpsc::channel::<TaskEvent>(capacity);
            let channel: Arc<dyn EventSink> = Arc::new(ChannelSink::new(tx));
            let sink: Arc<dyn EventSink> = match extra {
                Some(extra) => Arc::new(SinkSet::new(vec![channel, extra])),
                None => channel,
            };

            let token = CancellationToken::new();
            let _cancel_on_drop = token.clone().drop_guard();
            let task = runnable.task().clone();
            let mut producer = tokio::spawn(async move {
                let ctx = LiveTaskContext::new();
                tokio::select! {
                    res = ctx.enter(None, Some(sink), settings, &runnable) => Some(res),
                    _ = token.cancelled() => None,
                }
            });

            let finished = loop {
                let step = tokio::select! {
                    biased;
                    ev = rx.recv() => Step::Event(ev),
                    res = &mut producer => Step::Done(res),
                };
                match step {
                    Step::Event(Some(ev)) => yield Ok(ev),
                    Step::Event(None) => break (&mut producer).await,
                    Step::Done(res) => {
                        while let Ok(ev) = rx.try_recv() {
                            yield Ok(ev);
                        }
                        break res;
                    }
                }
            };

            match finished {
                Ok(Some(Ok(value))) => {
                    if let Some(slot) = &slot {
                        if let Err(err) = slot.fill(value) {
                            debug!(task = %task, "result slot filled concurrently");
                            yield Err(err);
                        }
                    }
                }
                Ok(Some(Err(err))) => yield Err(err),
                Ok(None) => {}
                Err(err) => yield Err(join_error(&task, err)),
            }
        }))
    }
}

impl<T> Clone for EventStream<T> {
    fn clone(&self) -> Self {
        Self {
            runnable: self.runnable.clone(),
            settings: self.settings.clone(),
            capacity: self.capacity,
            extra: self.extra.clone(),
            slot: self.slot.clone(),
        }
    }
}

impl<T> fmt::Debug for EventStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("task", self.runnable.task())
            .field("settings", &self.settings)
            .field("capacity", &self.capacity)
            .field("bound", &self.slot.is_some())
            .finish()
    }
}
