#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tasknest::{EventKind, EventSink, TaskEvent};

/// Sink keeping every event for later assertions.
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<TaskEvent>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sink(&self) -> Arc<dyn EventSink> {
        Arc::new(self.clone())
    }

    pub fn events(&self) -> Vec<TaskEvent> {
        self.events.lock().clone()
    }

    /// `(task name, event kind)` pairs in emission order.
    pub fn trace(&self) -> Vec<(String, EventKind)> {
        self.events
            .lock()
            .iter()
            .map(|ev| (ev.task().to_string(), ev.kind()))
            .collect()
    }

    /// Kinds emitted by the task named `name`.
    pub fn kinds_of(&self, name: &str) -> Vec<EventKind> {
        self.trace()
            .into_iter()
            .filter(|(task, _)| task == name)
            .map(|(_, kind)| kind)
            .collect()
    }

    /// Position of the first `kind` event emitted by `name`.
    pub fn position(&self, name: &str, kind: EventKind) -> Option<usize> {
        self.trace()
            .iter()
            .position(|(task, k)| task == name && *k == kind)
    }
}

#[async_trait]
impl EventSink for Recorder {
    async fn on_event(&self, event: &TaskEvent) {
        self.events.lock().push(event.clone());
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}
