//! # Live task context: the hierarchy engine.
//!
//! A [`LiveTaskContext`] is the mutable record of one execution of a
//! [`TaskRunnable`]. It is created empty, entered exactly once, and settles
//! when the body (and the running-children check) is over.
//!
//! ## Lifecycle
//! ```text
//! new() ──► enter(parent, sink, settings, runnable)
//!   attach (synchronous, at the call site):
//!             ├─► [entry lock] entered-flag check      (state error on re-entry)
//!             ├─► [parent hierarchy lock] alive check  (concurrency error if dead)
//!             │                           register in parent's children
//!             └─► setup: task, parent, sink, settings, active = true
//!   run (asynchronous, possibly on a spawned task):
//!             ├─► sibling policy (Ignore / Await / Error)
//!             ├─► emit Begin
//!             ├─► run body inside TaskScope (ambient for nested builders)
//!             ├─► close: refuse new children, check none still registered
//!             ├─► emit Finish | Fail
//!             └─► settle: deregister from parent, active = false,
//!                         completed, clear task/parent/sink
//! ```
//!
//! ## Rules
//! - Settling happens on **every** path, including a dropped future
//!   (the settle guard runs synchronously from `Drop`).
//! - The children list of a context is only mutated under that context's
//!   hierarchy lock; lock order is always child → parent.
//! - `parent()` and `level()` are live readouts: absent/zero once settled.
//! - `failure_cause()` is the **local** cause: the body's own error or this
//!   context's own concurrency error.
//! - A context refused by a dead parent emits nothing; it reads as settled
//!   with the concurrency error as its cause.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Weak};

use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use crate::context::behavior::ConcurrentTaskBehavior;
use crate::context::logger::{LogLevel, LogMessage, TaskLogger};
use crate::context::scope::{self, TaskScope};
use crate::context::snapshot::{self, StaticTaskContext};
use crate::context::TaskContext;
use crate::error::TaskError;
use crate::events::{EventMeta, TaskEvent, TaskOutput};
use crate::sinks::EventSink;
use crate::tasks::{Task, TaskRunnable};

static CONTEXT_SEQ: AtomicU64 = AtomicU64::new(1);

/// Snapshot attempts before an unreachable target is treated as a bug.
const SNAPSHOT_ATTEMPTS: usize = 4;

/// Settings a context inherits from its parent at entry.
///
/// Only root contexts take them from the caller (see [`Config`](crate::Config));
/// children always copy their parent's.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContextSettings {
    /// Sibling concurrency policy.
    pub behavior: ConcurrentTaskBehavior,
    /// Minimum level a log message needs to be emitted.
    pub log_threshold: LogLevel,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            behavior: ConcurrentTaskBehavior::default(),
            log_threshold: LogLevel::TRACE,
        }
    }
}

/// Fields guarded by the hierarchy lock.
struct LiveState {
    task: Option<Task>,
    parent: Option<Weak<LiveTaskContext>>,
    children: Vec<Arc<LiveTaskContext>>,
    /// Set once the body is over; new children are refused from then on.
    closing: bool,
    failure: Option<TaskError>,
    sink: Option<Arc<dyn EventSink>>,
    settings: ContextSettings,
}

/// What a child learns from its parent while attaching.
struct Attachment {
    elder: Option<Arc<LiveTaskContext>>,
    sink: Option<Arc<dyn EventSink>>,
    settings: ContextSettings,
}

/// Mutable state of one in-flight execution of a runnable.
pub struct LiveTaskContext {
    id: u64,
    me: Weak<LiveTaskContext>,
    /// Serializes entry attempts on this context.
    entry: Mutex<()>,
    entered: AtomicBool,
    active: AtomicBool,
    /// Flips to `true` exactly once, when the context settles.
    settled: watch::Sender<bool>,
    state: RwLock<LiveState>,
}

impl LiveTaskContext {
    /// Creates an empty, never-entered context.
    pub fn new() -> Arc<Self> {
        let (settled, _) = watch::channel(false);
        Arc::new_cyclic(|me| Self {
            id: CONTEXT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            me: me.clone(),
            entry: Mutex::new(()),
            entered: AtomicBool::new(false),
            active: AtomicBool::new(false),
            settled,
            state: RwLock::new(LiveState {
                task: None,
                parent: None,
                children: Vec::new(),
                closing: false,
                failure: None,
                sink: None,
                settings: ContextSettings::default(),
            }),
        })
    }

    /// Process-unique id of this context.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Live parent, present only while this context has not settled.
    pub fn parent(&self) -> Option<Arc<LiveTaskContext>> {
        self.state.read().parent.as_ref().and_then(Weak::upgrade)
    }

    /// Currently registered children, in start order.
    pub fn children(&self) -> Vec<Arc<LiveTaskContext>> {
        self.state.read().children.clone()
    }

    /// Settings in effect (inherited from the parent for non-root contexts).
    pub fn settings(&self) -> ContextSettings {
        self.state.read().settings.clone()
    }

    pub fn behavior(&self) -> ConcurrentTaskBehavior {
        self.state.read().settings.behavior
    }

    /// True once the context was entered, whatever the outcome of the attempt.
    pub fn was_entered(&self) -> bool {
        self.entered.load(AtomicOrdering::SeqCst)
    }

    /// Topmost ancestor reachable through live parent links (possibly `self`).
    pub fn root(&self) -> Option<Arc<LiveTaskContext>> {
        let mut current = self.me.upgrade()?;
        while let Some(parent) = current.parent() {
            current = parent;
        }
        Some(current)
    }

    /// Immutable copy of this context and its descendants.
    ///
    /// The whole tree is converted from the root down, and the copy of
    /// `self` is picked out when its conversion completes; the returned
    /// handle keeps the entire snapshot tree (and thus `parent()` links) alive.
    ///
    /// # Panics
    /// If `self` cannot be reached from its own root after several attempts,
    /// which means the hierarchy is corrupted.
    pub fn snapshot(&self) -> StaticTaskContext {
        for attempt in 1..=SNAPSHOT_ATTEMPTS {
            let Some(root) = self.root() else { break };
            let mut found = None;
            let tree = snapshot::convert(&root, |live, node| {
                if std::ptr::eq(Arc::as_ptr(live), self) {
                    found = Some(Arc::clone(node));
                }
            });
            if let Some(node) = found {
                return StaticTaskContext::new(tree, node);
            }
            trace!(context = self.id, attempt, "snapshot target moved; retrying");
        }
        panic!(
            "context-{} is not reachable from its own root; task hierarchy is corrupted",
            self.id
        );
    }

    /// Display name used in error messages and diagnostics.
    pub(crate) fn display_name(&self) -> String {
        match &self.state.read().task {
            Some(task) => task.to_string(),
            None => format!("context-{}", self.id),
        }
    }

    /// Snapshot-time view of the guarded fields.
    pub(crate) fn capture(&self) -> Captured {
        let st = self.state.read();
        Captured {
            task: st.task.clone(),
            failure: st.failure.clone(),
            children: st.children.clone(),
        }
    }

    pub(crate) fn is_settled(&self) -> bool {
        *self.settled.borrow()
    }

    /// Suspends until this context has settled.
    pub(crate) async fn wait_settled(&self) {
        let mut rx = self.settled.subscribe();
        rx.wait_for(|settled| *settled).await.ok();
    }

    /// Runs `runnable` in this context.
    ///
    /// - `parent`: context to attach under; it must be active and not closing.
    /// - `sink`: event sink; `None` inherits the parent's sink.
    /// - `settings`: used for roots only; children inherit their parent's.
    ///
    /// Returns the body's value, or the failure that was also recorded as
    /// this context's cause and reported in a `Fail` event.
    pub async fn enter<T>(
        self: &Arc<Self>,
        parent: Option<Arc<LiveTaskContext>>,
        sink: Option<Arc<dyn EventSink>>,
        settings: ContextSettings,
        runnable: &TaskRunnable<T>,
    ) -> Result<T, TaskError>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.attach(parent, sink, settings, runnable.task())?
            .run(runnable)
            .await
    }

    /// Synchronous half of [`enter`](Self::enter): claims the context and
    /// registers it in `parent`'s children.
    ///
    /// Spawning builders call this at the call site, so start order is call
    /// order and the parent counts the child as running before the scheduler
    /// ever polls it. The returned [`Entry`] settles the context if dropped.
    pub(crate) fn attach(
        self: &Arc<Self>,
        parent: Option<Arc<LiveTaskContext>>,
        sink: Option<Arc<dyn EventSink>>,
        settings: ContextSettings,
        task: &Task,
    ) -> Result<Entry, TaskError> {
        let _entry = self.entry.lock();
        if self.entered.swap(true, AtomicOrdering::SeqCst) {
            return Err(TaskError::state(format!(
                "context-{} for task {task} was already entered",
                self.id
            )));
        }

        let attachment = match &parent {
            Some(p) => match p.attach_child(self) {
                Ok(attachment) => attachment,
                Err(err) => {
                    self.refuse(err.clone());
                    return Err(err);
                }
            },
            None => Attachment {
                elder: None,
                sink: None,
                settings,
            },
        };
        let sink = sink.or(attachment.sink);
        let behavior = attachment.settings.behavior;
        {
            let mut st = self.state.write();
            st.task = Some(task.clone());
            st.parent = parent.as_ref().map(Arc::downgrade);
            st.sink = sink;
            st.settings = attachment.settings;
        }
        self.active.store(true, AtomicOrdering::SeqCst);
        debug!(task = %task, context = self.id, level = self.level(), "entered task context");

        Ok(Entry {
            ctx: Arc::clone(self),
            task: task.clone(),
            guard: SettleGuard::arm(Arc::clone(self)),
            elder: attachment.elder,
            behavior,
        })
    }

    /// Registers `child` under `self`, refusing if `self` is dead or closing.
    fn attach_child(&self, child: &Arc<LiveTaskContext>) -> Result<Attachment, TaskError> {
        let mut st = self.state.write();
        if !self.is_active() || st.closing {
            let name = match &st.task {
                Some(task) => task.to_string(),
                None => format!("context-{}", self.id),
            };
            warn!(parent = %name, "refusing to attach child to inactive parent");
            return Err(TaskError::concurrency(
                format!("parent {name} is no longer active"),
                [name],
            ));
        }
        let elder = st.children.first().cloned();
        st.children.push(Arc::clone(child));
        Ok(Attachment {
            elder,
            sink: st.sink.clone(),
            settings: st.settings.clone(),
        })
    }

    fn detach_child(&self, child: &LiveTaskContext) {
        self.state
            .write()
            .children
            .retain(|c| !std::ptr::eq(Arc::as_ptr(c), child));
    }

    /// Applies the sibling policy; returns the refusal, if any.
    async fn apply_behavior(
        &self,
        behavior: ConcurrentTaskBehavior,
        elder: &LiveTaskContext,
    ) -> Option<TaskError> {
        match behavior {
            ConcurrentTaskBehavior::Ignore => None,
            ConcurrentTaskBehavior::Await => {
                debug!(context = self.id, elder = %elder.display_name(), "waiting for elder sibling");
                elder.wait_settled().await;
                None
            }
            ConcurrentTaskBehavior::Error => {
                let elder_name = elder.display_name();
                warn!(context = self.id, elder = %elder_name, "elder sibling still active");
                Some(TaskError::concurrency(
                    format!("elder sibling {elder_name} is still active"),
                    [elder_name],
                ))
            }
        }
    }

    /// Ends the body phase; fails if children are still registered.
    fn close(&self) -> Result<(), TaskError> {
        let running = {
            let mut st = self.state.write();
            st.closing = true;
            st.children.clone()
        };
        if running.is_empty() {
            return Ok(());
        }
        let names: Vec<String> = running.iter().map(|c| c.display_name()).collect();
        warn!(context = self.id, children = ?names, "task body returned with running children");
        Err(TaskError::concurrency(
            format!("{} child task(s) still active on exit", names.len()),
            names,
        ))
    }

    /// Records `err` as the local cause and emits `Fail`.
    async fn fail(&self, err: TaskError) {
        {
            let mut st = self.state.write();
            st.closing = true;
            st.failure = Some(err.clone());
        }
        self.emit(|meta| TaskEvent::Fail { meta, error: err }).await;
    }

    /// Marks a context that could not attach as settled with `err` as its cause.
    fn refuse(&self, err: TaskError) {
        self.state.write().failure = Some(err);
        self.settled.send_replace(true);
    }

    /// Deregisters from the parent and clears live-only fields.
    fn settle(&self) {
        let parent = {
            let mut st = self.state.write();
            st.closing = true;
            st.task = None;
            st.sink = None;
            st.parent.take()
        };
        if let Some(parent) = parent.and_then(|p| p.upgrade()) {
            parent.detach_child(self);
        }
        self.active.store(false, AtomicOrdering::SeqCst);
        self.settled.send_replace(true);
        trace!(context = self.id, "context settled");
    }

    /// Settles a context whose execution was dropped mid-flight.
    fn abandon(&self) {
        {
            let mut st = self.state.write();
            if st.failure.is_none() {
                st.failure = Some(TaskError::state(
                    "task execution was dropped before completion",
                ));
            }
        }
        debug!(context = self.id, "task execution dropped; settling");
        self.settle();
    }

    /// Emits an event built by `make`, yielding before and after delivery.
    async fn emit<F>(&self, make: F)
    where
        F: FnOnce(EventMeta) -> TaskEvent + Send,
    {
        let (task, sink) = {
            let st = self.state.read();
            (st.task.clone(), st.sink.clone())
        };
        let event = match (task, &sink) {
            (Some(task), Some(_)) => Some(make(EventMeta::capture(task, self.snapshot()))),
            _ => None,
        };
        tokio::task::yield_now().await;
        if let (Some(sink), Some(event)) = (sink, event) {
            sink.on_event(&event).await;
        }
        tokio::task::yield_now().await;
    }

    pub(crate) async fn log(&self, level: LogLevel, message: LogMessage) -> Result<(), TaskError> {
        let threshold = {
            let st = self.state.read();
            if st.task.is_none() {
                let why = if self.was_entered() { "has exited" } else { "was never entered" };
                return Err(TaskError::state(format!(
                    "context-{} {why}; cannot log",
                    self.id
                )));
            }
            st.settings.log_threshold.clone()
        };
        if level.is_off() || level < threshold {
            return Ok(());
        }
        self.emit(|meta| TaskEvent::Log {
            meta,
            level,
            message,
        })
        .await;
        Ok(())
    }
}

/// Guarded fields copied for snapshot conversion.
pub(crate) struct Captured {
    pub task: Option<Task>,
    pub failure: Option<TaskError>,
    pub children: Vec<Arc<LiveTaskContext>>,
}

impl TaskContext for LiveTaskContext {
    fn context_id(&self) -> u64 {
        self.id
    }

    fn task(&self) -> Result<Task, TaskError> {
        self.state.read().task.clone().ok_or_else(|| {
            TaskError::state(format!("context-{} has no running task", self.id))
        })
    }

    fn level(&self) -> usize {
        let mut level = 0;
        let mut next = self.parent();
        while let Some(parent) = next {
            level += 1;
            next = parent.parent();
        }
        level
    }

    fn is_active(&self) -> bool {
        self.active.load(AtomicOrdering::SeqCst)
    }

    fn is_completed(&self) -> bool {
        self.is_settled() && self.state.read().children.is_empty()
    }

    fn failure_cause(&self) -> Option<TaskError> {
        self.state.read().failure.clone()
    }

    fn child_count(&self) -> usize {
        self.state.read().children.len()
    }

    fn logger(&self) -> TaskLogger {
        TaskLogger::live(self.me.clone())
    }
}

impl fmt::Debug for LiveTaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.state.read();
        f.debug_struct("LiveTaskContext")
            .field("id", &self.id)
            .field("task", &st.task)
            .field("active", &self.is_active())
            .field("children", &st.children.len())
            .field("failure", &st.failure)
            .finish()
    }
}

/// A context attached to its parent whose body has not started yet.
pub(crate) struct Entry {
    ctx: Arc<LiveTaskContext>,
    task: Task,
    guard: SettleGuard,
    elder: Option<Arc<LiveTaskContext>>,
    behavior: ConcurrentTaskBehavior,
}

impl Entry {
    /// Asynchronous half of [`LiveTaskContext::enter`]: sibling policy,
    /// `Begin`, the body, the running-children check, the terminal event and
    /// settlement.
    pub(crate) async fn run<T>(self, runnable: &TaskRunnable<T>) -> Result<T, TaskError>
    where
        T: Clone + Send + Sync + 'static,
    {
        let Entry {
            ctx,
            task,
            guard,
            elder,
            behavior,
        } = self;

        let refused = match elder {
            Some(elder) if elder.is_active() => ctx.apply_behavior(behavior, &elder).await,
            _ => None,
        };
        if let Some(err) = refused {
            ctx.fail(err.clone()).await;
            guard.settle();
            return Err(err);
        }

        ctx.emit(|meta| TaskEvent::Begin { meta }).await;

        let scope = TaskScope::new(Arc::clone(&ctx));
        let body = scope::with_current(scope.clone(), runnable.call(scope));
        let outcome = match AssertUnwindSafe(body).catch_unwind().await {
            Ok(res) => res,
            Err(panic) => Err(TaskError::from_panic(panic)),
        };
        let outcome = match outcome {
            Ok(value) => ctx.close().map(|()| value),
            Err(err) => Err(err),
        };

        match outcome {
            Ok(value) => {
                ctx.emit(|meta| TaskEvent::Finish {
                    meta,
                    result: TaskOutput::new(value.clone()),
                })
                .await;
                guard.settle();
                debug!(task = %task, context = ctx.id, "task finished");
                Ok(value)
            }
            Err(err) => {
                ctx.fail(err.clone()).await;
                guard.settle();
                debug!(task = %task, context = ctx.id, error = %err, "task failed");
                Err(err)
            }
        }
    }
}

/// Settles the context on drop unless [`SettleGuard::settle`] ran first.
struct SettleGuard {
    ctx: Option<Arc<LiveTaskContext>>,
}

impl SettleGuard {
    fn arm(ctx: Arc<LiveTaskContext>) -> Self {
        Self { ctx: Some(ctx) }
    }

    fn settle(mut self) {
        if let Some(ctx) = self.ctx.take() {
            ctx.settle();
        }
    }
}

impl Drop for SettleGuard {
    fn drop(&mut self) {
        if let Some(ctx) = self.ctx.take() {
            ctx.abandon();
        }
    }
}
