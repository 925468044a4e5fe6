//! # Immutable point-in-time copies of live contexts.
//!
//! A [`StaticTaskContext`] is a fully detached copy of a
//! [`LiveTaskContext`] and all its descendants. Event consumers receive these
//! instead of live state, so reading "how did the task end" never races with
//! the task itself.
//!
//! ## Construction
//! ```text
//! convert(root):
//!   walk root-down with an explicit stack (no recursion)
//!   ├─► open(node): copy task / flags / failure, queue children in start order
//!   ├─► after the last child of a node is built:
//!   │     build the node with Arc::new_cyclic; inside its constructor install
//!   │     `parent` on every already-built child copy
//!   └─► on_converted(live, copy) fires exactly once per live node
//! ```
//! Children never ask for their parent's copy while it is being built: the
//! back-link is written by the parent after each child finished converting.
//!
//! A handle anchors the root of its tree, so `parent()` works from any node
//! for as long as the handle lives, without the tree owning itself.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use crate::context::TaskContext;
use crate::context::live::LiveTaskContext;
use crate::context::logger::TaskLogger;
use crate::error::TaskError;
use crate::tasks::Task;

/// One converted node. Owned by its parent node; the root is owned by handles.
pub(crate) struct StaticNode {
    context_id: u64,
    task: Option<Task>,
    level: usize,
    active: bool,
    completed: bool,
    failure: Option<TaskError>,
    children: Vec<Arc<StaticNode>>,
    parent: OnceLock<Weak<StaticNode>>,
}

/// A live node whose children are still being converted.
struct Frame {
    live: Arc<LiveTaskContext>,
    task: Option<Task>,
    level: usize,
    active: bool,
    settled: bool,
    failure: Option<TaskError>,
    /// Children left to convert, reversed so `pop` yields start order.
    pending: Vec<Arc<LiveTaskContext>>,
    done: Vec<Arc<StaticNode>>,
}

impl Frame {
    fn open(live: Arc<LiveTaskContext>, seen: &mut HashSet<u64>) -> Self {
        let level = live.level();
        let active = live.is_active();
        let settled = live.is_settled();
        let captured = live.capture();
        let mut pending: Vec<_> = captured
            .children
            .into_iter()
            .filter(|c| seen.insert(c.id()))
            .collect();
        pending.reverse();
        Self {
            live,
            task: captured.task,
            level,
            active,
            settled,
            failure: captured.failure,
            pending,
            done: Vec::new(),
        }
    }

    fn build(self) -> (Arc<LiveTaskContext>, Arc<StaticNode>) {
        let Frame {
            live,
            task,
            level,
            active,
            settled,
            failure,
            done,
            ..
        } = self;
        let node = Arc::new_cyclic(|me: &Weak<StaticNode>| {
            for child in &done {
                let _ = child.parent.set(me.clone());
            }
            StaticNode {
                context_id: live.id(),
                task,
                level,
                active,
                completed: settled && done.is_empty(),
                failure,
                children: done,
                parent: OnceLock::new(),
            }
        });
        (live, node)
    }
}

/// Converts the tree under `root`, invoking `on_converted` once per node.
pub(crate) fn convert<F>(root: &Arc<LiveTaskContext>, mut on_converted: F) -> Arc<StaticNode>
where
    F: FnMut(&Arc<LiveTaskContext>, &Arc<StaticNode>),
{
    let mut seen = HashSet::from([root.id()]);
    let mut stack: Vec<Frame> = Vec::new();
    let mut current = Frame::open(Arc::clone(root), &mut seen);
    loop {
        if let Some(child) = current.pending.pop() {
            stack.push(current);
            current = Frame::open(child, &mut seen);
            continue;
        }
        let (live, node) = current.build();
        on_converted(&live, &node);
        match stack.pop() {
            Some(mut parent) => {
                parent.done.push(node);
                current = parent;
            }
            None => return node,
        }
    }
}

/// Immutable snapshot of a task context and its descendants.
#[derive(Clone)]
pub struct StaticTaskContext {
    /// Keeps the whole tree alive so parent links stay valid.
    root: Arc<StaticNode>,
    node: Arc<StaticNode>,
}

impl StaticTaskContext {
    pub(crate) fn new(root: Arc<StaticNode>, node: Arc<StaticNode>) -> Self {
        Self { root, node }
    }

    fn at(&self, node: Arc<StaticNode>) -> Self {
        Self {
            root: Arc::clone(&self.root),
            node,
        }
    }

    /// Parent copy, as it was when the snapshot was taken.
    pub fn parent(&self) -> Option<StaticTaskContext> {
        self.node
            .parent
            .get()
            .and_then(Weak::upgrade)
            .map(|p| self.at(p))
    }

    /// Child copies, in start order.
    pub fn children(&self) -> Vec<StaticTaskContext> {
        self.node
            .children
            .iter()
            .map(|c| self.at(Arc::clone(c)))
            .collect()
    }

    /// Topmost node of this snapshot tree.
    pub fn root(&self) -> StaticTaskContext {
        self.at(Arc::clone(&self.root))
    }

    /// Finds the copy of the context with `context_id` in this snapshot tree.
    pub fn find(&self, context_id: u64) -> Option<StaticTaskContext> {
        let mut queue = vec![Arc::clone(&self.root)];
        while let Some(node) = queue.pop() {
            if node.context_id == context_id {
                return Some(self.at(node));
            }
            queue.extend(node.children.iter().cloned());
        }
        None
    }

    /// Total number of nodes below this one.
    pub fn descendant_count(&self) -> usize {
        let mut count = 0;
        let mut queue: Vec<&StaticNode> = vec![self.node.as_ref()];
        while let Some(node) = queue.pop() {
            count += node.children.len();
            queue.extend(node.children.iter().map(Arc::as_ref));
        }
        count
    }

    fn write_tree(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut stack: Vec<(usize, &StaticNode)> = vec![(0, self.node.as_ref())];
        while let Some((depth, node)) = stack.pop() {
            let name = match &node.task {
                Some(task) => task.to_string(),
                None => format!("context-{}", node.context_id),
            };
            let state = if node.failure.is_some() {
                "failed"
            } else if node.completed {
                "completed"
            } else if node.active {
                "active"
            } else {
                "idle"
            };
            writeln!(f, "{:indent$}{name} [{state}]", "", indent = depth * 2)?;
            for child in node.children.iter().rev() {
                stack.push((depth + 1, child.as_ref()));
            }
        }
        Ok(())
    }
}

impl TaskContext for StaticTaskContext {
    fn context_id(&self) -> u64 {
        self.node.context_id
    }

    fn task(&self) -> Result<Task, TaskError> {
        self.node.task.clone().ok_or_else(|| {
            TaskError::state(format!(
                "context-{} had no running task when copied",
                self.node.context_id
            ))
        })
    }

    fn level(&self) -> usize {
        self.node.level
    }

    fn is_active(&self) -> bool {
        self.node.active
    }

    fn is_completed(&self) -> bool {
        self.node.completed
    }

    fn failure_cause(&self) -> Option<TaskError> {
        self.node.failure.clone()
    }

    fn child_count(&self) -> usize {
        self.node.children.len()
    }

    fn logger(&self) -> TaskLogger {
        TaskLogger::snapshot(self.node.context_id)
    }
}

/// Renders the tree below this node, one indented line per context.
impl fmt::Display for StaticTaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_tree(f)
    }
}

impl fmt::Debug for StaticTaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticTaskContext")
            .field("context_id", &self.node.context_id)
            .field("task", &self.node.task)
            .field("level", &self.node.level)
            .field("active", &self.node.active)
            .field("completed", &self.node.completed)
            .field("failure", &self.node.failure)
            .field("children", &self.node.children.len())
            .finish()
    }
}
