//! # Example: nested_tree
//!
//! Builds a small task tree and prints every lifecycle event.
//!
//! Shows how to:
//! - Nest tasks with [`TaskScope::spawn`] and [`TaskScope::run`].
//! - Attach a custom [`EventSink`] to a [`Launcher`].
//! - Read the immutable snapshot carried by each event.
//!
//! ## Tree
//! ```text
//! pipeline
//!   ├─► fetch-a ──► parse
//!   ├─► fetch-b ──► parse
//!   └─► report
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example nested_tree
//! ```

use std::sync::Arc;
use std::time::Duration;

use tasknest::{
    Config, EventSink, Launcher, TaskContext, TaskError, TaskEvent, TaskRunnable,
};

/// Prints events indented by the depth of the emitting task.
struct TreePrinter;

#[async_trait::async_trait]
impl EventSink for TreePrinter {
    async fn on_event(&self, ev: &TaskEvent) {
        let indent = "  ".repeat(ev.context().level());
        match ev {
            TaskEvent::Begin { meta } => println!("{indent}> {}", meta.task),
            TaskEvent::Log { meta, level, message } => {
                println!("{indent}  [{level}] {}: {message}", meta.task)
            }
            TaskEvent::Finish { meta, result } => {
                println!("{indent}< {} ({})", meta.task, result.type_name())
            }
            TaskEvent::Fail { meta, error } => println!("{indent}! {}: {error}", meta.task),
        }
    }

    fn name(&self) -> &'static str {
        "tree_printer"
    }
}

fn fetch(name: &'static str, ms: u64) -> TaskRunnable<usize> {
    let parse = TaskRunnable::named("parse", move |scope| async move {
        scope
            .task_logger()
            .log_with(tasknest::LogLevel::DEBUG, move || format!("parsing {ms} bytes"))
            .await?;
        Ok(ms as usize)
    });
    TaskRunnable::named(name, move |scope| {
        let parse = parse.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            scope.task_logger().info("fetched").await?;
            scope.run(&parse).await
        }
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let fetch_a = fetch("fetch-a", 40);
    let fetch_b = fetch("fetch-b", 20);
    let report = TaskRunnable::named("report", |scope| async move {
        let parent = scope.task_context().parent();
        let siblings = parent.map(|p| p.child_count()).unwrap_or(0);
        scope
            .task_logger()
            .info(format!("{siblings} task(s) registered under pipeline"))
            .await?;
        Ok(0)
    });

    let pipeline = TaskRunnable::named("pipeline", move |scope| {
        let (fetch_a, fetch_b, report) = (fetch_a.clone(), fetch_b.clone(), report.clone());
        async move {
            let a = scope.spawn(&fetch_a);
            let b = scope.spawn(&fetch_b);
            let total = a.join().await? + b.join().await?;
            scope.run(&report).await?;
            Ok::<_, TaskError>(total)
        }
    });

    let launcher = Launcher::builder(Config::default())
        .with_sinks(vec![Arc::new(TreePrinter)])
        .build();

    let total = launcher.run(&pipeline).await?;
    println!("pipeline parsed {total} bytes");
    Ok(())
}
