//! # Example: event_stream
//!
//! Subscribes to a runnable as a cold event stream and binds its result to a
//! write-once slot.
//!
//! Shows how to:
//! - Consume [`EventStream`] items until the terminal event.
//! - Re-run the body by subscribing again.
//! - Observe a failure: `Fail` event followed by an `Err` item.
//! - Route events through `tracing` with [`LogWriter`].
//!
//! ## Run
//! ```bash
//! RUST_LOG=tasknest=debug cargo run --example event_stream
//! ```

use std::sync::Arc;

use futures::StreamExt;
use tasknest::{Config, Launcher, LogLevel, ResultSlot, TaskError, TaskEvent, TaskRunnable};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut cfg = Config::default();
    cfg.log_threshold = LogLevel::INFO;

    let mut sinks: Vec<Arc<dyn tasknest::EventSink>> = Vec::new();
    #[cfg(feature = "logging")]
    sinks.push(Arc::new(tasknest::LogWriter));
    let launcher = Launcher::builder(cfg).with_sinks(sinks).build();

    let answer = TaskRunnable::named("answer", |scope| async move {
        let log = scope.task_logger();
        log.debug("suppressed by the threshold").await?;
        log.info("computing").await?;
        Ok(42u64)
    });

    let slot = ResultSlot::new();
    let factory = launcher.events(&answer).bind(slot.clone());
    let mut events = factory.subscribe()?;
    while let Some(item) = events.next().await {
        match item? {
            TaskEvent::Log { level, message, .. } => println!("log [{level}] {message}"),
            ev => println!("{} #{}", ev.kind().as_label(), ev.meta().seq),
        }
    }
    println!("slot = {:?}", slot.get());

    // The slot is filled now, so the factory refuses to run again.
    if let Err(err) = factory.subscribe() {
        println!("second subscription refused: {err}");
    }

    let broken: TaskRunnable<()> =
        TaskRunnable::named("broken", |_scope| async { Err(TaskError::fail("disk on fire")) });
    let mut events = launcher.events(&broken).subscribe()?;
    while let Some(item) = events.next().await {
        match item {
            Ok(ev) => println!("{} {}", ev.kind().as_label(), ev.task()),
            Err(err) => println!("stream ended with: {err}"),
        }
    }
    Ok(())
}
