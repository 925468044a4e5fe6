//! # Tracing sink for debugging and demos.
//!
//! [`LogWriter`] renders every [`TaskEvent`] through `tracing`, under the
//! `tasknest` target. Install any `tracing` subscriber to see the output.
//!
//! ## Output format
//! ```text
//! INFO tasknest: [begin] task=worker level=1 seq=3
//! WARN tasknest: [log] task=worker level=1 seq=4 msg="disk almost full"
//! INFO tasknest: [finish] task=worker level=1 seq=5 result=u32
//! ERROR tasknest: [fail] task=worker level=1 seq=5 err="execution failed: boom"
//! ```
//!
//! Task log levels map onto `tracing` levels by rank; `fatal` (and any custom
//! level above `error`) is written as `ERROR`.
//!
//! ## Example
//! ```no_run
//! # use std::sync::Arc;
//! # use tasknest::{Config, Launcher, LogWriter};
//! let launcher = Launcher::builder(Config::default())
//!     .with_sinks(vec![Arc::new(LogWriter)])
//!     .build();
//! ```

use async_trait::async_trait;
use tracing::Level;

use super::EventSink;
use crate::context::{LogLevel, TaskContext};
use crate::events::TaskEvent;

/// Sink writing human-readable event lines through `tracing`.
///
/// Enabled via the `logging` feature.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogWriter;

/// Maps a task log level onto the closest `tracing` level.
fn tracing_level(level: &LogLevel) -> Level {
    if *level < LogLevel::DEBUG {
        Level::TRACE
    } else if *level < LogLevel::INFO {
        Level::DEBUG
    } else if *level < LogLevel::WARN {
        Level::INFO
    } else if *level < LogLevel::ERROR {
        Level::WARN
    } else {
        Level::ERROR
    }
}

fn write(level: Level, line: &str) {
    match level {
        Level::TRACE => tracing::trace!(target: "tasknest", "{line}"),
        Level::DEBUG => tracing::debug!(target: "tasknest", "{line}"),
        Level::INFO => tracing::info!(target: "tasknest", "{line}"),
        Level::WARN => tracing::warn!(target: "tasknest", "{line}"),
        _ => tracing::error!(target: "tasknest", "{line}"),
    }
}

/// Formats `event` the way [`LogWriter`] prints it.
fn render(event: &TaskEvent) -> (Level, String) {
    let meta = event.meta();
    let head = format!(
        "[{}] task={} level={} seq={}",
        event.kind().as_label(),
        meta.task,
        meta.context.level(),
        meta.seq
    );
    match event {
        TaskEvent::Begin { .. } => (Level::INFO, head),
        TaskEvent::Log { level, message, .. } => {
            (tracing_level(level), format!("{head} msg={:?}", message.as_str()))
        }
        TaskEvent::Finish { result, .. } => {
            (Level::INFO, format!("{head} result={}", result.type_name()))
        }
        TaskEvent::Fail { error, .. } => (Level::ERROR, format!("{head} err=\"{error}\"")),
    }
}

#[async_trait]
impl EventSink for LogWriter {
    async fn on_event(&self, event: &TaskEvent) {
        let (level, line) = render(event);
        write(level, &line);
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_map_by_rank() {
        assert_eq!(tracing_level(&LogLevel::TRACE), Level::TRACE);
        assert_eq!(tracing_level(&LogLevel::DEBUG), Level::DEBUG);
        assert_eq!(tracing_level(&LogLevel::custom("notice", 350)), Level::INFO);
        assert_eq!(tracing_level(&LogLevel::WARN), Level::WARN);
        assert_eq!(tracing_level(&LogLevel::FATAL), Level::ERROR);
    }

    #[tokio::test]
    async fn renders_lifecycle_lines() {
        let recorder = crate::sinks::testing::Recorder::new();
        let launcher = crate::Launcher::builder(crate::Config::default())
            .with_sinks(vec![recorder.sink(), std::sync::Arc::new(LogWriter)])
            .build();
        let job = crate::TaskRunnable::named("render-me", |scope| async move {
            scope.task_logger().warn("careful").await?;
            Ok(7u32)
        });
        launcher.run(&job).await.unwrap();

        let lines: Vec<(Level, String)> = recorder.events().iter().map(render).collect();
        assert_eq!(lines[0].0, Level::INFO);
        assert!(lines[0].1.starts_with("[begin] task=render-me level=0"));
        assert_eq!(lines[1].0, Level::WARN);
        assert!(lines[1].1.ends_with("msg=\"careful\""));
        assert!(lines[2].1.ends_with("result=u32"));
    }
}
