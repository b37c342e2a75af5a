use crate::config::LogConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*};

/// Installs the global tracing subscriber. Diagnostics go to stderr so the
/// report lines on stdout stay machine-comparable; an optional non-blocking
/// file writer is added when configured. The returned guard must be held
/// until process exit to flush the file writer.
pub fn init(config: &LogConfig) -> Option<WorkerGuard> {
    let level = LevelFilter::from_level(config.level);
    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(level);

    match &config.file {
        Some((directory, file_name)) => {
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(console)
                .with(
                    fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false)
                        .with_target(false)
                        .with_filter(level),
                )
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(console).init();
            None
        }
    }
}
