use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_DIRECTIVE: &str = "holdings_extractor=info";

/// Initializes logging: human-readable output on stderr, plus a daily-rotated
/// JSON file under `logs/` when `file_logging` is set.
///
/// The returned guard must be kept alive until exit so buffered file logs are flushed.
pub fn init_logging(file_logging: bool) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    // stdout carries the report, so console output goes to stderr
    if file_logging {
        let _ = fs::create_dir_all("logs");
        let file_appender = tracing_appender::rolling::daily("logs", "extractor.log");
        let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);
        let file_layer = fmt::layer().json().with_writer(non_blocking_writer);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
        Some(guard)
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
        None
    }
}
