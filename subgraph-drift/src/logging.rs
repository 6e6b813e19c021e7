//! Logging module for Subgraph-Drift

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// File name prefix of the rolling log
pub const LOG_FILE_NAME: &str = "subgraph-drift.log";

/// Initialize logging with tracing
///
/// Always logs to stderr. With a `log_dir`, also writes a daily rolling log
/// there; the returned guard must be kept alive for the duration of the
/// program so buffered lines get flushed.
pub fn init_logging(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let (file_layer, guard) = match log_dir.and_then(file_appender) {
        Some(appender) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    guard
}

/// Daily appender in `dir`, or `None` when the directory cannot be created
fn file_appender(dir: &Path) -> Option<RollingFileAppender> {
    if let Err(e) = std::fs::create_dir_all(dir) {
        eprintln!("Could not create log directory {}: {}", dir.display(), e);
        return None;
    }
    Some(RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_NAME))
}
