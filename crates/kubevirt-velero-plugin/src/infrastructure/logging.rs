//! provides logging helpers

use std::env;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::filter::{self};
use tracing_subscriber::fmt::layer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry;

/// Directory for rolling log files; logs go to stderr when unset.
pub const LOG_PATH_ENV_VAR: &str = "KUBEVIRT_VELERO_LOG_PATH";

const LOG_FILE_PREFIX: &str = "kubevirt-velero-plugin";

/// initiate the global tracing subscriber
///
/// The returned guard flushes the file writer on drop and must be held for
/// the lifetime of the process.
pub fn init() -> Option<WorkerGuard> {
    let env_filter = filter::EnvFilter::builder()
        .with_default_directive(filter::LevelFilter::INFO.into())
        .from_env_lossy();

    let appender = env::var(LOG_PATH_ENV_VAR)
        .ok()
        .filter(|path| !path.is_empty())
        .map(|path| {
            RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(LOG_FILE_PREFIX)
                .filename_suffix("log")
                .max_log_files(3)
                .build(Path::new(&path))
                .map_err(|e| (path, e))
        });

    match appender {
        Some(Ok(appender)) => {
            let (file_writer, guard) = tracing_appender::non_blocking(appender);
            let fmt_layer = layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_target(true)
                .with_filter(env_filter);
            registry().with(fmt_layer).init();
            Some(guard)
        }
        Some(Err((path, e))) => {
            init_stderr(env_filter);
            tracing::warn!("Failed to open log directory {path}, logging to stderr: {e}");
            None
        }
        None => {
            init_stderr(env_filter);
            None
        }
    }
}

fn init_stderr(env_filter: filter::EnvFilter) {
    let fmt_layer = layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(env_filter);
    registry().with(fmt_layer).init();
}
