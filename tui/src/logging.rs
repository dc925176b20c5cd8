use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

const DEFAULT_FILTER: &str = "kiosk_core=info,kiosk_client=info,kiosk_tui=info";
const LOG_FILE_NAME: &str = "kiosk.log";

pub(crate) fn default_log_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("kiosk")
}

/// Routes `tracing` output to `<log_dir>/kiosk.log`. The terminal belongs to
/// the UI, so nothing is written to stdout or stderr.
///
/// The returned guard flushes the writer when dropped.
pub(crate) fn init_logging(log_dir: &Path) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("creating log directory {}", log_dir.display()))?;

    let appender = tracing_appender::rolling::never(log_dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_filter(env_filter);

    // A subscriber may already be installed in tests.
    let _ = tracing_subscriber::registry().with(file_layer).try_init();
    Ok(guard)
}
