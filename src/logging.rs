//! Logger setup.
//!
//! Events go to a daily-rolling file under `app.log_dir` (`docdesk.log`,
//! suffixed by date) and, at `warn` and above, to stderr. `RUST_LOG`
//! overrides the default `info` filter. Initialization runs once per
//! process; later calls are no-ops.

use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use crate::config::AppConfig;

pub const LOG_FILE_PREFIX: &str = "docdesk.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

pub fn init(app: &AppConfig) -> Result<()> {
    if LOG_GUARD.get().is_some() {
        return Ok(());
    }
    let log_dir: &Path = &app.log_dir;
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    if LOG_GUARD.set(guard).is_err() {
        return Ok(());
    }

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking);
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(LevelFilter::WARN);

    // A subscriber installed elsewhere (tests, embedding app) wins.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init();

    tracing::debug!(app = %app.name, dir = %log_dir.display(), "logging initialized");
    Ok(())
}

/// Span that tags every event of a session with its id.
pub fn session_span(session_id: &str) -> tracing::Span {
    tracing::info_span!("session", session_id = %session_id)
}
