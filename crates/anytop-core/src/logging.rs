//! Optional debug trace sink.
//!
//! The terminal belongs to the renderer, so nothing is logged unless a trace
//! file is requested. The file is recreated on every run.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the trace filter (defaults to `debug`).
pub const LOG_FILTER_ENV: &str = "ANYTOP_LOG";

/// Keeps the background log writer alive; dropping it flushes the file.
#[must_use = "dropping the guard stops the trace writer"]
pub struct TraceGuard {
    guard: Option<WorkerGuard>,
}

/// Sends `tracing` output to `path`, or does nothing when `path` is `None`.
///
/// # Errors
/// Returns an error if the old trace cannot be removed or a global
/// subscriber is already installed.
pub fn init_trace(path: Option<&Path>) -> Result<TraceGuard> {
    let Some(path) = path else {
        return Ok(TraceGuard { guard: None });
    };

    if path.exists() {
        fs::remove_file(path)
            .with_context(|| format!("Failed to remove old trace {}", path.display()))?;
    }
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .with_context(|| format!("Trace path {} has no file name", path.display()))?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter =
        EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_thread_names(true)
        .try_init()
        .map_err(|err| anyhow!("Failed to install trace subscriber: {err}"))?;

    tracing::info!(path = %path.display(), "debug trace started");
    Ok(TraceGuard {
        guard: Some(guard),
    })
}
