//! Tracing setup for the docproc server.
//!
//! Logs go to stdout with a compact formatter. When `DOCPROC_LOG_FILE` points at a
//! writable path, a second non-blocking layer appends structured lines there so that
//! container platforms capturing only stdout and operators tailing a file both work.
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

// Keeps the non-blocking writer flushing until process exit.
static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the global tracing subscriber.
///
/// `RUST_LOG` controls filtering and defaults to `info`. The file layer is optional;
/// a failure to open the target file downgrades to stdout-only logging rather than
/// aborting startup.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(false).compact();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    match file_writer() {
        Some(writer) => {
            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .compact();
            registry.with(file_layer).init();
        }
        None => registry.init(),
    }
}

fn file_writer() -> Option<NonBlocking> {
    let path = std::env::var("DOCPROC_LOG_FILE").ok()?;
    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
    {
        Ok(file) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let _ = LOG_GUARD.set(guard);
            Some(non_blocking)
        }
        Err(err) => {
            eprintln!("Failed to open log file {path}: {err}");
            None
        }
    }
}
