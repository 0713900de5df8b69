//! Logging configuration with file-based output and size-based rotation.
//!
//! Writes logs to `<data dir>/bossfall.log` with 10 MB size-based rotation.
//! Set `DEBUG_LOGGING=1` (or `debug_logging = true` in the config) to enable
//! debug output for bossfall crates. The terminal layer writes to stderr so
//! it does not interleave with REPL output on stdout.

use std::path::Path;

use rolling_file::{BasicRollingFileAppender, RollingConditionBasic};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const DEBUG_DIRECTIVES: &str = "info,bossfall_core=debug,bossfall_cli=debug";

fn filter_directive(debug_logging: bool) -> &'static str {
    if debug_logging { DEBUG_DIRECTIVES } else { "info" }
}

/// Initialize logging with dual output (file + stderr).
///
/// Returns a `WorkerGuard` that must be held for the program lifetime so
/// buffered log lines are flushed on exit. Falls back to stderr-only logging
/// (and returns `None`) when the log file cannot be created.
pub fn init(log_dir: &Path, debug_logging: bool) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let debug_logging = debug_logging || std::env::var("DEBUG_LOGGING").is_ok();

    if let Err(e) = std::fs::create_dir_all(log_dir) {
        // Can't use tracing yet since subscriber not initialized
        eprintln!("Failed to create log directory {:?}: {}, using stderr only", log_dir, e);
        init_stderr_only(debug_logging);
        return None;
    }

    let log_path = log_dir.join("bossfall.log");
    let file_appender = match BasicRollingFileAppender::new(
        &log_path,
        RollingConditionBasic::new().max_size(10 * 1024 * 1024),
        1,
    ) {
        Ok(appender) => appender,
        Err(e) => {
            eprintln!("Failed to create log file at {:?}: {}", log_path, e);
            init_stderr_only(debug_logging);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_span_events(FmtSpan::NONE);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_span_events(FmtSpan::NONE);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .with(EnvFilter::new(filter_directive(debug_logging)))
        .init();

    tracing::info!(log_file = ?log_path, debug_logging, "Bossfall logging initialized");

    Some(guard)
}

fn init_stderr_only(debug_logging: bool) {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_span_events(FmtSpan::NONE);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(EnvFilter::new(filter_directive(debug_logging)))
        .init();

    tracing::info!(debug_logging, "Bossfall logging initialized (stderr only)");
}
