//! Structured logging setup: a non-blocking file layer plus an ANSI stderr
//! layer, gated by an `EnvFilter`.

use crate::config::Config;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initializes the global tracing subscriber. The returned [`WorkerGuard`]
/// must be held for the process lifetime - dropping it flushes and stops
/// the non-blocking file writer.
pub fn init_logging(config: &Config) -> WorkerGuard {
    let _ = std::fs::create_dir_all("logs");
    let file_appender = tracing_appender::rolling::never("logs", "fastbook.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    let registry = tracing_subscriber::registry().with(filter);

    if config.log_json {
        let file_layer = fmt::layer().json().with_target(true).with_writer(non_blocking).with_ansi(false);
        registry.with(file_layer).init();
    } else {
        let file_layer = fmt::layer().with_target(false).with_writer(non_blocking).with_ansi(false);
        // stderr, not stdout: Egress may itself be writing CSV to stdout.
        let stderr_layer = fmt::layer().with_target(false).with_ansi(true).with_writer(std::io::stderr);
        registry.with(file_layer).with(stderr_layer).init();
    }

    guard
}
