//! fastbook - process entry point.
//!
//! ```text
//! parse CLI → init logging → build engine → spawn pipeline →
//! install Ctrl+C handler → poll loop → print final stats → exit
//! ```

use anyhow::{Context, Result};
use fastbook::config::Config;
use fastbook::engine::MatchingEngine;
use fastbook::ingress::{DatagramSource, UdpDatagramSource};
use fastbook::logging::init_logging;
use fastbook::pipeline::{PipelineController, PipelineQueues, PipelineStats, ShutdownSignal};
use std::sync::Arc;

fn main() -> Result<()> {
    let config = Config::from_args().context("failed to parse configuration")?;
    let _log_guard = init_logging(&config);

    tracing::info!(bind_addr = %config.bind_addr, output = %config.output_path, "starting fastbook");

    let source: Box<dyn DatagramSource> =
        Box::new(UdpDatagramSource::bind(&config.bind_addr).context("failed to bind ingress socket")?);

    let engine = MatchingEngine::new();
    let queues = PipelineQueues::with_capacity(config.in_queue_capacity, config.out_queue_capacity);
    let shutdown = Arc::new(ShutdownSignal::new());
    let stats = Arc::new(PipelineStats::new());

    install_shutdown_handler(Arc::clone(&shutdown))?;

    let snapshot = if config.output_path == "-" {
        let controller =
            PipelineController::start(engine, source, std::io::stdout(), queues, shutdown, stats);
        controller.run_until_shutdown()
    } else {
        let file = std::fs::File::create(&config.output_path)
            .with_context(|| format!("failed to open output path {}", config.output_path))?;
        let controller = PipelineController::start(engine, source, file, queues, shutdown, stats);
        controller.run_until_shutdown()
    };

    tracing::info!(%snapshot, "pipeline stopped");
    println!("{snapshot}");
    Ok(())
}

/// Installs a SIGINT/SIGTERM handler via `ctrlc` that flips the shared
/// shutdown flag. The core is agnostic to what sets this bit - tests drive
/// shutdown directly without touching signal handling at all.
fn install_shutdown_handler(shutdown: Arc<ShutdownSignal>) -> Result<()> {
    ctrlc::set_handler(move || shutdown.request_shutdown()).context("failed to install signal handler")
}
