//! cadence - run a self-rescheduling sync chain against simulated boundaries.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cadence_core::observability::QueueCounts;
use cadence_core::queue::{InMemoryQueue, TaskSource};
use cadence_core::service::{ChannelSpec, ServiceHost};
use cadence_core::{BoundaryError, ChainConfig, ChainRuntime, ChainStatus, Trigger, WorkerGroup};

mod simulated;

use simulated::{ConsoleChannel, SimulatedEngine, SimulatedLoop};

/// Cadence - an externally-paced, self-rescheduling task chain
#[derive(Parser)]
#[command(name = "cadence")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML config file (defaults are used when omitted)
    #[arg(long, env = "CADENCE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Trigger the bootstrap and let the chain reschedule itself
    Chain(ChainArgs),

    /// Run the long-lived loop instead of the chain
    Service {
        /// Stop after this many seconds (Ctrl-C stops earlier)
        #[arg(long, default_value_t = 5)]
        run_for: u64,
    },
}

#[derive(Args)]
struct ChainArgs {
    /// Host signal to deliver; repeat to simulate duplicate triggers
    #[arg(long = "trigger", default_value = "boot")]
    triggers: Vec<Trigger>,

    /// Seconds the environment oracle recommends before the first sync
    #[arg(long, default_value_t = 2, allow_negative_numbers = true)]
    oracle_delay: i64,

    /// Seconds the sync engine recommends before the next sync
    #[arg(long, default_value_t = 3, allow_negative_numbers = true)]
    engine_delay: i64,

    /// Make every n-th sync fail (0 = never)
    #[arg(long, default_value_t = 0)]
    engine_fail_every: u32,

    /// Stop after this many seconds (Ctrl-C stops earlier)
    #[arg(long, default_value_t = 15)]
    run_for: u64,
}

#[derive(Serialize)]
struct Report {
    chain: ChainStatus,
    queue: QueueCounts,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config = match &cli.config {
        Some(path) => ChainConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ChainConfig::default(),
    };

    match cli.command {
        Commands::Chain(args) => run_chain(&config, args).await,
        Commands::Service { run_for } => run_service(run_for).await,
    }
}

async fn run_chain(config: &ChainConfig, args: ChainArgs) -> Result<()> {
    let queue = Arc::new(InMemoryQueue::with_history_limit(
        config.retry_policy(),
        config.history_limit,
    ));
    let oracle_delay = args.oracle_delay;
    let runtime = ChainRuntime::builder()
        .queue(queue.clone())
        .oracle(move || -> Result<i64, BoundaryError> { Ok(oracle_delay) })
        .engine(SimulatedEngine::new(args.engine_delay, args.engine_fail_every))
        .config(config)
        .build()
        .context("failed to build chain runtime")?;
    let runtime = Arc::new(runtime);

    let source: Arc<dyn TaskSource> = queue.clone();
    let workers = WorkerGroup::spawn(config.workers, source, Arc::clone(&runtime));

    for trigger in args.triggers {
        let result = runtime
            .trigger(trigger)
            .await
            .with_context(|| format!("failed to deliver trigger {trigger}"))?;
        info!(%trigger, task_id = %result.task_id(), new = result.is_new(), "trigger delivered");
    }

    wait(Duration::from_secs(args.run_for)).await;

    queue.close().await;
    workers.shutdown_and_join().await;

    let report = Report {
        chain: runtime.status(),
        queue: queue.counts_by_state().await?,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn run_service(run_for: u64) -> Result<()> {
    let host = ServiceHost::new(
        SimulatedLoop::default(),
        ConsoleChannel::default(),
        ChannelSpec::background("cadence", "Cadence"),
    );
    host.start().context("failed to start service")?;

    wait(Duration::from_secs(run_for)).await;

    host.stop();
    info!(ticks = host.native().ticks(), "service finished");
    Ok(())
}

async fn wait(run_for: Duration) {
    tokio::select! {
        _ = tokio::time::sleep(run_for) => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!(error = %e, "failed to listen for Ctrl-C");
            }
            info!("interrupted");
        }
    }
}
