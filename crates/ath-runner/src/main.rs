//! # ath-runner
//!
//! Main entry point for the all-time-high notifier.
//!
//! Loads a JSON configuration file, wires the all-time-high recipe onto an
//! in-process event bus, and keeps it running until Ctrl+C. Trades can be fed
//! from a JSON-lines recording with `--replay`; `--loopback` answers the
//! render and post requests locally for dry runs.
//!
//! # Usage
//!
//! ```bash
//! ath-runner config.json --log-level info --replay trades.jsonl --loopback
//! ```

mod loopback;
mod replay;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use ath_core::bus::{EventBus, LocalBus};
use ath_core::events::Event;
use ath_core::logging::{LogOptions, init_logging};
use ath_recipe::highs::{HighsCollection, JsonFileHighs, MemoryHighs};
use ath_recipe::{AllTimeHighRecipe, Recipe};
use clap::Parser;
use tokio::io::BufReader;
use tracing::{debug, error, info};

/// All-time-high notifier.
#[derive(Parser)]
#[command(name = "ath-runner", about = "All-time-high trade notifier")]
struct Cli {
    /// Configuration file path (JSON).
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Optional log directory for file output. Overrides `recipe.log_path`.
    #[arg(long)]
    log_dir: Option<String>,

    /// Write file logs as JSON lines.
    #[arg(long)]
    json_logs: bool,

    /// Replay trades from a JSON-lines file (`-` for stdin).
    #[arg(long)]
    replay: Option<String>,

    /// Answer render and post requests locally instead of calling out.
    #[arg(long)]
    loopback: bool,

    /// Log every bus event at debug level.
    #[arg(long)]
    trace_events: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load configuration
    let config = ath_core::config::load_config(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let module_name = config.module_name();

    // 2. Initialize logging
    let log_dir = cli.log_dir.clone().or_else(|| config.log_path());
    init_logging(&LogOptions {
        level: &cli.log_level,
        dir: log_dir.as_deref(),
        file_prefix: &module_name,
        json_file: cli.json_logs,
    });
    info!("ath-runner starting: config={}, log_level={}", cli.config.display(), cli.log_level);

    // 3. Bus and highs collection
    let bus: Arc<dyn EventBus> = Arc::new(LocalBus::new());
    let highs: Arc<dyn HighsCollection> = match &config.highs_path {
        Some(path) => {
            info!("highs collection: {path}");
            Arc::new(JsonFileHighs::new(path))
        }
        None => {
            info!("highs collection: in-memory (not persisted)");
            Arc::new(MemoryHighs::new())
        }
    };

    if cli.trace_events {
        bus.subscribe(
            "**",
            Arc::new(|ev: &Event| debug!(target: "bus", "{} {}", ev.name, ev.payload)),
        );
    }
    if cli.loopback {
        loopback::install(&bus);
    }

    // 4. Start the recipe
    let mut recipe = AllTimeHighRecipe::new(Arc::clone(&bus), highs, &config)?;
    recipe.start().await?;
    info!("recipe '{}' started, press Ctrl+C to stop", recipe.name());

    // 5. Optional replay feed
    let replay_task = cli.replay.clone().map(|source| {
        let bus = Arc::clone(&bus);
        tokio::spawn(async move {
            let result = if source == "-" {
                replay::replay(bus.as_ref(), BufReader::new(tokio::io::stdin())).await
            } else {
                match tokio::fs::File::open(&source).await {
                    Ok(file) => replay::replay(bus.as_ref(), BufReader::new(file)).await,
                    Err(e) => Err(anyhow::anyhow!("opening {source}: {e}")),
                }
            };
            if let Err(e) = result {
                error!("replay failed: {e:#}");
            }
        })
    });

    // 6. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    if let Some(task) = replay_task {
        task.abort();
    }

    // 7. Stop gracefully
    if let Err(e) = recipe.stop().await {
        error!("error stopping '{}': {e}", recipe.name());
    }
    info!("highs at shutdown: {}", recipe.state());
    Ok(())
}
