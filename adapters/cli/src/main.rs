#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a headless wave arena session.

mod scenario;
mod simulation;

use std::{path::PathBuf, time::Duration};

use anyhow::{ensure, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wave_arena_core::ProgressStore;
use wave_arena_persistence::{JsonFileProgressStore, MemoryProgressStore};

use crate::{
    scenario::Scenario,
    simulation::{RunSummary, Settings, Simulation},
};

/// Runs a scripted player through an arena scenario.
#[derive(Debug, Parser)]
#[command(name = "wave-arena", version, about)]
struct Args {
    /// Scenario file holding `[waves]`, `[arena]` and `[spawning]` tables.
    #[arg(long, default_value = "demos/arena.toml")]
    scenario: PathBuf,
    /// JSON file progress is loaded from and saved to. Kept in memory when absent.
    #[arg(long)]
    save: Option<PathBuf>,
    /// Session length in simulated seconds.
    #[arg(long, default_value_t = 120.0)]
    duration: f32,
    /// Simulated milliseconds per tick.
    #[arg(long, default_value_t = 50)]
    tick_ms: u64,
    /// Milliseconds between two kills by the scripted player.
    #[arg(long, default_value_t = 400)]
    kill_interval_ms: u64,
    /// Player damage per second per point of enemy contact damage.
    #[arg(long, default_value_t = 0.02)]
    exposure: f32,
    /// Seed for spawn placement, pool draws and target choice.
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Start at wave 1 even when progress was saved.
    #[arg(long)]
    fresh: bool,
}

/// Entry point for the wave arena command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    ensure!(args.tick_ms > 0, "--tick-ms must be positive");
    ensure!(args.kill_interval_ms > 0, "--kill-interval-ms must be positive");
    let duration = Duration::try_from_secs_f32(args.duration)
        .with_context(|| format!("--duration {} is not a valid length", args.duration))?;

    let scenario = Scenario::load(&args.scenario)
        .with_context(|| format!("failed to load scenario {}", args.scenario.display()))?;
    for issue in scenario.waves.validate() {
        warn!(%issue, scenario = %args.scenario.display(), "scenario issue");
    }

    let settings = Settings {
        tick: Duration::from_millis(args.tick_ms),
        duration,
        kill_interval: Duration::from_millis(args.kill_interval_ms),
        exposure: args.exposure.max(0.0),
        seed: args.seed,
        resume: !args.fresh,
    };

    let summary = match &args.save {
        Some(path) => {
            let store = JsonFileProgressStore::open(path)
                .with_context(|| format!("failed to open progress file {}", path.display()))?;
            let (summary, store) = run(scenario, settings, store);
            let record = store.record();
            info!(
                path = %store.path().display(),
                current_wave = ?record.current_wave,
                max_wave_reached = record.max_wave_reached,
                "progress file updated"
            );
            summary
        }
        None => run(scenario, settings, MemoryProgressStore::new()).0,
    };

    println!("{summary}");
    Ok(())
}

fn run<S: ProgressStore>(scenario: Scenario, settings: Settings, store: S) -> (RunSummary, S) {
    let mut simulation = Simulation::new(scenario, settings, store);
    let summary = simulation.run();
    (summary, simulation.into_store())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
