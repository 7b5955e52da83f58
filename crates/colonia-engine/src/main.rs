//! Headless harness for the Colonia diplomacy and warfare engine.
//!
//! Seeds a world of synthetic colonies, drives [`WarfareSystem::update`]
//! once per tick, and logs statistics along the way.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `$COLONIA_CONFIG` or `colonia-config.yaml`
//! 3. Seed the random number generator
//! 4. Spawn colonies
//! 5. Run the tick loop
//! 6. Log the totals and write the final snapshot

mod config;
mod error;
mod runner;
mod spawner;

use std::path::Path;

use anyhow::Context;
use colonia_warfare::WarfareSystem;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::runner::RunTotals;

/// Everything written to the snapshot file at the end of a run.
#[derive(Debug, Serialize)]
struct RunOutput<'a> {
    totals: &'a RunTotals,
    state: colonia_warfare::WarfareSnapshot,
}

/// Application entry point for the harness.
fn main() -> anyhow::Result<()> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("colonia-engine starting");

    // 2. Load configuration.
    let path = config::config_path();
    let config = config::load(&path)
        .with_context(|| format!("loading configuration from {}", path.display()))?;
    info!(
        ticks = config.run.ticks,
        colonies = config.colonies.count,
        seed = ?config.warfare.seed,
        border_conflict_chance = config.warfare.border_conflict_chance,
        "Configuration loaded"
    );

    // 3. Seed the harness RNG. A configured seed makes the whole run
    //    reproducible; the engine derives its own stream from the same seed.
    let mut rng = config.warfare.seed.map_or_else(
        || SmallRng::from_rng(&mut rand::rng()),
        SmallRng::seed_from_u64,
    );

    // 4. Spawn colonies.
    let mut colonies = spawner::spawn_colonies(&config.colonies, &mut rng)?;
    info!(colonies = colonies.len(), "Colonies spawned");

    // 5. Run.
    let mut system = WarfareSystem::new(config.warfare.clone());
    let totals = runner::run(
        &mut system,
        &mut colonies,
        &config.run,
        &config.colonies,
        &mut rng,
    );

    // 6. Report.
    runner::log_stats(&system, config.run.ticks);
    runner::log_run_end(&totals);
    if let Some(snapshot_path) = &config.run.snapshot_path {
        write_snapshot(snapshot_path, &totals, &system)?;
        info!(path = %snapshot_path.display(), "Snapshot written");
    }

    info!("colonia-engine shutdown complete");
    Ok(())
}

/// Serialize the run totals and engine snapshot as pretty JSON.
fn write_snapshot(
    path: &Path,
    totals: &RunTotals,
    system: &WarfareSystem,
) -> Result<(), EngineError> {
    let output = RunOutput {
        totals,
        state: system.snapshot(),
    };
    let json = serde_json::to_string_pretty(&output).map_err(|e| EngineError::Snapshot {
        message: format!("failed to serialize snapshot: {e}"),
    })?;
    std::fs::write(path, json).map_err(|e| EngineError::Snapshot {
        message: format!("failed to write {}: {e}", path.display()),
    })
}
