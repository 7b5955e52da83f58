//! The harness tick loop.
//!
//! Each tick the spawner tends the colonies' economies, then the warfare
//! engine runs its full update over them. Tick reports are folded into
//! [`RunTotals`], and a statistics line is logged every
//! `report_interval_ticks`.

use colonia_types::Colony;
use colonia_warfare::{TickReport, WarfareSystem};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::RunConfig;
use crate::spawner::{self, SpawnerConfig};

/// Running totals over every tick report of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunTotals {
    /// Ticks simulated.
    pub ticks: u64,
    /// Conflicts opened, by ignition, API or joint operation.
    pub conflicts_started: usize,
    /// Conflicts settled or abandoned.
    pub conflicts_ended: usize,
    /// Battle turns fought.
    pub battles: usize,
    /// Trade agreements signed.
    pub trades_signed: usize,
    /// Successful trade executions.
    pub trades_executed: usize,
    /// Skipped trade executions.
    pub trades_failed: usize,
    /// Alliances formed.
    pub alliances_formed: usize,
    /// Alliances dissolved.
    pub alliances_dissolved: usize,
    /// Joint operations launched.
    pub joint_operations: usize,
    /// Truces signed.
    pub truces_signed: usize,
    /// Truces relaxed back to neutrality.
    pub relations_normalized: usize,
    /// Colonies forgotten after vanishing.
    pub colonies_forgotten: usize,
}

impl RunTotals {
    /// Fold one tick report into the totals.
    pub fn absorb(&mut self, report: &TickReport) {
        self.ticks = self.ticks.saturating_add(1);
        self.conflicts_started = self
            .conflicts_started
            .saturating_add(report.conflicts_started.len());
        self.conflicts_ended = self
            .conflicts_ended
            .saturating_add(report.conflicts_ended.len());
        self.battles = self.battles.saturating_add(report.battles);
        self.trades_signed = self.trades_signed.saturating_add(report.trades_signed.len());
        self.trades_executed = self.trades_executed.saturating_add(report.trades_executed);
        self.trades_failed = self.trades_failed.saturating_add(report.trades_failed);
        self.alliances_formed = self
            .alliances_formed
            .saturating_add(report.alliances_formed.len());
        self.alliances_dissolved = self
            .alliances_dissolved
            .saturating_add(report.alliances_dissolved.len());
        self.joint_operations = self
            .joint_operations
            .saturating_add(report.joint_operations.len());
        self.truces_signed = self.truces_signed.saturating_add(report.truces_signed);
        self.relations_normalized = self
            .relations_normalized
            .saturating_add(report.relations_normalized);
        self.colonies_forgotten = self
            .colonies_forgotten
            .saturating_add(report.colonies_forgotten.len());
    }
}

/// Run `run.ticks` ticks, starting at tick 1.
pub fn run(
    system: &mut WarfareSystem,
    colonies: &mut [Colony],
    run: &RunConfig,
    spawner_config: &SpawnerConfig,
    rng: &mut impl Rng,
) -> RunTotals {
    let mut totals = RunTotals::default();
    for tick in 1..=run.ticks {
        spawner::tend_colonies(colonies, spawner_config, rng);
        let report = system.update(colonies, tick);
        debug!(
            tick,
            conflicts_started = report.conflicts_started.len(),
            conflicts_ended = report.conflicts_ended.len(),
            battles = report.battles,
            trades_executed = report.trades_executed,
            "Tick complete"
        );
        totals.absorb(&report);

        if run.report_interval_ticks > 0
            && tick.checked_rem(run.report_interval_ticks) == Some(0)
        {
            log_stats(system, tick);
        }
    }
    totals
}

/// Log the engine's aggregate statistics at `info`.
pub fn log_stats(system: &WarfareSystem, tick: u64) {
    let stats = system.stats();
    let relations: Vec<String> = stats
        .relation_counts
        .iter()
        .map(|(kind, count)| format!("{}={count}", kind.as_str()))
        .collect();
    info!(
        tick,
        colonies = stats.total_colonies,
        active_conflicts = stats.active_conflicts,
        alliances = stats.total_alliances,
        trade_agreements = stats.active_trade_agreements,
        relations = %relations.join(","),
        "Warfare statistics"
    );
}

/// Log the totals of a finished run.
pub fn log_run_end(totals: &RunTotals) {
    info!(
        ticks = totals.ticks,
        conflicts_started = totals.conflicts_started,
        conflicts_ended = totals.conflicts_ended,
        battles = totals.battles,
        trades_signed = totals.trades_signed,
        trades_executed = totals.trades_executed,
        alliances_formed = totals.alliances_formed,
        joint_operations = totals.joint_operations,
        truces_signed = totals.truces_signed,
        "Run finished"
    );
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use colonia_types::{ConflictId, TradeId};
    use colonia_warfare::WarfareConfig;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    #[test]
    fn totals_fold_reports() {
        let mut totals = RunTotals::default();
        let report = TickReport {
            tick: 1,
            conflicts_started: vec![ConflictId(1), ConflictId(2)],
            battles: 3,
            trades_signed: vec![TradeId(1)],
            truces_signed: 1,
            ..TickReport::default()
        };
        totals.absorb(&report);
        totals.absorb(&report);

        assert_eq!(totals.ticks, 2);
        assert_eq!(totals.conflicts_started, 4);
        assert_eq!(totals.battles, 6);
        assert_eq!(totals.trades_signed, 2);
        assert_eq!(totals.truces_signed, 2);
        assert_eq!(totals.alliances_formed, 0);
    }

    #[test]
    fn seeded_run_is_reproducible() {
        let spawner_config = SpawnerConfig::default();
        let run_config = RunConfig {
            ticks: 300,
            report_interval_ticks: 100,
            snapshot_path: None,
        };
        let play = || {
            let mut rng = SmallRng::seed_from_u64(21);
            let mut colonies = spawner::spawn_colonies(&spawner_config, &mut rng).unwrap();
            let mut system = WarfareSystem::new(
                WarfareConfig {
                    border_conflict_chance: 0.05,
                    ..WarfareConfig::default()
                }
                .with_seed(21),
            );
            let totals = run(&mut system, &mut colonies, &run_config, &spawner_config, &mut rng);
            (totals, system.stats(), colonies)
        };

        let (first_totals, first_stats, first_colonies) = play();
        let (second_totals, second_stats, second_colonies) = play();
        assert_eq!(first_totals.ticks, 300);
        assert_eq!(first_totals, second_totals);
        assert_eq!(first_stats, second_stats);
        assert_eq!(first_colonies, second_colonies);
    }

    #[test]
    fn crowded_world_sees_diplomacy() {
        let spawner_config = SpawnerConfig {
            count: 10,
            world_size: 30.0,
            ..SpawnerConfig::default()
        };
        let run_config = RunConfig {
            ticks: 1000,
            report_interval_ticks: 0,
            snapshot_path: None,
        };
        let mut rng = SmallRng::seed_from_u64(8);
        let mut colonies = spawner::spawn_colonies(&spawner_config, &mut rng).unwrap();
        let mut system = WarfareSystem::new(
            WarfareConfig {
                border_conflict_chance: 0.05,
                ..WarfareConfig::default()
            }
            .with_seed(8),
        );

        let totals = run(&mut system, &mut colonies, &run_config, &spawner_config, &mut rng);
        assert!(totals.conflicts_started > 0);
        assert!(totals.battles > 0);
        assert!(system.ledger().is_consistent());
        assert!(colonies.iter().all(|c| c.size >= 1));
    }
}
