//! The engine facade: owns every arena and drives the per-tick update.
//!
//! # Update order
//!
//! 1. Register newly seen colonies; forget vanished ones and close every
//!    conflict, trade agreement and alliance membership naming them.
//! 2. Recompute borders.
//! 3. Conflict ignition, then one battle turn for every active conflict.
//! 4. Revert the fitness boosts granted by the previous tick's alliance
//!    pass. They have now fought exactly one battle turn.
//! 5. Peace negotiation (every `diplomacy_interval_ticks`).
//! 6. Trade execution and expiry, then automatic trading (every
//!    `auto_trade_interval_ticks`).
//! 7. Alliance upkeep (expiry, sharing, shared defense, joint operations),
//!    then automatic formation (every `alliance_formation_interval_ticks`).
//!
//! # Fitness contract
//!
//! Alliance boosts are applied by adding a delta to [`Colony::fitness`] and
//! reverted in step 4 by subtracting the same delta. The colony simulation
//! must carry `fitness` through unchanged between two `update` calls. If it
//! recomputes fitness from scratch in between, the revert lands on a value
//! that never held the boost and permanently lowers it.
//!
//! `update` takes `&mut self`, so no reader can observe a half-applied tick.
//! Viewers take a [`WarfareSnapshot`] once `update` has returned.

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use colonia_types::{
    Alliance, AllianceId, Colony, ColonyId, Conflict, ConflictId, DiplomaticEvent,
    DiplomaticEventKind, RelationKind, TerritoryBorder, TradeAgreement, TradeId, WarfareStats,
};

use crate::border;
use crate::config::WarfareConfig;
use crate::error::WarfareError;
use crate::ledger::{ColonyDiplomacy, RelationLedger};
use crate::military::{FitnessBoost, Roster, revert_boost};

/// Whether a periodic pass runs on `tick`. Tick 0 never triggers one.
pub(crate) fn due(tick: u64, interval: u64) -> bool {
    tick > 0 && tick.checked_rem(interval) == Some(0)
}

// ---------------------------------------------------------------------------
// TickReport
// ---------------------------------------------------------------------------

/// Summary of everything one [`WarfareSystem::update`] call changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// The tick that was processed.
    pub tick: u64,
    /// Colonies seen for the first time.
    pub colonies_registered: Vec<ColonyId>,
    /// Colonies that vanished and were removed from the ledger.
    pub colonies_forgotten: Vec<ColonyId>,
    /// Number of borders after recomputation.
    pub borders: usize,
    /// Conflicts opened this tick.
    pub conflicts_started: Vec<ConflictId>,
    /// Conflicts that ended this tick.
    pub conflicts_ended: Vec<ConflictId>,
    /// Battle turns fought.
    pub battles: usize,
    /// Trade agreements signed.
    pub trades_signed: Vec<TradeId>,
    /// Trade executions that delivered resources.
    pub trades_executed: usize,
    /// Trade executions skipped because a partner could not pay.
    pub trades_failed: usize,
    /// Trade agreements that ended.
    pub trades_ended: Vec<TradeId>,
    /// Alliances formed.
    pub alliances_formed: Vec<AllianceId>,
    /// Alliances dissolved.
    pub alliances_dissolved: Vec<AllianceId>,
    /// Coordinated alliance offensives launched.
    pub joint_operations: Vec<ConflictId>,
    /// Enemy pairs that signed a truce.
    pub truces_signed: usize,
    /// Truce pairs that returned to neutrality.
    pub relations_normalized: usize,
}

impl TickReport {
    fn new(tick: u64) -> Self {
        Self {
            tick,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// WarfareSnapshot
// ---------------------------------------------------------------------------

/// An owned, serializable copy of the engine state for viewers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarfareSnapshot {
    /// Aggregate statistics.
    pub stats: WarfareStats,
    /// Every colony's diplomacy.
    pub ledger: RelationLedger,
    /// Every conflict, active or finished.
    pub conflicts: Vec<Conflict>,
    /// Every trade agreement, active or finished.
    pub trade_agreements: Vec<TradeAgreement>,
    /// Every alliance, active or dissolved.
    pub alliances: Vec<Alliance>,
    /// Current borders.
    pub borders: Vec<TerritoryBorder>,
}

// ---------------------------------------------------------------------------
// WarfareSystem
// ---------------------------------------------------------------------------

/// The diplomacy and warfare engine.
#[derive(Debug)]
pub struct WarfareSystem {
    pub(crate) config: WarfareConfig,
    pub(crate) ledger: RelationLedger,
    pub(crate) conflicts: BTreeMap<ConflictId, Conflict>,
    pub(crate) trades: BTreeMap<TradeId, TradeAgreement>,
    pub(crate) alliances: BTreeMap<AllianceId, Alliance>,
    pub(crate) borders: Vec<TerritoryBorder>,
    pub(crate) boosts: Vec<FitnessBoost>,
    pub(crate) rng: SmallRng,
    pub(crate) report: TickReport,
    next_conflict_id: ConflictId,
    next_trade_id: TradeId,
    next_alliance_id: AllianceId,
}

impl WarfareSystem {
    /// Create an engine. The RNG is seeded from `config.seed` when present.
    pub fn new(config: WarfareConfig) -> Self {
        let rng = config.seed.map_or_else(
            || SmallRng::from_rng(&mut rand::rng()),
            SmallRng::seed_from_u64,
        );
        Self {
            config,
            ledger: RelationLedger::new(),
            conflicts: BTreeMap::new(),
            trades: BTreeMap::new(),
            alliances: BTreeMap::new(),
            borders: Vec::new(),
            boosts: Vec::new(),
            rng,
            report: TickReport::default(),
            next_conflict_id: ConflictId(1),
            next_trade_id: TradeId(1),
            next_alliance_id: AllianceId(1),
        }
    }

    /// Advance the engine by one tick.
    ///
    /// Leaves boost deltas on `fitness` until the next call; see the
    /// module's fitness contract.
    pub fn update(&mut self, colonies: &mut [Colony], tick: u64) -> TickReport {
        self.report = TickReport::new(tick);
        let roster = Roster::build(colonies);

        self.sync_colonies(&roster, tick);
        self.recompute_borders(colonies);

        self.process_ignition(colonies, &roster, tick);
        self.process_conflicts(colonies, &roster, tick);
        self.revert_boosts(colonies, &roster);

        if due(tick, self.config.diplomacy_interval_ticks) {
            self.attempt_diplomacy(tick);
        }

        self.run_trades(colonies, &roster, tick);
        if due(tick, self.config.auto_trade_interval_ticks) {
            self.auto_trade(colonies, &roster, tick);
        }

        self.process_alliances(colonies, &roster, tick);
        if due(tick, self.config.alliance_formation_interval_ticks) {
            self.attempt_alliance_formation(&roster, tick);
        }

        let report = std::mem::take(&mut self.report);
        debug!(
            tick,
            colonies = self.ledger.len(),
            borders = report.borders,
            battles = report.battles,
            started = report.conflicts_started.len(),
            ended = report.conflicts_ended.len(),
            trades = report.trades_executed,
            "Warfare tick complete"
        );
        report
    }

    // -----------------------------------------------------------------------
    // Colony bookkeeping
    // -----------------------------------------------------------------------

    /// Register a colony in the relation ledger. Idempotent.
    pub fn register_colony(&mut self, colony: &Colony) -> bool {
        self.ledger.register(colony.id)
    }

    fn sync_colonies(&mut self, roster: &Roster, tick: u64) {
        for id in roster.ids() {
            if self.ledger.register(id) {
                self.report.colonies_registered.push(id);
            }
        }

        let vanished: Vec<ColonyId> = self
            .ledger
            .colony_ids()
            .into_iter()
            .filter(|id| !roster.contains(*id))
            .collect();
        for id in vanished {
            self.forget_colony(id, tick);
        }
    }

    /// Remove a vanished colony and every object that names it.
    fn forget_colony(&mut self, colony: ColonyId, tick: u64) {
        let conflicts: Vec<ConflictId> = self
            .conflicts
            .values()
            .filter(|c| c.active && c.involves(colony))
            .map(|c| c.id)
            .collect();
        for id in conflicts {
            self.abandon_conflict(id, tick);
        }

        let trades: Vec<TradeId> = self
            .trades
            .values()
            .filter(|t| t.active && t.involves(colony))
            .map(|t| t.id)
            .collect();
        for id in trades {
            self.end_trade(id, tick);
        }

        let alliances: Vec<AllianceId> = self
            .alliances
            .values()
            .filter(|a| a.active && a.has_member(colony))
            .map(|a| a.id)
            .collect();
        for id in alliances {
            self.drop_member(id, colony, tick);
        }

        self.boosts.retain(|b| b.colony != colony);
        self.ledger.forget(colony);
        self.report.colonies_forgotten.push(colony);
        info!(tick, colony = %colony, "Colony vanished, diplomacy forgotten");
    }

    fn revert_boosts(&mut self, colonies: &mut [Colony], roster: &Roster) {
        for boost in std::mem::take(&mut self.boosts) {
            if let Some(colony) = roster.get_mut(colonies, boost.colony) {
                revert_boost(colony, &boost);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Borders
    // -----------------------------------------------------------------------

    fn recompute_borders(&mut self, colonies: &[Colony]) {
        self.borders = border::compute_borders(
            colonies,
            &self.borders,
            &self.ledger,
            self.config.adjacency_distance,
        );
        self.ledger.clear_borders();
        for border in &self.borders {
            self.ledger.set_border(border);
        }
        self.report.borders = self.borders.len();
    }

    /// Index of the border between two colonies, if one exists.
    pub(crate) fn border_index(&self, a: ColonyId, b: ColonyId) -> Option<usize> {
        self.borders.iter().position(|border| border.separates(a, b))
    }

    /// Build one fortification on the border between two colonies.
    ///
    /// Returns the fortification count afterwards. At the configured cap the
    /// border is left as is and the current count is returned.
    pub fn fortify_border(
        &mut self,
        colony: ColonyId,
        neighbour: ColonyId,
        tick: u64,
    ) -> Result<u32, WarfareError> {
        if colony == neighbour {
            return Err(WarfareError::SameColony(colony));
        }
        for id in [colony, neighbour] {
            if !self.ledger.contains(id) {
                return Err(WarfareError::UnknownColony(id));
            }
        }
        let max = self.config.max_fortifications;
        let index = self.border_index(colony, neighbour);
        let Some(border) = index.and_then(|i| self.borders.get_mut(i)) else {
            return Err(WarfareError::BorderNotFound {
                a: colony,
                b: neighbour,
            });
        };
        if border.fortifications >= max {
            return Ok(border.fortifications);
        }
        border.fortifications = border.fortifications.saturating_add(1);
        let count = border.fortifications;
        let snapshot = border.clone();
        self.ledger.set_border(&snapshot);
        self.ledger.record_event(
            colony,
            neighbour,
            DiplomaticEvent::new(
                tick,
                DiplomaticEventKind::BorderFortified,
                neighbour,
                format!("Fortified the border with colony {neighbour} ({count} in place)"),
            ),
        );
        debug!(tick, colony = %colony, neighbour = %neighbour, count, "Border fortified");
        Ok(count)
    }

    // -----------------------------------------------------------------------
    // ID allocation
    // -----------------------------------------------------------------------

    pub(crate) const fn allocate_conflict_id(&mut self) -> ConflictId {
        let id = self.next_conflict_id;
        self.next_conflict_id = id.next();
        id
    }

    pub(crate) const fn allocate_trade_id(&mut self) -> TradeId {
        let id = self.next_trade_id;
        self.next_trade_id = id.next();
        id
    }

    pub(crate) const fn allocate_alliance_id(&mut self) -> AllianceId {
        let id = self.next_alliance_id;
        self.next_alliance_id = id.next();
        id
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Aggregate statistics. Relation counts are per unordered pair.
    pub fn stats(&self) -> WarfareStats {
        let mut relation_counts = BTreeMap::new();
        for (a, b) in self.ledger.pairs() {
            let entry = relation_counts
                .entry(self.ledger.relation(a, b))
                .or_insert(0_usize);
            *entry = entry.saturating_add(1);
        }
        WarfareStats {
            total_colonies: self.ledger.len(),
            active_conflicts: self.conflicts.values().filter(|c| c.active).count(),
            total_alliances: self.alliances.values().filter(|a| a.active).count(),
            active_trade_agreements: self.trades.values().filter(|t| t.active).count(),
            relation_counts,
            border_conflict_chance: self.config.border_conflict_chance,
            resource_competition_factor: self.config.resource_competition_factor,
        }
    }

    /// The configuration the engine runs with.
    pub const fn config(&self) -> &WarfareConfig {
        &self.config
    }

    /// The relation ledger.
    pub const fn ledger(&self) -> &RelationLedger {
        &self.ledger
    }

    /// Every conflict, active or finished, in ID order.
    pub fn conflicts(&self) -> impl Iterator<Item = &Conflict> {
        self.conflicts.values()
    }

    /// Conflicts still being fought.
    pub fn active_conflicts(&self) -> impl Iterator<Item = &Conflict> {
        self.conflicts.values().filter(|c| c.active)
    }

    /// One conflict by ID.
    pub fn conflict(&self, id: ConflictId) -> Option<&Conflict> {
        self.conflicts.get(&id)
    }

    /// Every trade agreement, active or finished, in ID order.
    pub fn trade_agreements(&self) -> impl Iterator<Item = &TradeAgreement> {
        self.trades.values()
    }

    /// One trade agreement by ID.
    pub fn trade_agreement(&self, id: TradeId) -> Option<&TradeAgreement> {
        self.trades.get(&id)
    }

    /// Every alliance, active or dissolved, in ID order.
    pub fn alliances(&self) -> impl Iterator<Item = &Alliance> {
        self.alliances.values()
    }

    /// One alliance by ID.
    pub fn alliance(&self, id: AllianceId) -> Option<&Alliance> {
        self.alliances.get(&id)
    }

    /// Current borders.
    pub fn borders(&self) -> &[TerritoryBorder] {
        &self.borders
    }

    /// Every event in a colony's history, ordered by tick.
    pub fn history(&self, colony: ColonyId) -> Vec<&DiplomaticEvent> {
        let mut events: Vec<&DiplomaticEvent> = self
            .ledger
            .get(colony)
            .map(|d| d.history().values().flatten().collect())
            .unwrap_or_default();
        events.sort_by_key(|e| e.tick);
        events
    }

    /// Events `colony` recorded about `other`, in recording order.
    pub fn history_between(&self, colony: ColonyId, other: ColonyId) -> &[DiplomaticEvent] {
        self.ledger
            .get(colony)
            .and_then(|d| d.history().get(&other))
            .map_or(&[], Vec::as_slice)
    }

    /// Relation between two colonies.
    pub fn relation(&self, a: ColonyId, b: ColonyId) -> RelationKind {
        self.ledger.relation(a, b)
    }

    /// Trust between two colonies.
    pub fn trust(&self, a: ColonyId, b: ColonyId) -> f64 {
        self.ledger.trust(a, b)
    }

    /// A colony's reputation.
    pub fn reputation(&self, colony: ColonyId) -> f64 {
        self.ledger.reputation(colony)
    }

    /// A colony's full diplomacy.
    pub fn diplomacy(&self, colony: ColonyId) -> Option<&ColonyDiplomacy> {
        self.ledger.get(colony)
    }

    /// An owned copy of the engine state.
    pub fn snapshot(&self) -> WarfareSnapshot {
        WarfareSnapshot {
            stats: self.stats(),
            ledger: self.ledger.clone(),
            conflicts: self.conflicts.values().cloned().collect(),
            trade_agreements: self.trades.values().cloned().collect(),
            alliances: self.alliances.values().cloned().collect(),
            borders: self.borders.clone(),
        }
    }
}
