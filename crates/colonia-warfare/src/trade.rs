//! Trade engine for inter-colony resource exchange.
//!
//! Implements the agreement lifecycle:
//!
//! 1. [`WarfareSystem::create_trade_agreement`] -- sign an agreement between
//!    two non-hostile colonies.
//! 2. [`WarfareSystem::attempt_automatic_trading`] -- match surpluses with
//!    needs and sign agreements on the colonies' behalf.
//! 3. [`WarfareSystem::process_trade_agreements`] -- execute due agreements
//!    and expire finished ones.
//! 4. [`WarfareSystem::cancel_trade_agreement`] -- end an agreement early.
//!
//! # Delivery
//!
//! Each partner pays its committed amounts in full and receives the other
//! side's commitment scaled by the volume factor
//! `trade_volume * route_efficiency * trust_bonus * relationship_multiplier`.
//! An execution where either side cannot pay is skipped entirely.

use std::collections::BTreeMap;

use colonia_types::{
    Colony, ColonyId, DiplomaticEvent, DiplomaticEventKind, RelationKind,
    ResourceKind, TradeAgreement, TradeId,
};
use rand::Rng;
use tracing::{debug, info};

use crate::error::WarfareError;
use crate::military::Roster;
use crate::system::WarfareSystem;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Shortest lifetime of a newly signed agreement.
const MIN_DURATION_TICKS: i64 = 500;

/// Longest lifetime of a newly signed agreement.
const MAX_DURATION_TICKS: i64 = 1500;

/// Trust nudge applied when an agreement is signed.
const SIGNING_TRUST_GAIN: f64 = 0.05;

/// Trust above which Neutral partners start rating each other as Trading.
const TRADING_TRUST: f64 = 0.6;

/// Trust automatic trading requires.
const AUTO_TRADE_TRUST: f64 = 0.4;

/// Surplus (and need) a resource must exceed to be traded automatically.
const AUTO_TRADE_THRESHOLD: f64 = 10.0;

/// Share of its surplus an automatic offer commits.
const AUTO_TRADE_SURPLUS_SHARE: f64 = 0.3;

/// Share of the partner's need an automatic offer covers.
const AUTO_TRADE_NEED_SHARE: f64 = 0.5;

/// Trust gained per successful execution, scaled by route efficiency.
const EXECUTION_TRUST_GAIN: f64 = 0.02;

/// Route efficiency before distance, relation, trust and war effects.
const BASE_ROUTE_EFFICIENCY: f64 = 0.8;

/// Distance beyond which routes get no worse.
const MAX_ROUTE_DISTANCE: f64 = 200.0;

/// Trust bonus curve as `(trust, bonus)` points, interpolated linearly.
const TRUST_BONUS_CURVE: [(f64, f64); 5] =
    [(0.0, 0.5), (0.3, 0.8), (0.6, 1.2), (0.8, 1.5), (1.0, 2.0)];

// ---------------------------------------------------------------------------
// Pure rules
// ---------------------------------------------------------------------------

/// Delivery multiplier earned by trust between partners.
pub fn trust_bonus(trust: f64) -> f64 {
    let trust = trust.clamp(0.0, 1.0);
    let mut previous = (0.0, 0.5);
    for (x, y) in TRUST_BONUS_CURVE {
        if trust <= x {
            let (x0, y0) = previous;
            let span = x - x0;
            if span <= 0.0 {
                return y;
            }
            return y0 + (y - y0) * (trust - x0) / span;
        }
        previous = (x, y);
    }
    previous.1
}

/// Delivery multiplier for a relation.
pub const fn relationship_multiplier(relation: RelationKind) -> f64 {
    match relation {
        RelationKind::Allied => 1.5,
        RelationKind::Trading => 1.3,
        RelationKind::Neutral => 1.0,
        RelationKind::Truce => 0.8,
        RelationKind::Vassal => 1.2,
        RelationKind::Enemy => 0.1,
    }
}

/// Route efficiency adjustment for a relation.
const fn relation_route_adjustment(relation: RelationKind) -> f64 {
    match relation {
        RelationKind::Allied => 0.2,
        RelationKind::Trading => 0.1,
        RelationKind::Truce => -0.1,
        RelationKind::Enemy => -0.5,
        RelationKind::Neutral | RelationKind::Vassal => 0.0,
    }
}

/// Amounts `giver` can spare for `taker`: every resource where the giver's
/// surplus and the taker's need both exceed the threshold.
pub fn matching_terms(giver: &Colony, taker: &Colony) -> BTreeMap<ResourceKind, f64> {
    ResourceKind::ALL
        .into_iter()
        .filter_map(|kind| {
            let surplus = giver.surplus(kind);
            let need = taker.need(kind);
            (surplus > AUTO_TRADE_THRESHOLD && need > AUTO_TRADE_THRESHOLD).then(|| {
                (
                    kind,
                    (surplus * AUTO_TRADE_SURPLUS_SHARE).min(need * AUTO_TRADE_NEED_SHARE),
                )
            })
        })
        .collect()
}

fn scaled(amounts: &BTreeMap<ResourceKind, f64>, factor: f64) -> BTreeMap<ResourceKind, f64> {
    amounts.iter().map(|(k, v)| (*k, v * factor)).collect()
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

impl WarfareSystem {
    /// Efficiency of the trade route between two colonies, in `[0.1, 1.0]`.
    ///
    /// Long routes, hostility, distrust and every active conflict touching
    /// either partner make routes worse.
    pub fn route_efficiency(&self, a: &Colony, b: &Colony) -> f64 {
        let distance = a.location.distance(&b.location);
        let relation = self.ledger.relation(a.id, b.id);
        let trust = self.ledger.trust(a.id, b.id);
        let war_drag: f64 = self
            .active_conflicts()
            .filter(|c| c.involves(a.id) || c.involves(b.id))
            .map(|c| 0.3 * c.intensity)
            .sum();
        let efficiency = BASE_ROUTE_EFFICIENCY
            - 0.3 * distance.min(MAX_ROUTE_DISTANCE) / MAX_ROUTE_DISTANCE
            + relation_route_adjustment(relation)
            + (trust - 0.5) * 0.2
            - war_drag;
        efficiency.clamp(0.1, 1.0)
    }

    /// Sign a trade agreement. `colony1` ships `offered`, `colony2` ships
    /// `wanted`, every `trade_execution_interval_ticks`.
    ///
    /// The agreement runs for a random 500 to 1500 ticks. Signing nudges
    /// trust up, which may turn Neutral partners into Trading partners.
    pub fn create_trade_agreement(
        &mut self,
        colony1: ColonyId,
        colony2: ColonyId,
        offered: BTreeMap<ResourceKind, f64>,
        wanted: BTreeMap<ResourceKind, f64>,
        trade_volume: f64,
        tick: u64,
    ) -> Result<TradeId, WarfareError> {
        if colony1 == colony2 {
            return Err(WarfareError::SameColony(colony1));
        }
        for id in [colony1, colony2] {
            if !self.ledger.contains(id) {
                return Err(WarfareError::UnknownColony(id));
            }
        }
        if self.ledger.relation(colony1, colony2) == RelationKind::Enemy {
            return Err(WarfareError::EnemyRelation {
                a: colony1,
                b: colony2,
            });
        }

        let duration = self
            .rng
            .random_range(MIN_DURATION_TICKS..=MAX_DURATION_TICKS);
        let id = self.allocate_trade_id();
        self.trades.insert(
            id,
            TradeAgreement {
                id,
                colony1,
                colony2,
                start_tick: tick,
                duration,
                offered,
                wanted,
                trade_volume,
                active: true,
                last_trade_tick: tick,
                consecutive_failures: 0,
                executions: 0,
                total_transferred: 0.0,
            },
        );
        self.ledger.link_trade(colony1, colony2, id);

        let trust = self
            .ledger
            .adjust_trust(colony1, colony2, SIGNING_TRUST_GAIN);
        self.promote_to_trading(colony1, colony2, trust);
        self.ledger.record_event(
            colony1,
            colony2,
            DiplomaticEvent::new(
                tick,
                DiplomaticEventKind::TradeAgreement,
                colony2,
                format!("Signed a {duration}-tick trade agreement with colony {colony2}"),
            )
            .with_deltas(SIGNING_TRUST_GAIN, 0.0),
        );
        self.report.trades_signed.push(id);
        info!(tick, trade = %id, colony1 = %colony1, colony2 = %colony2, duration, "Trade agreement signed");
        Ok(id)
    }

    /// End an agreement early. Cancelling a finished agreement is a no-op.
    pub fn cancel_trade_agreement(&mut self, id: TradeId, tick: u64) -> Result<(), WarfareError> {
        if !self.trades.contains_key(&id) {
            return Err(WarfareError::TradeNotFound(id));
        }
        self.end_trade(id, tick);
        Ok(())
    }

    /// Execute every due agreement and expire finished ones.
    pub fn process_trade_agreements(&mut self, colonies: &mut [Colony], tick: u64) {
        let roster = Roster::build(colonies);
        self.run_trades(colonies, &roster, tick);
    }

    /// Match surpluses with needs across every registered pair present in
    /// `colonies` and sign agreements where both sides have something to
    /// give. Returns the IDs of the new agreements.
    pub fn attempt_automatic_trading(&mut self, colonies: &[Colony], tick: u64) -> Vec<TradeId> {
        let roster = Roster::build(colonies);
        self.auto_trade(colonies, &roster, tick)
    }

    pub(crate) fn run_trades(&mut self, colonies: &mut [Colony], roster: &Roster, tick: u64) {
        let interval = self.config.trade_execution_interval_ticks;
        let active: Vec<TradeId> = self
            .trades
            .values()
            .filter(|t| t.active)
            .map(|t| t.id)
            .collect();
        for id in active {
            let Some(trade) = self.trades.get(&id) else {
                continue;
            };
            let present = [trade.colony1, trade.colony2]
                .iter()
                .all(|c| roster.contains(*c) && self.ledger.contains(*c));
            if !present || trade.is_expired(tick) {
                self.end_trade(id, tick);
                continue;
            }
            if tick.saturating_sub(trade.last_trade_tick) >= interval {
                self.execute_trade(id, colonies, roster, tick);
            }
        }
    }

    fn execute_trade(&mut self, id: TradeId, colonies: &mut [Colony], roster: &Roster, tick: u64) {
        let Some(trade) = self.trades.get(&id) else {
            return;
        };
        let (c1, c2) = (trade.colony1, trade.colony2);
        let (Some(first), Some(second)) = (roster.get(colonies, c1), roster.get(colonies, c2))
        else {
            return;
        };

        if !first.can_afford(&trade.offered) || !second.can_afford(&trade.wanted) {
            self.record_trade_failure(id, tick);
            return;
        }

        let efficiency = self.route_efficiency(first, second);
        let trust = self.ledger.trust(c1, c2);
        let relation = self.ledger.relation(c1, c2);
        let factor = trade.trade_volume
            * efficiency
            * trust_bonus(trust)
            * relationship_multiplier(relation);
        let offered = trade.offered.clone();
        let wanted = trade.wanted.clone();

        if let Some(colony) = roster.get_mut(colonies, c1) {
            colony.consume(&offered);
        }
        if let Some(colony) = roster.get_mut(colonies, c2) {
            colony.consume(&wanted);
        }
        let to_second = scaled(&offered, factor);
        let to_first = scaled(&wanted, factor);
        if let Some(colony) = roster.get_mut(colonies, c2) {
            for (kind, amount) in &to_second {
                colony.add(*kind, *amount);
            }
        }
        if let Some(colony) = roster.get_mut(colonies, c1) {
            for (kind, amount) in &to_first {
                colony.add(*kind, *amount);
            }
        }
        let delivered: f64 = to_second.values().chain(to_first.values()).sum();

        let trust = self
            .ledger
            .adjust_trust(c1, c2, EXECUTION_TRUST_GAIN * efficiency);
        self.promote_to_trading(c1, c2, trust);

        if let Some(trade) = self.trades.get_mut(&id) {
            trade.last_trade_tick = tick;
            trade.consecutive_failures = 0;
            trade.executions = trade.executions.saturating_add(1);
            trade.total_transferred += delivered;
        }
        self.report.trades_executed = self.report.trades_executed.saturating_add(1);
        debug!(tick, trade = %id, factor, efficiency, delivered, trust, "Trade executed");
    }

    fn record_trade_failure(&mut self, id: TradeId, tick: u64) {
        let max_failures = self.config.max_trade_failures;
        let Some(trade) = self.trades.get_mut(&id) else {
            return;
        };
        trade.last_trade_tick = tick;
        trade.consecutive_failures = trade.consecutive_failures.saturating_add(1);
        let failures = trade.consecutive_failures;
        self.report.trades_failed = self.report.trades_failed.saturating_add(1);
        debug!(tick, trade = %id, failures, "Trade skipped, a partner could not pay");
        if failures >= max_failures {
            self.end_trade(id, tick);
        }
    }

    /// Deactivate an agreement and drop both partners' back-references.
    pub(crate) fn end_trade(&mut self, id: TradeId, tick: u64) {
        let Some(trade) = self.trades.get_mut(&id) else {
            return;
        };
        if !trade.active {
            return;
        }
        trade.active = false;
        let (c1, c2) = (trade.colony1, trade.colony2);
        let executions = trade.executions;
        self.ledger.unlink_trade(c1, c2, id);
        self.report.trades_ended.push(id);
        debug!(tick, trade = %id, executions, "Trade agreement ended");
    }

    pub(crate) fn auto_trade(
        &mut self,
        colonies: &[Colony],
        roster: &Roster,
        tick: u64,
    ) -> Vec<TradeId> {
        let mut signed = Vec::new();
        for (a, b) in self.ledger.pairs() {
            let (Some(first), Some(second)) = (roster.get(colonies, a), roster.get(colonies, b))
            else {
                continue;
            };
            if self.ledger.relation(a, b) == RelationKind::Enemy
                || self.ledger.trust(a, b) <= AUTO_TRADE_TRUST
                || self.ledger.trade_between(a, b).is_some()
            {
                continue;
            }
            let offered = matching_terms(first, second);
            let wanted = matching_terms(second, first);
            if offered.is_empty() || wanted.is_empty() {
                continue;
            }
            match self.create_trade_agreement(a, b, offered, wanted, 1.0, tick) {
                Ok(id) => signed.push(id),
                Err(error) => debug!(tick, %error, "Automatic trade refused"),
            }
        }
        signed
    }

    fn promote_to_trading(&mut self, a: ColonyId, b: ColonyId, trust: f64) {
        if trust > TRADING_TRUST && self.ledger.relation(a, b) == RelationKind::Neutral {
            self.ledger.set_relation(a, b, RelationKind::Trading);
        }
    }
}

#[cfg(test)]
mod tests {
    use colonia_types::Position;

    use super::*;
    use crate::config::WarfareConfig;

    fn colony(id: u64, x: f64, food: f64, water: f64) -> Colony {
        Colony::new(ColonyId(id), 40, Position::new(x, 0.0))
            .with_resource(ResourceKind::Food, food)
            .with_resource(ResourceKind::Water, water)
    }

    fn system(colonies: &[Colony]) -> WarfareSystem {
        let mut system = WarfareSystem::new(
            WarfareConfig {
                border_conflict_chance: 0.0,
                ..WarfareConfig::default()
            }
            .with_seed(9),
        );
        for c in colonies {
            system.register_colony(c);
        }
        system
    }

    fn one(kind: ResourceKind, amount: f64) -> BTreeMap<ResourceKind, f64> {
        BTreeMap::from([(kind, amount)])
    }

    #[test]
    fn trust_bonus_curve() {
        assert!((trust_bonus(-1.0) - 0.5).abs() < 1e-9);
        assert!((trust_bonus(0.0) - 0.5).abs() < 1e-9);
        assert!((trust_bonus(0.15) - 0.65).abs() < 1e-9);
        assert!((trust_bonus(0.3) - 0.8).abs() < 1e-9);
        assert!((trust_bonus(0.5) - (0.8 + 0.4 * 2.0 / 3.0)).abs() < 1e-9);
        assert!((trust_bonus(0.7) - 1.35).abs() < 1e-9);
        assert!((trust_bonus(0.9) - 1.75).abs() < 1e-9);
        assert!((trust_bonus(1.0) - 2.0).abs() < 1e-9);
        assert!((trust_bonus(3.0) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn relationship_multipliers() {
        assert!((relationship_multiplier(RelationKind::Allied) - 1.5).abs() < f64::EPSILON);
        assert!((relationship_multiplier(RelationKind::Enemy) - 0.1).abs() < f64::EPSILON);
        assert!((relationship_multiplier(RelationKind::Vassal) - 1.2).abs() < f64::EPSILON);
    }

    #[test]
    fn route_efficiency_components() {
        let a = colony(1, 0.0, 0.0, 0.0);
        let b = colony(2, 100.0, 0.0, 0.0);
        let mut system = system(&[a.clone(), b.clone()]);
        // 0.8 - 0.15 + 0 + 0 = 0.65
        assert!((system.route_efficiency(&a, &b) - 0.65).abs() < 1e-9);

        system
            .ledger
            .set_relation(ColonyId(1), ColonyId(2), RelationKind::Allied);
        system.ledger.set_trust(ColonyId(1), ColonyId(2), 1.0);
        // 0.65 + 0.2 + 0.1 = 0.95
        assert!((system.route_efficiency(&a, &b) - 0.95).abs() < 1e-9);

        system
            .ledger
            .set_relation(ColonyId(1), ColonyId(2), RelationKind::Enemy);
        system.ledger.set_trust(ColonyId(1), ColonyId(2), 0.0);
        assert!((system.route_efficiency(&a, &b) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn enemies_cannot_trade() {
        let colonies = [colony(1, 0.0, 50.0, 0.0), colony(2, 5.0, 0.0, 50.0)];
        let mut system = system(&colonies);
        system
            .ledger
            .set_relation(ColonyId(1), ColonyId(2), RelationKind::Enemy);
        let result = system.create_trade_agreement(
            ColonyId(1),
            ColonyId(2),
            one(ResourceKind::Food, 5.0),
            one(ResourceKind::Water, 5.0),
            1.0,
            0,
        );
        assert_eq!(
            result,
            Err(WarfareError::EnemyRelation {
                a: ColonyId(1),
                b: ColonyId(2)
            })
        );
        assert_eq!(system.trade_agreements().count(), 0);
    }

    #[test]
    fn signing_nudges_trust_and_sets_duration() {
        let colonies = [colony(1, 0.0, 50.0, 0.0), colony(2, 5.0, 0.0, 50.0)];
        let mut system = system(&colonies);
        let id = system.create_trade_agreement(
            ColonyId(1),
            ColonyId(2),
            one(ResourceKind::Food, 5.0),
            one(ResourceKind::Water, 5.0),
            1.0,
            0,
        );
        let trade = id.ok().and_then(|id| system.trade_agreement(id));
        assert!(trade.is_some_and(|t| (500..=1500).contains(&t.duration)));
        assert!((system.trust(ColonyId(1), ColonyId(2)) - 0.55).abs() < 1e-9);
        assert_eq!(
            system.relation(ColonyId(1), ColonyId(2)),
            RelationKind::Neutral
        );
        assert_eq!(system.history_between(ColonyId(1), ColonyId(2)).len(), 1);
    }

    #[test]
    fn execution_moves_resources_and_builds_trust() {
        let mut colonies = vec![colony(1, 0.0, 50.0, 0.0), colony(2, 5.0, 0.0, 50.0)];
        let mut system = system(&colonies);
        let id = system.create_trade_agreement(
            ColonyId(1),
            ColonyId(2),
            one(ResourceKind::Food, 5.0),
            one(ResourceKind::Water, 5.0),
            1.0,
            0,
        );
        let trust_before = system.trust(ColonyId(1), ColonyId(2));

        for tick in 1..=20 {
            system.process_trade_agreements(&mut colonies, tick);
        }

        let trade = id.ok().and_then(|id| system.trade_agreement(id));
        assert_eq!(trade.map(|t| t.executions), Some(2));
        assert!(trade.is_some_and(|t| t.total_transferred > 0.0));
        assert!(system.trust(ColonyId(1), ColonyId(2)) > trust_before);
        assert!(colonies.first().is_some_and(|c| c.amount(ResourceKind::Water) > 0.0));
        assert!(colonies.get(1).is_some_and(|c| c.amount(ResourceKind::Food) > 0.0));
        assert!(colonies.first().is_some_and(|c| (c.amount(ResourceKind::Food) - 40.0).abs() < 1e-9));
    }

    #[test]
    fn repeated_failures_deactivate() {
        let mut colonies = vec![colony(1, 0.0, 0.0, 0.0), colony(2, 5.0, 0.0, 50.0)];
        let mut system = system(&colonies);
        let id = system.create_trade_agreement(
            ColonyId(1),
            ColonyId(2),
            one(ResourceKind::Food, 5.0),
            one(ResourceKind::Water, 5.0),
            1.0,
            0,
        );
        for tick in 1..=30 {
            system.process_trade_agreements(&mut colonies, tick);
        }
        let trade = id.ok().and_then(|id| system.trade_agreement(id));
        assert!(trade.is_some_and(|t| !t.active && t.consecutive_failures == 3));
        assert!(system.ledger.trade_between(ColonyId(1), ColonyId(2)).is_none());
        // Nothing was taken from the side that could pay.
        assert!(colonies.get(1).is_some_and(|c| (c.amount(ResourceKind::Water) - 50.0).abs() < 1e-9));
    }

    #[test]
    fn agreement_expires_after_duration() {
        let mut colonies = vec![colony(1, 0.0, 0.0, 0.0), colony(2, 5.0, 0.0, 0.0)];
        let mut system = system(&colonies);
        let id = system.create_trade_agreement(
            ColonyId(1),
            ColonyId(2),
            BTreeMap::new(),
            BTreeMap::new(),
            1.0,
            0,
        );
        system.process_trade_agreements(&mut colonies, 1501);
        let trade = id.ok().and_then(|id| system.trade_agreement(id));
        assert!(trade.is_some_and(|t| !t.active));
    }

    #[test]
    fn cancel_unknown_trade() {
        let mut system = system(&[]);
        assert_eq!(
            system.cancel_trade_agreement(TradeId(4), 0),
            Err(WarfareError::TradeNotFound(TradeId(4)))
        );
    }

    #[test]
    fn automatic_trading_needs_both_directions() {
        // Colony 1 is rich in food, colony 2 in water; both need the other.
        let rich_food = colony(1, 0.0, 100.0, 0.0);
        let rich_water = colony(2, 5.0, 0.0, 100.0);
        let mut system = system(&[rich_food.clone(), rich_water.clone()]);
        let signed = system.attempt_automatic_trading(&[rich_food.clone(), rich_water], 100);
        assert_eq!(signed.len(), 1);
        let trade = signed.first().and_then(|id| system.trade_agreement(*id));
        // surplus 80 * 0.3 = 24, need 20 * 0.5 = 10.
        assert!(trade.is_some_and(|t| {
            t.offered
                .get(&ResourceKind::Food)
                .is_some_and(|a| (a - 10.0).abs() < 1e-9)
        }));

        // One-sided surplus signs nothing.
        let poor = colony(3, 8.0, 0.0, 0.0);
        system.register_colony(&poor);
        let signed = system.attempt_automatic_trading(&[rich_food, poor], 200);
        assert!(signed.is_empty());
    }
}
