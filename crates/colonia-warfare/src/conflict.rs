//! Conflict engine: ignition, battle turns, termination and settlement.
//!
//! ## Conflict lifecycle
//!
//! 1. **Ignition** -- every border without an active conflict is rolled
//!    against `border_conflict_chance`. On a hit, each side in turn is
//!    evaluated as aggressor by [`ignition_probability`].
//! 2. **Opening** -- both sides become Enemy, trust drops, the initial
//!    intensity is drawn from the conflict type's range and a war goal is
//!    chosen from the size balance.
//! 3. **Battle turns** -- one per tick. The strength ratio and an
//!    independent roll select an outcome from [`classify_battle`].
//! 4. **Termination** -- a side falls below 5 members, the turn cap is
//!    exceeded, intensity fades below 0.1, or a late 5% roll hits.
//! 5. **Settlement** -- the war goal decides the winner, reputations move,
//!    and the pair falls back to Enemy or Truce depending on the bloodshed.

use colonia_types::{
    BattleOutcome, Colony, ColonyId, Conflict, ConflictId, ConflictType, DiplomaticEvent,
    DiplomaticEventKind, RelationKind, TerritoryBorder, WarGoal,
};
use rand::Rng;
use tracing::{debug, info};

use crate::config::WarfareConfig;
use crate::error::WarfareError;
use crate::military::{Roster, apply_casualties, military_strength, pick_index};
use crate::system::WarfareSystem;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Ignition probability between declared enemies.
const ENEMY_IGNITION_PROBABILITY: f64 = 0.3;

/// Scale applied to the size and proximity pressure.
const IGNITION_SCALE: f64 = 0.1;

/// Distance at which proximity pressure reaches zero.
const PROXIMITY_RANGE: f64 = 100.0;

/// Ticks during which a recent conflict dampens ignition.
const RECENT_CONFLICT_TICKS: u64 = 100;

/// Trust lost by both sides when a conflict opens.
const WAR_TRUST_PENALTY: f64 = 0.3;

/// Attacker-to-defender size ratio above which the goal is Dominance.
const DOMINANCE_SIZE_RATIO: f64 = 1.5;

/// Attackers holding fewer cells than this fight for territory.
const TERRITORY_HUNGRY_CELLS: usize = 5;

/// Share of casualties borne by the attacker. The defender takes the rest.
const ATTACKER_CASUALTY_SHARE: f64 = 0.3;

/// Share of casualties borne by the defender.
const DEFENDER_CASUALTY_SHARE: f64 = 0.7;

/// Turns after which intensity starts to decay.
const INTENSITY_DECAY_AFTER: u32 = 20;

/// Per-turn intensity decay factor.
const INTENSITY_DECAY: f64 = 0.95;

/// Colonies below this size cannot keep fighting.
const MIN_FIGHTING_SIZE: u32 = 5;

/// Intensity below which a conflict fizzles out.
const MIN_INTENSITY: f64 = 0.1;

/// Turns after which a conflict may end on a random roll.
const ATTRITION_AFTER: u32 = 30;

/// Per-turn chance a long conflict ends by attrition.
const ATTRITION_CHANCE: f64 = 0.05;

/// Attacker-to-defender size ratio a Dominance war must end above.
const DOMINANCE_WIN_RATIO: f64 = 1.2;

/// Casualties above which a settled conflict leaves the pair as enemies.
const BLOODY_CASUALTIES: f64 = 20.0;

/// Trust after a bloody settlement.
const BLOODY_TRUST: f64 = 0.1;

/// Trust after a settlement that ends in a truce.
const TRUCE_TRUST: f64 = 0.3;

/// Reputation gained by the winner and lost by the loser.
const SETTLEMENT_REPUTATION: f64 = 0.1;

// ---------------------------------------------------------------------------
// Pure rules
// ---------------------------------------------------------------------------

/// Probability that `aggressor` opens a border skirmish against `target`.
///
/// Allied pairs never ignite. Enemies ignite at a flat 30%. Everyone else
/// ignites on size and proximity pressure scaled by the competition factor,
/// doubled on disputed borders, halved after a recent conflict, and damped
/// once per fortification.
pub fn ignition_probability(
    relation: RelationKind,
    aggressor: &Colony,
    target: &Colony,
    border: &TerritoryBorder,
    tick: u64,
    config: &WarfareConfig,
) -> f64 {
    match relation {
        RelationKind::Allied => return 0.0,
        RelationKind::Enemy => return ENEMY_IGNITION_PROBABILITY,
        RelationKind::Neutral
        | RelationKind::Truce
        | RelationKind::Trading
        | RelationKind::Vassal => {}
    }

    let distance = aggressor.location.distance(&target.location);
    let proximity = 1.0 - distance.min(PROXIMITY_RANGE) / PROXIMITY_RANGE;
    let total = f64::from(aggressor.size) + f64::from(target.size);
    let relative_size = if total > 0.0 {
        f64::from(aggressor.size) / total
    } else {
        0.5
    };
    let pressure = (proximity + relative_size).min(1.0);

    let mut probability = pressure * config.resource_competition_factor * IGNITION_SCALE;
    if border.disputed {
        probability *= 2.0;
    }
    if border
        .last_conflict_tick
        .is_some_and(|last| tick.saturating_sub(last) <= RECENT_CONFLICT_TICKS)
    {
        probability *= 0.5;
    }
    let fortifications = i32::try_from(border.fortifications).unwrap_or(i32::MAX);
    probability *= config.fortification_ignition_factor.powi(fortifications);
    probability.clamp(0.0, 1.0)
}

/// Attacker share of the combined strength. 0.5 when both are zero.
pub fn strength_ratio(attacker: f64, defender: f64) -> f64 {
    let total = attacker + defender;
    if total > 0.0 { attacker / total } else { 0.5 }
}

/// Battle outcome for a strength ratio and an independent roll in `[0, 1)`.
///
/// The three outcomes partition the whole `(ratio, roll)` square:
/// attacker victory needs a clear edge and a good roll, defender victory a
/// clear deficit and a bad roll, and everything else is a stalemate.
pub fn classify_battle(ratio: f64, roll: f64) -> BattleOutcome {
    if ratio > 0.6 && roll > 0.3 {
        BattleOutcome::AttackerVictory
    } else if ratio < 0.4 && roll < 0.7 {
        BattleOutcome::DefenderVictory
    } else {
        BattleOutcome::Stalemate
    }
}

/// Casualty figure of one battle turn.
pub fn battle_casualties(
    outcome: BattleOutcome,
    attacker_size: u32,
    defender_size: u32,
    intensity: f64,
) -> f64 {
    match outcome {
        BattleOutcome::AttackerVictory => f64::from(defender_size) * 0.1 * intensity,
        BattleOutcome::DefenderVictory => f64::from(attacker_size) * 0.1 * intensity,
        BattleOutcome::Stalemate => {
            (f64::from(attacker_size) + f64::from(defender_size)) * 0.05 * intensity
        }
    }
}

/// War goal chosen when a conflict opens.
pub fn choose_war_goal(attacker: &Colony, defender: &Colony) -> WarGoal {
    if f64::from(attacker.size) > f64::from(defender.size) * DOMINANCE_SIZE_RATIO {
        WarGoal::Dominance
    } else if attacker.territory.len() < TERRITORY_HUNGRY_CELLS {
        WarGoal::Territory
    } else {
        WarGoal::Resources
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

impl WarfareSystem {
    /// Open a conflict between two colonies taken from `colonies`.
    ///
    /// Fails when the colonies are the same, either is unknown, they are
    /// allied, or they are already fighting.
    pub fn start_conflict(
        &mut self,
        colonies: &[Colony],
        attacker: ColonyId,
        defender: ColonyId,
        conflict_type: ConflictType,
        tick: u64,
    ) -> Result<ConflictId, WarfareError> {
        let find = |id: ColonyId| {
            colonies
                .iter()
                .find(|c| c.id == id)
                .ok_or(WarfareError::UnknownColony(id))
        };
        let attacker = find(attacker)?;
        let defender = find(defender)?;
        self.open_conflict(attacker, defender, conflict_type, tick)
    }

    pub(crate) fn open_conflict(
        &mut self,
        attacker: &Colony,
        defender: &Colony,
        conflict_type: ConflictType,
        tick: u64,
    ) -> Result<ConflictId, WarfareError> {
        let (a, d) = (attacker.id, defender.id);
        if a == d {
            return Err(WarfareError::SameColony(a));
        }
        for id in [a, d] {
            if !self.ledger.contains(id) {
                return Err(WarfareError::UnknownColony(id));
            }
        }
        if self.ledger.relation(a, d) == RelationKind::Allied {
            return Err(WarfareError::AlliedRelation { a, b: d });
        }
        if self.ledger.conflict_between(a, d).is_some() {
            return Err(WarfareError::AlreadyInConflict { a, b: d });
        }

        self.ledger.set_relation(a, d, RelationKind::Enemy);
        self.ledger.adjust_trust(a, d, -WAR_TRUST_PENALTY);

        let (low, high) = conflict_type.intensity_range();
        let intensity = self.rng.random_range(low..=high);
        let war_goal = choose_war_goal(attacker, defender);

        let id = self.allocate_conflict_id();
        self.conflicts.insert(
            id,
            Conflict {
                id,
                attacker: a,
                defender: d,
                conflict_type,
                start_tick: tick,
                turns_active: 0,
                casualties: 0.0,
                resources_lost: 0.0,
                claimed_territory: Vec::new(),
                intensity,
                war_goal,
                active: true,
                supporters: std::collections::BTreeSet::new(),
                last_outcome: None,
                winner: None,
                ended_tick: None,
            },
        );
        self.ledger.link_conflict(a, d, id);
        self.ledger.record_event(
            a,
            d,
            DiplomaticEvent::new(
                tick,
                DiplomaticEventKind::WarDeclaration,
                d,
                format!("Declared war on colony {d} over {}", war_goal.as_str()),
            )
            .with_deltas(-WAR_TRUST_PENALTY, 0.0),
        );

        if let Some(border) = self
            .border_index(a, d)
            .and_then(|i| self.borders.get_mut(i))
        {
            border.last_conflict_tick = Some(tick);
            border.disputed = true;
            let snapshot = border.clone();
            self.ledger.set_border(&snapshot);
        }

        self.report.conflicts_started.push(id);
        info!(
            tick,
            conflict = %id,
            attacker = %a,
            defender = %d,
            ?conflict_type,
            goal = war_goal.as_str(),
            intensity,
            "Conflict started"
        );
        Ok(id)
    }

    pub(crate) fn process_ignition(&mut self, colonies: &[Colony], roster: &Roster, tick: u64) {
        let candidates: Vec<TerritoryBorder> = self
            .borders
            .iter()
            .filter(|b| self.ledger.conflict_between(b.colony1, b.colony2).is_none())
            .cloned()
            .collect();

        for border in candidates {
            let active = self.conflicts.values().filter(|c| c.active).count();
            if active >= self.config.max_active_conflicts {
                break;
            }
            if self.rng.random::<f64>() >= self.config.border_conflict_chance {
                continue;
            }
            let (Some(first), Some(second)) = (
                roster.get(colonies, border.colony1),
                roster.get(colonies, border.colony2),
            ) else {
                continue;
            };
            // One decision per border, colony1 as aggressor.
            let relation = self.ledger.relation(first.id, second.id);
            let p = ignition_probability(relation, first, second, &border, tick, &self.config);
            if self.rng.random::<f64>() < p {
                if let Err(error) =
                    self.open_conflict(first, second, ConflictType::BorderSkirmish, tick)
                {
                    debug!(tick, %error, "Ignition refused");
                }
            }
        }
    }

    pub(crate) fn process_conflicts(
        &mut self,
        colonies: &mut [Colony],
        roster: &Roster,
        tick: u64,
    ) {
        let active: Vec<ConflictId> = self.active_conflicts().map(|c| c.id).collect();
        for id in active {
            let Some(conflict) = self.conflicts.get(&id) else {
                continue;
            };
            let (a, d) = (conflict.attacker, conflict.defender);
            if !roster.contains(a) || !roster.contains(d) {
                self.abandon_conflict(id, tick);
                continue;
            }
            self.fight_turn(id, colonies, roster);
            if self.should_end(id, colonies, roster) {
                self.settle_conflict(id, colonies, roster, tick);
            }
        }
    }

    fn fight_turn(&mut self, id: ConflictId, colonies: &mut [Colony], roster: &Roster) {
        let Some(conflict) = self.conflicts.get(&id) else {
            return;
        };
        let (a, d, intensity, goal) = (
            conflict.attacker,
            conflict.defender,
            conflict.intensity,
            conflict.war_goal,
        );
        let (Some(attacker), Some(defender)) = (roster.get(colonies, a), roster.get(colonies, d))
        else {
            return;
        };
        let defender_strength = military_strength(defender);
        let ratio = strength_ratio(military_strength(attacker), defender_strength);
        let outcome = classify_battle(ratio, self.rng.random::<f64>());
        let casualties = battle_casualties(outcome, attacker.size, defender.size, intensity);

        let mut claimed = None;
        if outcome == BattleOutcome::AttackerVictory && goal == WarGoal::Territory {
            let roll = self.rng.random::<f64>();
            if let Some(defender) = roster.get_mut(colonies, d) {
                if let Some(index) = pick_index(defender.territory.len(), roll) {
                    claimed = Some(defender.territory.remove(index));
                }
            }
        }

        let attacker_lost = roster
            .get_mut(colonies, a)
            .map_or(0, |c| apply_casualties(c, casualties * ATTACKER_CASUALTY_SHARE));
        let defender_lost = roster
            .get_mut(colonies, d)
            .map_or(0, |c| apply_casualties(c, casualties * DEFENDER_CASUALTY_SHARE));

        let Some(conflict) = self.conflicts.get_mut(&id) else {
            return;
        };
        conflict.turns_active = conflict.turns_active.saturating_add(1);
        conflict.casualties += casualties;
        conflict.last_outcome = Some(outcome);
        if outcome == BattleOutcome::AttackerVictory {
            conflict.resources_lost += defender_strength * 0.2;
        }
        if let Some(cell) = claimed {
            conflict.claimed_territory.push(cell);
        }
        if conflict.turns_active > INTENSITY_DECAY_AFTER {
            conflict.intensity *= INTENSITY_DECAY;
        }
        self.report.battles = self.report.battles.saturating_add(1);
        debug!(
            conflict = %id,
            ?outcome,
            ratio,
            casualties,
            attacker_lost,
            defender_lost,
            "Battle turn resolved"
        );
    }

    fn should_end(&mut self, id: ConflictId, colonies: &[Colony], roster: &Roster) -> bool {
        let Some(conflict) = self.conflicts.get(&id) else {
            return false;
        };
        let too_small = [conflict.attacker, conflict.defender].iter().any(|c| {
            roster
                .get(colonies, *c)
                .is_none_or(|colony| colony.size < MIN_FIGHTING_SIZE)
        });
        if too_small
            || conflict.turns_active > conflict.conflict_type.max_turns()
            || conflict.intensity < MIN_INTENSITY
        {
            return true;
        }
        conflict.turns_active > ATTRITION_AFTER && self.rng.random::<f64>() < ATTRITION_CHANCE
    }

    fn settle_conflict(
        &mut self,
        id: ConflictId,
        colonies: &mut [Colony],
        roster: &Roster,
        tick: u64,
    ) {
        let Some(conflict) = self.conflicts.get(&id) else {
            return;
        };
        let (a, d) = (conflict.attacker, conflict.defender);
        let (Some(attacker), Some(defender)) = (roster.get(colonies, a), roster.get(colonies, d))
        else {
            self.abandon_conflict(id, tick);
            return;
        };
        let attacker_won = match conflict.war_goal {
            WarGoal::Territory => !conflict.claimed_territory.is_empty(),
            WarGoal::Resources => conflict.resources_lost > 0.0 && attacker.size >= defender.size,
            WarGoal::Dominance => {
                f64::from(attacker.size) > f64::from(defender.size) * DOMINANCE_WIN_RATIO
            }
            WarGoal::AllianceDominance => self.rng.random::<f64>() < 0.5,
        };
        let (winner, loser) = if attacker_won { (a, d) } else { (d, a) };
        let bloody = conflict.casualties > BLOODY_CASUALTIES;
        let casualties = conflict.casualties;
        let claimed = conflict.claimed_territory.clone();

        self.ledger.adjust_reputation(winner, SETTLEMENT_REPUTATION);
        self.ledger.adjust_reputation(loser, -SETTLEMENT_REPUTATION);
        let (relation, trust) = if bloody {
            (RelationKind::Enemy, BLOODY_TRUST)
        } else {
            (RelationKind::Truce, TRUCE_TRUST)
        };
        self.ledger.set_relation(a, d, relation);
        self.ledger.set_trust(a, d, trust);

        if let Some(colony) = roster.get_mut(colonies, winner) {
            colony.territory.extend(claimed.iter().copied());
        }

        self.ledger.record_event(
            winner,
            loser,
            DiplomaticEvent::new(
                tick,
                DiplomaticEventKind::PeaceTreaty,
                loser,
                format!(
                    "Won the conflict with colony {loser}; {} cells taken, relations now {}",
                    claimed.len(),
                    relation.as_str()
                ),
            )
            .with_deltas(0.0, SETTLEMENT_REPUTATION),
        );
        self.ledger.unlink_conflict(a, d);

        if let Some(conflict) = self.conflicts.get_mut(&id) {
            conflict.active = false;
            conflict.winner = Some(winner);
            conflict.ended_tick = Some(tick);
        }
        self.report.conflicts_ended.push(id);
        info!(
            tick,
            conflict = %id,
            winner = %winner,
            loser = %loser,
            casualties,
            relation = relation.as_str(),
            "Conflict settled"
        );
    }

    /// Close a conflict without a settlement because a side vanished.
    pub(crate) fn abandon_conflict(&mut self, id: ConflictId, tick: u64) {
        let Some(conflict) = self.conflicts.get_mut(&id) else {
            return;
        };
        if !conflict.active {
            return;
        }
        conflict.active = false;
        conflict.winner = None;
        conflict.ended_tick = Some(tick);
        let (a, d) = (conflict.attacker, conflict.defender);
        self.ledger.unlink_conflict(a, d);
        self.report.conflicts_ended.push(id);
        info!(tick, conflict = %id, "Conflict abandoned, a side vanished");
    }
}

#[cfg(test)]
mod tests {
    use colonia_types::{CasteCounts, Position};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn colony(id: u64, size: u32, soldiers: u32, x: f64, cells: usize) -> Colony {
        let territory = (0..cells)
            .map(|i| Position::new(x, crate::military::count_to_f64(i)))
            .collect();
        Colony::new(ColonyId(id), size, Position::new(x, 0.0))
            .with_castes(CasteCounts {
                soldiers,
                workers: 10,
                queens: 1,
                others: 0,
            })
            .with_territory(territory)
    }

    fn border() -> TerritoryBorder {
        TerritoryBorder {
            colony1: ColonyId(1),
            colony2: ColonyId(2),
            border_points: vec![Position::new(1.0, 0.0)],
            length: 0.0,
            disputed: false,
            fortifications: 0,
            last_conflict_tick: None,
        }
    }

    fn system(colonies: &[Colony]) -> WarfareSystem {
        let mut system = WarfareSystem::new(
            WarfareConfig {
                border_conflict_chance: 0.0,
                ..WarfareConfig::default()
            }
            .with_seed(3),
        );
        for c in colonies {
            system.register_colony(c);
        }
        system
    }

    #[test]
    fn battle_partition_is_exhaustive() {
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..5000 {
            let ratio: f64 = rng.random();
            let roll: f64 = rng.random();
            let outcome = classify_battle(ratio, roll);
            let expected = if ratio > 0.6 && roll > 0.3 {
                BattleOutcome::AttackerVictory
            } else if ratio < 0.4 && roll < 0.7 {
                BattleOutcome::DefenderVictory
            } else {
                BattleOutcome::Stalemate
            };
            assert_eq!(outcome, expected);
        }
    }

    #[test]
    fn battle_band_edges() {
        assert_eq!(classify_battle(0.6, 0.9), BattleOutcome::Stalemate);
        assert_eq!(classify_battle(0.61, 0.31), BattleOutcome::AttackerVictory);
        assert_eq!(classify_battle(0.4, 0.1), BattleOutcome::Stalemate);
        assert_eq!(classify_battle(0.39, 0.69), BattleOutcome::DefenderVictory);
        assert_eq!(classify_battle(0.5, 0.5), BattleOutcome::Stalemate);
    }

    #[test]
    fn zero_strength_ratio_is_even() {
        assert!((strength_ratio(0.0, 0.0) - 0.5).abs() < f64::EPSILON);
        assert!((strength_ratio(3.0, 1.0) - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn casualty_figures() {
        let c = battle_casualties(BattleOutcome::AttackerVictory, 100, 50, 0.5);
        assert!((c - 2.5).abs() < 1e-9);
        let c = battle_casualties(BattleOutcome::DefenderVictory, 100, 50, 0.5);
        assert!((c - 5.0).abs() < 1e-9);
        let c = battle_casualties(BattleOutcome::Stalemate, 100, 50, 0.5);
        assert!((c - 3.75).abs() < 1e-9);
    }

    #[test]
    fn war_goal_selection() {
        let big = colony(1, 200, 10, 0.0, 10);
        let small = colony(2, 100, 10, 2.0, 10);
        assert_eq!(choose_war_goal(&big, &small), WarGoal::Dominance);

        let landless = colony(1, 100, 10, 0.0, 2);
        assert_eq!(choose_war_goal(&landless, &small), WarGoal::Territory);

        let landed = colony(1, 100, 10, 0.0, 8);
        assert_eq!(choose_war_goal(&landed, &small), WarGoal::Resources);
    }

    #[test]
    fn allies_never_ignite() {
        let a = colony(1, 100, 10, 0.0, 3);
        let b = colony(2, 10, 1, 1.0, 3);
        let config = WarfareConfig::default();
        let p = ignition_probability(RelationKind::Allied, &a, &b, &border(), 5, &config);
        assert!(p.abs() < f64::EPSILON);
        let p = ignition_probability(RelationKind::Enemy, &a, &b, &border(), 5, &config);
        assert!((p - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn ignition_modifiers() {
        // Same spot, equal size: pressure = min(1, 1 + 0.5) = 1.
        let a = colony(1, 50, 10, 0.0, 3);
        let b = colony(2, 50, 10, 0.0, 3);
        let config = WarfareConfig::default();
        let mut b0 = border();
        let base = ignition_probability(RelationKind::Neutral, &a, &b, &b0, 500, &config);
        assert!((base - 0.1).abs() < 1e-9);

        b0.disputed = true;
        let disputed = ignition_probability(RelationKind::Neutral, &a, &b, &b0, 500, &config);
        assert!((disputed - 0.2).abs() < 1e-9);

        b0.last_conflict_tick = Some(450);
        let recent = ignition_probability(RelationKind::Neutral, &a, &b, &b0, 500, &config);
        assert!((recent - 0.1).abs() < 1e-9);

        b0.fortifications = 2;
        let fortified = ignition_probability(RelationKind::Neutral, &a, &b, &b0, 500, &config);
        assert!((fortified - 0.081).abs() < 1e-9);
    }

    #[test]
    fn far_apart_pressure_is_relative_size() {
        let a = colony(1, 30, 10, 0.0, 3);
        let b = colony(2, 10, 10, 500.0, 3);
        let config = WarfareConfig::default();
        let p = ignition_probability(RelationKind::Trading, &a, &b, &border(), 5, &config);
        assert!((p - 0.075).abs() < 1e-9);
    }

    #[test]
    fn start_conflict_sets_enemy_and_drops_trust() {
        let colonies = vec![colony(1, 60, 10, 0.0, 3), colony(2, 50, 10, 2.0, 3)];
        let mut system = system(&colonies);

        let id = system.start_conflict(&colonies, ColonyId(1), ColonyId(2), ConflictType::Raid, 7);
        assert!(id.is_ok());
        assert_eq!(system.relation(ColonyId(2), ColonyId(1)), RelationKind::Enemy);
        assert!((system.trust(ColonyId(1), ColonyId(2)) - 0.2).abs() < 1e-9);

        let conflict = id.ok().and_then(|id| system.conflict(id));
        assert!(conflict.is_some_and(|c| (0.1..=0.3).contains(&c.intensity)));
        assert!(conflict.is_some_and(|c| c.war_goal == WarGoal::Territory));
        assert_eq!(system.history_between(ColonyId(1), ColonyId(2)).len(), 1);
        assert!(system.history_between(ColonyId(2), ColonyId(1)).is_empty());
    }

    #[test]
    fn start_conflict_rejections() {
        let colonies = vec![colony(1, 60, 10, 0.0, 3), colony(2, 50, 10, 2.0, 3)];
        let mut system = system(&colonies);

        assert_eq!(
            system.start_conflict(&colonies, ColonyId(1), ColonyId(1), ConflictType::Raid, 1),
            Err(WarfareError::SameColony(ColonyId(1)))
        );
        assert_eq!(
            system.start_conflict(&colonies, ColonyId(1), ColonyId(9), ConflictType::Raid, 1),
            Err(WarfareError::UnknownColony(ColonyId(9)))
        );

        system
            .ledger
            .set_relation(ColonyId(1), ColonyId(2), RelationKind::Allied);
        assert_eq!(
            system.start_conflict(&colonies, ColonyId(1), ColonyId(2), ConflictType::Raid, 1),
            Err(WarfareError::AlliedRelation {
                a: ColonyId(1),
                b: ColonyId(2)
            })
        );

        system
            .ledger
            .set_relation(ColonyId(1), ColonyId(2), RelationKind::Neutral);
        assert!(
            system
                .start_conflict(&colonies, ColonyId(1), ColonyId(2), ConflictType::Raid, 1)
                .is_ok()
        );
        assert_eq!(
            system.start_conflict(&colonies, ColonyId(2), ColonyId(1), ConflictType::Raid, 2),
            Err(WarfareError::AlreadyInConflict {
                a: ColonyId(2),
                b: ColonyId(1)
            })
        );
        assert_eq!(system.active_conflicts().count(), 1);
    }

    #[test]
    fn conflicts_run_to_settlement() {
        let mut colonies = vec![colony(1, 80, 30, 0.0, 3), colony(2, 60, 2, 2.0, 6)];
        let mut system = system(&colonies);
        let id = system.start_conflict(&colonies, ColonyId(1), ColonyId(2), ConflictType::Raid, 0);
        assert!(id.is_ok());

        for tick in 1..=40 {
            system.update(&mut colonies, tick);
            for c in &colonies {
                assert!(c.size >= 1);
            }
        }

        let conflict = id.ok().and_then(|id| system.conflict(id));
        assert!(conflict.is_some_and(|c| !c.active));
        assert!(conflict.is_some_and(|c| c.winner.is_some()));
        assert!(conflict.is_some_and(|c| c.turns_active <= ConflictType::Raid.max_turns() + 1));
        let relation = system.relation(ColonyId(1), ColonyId(2));
        let casualties = conflict.map_or(0.0, |c| c.casualties);
        if casualties > 20.0 {
            assert_eq!(relation, RelationKind::Enemy);
        } else {
            assert_eq!(relation, RelationKind::Truce);
        }
        assert!(system.ledger.conflict_between(ColonyId(1), ColonyId(2)).is_none());
    }

    #[test]
    fn vanished_side_abandons_conflict() {
        let mut colonies = vec![colony(1, 80, 10, 0.0, 3), colony(2, 60, 10, 2.0, 3)];
        let mut system = system(&colonies);
        let id = system.start_conflict(&colonies, ColonyId(1), ColonyId(2), ConflictType::TotalWar, 0);

        colonies.pop();
        system.update(&mut colonies, 1);

        let conflict = id.ok().and_then(|id| system.conflict(id));
        assert!(conflict.is_some_and(|c| !c.active && c.winner.is_none()));
        assert_eq!(conflict.and_then(|c| c.ended_tick), Some(1));
    }

    fn unarmed(id: u64, size: u32, x: f64, cells: usize) -> Colony {
        let mut c = colony(id, size, 0, x, cells);
        c.castes.workers = 0;
        c
    }

    /// Settle a freshly opened conflict under `goal` and return the winner.
    fn settle_under(
        goal: WarGoal,
        attacker_size: u32,
        defender_size: u32,
        resources_lost: f64,
    ) -> Option<ColonyId> {
        let mut colonies = vec![
            colony(1, attacker_size, 10, 0.0, 8),
            colony(2, defender_size, 10, 2.0, 8),
        ];
        let roster = Roster::build(&colonies);
        let mut system = system(&colonies);
        let id = system
            .start_conflict(&colonies, ColonyId(1), ColonyId(2), ConflictType::Raid, 0)
            .ok()?;
        if let Some(c) = system.conflicts.get_mut(&id) {
            c.war_goal = goal;
            c.resources_lost = resources_lost;
        }
        system.settle_conflict(id, &mut colonies, &roster, 1);
        system.conflict(id).and_then(|c| c.winner)
    }

    #[test]
    fn enemy_ignition_is_a_single_thirty_percent_roll() {
        let colonies = vec![colony(1, 60, 10, 0.0, 3), colony(2, 60, 10, 1.0, 3)];
        let roster = Roster::build(&colonies);
        let mut system = system(&colonies);
        system.config.border_conflict_chance = 1.0;
        system.borders = vec![border()];

        let trials: u32 = 10_000;
        let mut ignited: u32 = 0;
        for tick in 1..=u64::from(trials) {
            system
                .ledger
                .set_relation(ColonyId(1), ColonyId(2), RelationKind::Enemy);
            system.process_ignition(&colonies, &roster, tick);
            if let Some(id) = system.ledger.conflict_between(ColonyId(1), ColonyId(2)) {
                ignited = ignited.saturating_add(1);
                assert_eq!(system.conflict(id).map(|c| c.attacker), Some(ColonyId(1)));
                system.abandon_conflict(id, tick);
            }
        }

        let rate = f64::from(ignited) / f64::from(trials);
        assert!((rate - 0.3).abs() < 0.02, "ignition rate {rate}");
    }

    #[test]
    fn ignition_respects_active_conflict_cap() {
        let colonies = vec![
            colony(1, 60, 10, 0.0, 3),
            colony(2, 60, 10, 1.0, 3),
            colony(3, 60, 10, 2.0, 3),
        ];
        let roster = Roster::build(&colonies);
        let mut system = system(&colonies);
        system.config.border_conflict_chance = 1.0;
        system.config.max_active_conflicts = 1;
        let ongoing =
            system.start_conflict(&colonies, ColonyId(1), ColonyId(2), ConflictType::TotalWar, 0);
        assert!(ongoing.is_ok());

        let mut second = border();
        second.colony1 = ColonyId(2);
        second.colony2 = ColonyId(3);
        system.borders = vec![border(), second];
        system
            .ledger
            .set_relation(ColonyId(2), ColonyId(3), RelationKind::Enemy);

        for tick in 1..=200 {
            system.process_ignition(&colonies, &roster, tick);
        }
        assert_eq!(system.active_conflicts().count(), 1);
        assert!(system.ledger.conflict_between(ColonyId(2), ColonyId(3)).is_none());

        system.config.max_active_conflicts = 2;
        for tick in 201..=400 {
            system.process_ignition(&colonies, &roster, tick);
        }
        assert_eq!(system.active_conflicts().count(), 2);
        assert!(system.ledger.conflict_between(ColonyId(2), ColonyId(3)).is_some());
    }

    #[test]
    fn territory_war_hands_claimed_cells_to_winner() {
        // Landless attacker against an unarmed defender: the strength ratio
        // is 1, so every roll above 0.3 is an attacker victory.
        let mut colonies = vec![colony(1, 80, 30, 0.0, 2), unarmed(2, 60, 2.0, 6)];
        let roster = Roster::build(&colonies);
        let mut system = system(&colonies);
        let id = system
            .start_conflict(&colonies, ColonyId(1), ColonyId(2), ConflictType::TotalWar, 0)
            .unwrap_or_else(|e| panic!("conflict refused: {e}"));
        assert_eq!(system.conflict(id).map(|c| c.war_goal), Some(WarGoal::Territory));

        for _ in 0..10 {
            system.fight_turn(id, &mut colonies, &roster);
        }
        let claimed = system
            .conflict(id)
            .map(|c| c.claimed_territory.clone())
            .unwrap_or_default();
        assert!(!claimed.is_empty());
        let defender_cells = colonies.get(1).map(|c| c.territory.len());
        assert_eq!(defender_cells, Some(6_usize.saturating_sub(claimed.len())));

        system.settle_conflict(id, &mut colonies, &roster, 11);
        assert_eq!(system.conflict(id).and_then(|c| c.winner), Some(ColonyId(1)));
        let attacker = colonies.first();
        assert_eq!(
            attacker.map(|c| c.territory.len()),
            Some(claimed.len().saturating_add(2))
        );
        assert!(attacker.is_some_and(|c| claimed.iter().all(|cell| c.territory.contains(cell))));
    }

    #[test]
    fn settlement_moves_reputation_both_ways() {
        let mut colonies = vec![colony(1, 80, 30, 0.0, 2), colony(2, 60, 10, 2.0, 6)];
        let roster = Roster::build(&colonies);
        let mut system = system(&colonies);
        let id = system
            .start_conflict(&colonies, ColonyId(1), ColonyId(2), ConflictType::Raid, 0)
            .unwrap_or_else(|e| panic!("conflict refused: {e}"));
        if let Some(c) = system.conflicts.get_mut(&id) {
            c.claimed_territory.push(Position::new(2.0, 5.0));
        }
        let before = (system.reputation(ColonyId(1)), system.reputation(ColonyId(2)));

        system.settle_conflict(id, &mut colonies, &roster, 3);
        assert_eq!(system.conflict(id).and_then(|c| c.winner), Some(ColonyId(1)));
        assert!((system.reputation(ColonyId(1)) - before.0 - 0.1).abs() < 1e-9);
        assert!((system.reputation(ColonyId(2)) - before.1 + 0.1).abs() < 1e-9);
        assert_eq!(system.relation(ColonyId(1), ColonyId(2)), RelationKind::Truce);
        assert!((system.trust(ColonyId(1), ColonyId(2)) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn winner_follows_war_goal() {
        assert_eq!(settle_under(WarGoal::Resources, 60, 50, 10.0), Some(ColonyId(1)));
        assert_eq!(settle_under(WarGoal::Resources, 60, 50, 0.0), Some(ColonyId(2)));
        assert_eq!(settle_under(WarGoal::Resources, 40, 50, 10.0), Some(ColonyId(2)));
        assert_eq!(settle_under(WarGoal::Dominance, 130, 100, 0.0), Some(ColonyId(1)));
        assert_eq!(settle_under(WarGoal::Dominance, 110, 100, 0.0), Some(ColonyId(2)));
        assert_eq!(settle_under(WarGoal::Territory, 100, 100, 50.0), Some(ColonyId(2)));
        assert!(settle_under(WarGoal::AllianceDominance, 100, 100, 0.0).is_some());
    }

    #[test]
    fn intensity_decays_late_and_ends_the_war() {
        let mut colonies = vec![colony(1, 100, 10, 0.0, 8), colony(2, 100, 10, 2.0, 8)];
        let roster = Roster::build(&colonies);
        let mut system = system(&colonies);
        let id = system
            .start_conflict(&colonies, ColonyId(1), ColonyId(2), ConflictType::TotalWar, 0)
            .unwrap_or_else(|e| panic!("conflict refused: {e}"));
        if let Some(c) = system.conflicts.get_mut(&id) {
            c.intensity = 0.104;
            c.turns_active = 19;
        }

        // Turn 20 is still at full intensity.
        system.fight_turn(id, &mut colonies, &roster);
        assert!(system.conflict(id).is_some_and(|c| (c.intensity - 0.104).abs() < 1e-12));
        assert!(!system.should_end(id, &colonies, &roster));

        // Turn 21 decays by 5% and drops below the floor.
        system.fight_turn(id, &mut colonies, &roster);
        assert!(system.conflict(id).is_some_and(|c| (c.intensity - 0.0988).abs() < 1e-12));
        assert!(system.should_end(id, &colonies, &roster));
    }
}
