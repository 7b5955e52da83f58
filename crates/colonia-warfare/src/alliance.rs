//! Alliance engine: formation, upkeep, shared defense and joint operations.
//!
//! ## Alliance lifecycle
//!
//! 1. **Formation** -- [`WarfareSystem::create_alliance`], or the periodic
//!    automatic pass pairing trusting colonies with a common enemy.
//! 2. **Upkeep** (every tick) -- members that vanished are dropped and
//!    expired alliances dissolve. Live alliances pool surplus resources and
//!    rally to members under attack.
//! 3. **Joint operations** (periodic) -- a coordinated offensive against an
//!    outsider at least two members regard as an enemy.
//! 4. **Dissolution** -- expiry, too few members left, or the last but one
//!    member walking out through [`WarfareSystem::break_alliance`]. Member
//!    pairs that share no other alliance fall back from Allied to Neutral.

use std::collections::BTreeMap;

use colonia_types::{
    Alliance, AllianceId, AllianceKind, Colony, ColonyId, ConflictId, ConflictType, DiplomaticEvent,
    DiplomaticEventKind, MAX_RESOURCE_SHARE, PERMANENT, RelationKind, ResourceKind, WarGoal,
};
use rand::Rng;
use tracing::{debug, info};

use crate::error::WarfareError;
use crate::military::{Roster, apply_casualties, grant_boost, military_strength};
use crate::system::{WarfareSystem, due};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Trust every member pair is raised to when an alliance forms.
const ALLIANCE_TRUST_FLOOR: f64 = 0.8;

/// Trust a pair needs before it forms an alliance on its own.
const AUTO_ALLIANCE_TRUST: f64 = 0.7;

/// Chance a qualifying pair actually forms an alliance.
const AUTO_ALLIANCE_CHANCE: f64 = 0.3;

/// Resource share of automatically formed alliances.
const AUTO_ALLIANCE_SHARE: f64 = 0.1;

/// Surplus a member needs before it contributes to the pool.
const SHARING_SURPLUS: f64 = 20.0;

/// Need a member must have before it draws from the pool.
const SHARING_NEED: f64 = 20.0;

/// Farthest a member travels to help a defender.
const DEFENSE_RANGE: f64 = 100.0;

/// Share of a helper's strength lent to a defender.
const DEFENSE_CONTRIBUTION: f64 = 0.3;

/// Share of a helper's size lost the first time it supports a conflict.
const DEFENSE_CASUALTY_SHARE: f64 = 0.05;

/// Combined strength must exceed the target's by this factor.
const JOINT_STRENGTH_RATIO: f64 = 1.5;

/// Share of a supporting member's strength lent to the leader.
const JOINT_CONTRIBUTION: f64 = 0.2;

/// Share of a supporting member's size lost in a joint operation.
const JOINT_CASUALTY_SHARE: f64 = 0.03;

/// Intensity added to a joint operation on top of the opening roll.
const JOINT_INTENSITY_BONUS: f64 = 0.2;

/// Trust lost with every former ally when a colony walks out.
const BREAK_TRUST_PENALTY: f64 = 0.2;

/// Reputation lost by a colony that walks out of an alliance.
const BREAK_REPUTATION_PENALTY: f64 = 0.05;

// ---------------------------------------------------------------------------
// Formation and dissolution
// ---------------------------------------------------------------------------

impl WarfareSystem {
    /// Form an alliance. Duplicate members are ignored.
    ///
    /// The alliance is permanent with shared defense enabled, and the
    /// resource share is capped at [`MAX_RESOURCE_SHARE`]. Every member pair
    /// becomes Allied with trust raised to at least 0.8.
    pub fn create_alliance(
        &mut self,
        members: &[ColonyId],
        kind: AllianceKind,
        resource_share: f64,
        tick: u64,
    ) -> Result<AllianceId, WarfareError> {
        self.create_alliance_with_duration(members, kind, resource_share, PERMANENT, tick)
    }

    /// Form an alliance that dissolves once `duration` ticks have passed.
    /// A non-positive duration never expires.
    pub fn create_alliance_with_duration(
        &mut self,
        members: &[ColonyId],
        kind: AllianceKind,
        resource_share: f64,
        duration: i64,
        tick: u64,
    ) -> Result<AllianceId, WarfareError> {
        let mut distinct: Vec<ColonyId> = Vec::with_capacity(members.len());
        for member in members {
            if !distinct.contains(member) {
                distinct.push(*member);
            }
        }
        if distinct.len() < 2 {
            return Err(WarfareError::TooFewMembers {
                count: distinct.len(),
            });
        }
        if let Some(unknown) = distinct.iter().find(|m| !self.ledger.contains(**m)) {
            return Err(WarfareError::UnknownColony(*unknown));
        }
        let pairs = member_pairs(&distinct);
        if let Some((a, b)) = pairs
            .iter()
            .find(|(a, b)| self.ledger.relation(*a, *b) == RelationKind::Enemy)
        {
            return Err(WarfareError::EnemyRelation { a: *a, b: *b });
        }

        let id = self.allocate_alliance_id();
        for (a, b) in &pairs {
            self.ledger.set_relation(*a, *b, RelationKind::Allied);
            self.ledger.raise_trust_to(*a, *b, ALLIANCE_TRUST_FLOOR);
            self.ledger.link_alliance(*a, *b, id);
        }
        for member in &distinct {
            for other in distinct.iter().filter(|o| *o != member) {
                self.ledger.record_event(
                    *member,
                    *other,
                    DiplomaticEvent::new(
                        tick,
                        DiplomaticEventKind::AllianceFormed,
                        *other,
                        format!("Formed a {kind:?} alliance with colony {other}"),
                    ),
                );
            }
        }

        let resource_share = resource_share.clamp(0.0, MAX_RESOURCE_SHARE);
        info!(tick, alliance = %id, members = ?distinct, ?kind, resource_share, "Alliance formed");
        self.alliances.insert(
            id,
            Alliance {
                id,
                members: distinct,
                start_tick: tick,
                duration,
                kind,
                shared_defense: true,
                resource_share,
                active: true,
                last_joint_operation_tick: None,
                ended_tick: None,
            },
        );
        self.report.alliances_formed.push(id);
        Ok(id)
    }

    /// Walk `colony` out of an alliance.
    ///
    /// The breaker's pairs with the remaining members revert to Neutral
    /// (unless another alliance still binds them), trust with each drops by
    /// 0.2 and the breaker loses reputation. An alliance left with fewer
    /// than two members dissolves.
    pub fn break_alliance(
        &mut self,
        id: AllianceId,
        colony: ColonyId,
        tick: u64,
    ) -> Result<(), WarfareError> {
        let alliance = self
            .alliances
            .get(&id)
            .filter(|a| a.active)
            .ok_or(WarfareError::AllianceNotFound(id))?;
        if !alliance.has_member(colony) {
            return Err(WarfareError::NotAllianceMember {
                alliance: id,
                colony,
            });
        }
        let others: Vec<ColonyId> = alliance
            .members
            .iter()
            .copied()
            .filter(|m| *m != colony)
            .collect();

        self.remove_member(id, colony);
        for other in &others {
            self.release_pair(colony, *other, id);
            self.ledger.adjust_trust(colony, *other, -BREAK_TRUST_PENALTY);
            self.ledger.record_event(
                colony,
                *other,
                DiplomaticEvent::new(
                    tick,
                    DiplomaticEventKind::AllianceBroken,
                    *other,
                    format!("Walked out of alliance {id}, leaving colony {other}"),
                )
                .with_deltas(-BREAK_TRUST_PENALTY, -BREAK_REPUTATION_PENALTY),
            );
        }
        self.ledger
            .adjust_reputation(colony, -BREAK_REPUTATION_PENALTY);
        info!(tick, alliance = %id, colony = %colony, "Colony broke alliance");

        if others.len() < 2 {
            self.dissolve_alliance(id, tick);
        }
        Ok(())
    }

    /// Drop a vanished member. Dissolves the alliance when fewer than two
    /// members remain.
    pub(crate) fn drop_member(&mut self, id: AllianceId, colony: ColonyId, tick: u64) {
        self.remove_member(id, colony);
        let remaining = self.alliances.get(&id).map_or(0, |a| a.members.len());
        if remaining < 2 {
            self.dissolve_alliance(id, tick);
        }
    }

    fn remove_member(&mut self, id: AllianceId, colony: ColonyId) {
        if let Some(alliance) = self.alliances.get_mut(&id) {
            alliance.members.retain(|m| *m != colony);
        }
    }

    fn dissolve_alliance(&mut self, id: AllianceId, tick: u64) {
        let Some(alliance) = self.alliances.get_mut(&id) else {
            return;
        };
        if !alliance.active {
            return;
        }
        alliance.active = false;
        alliance.ended_tick = Some(tick);
        let members = alliance.members.clone();
        for (a, b) in member_pairs(&members) {
            self.release_pair(a, b, id);
        }
        self.report.alliances_dissolved.push(id);
        info!(tick, alliance = %id, "Alliance dissolved");
    }

    /// Unhook a pair from alliance `id`. If another active alliance still
    /// binds them the back-reference moves there, otherwise an Allied pair
    /// reverts to Neutral.
    fn release_pair(&mut self, a: ColonyId, b: ColonyId, id: AllianceId) {
        self.ledger.unlink_alliance(a, b, id);
        let other = self
            .alliances
            .values()
            .find(|al| al.id != id && al.active && al.has_member(a) && al.has_member(b))
            .map(|al| al.id);
        match other {
            Some(other) => self.ledger.link_alliance(a, b, other),
            None => {
                if self.ledger.relation(a, b) == RelationKind::Allied {
                    self.ledger.set_relation(a, b, RelationKind::Neutral);
                }
            }
        }
    }

    pub(crate) fn attempt_alliance_formation(&mut self, roster: &Roster, tick: u64) {
        for (a, b) in self.ledger.pairs() {
            if !roster.contains(a) || !roster.contains(b) {
                continue;
            }
            let relation = self.ledger.relation(a, b);
            if relation == RelationKind::Enemy
                || relation == RelationKind::Allied
                || self.ledger.trust(a, b) <= AUTO_ALLIANCE_TRUST
                || !self.share_enemy(a, b)
            {
                continue;
            }
            if self.rng.random::<f64>() >= AUTO_ALLIANCE_CHANCE {
                continue;
            }
            if let Err(error) =
                self.create_alliance(&[a, b], AllianceKind::Military, AUTO_ALLIANCE_SHARE, tick)
            {
                debug!(tick, %error, "Automatic alliance refused");
            }
        }
    }

    fn share_enemy(&self, a: ColonyId, b: ColonyId) -> bool {
        let (Some(da), Some(db)) = (self.ledger.get(a), self.ledger.get(b)) else {
            return false;
        };
        da.enemies()
            .any(|enemy| db.relations().get(&enemy) == Some(&RelationKind::Enemy))
    }

    // -----------------------------------------------------------------------
    // Upkeep
    // -----------------------------------------------------------------------

    pub(crate) fn process_alliances(
        &mut self,
        colonies: &mut [Colony],
        roster: &Roster,
        tick: u64,
    ) {
        let active: Vec<AllianceId> = self
            .alliances
            .values()
            .filter(|a| a.active)
            .map(|a| a.id)
            .collect();

        for id in &active {
            let Some(alliance) = self.alliances.get(id) else {
                continue;
            };
            let gone: Vec<ColonyId> = alliance
                .members
                .iter()
                .copied()
                .filter(|m| !roster.contains(*m) || !self.ledger.contains(*m))
                .collect();
            for member in gone {
                self.drop_member(*id, member, tick);
            }

            let Some(alliance) = self.alliances.get(id).filter(|a| a.active) else {
                continue;
            };
            if alliance.is_expired(tick) {
                self.dissolve_alliance(*id, tick);
                continue;
            }
            let members = alliance.members.clone();
            let (share, defends) = (alliance.resource_share, alliance.shared_defense);
            if share > 0.0 {
                share_resources(&members, share, colonies, roster);
            }
            if defends {
                self.shared_defense(&members, colonies, roster, tick);
            }
        }

        if due(tick, self.config.joint_operation_interval_ticks) {
            for id in active {
                if self.alliances.get(&id).is_some_and(|a| a.active) {
                    self.joint_operation(id, colonies, roster, tick);
                }
            }
        }
    }

    fn shared_defense(
        &mut self,
        members: &[ColonyId],
        colonies: &mut [Colony],
        roster: &Roster,
        tick: u64,
    ) {
        let defended: Vec<(ConflictId, ColonyId)> = self
            .active_conflicts()
            .filter(|c| members.contains(&c.defender))
            .map(|c| (c.id, c.defender))
            .collect();

        for (conflict_id, defender) in defended {
            let Some(location) = roster.get(colonies, defender).map(|c| c.location) else {
                continue;
            };
            for helper in members.iter().copied().filter(|m| *m != defender) {
                if self.ledger.at_war(helper) {
                    continue;
                }
                let Some(helper_colony) = roster.get(colonies, helper) else {
                    continue;
                };
                if helper_colony.location.distance(&location) > DEFENSE_RANGE {
                    continue;
                }
                let contribution = military_strength(helper_colony) * DEFENSE_CONTRIBUTION;
                let helper_size = helper_colony.size;

                let Some(boost) = roster
                    .get_mut(colonies, defender)
                    .and_then(|c| grant_boost(c, contribution))
                else {
                    continue;
                };
                self.boosts.push(boost);

                let first_time = self
                    .conflicts
                    .get_mut(&conflict_id)
                    .is_some_and(|c| c.supporters.insert(helper));
                if first_time {
                    let cost = f64::from(helper_size) * DEFENSE_CASUALTY_SHARE;
                    if let Some(colony) = roster.get_mut(colonies, helper) {
                        apply_casualties(colony, cost);
                    }
                }
                debug!(
                    tick,
                    conflict = %conflict_id,
                    defender = %defender,
                    helper = %helper,
                    contribution,
                    "Ally rallied to defense"
                );
            }
        }
    }

    fn joint_operation(
        &mut self,
        id: AllianceId,
        colonies: &mut [Colony],
        roster: &Roster,
        tick: u64,
    ) {
        let Some(members) = self.alliances.get(&id).map(|a| a.members.clone()) else {
            return;
        };

        let mut hostility: BTreeMap<ColonyId, usize> = BTreeMap::new();
        for member in &members {
            let Some(diplomacy) = self.ledger.get(*member) else {
                continue;
            };
            for enemy in diplomacy.enemies() {
                if !members.contains(&enemy) && roster.contains(enemy) {
                    let count = hostility.entry(enemy).or_insert(0);
                    *count = count.saturating_add(1);
                }
            }
        }

        let combined: f64 = members
            .iter()
            .filter_map(|m| roster.get(colonies, *m))
            .map(military_strength)
            .sum();

        for (target, _) in hostility.into_iter().filter(|(_, count)| *count >= 2) {
            let Some(target_colony) = roster.get(colonies, target) else {
                continue;
            };
            if combined <= military_strength(target_colony) * JOINT_STRENGTH_RATIO {
                continue;
            }
            let Some(leader) = members
                .iter()
                .filter_map(|m| roster.get(colonies, *m))
                .min_by(|a, b| {
                    a.location
                        .distance(&target_colony.location)
                        .total_cmp(&b.location.distance(&target_colony.location))
                })
            else {
                continue;
            };
            let leader_id = leader.id;
            let conflict_id =
                match self.open_conflict(leader, target_colony, ConflictType::TotalWar, tick) {
                    Ok(conflict_id) => conflict_id,
                    Err(error) => {
                        debug!(tick, alliance = %id, target = %target, %error, "Joint operation refused");
                        continue;
                    }
                };

            if let Some(conflict) = self.conflicts.get_mut(&conflict_id) {
                conflict.war_goal = WarGoal::AllianceDominance;
                conflict.intensity = (conflict.intensity + JOINT_INTENSITY_BONUS).min(1.0);
            }

            for member in members.iter().copied().filter(|m| *m != leader_id) {
                let Some((contribution, size)) = roster
                    .get(colonies, member)
                    .map(|c| (military_strength(c) * JOINT_CONTRIBUTION, c.size))
                else {
                    continue;
                };
                if let Some(boost) = roster
                    .get_mut(colonies, leader_id)
                    .and_then(|c| grant_boost(c, contribution))
                {
                    self.boosts.push(boost);
                }
                if let Some(colony) = roster.get_mut(colonies, member) {
                    apply_casualties(colony, f64::from(size) * JOINT_CASUALTY_SHARE);
                }
            }

            self.ledger.record_event(
                leader_id,
                target,
                DiplomaticEvent::new(
                    tick,
                    DiplomaticEventKind::JointOperation,
                    target,
                    format!("Led alliance {id} in a joint offensive against colony {target}"),
                ),
            );
            if let Some(alliance) = self.alliances.get_mut(&id) {
                alliance.last_joint_operation_tick = Some(tick);
            }
            self.report.joint_operations.push(conflict_id);
            info!(
                tick,
                alliance = %id,
                leader = %leader_id,
                target = %target,
                conflict = %conflict_id,
                "Joint operation launched"
            );
            return;
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Every unordered pair of members.
fn member_pairs(members: &[ColonyId]) -> Vec<(ColonyId, ColonyId)> {
    let mut pairs = Vec::new();
    for (i, a) in members.iter().enumerate() {
        for b in members.iter().skip(i.saturating_add(1)) {
            pairs.push((*a, *b));
        }
    }
    pairs
}

/// Pool surplus among members. Per resource, members with more than 20
/// surplus give in proportion to their surplus, and members with more than
/// 20 need receive in proportion to their need. The amount moved is
/// `min(total_surplus, total_need) * share`.
fn share_resources(members: &[ColonyId], share: f64, colonies: &mut [Colony], roster: &Roster) {
    for kind in ResourceKind::ALL {
        let mut givers = Vec::new();
        let mut takers = Vec::new();
        for member in members {
            let Some(colony) = roster.get(colonies, *member) else {
                continue;
            };
            let surplus = colony.surplus(kind);
            let need = colony.need(kind);
            if surplus > SHARING_SURPLUS {
                givers.push((*member, surplus));
            } else if need > SHARING_NEED {
                takers.push((*member, need));
            }
        }
        let total_surplus: f64 = givers.iter().map(|(_, s)| s).sum();
        let total_need: f64 = takers.iter().map(|(_, n)| n).sum();
        let pool = total_surplus.min(total_need) * share;
        if pool <= 0.0 {
            continue;
        }

        let mut collected = 0.0;
        for (giver, surplus) in &givers {
            if let Some(colony) = roster.get_mut(colonies, *giver) {
                collected += colony.take(kind, pool * surplus / total_surplus);
            }
        }
        for (taker, need) in &takers {
            if let Some(colony) = roster.get_mut(colonies, *taker) {
                colony.add(kind, collected * need / total_need);
            }
        }
    }
}
