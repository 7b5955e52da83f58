//! Records owned by the engine and exposed to consumers as value snapshots.
//!
//! Conflicts, trade agreements and alliances live in the engine's arenas and
//! are referenced from each colony's diplomacy by ID. Nothing here is ever
//! deleted: finished objects are flagged inactive and kept for inspection.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::colony::Position;
use crate::enums::{
    AllianceKind, BattleOutcome, ConflictType, DiplomaticEventKind, RelationKind, ResourceKind,
    WarGoal,
};
use crate::ids::{AllianceId, ColonyId, ConflictId, TradeId};

/// Duration value meaning "never expires".
pub const PERMANENT: i64 = -1;

/// Maximum fraction of surplus an alliance may redistribute per tick.
pub const MAX_RESOURCE_SHARE: f64 = 0.3;

// ---------------------------------------------------------------------------
// Conflict
// ---------------------------------------------------------------------------

/// A hostile interaction between an attacker and a defender colony.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    /// Arena identifier.
    pub id: ConflictId,
    /// The colony that opened the conflict.
    pub attacker: ColonyId,
    /// The colony under attack.
    pub defender: ColonyId,
    /// Flavour of the conflict.
    pub conflict_type: ConflictType,
    /// Tick the conflict was opened.
    pub start_tick: u64,
    /// Number of battle turns fought so far.
    pub turns_active: u32,
    /// Cumulative casualty figure across all turns.
    pub casualties: f64,
    /// Cumulative resources lost by the losing side of each turn.
    pub resources_lost: f64,
    /// Cells taken from the defender, handed to the winner at settlement.
    pub claimed_territory: Vec<Position>,
    /// Current intensity in `[0, 1]`.
    pub intensity: f64,
    /// What the attacker is fighting for.
    pub war_goal: WarGoal,
    /// Whether the conflict is still being fought.
    pub active: bool,
    /// Colonies that have already paid the shared-defense casualty cost.
    pub supporters: BTreeSet<ColonyId>,
    /// Result of the most recent battle turn.
    pub last_outcome: Option<BattleOutcome>,
    /// Winner at settlement, `None` while active or when a side vanished.
    pub winner: Option<ColonyId>,
    /// Tick the conflict ended.
    pub ended_tick: Option<u64>,
}

impl Conflict {
    /// Whether the colony is attacker or defender.
    pub fn involves(&self, colony: ColonyId) -> bool {
        self.attacker == colony || self.defender == colony
    }

    /// The other party, if `colony` is involved.
    pub fn opponent_of(&self, colony: ColonyId) -> Option<ColonyId> {
        if self.attacker == colony {
            Some(self.defender)
        } else if self.defender == colony {
            Some(self.attacker)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Trade agreement
// ---------------------------------------------------------------------------

/// A bilateral, time-bounded commitment to exchange resources periodically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeAgreement {
    /// Arena identifier.
    pub id: TradeId,
    /// The proposing colony. Delivers `offered`.
    pub colony1: ColonyId,
    /// The partner colony. Delivers `wanted`.
    pub colony2: ColonyId,
    /// Tick the agreement was signed.
    pub start_tick: u64,
    /// Lifetime in ticks, or [`PERMANENT`].
    pub duration: i64,
    /// Amounts colony-1 ships each execution.
    pub offered: BTreeMap<ResourceKind, f64>,
    /// Amounts colony-2 ships each execution.
    pub wanted: BTreeMap<ResourceKind, f64>,
    /// Base volume scalar applied to every shipment.
    pub trade_volume: f64,
    /// Whether the agreement is in force.
    pub active: bool,
    /// Tick of the last execution attempt, successful or not (or signing).
    pub last_trade_tick: u64,
    /// Execution attempts that failed in a row.
    pub consecutive_failures: u32,
    /// Successful executions so far.
    pub executions: u32,
    /// Total resource units delivered to both partners.
    pub total_transferred: f64,
}

impl TradeAgreement {
    /// Whether the colony is one of the two partners.
    pub fn involves(&self, colony: ColonyId) -> bool {
        self.colony1 == colony || self.colony2 == colony
    }

    /// Whether the agreement ran past its duration at `tick`.
    pub fn is_expired(&self, tick: u64) -> bool {
        let Ok(duration) = u64::try_from(self.duration) else {
            return false;
        };
        duration > 0 && tick.saturating_sub(self.start_tick) > duration
    }
}

// ---------------------------------------------------------------------------
// Alliance
// ---------------------------------------------------------------------------

/// A multi-member cooperative pact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alliance {
    /// Arena identifier.
    pub id: AllianceId,
    /// Member colonies, at least two while active.
    pub members: Vec<ColonyId>,
    /// Tick the alliance was formed.
    pub start_tick: u64,
    /// Lifetime in ticks, or [`PERMANENT`].
    pub duration: i64,
    /// Declared purpose.
    pub kind: AllianceKind,
    /// Whether members rally to each other's defense.
    pub shared_defense: bool,
    /// Fraction of pooled surplus redistributed each tick, at most
    /// [`MAX_RESOURCE_SHARE`].
    pub resource_share: f64,
    /// Whether the alliance is in force.
    pub active: bool,
    /// Tick of the last coordinated offensive.
    pub last_joint_operation_tick: Option<u64>,
    /// Tick the alliance dissolved.
    pub ended_tick: Option<u64>,
}

impl Alliance {
    /// Whether the colony is a member.
    pub fn has_member(&self, colony: ColonyId) -> bool {
        self.members.contains(&colony)
    }

    /// Whether the alliance ran past its duration at `tick`.
    pub fn is_expired(&self, tick: u64) -> bool {
        let Ok(duration) = u64::try_from(self.duration) else {
            return false;
        };
        duration > 0 && tick.saturating_sub(self.start_tick) > duration
    }
}

// ---------------------------------------------------------------------------
// Territory border
// ---------------------------------------------------------------------------

/// The shared border between two colonies' territories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerritoryBorder {
    /// Lower colony ID of the pair.
    pub colony1: ColonyId,
    /// Higher colony ID of the pair.
    pub colony2: ColonyId,
    /// Midpoints between adjacent cells, in discovery order.
    pub border_points: Vec<Position>,
    /// Path length through the border points in discovery order.
    pub length: f64,
    /// Whether the border is contested.
    pub disputed: bool,
    /// Number of fortifications built along the border.
    pub fortifications: u32,
    /// Tick of the last conflict opened across this border.
    pub last_conflict_tick: Option<u64>,
}

impl TerritoryBorder {
    /// Whether the border separates the two colonies (in either order).
    pub fn separates(&self, a: ColonyId, b: ColonyId) -> bool {
        (self.colony1 == a && self.colony2 == b) || (self.colony1 == b && self.colony2 == a)
    }
}

// ---------------------------------------------------------------------------
// Diplomatic event
// ---------------------------------------------------------------------------

/// An immutable audit record in a colony's diplomatic history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiplomaticEvent {
    /// Tick the event happened.
    pub tick: u64,
    /// What happened.
    pub kind: DiplomaticEventKind,
    /// The counterpart colony.
    pub other: ColonyId,
    /// Human-readable summary.
    pub description: String,
    /// Trust change caused by the event.
    pub trust_delta: f64,
    /// Reputation change caused by the event.
    pub reputation_delta: f64,
}

impl DiplomaticEvent {
    /// Create an event with no trust or reputation change attached.
    pub fn new(
        tick: u64,
        kind: DiplomaticEventKind,
        other: ColonyId,
        description: impl Into<String>,
    ) -> Self {
        Self {
            tick,
            kind,
            other,
            description: description.into(),
            trust_delta: 0.0,
            reputation_delta: 0.0,
        }
    }

    /// Attach the trust and reputation changes the event caused.
    #[must_use]
    pub const fn with_deltas(mut self, trust_delta: f64, reputation_delta: f64) -> Self {
        self.trust_delta = trust_delta;
        self.reputation_delta = reputation_delta;
        self
    }
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Aggregate statistics reported after each tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WarfareStats {
    /// Colonies currently registered in the relation ledger.
    pub total_colonies: usize,
    /// Conflicts currently being fought.
    pub active_conflicts: usize,
    /// Alliances currently in force.
    pub total_alliances: usize,
    /// Trade agreements currently in force.
    pub active_trade_agreements: usize,
    /// Number of colony pairs in each relation.
    pub relation_counts: BTreeMap<RelationKind, usize>,
    /// Configured per-border ignition roll.
    pub border_conflict_chance: f64,
    /// Configured weight of resource pressure in ignition.
    pub resource_competition_factor: f64,
}
