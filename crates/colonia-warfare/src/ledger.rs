//! Relation ledger: per-colony relation, trust, reputation and history.
//!
//! Every other component reads and writes diplomatic state through this
//! ledger. Pairwise state (relation and trust) is only ever written through
//! operations that update both sides at once, so callers never manage the
//! mirror write themselves.
//!
//! # Invariants
//!
//! - For every registered pair `(a, b)`, `relation(a, b) == relation(b, a)`
//!   and `trust(a, b) == trust(b, a)`.
//! - Trust is clamped to `[0.0, 1.0]` on every update.
//! - Reputation is clamped to `[-1.0, 1.0]` on every update.
//! - History is one-sided: an event is stored only under the colony that
//!   recorded it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use colonia_types::{
    AllianceId, ColonyId, ConflictId, DiplomaticEvent, RelationKind, TerritoryBorder, TradeId,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Trust every new pair starts with.
pub const DEFAULT_TRUST: f64 = 0.5;

/// Lowest possible trust.
const TRUST_MIN: f64 = 0.0;

/// Highest possible trust.
const TRUST_MAX: f64 = 1.0;

/// Lowest possible reputation.
const REPUTATION_MIN: f64 = -1.0;

/// Highest possible reputation.
const REPUTATION_MAX: f64 = 1.0;

/// Clamp a trust value into its valid range.
pub fn clamp_trust(value: f64) -> f64 {
    value.clamp(TRUST_MIN, TRUST_MAX)
}

/// Clamp a reputation value into its valid range.
pub fn clamp_reputation(value: f64) -> f64 {
    value.clamp(REPUTATION_MIN, REPUTATION_MAX)
}

// ---------------------------------------------------------------------------
// ColonyDiplomacy
// ---------------------------------------------------------------------------

/// One colony's view of every other known colony.
///
/// The `active_*` maps are back-references into the engine's arenas: they
/// hold IDs, and the canonical object is looked up through the arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColonyDiplomacy {
    colony_id: ColonyId,
    relations: BTreeMap<ColonyId, RelationKind>,
    trust_levels: BTreeMap<ColonyId, f64>,
    reputation: f64,
    history: BTreeMap<ColonyId, Vec<DiplomaticEvent>>,
    active_trade_agreements: BTreeMap<ColonyId, TradeId>,
    active_alliances: BTreeMap<ColonyId, AllianceId>,
    active_conflicts: BTreeMap<ColonyId, ConflictId>,
    territory_borders: BTreeMap<ColonyId, Vec<TerritoryBorder>>,
}

impl ColonyDiplomacy {
    fn new(colony_id: ColonyId) -> Self {
        Self {
            colony_id,
            relations: BTreeMap::new(),
            trust_levels: BTreeMap::new(),
            reputation: 0.0,
            history: BTreeMap::new(),
            active_trade_agreements: BTreeMap::new(),
            active_alliances: BTreeMap::new(),
            active_conflicts: BTreeMap::new(),
            territory_borders: BTreeMap::new(),
        }
    }

    fn meet(&mut self, other: ColonyId) {
        self.relations.entry(other).or_insert(RelationKind::Neutral);
        self.trust_levels.entry(other).or_insert(DEFAULT_TRUST);
    }

    fn forget(&mut self, other: ColonyId) {
        self.relations.remove(&other);
        self.trust_levels.remove(&other);
        self.active_trade_agreements.remove(&other);
        self.active_alliances.remove(&other);
        self.active_conflicts.remove(&other);
        self.territory_borders.remove(&other);
    }

    /// The colony this diplomacy belongs to.
    pub const fn colony_id(&self) -> ColonyId {
        self.colony_id
    }

    /// Relation toward every known colony.
    pub const fn relations(&self) -> &BTreeMap<ColonyId, RelationKind> {
        &self.relations
    }

    /// Trust toward every known colony.
    pub const fn trust_levels(&self) -> &BTreeMap<ColonyId, f64> {
        &self.trust_levels
    }

    /// Colony-local reputation in `[-1, 1]`.
    pub const fn reputation(&self) -> f64 {
        self.reputation
    }

    /// Recorded events, grouped by counterpart.
    pub const fn history(&self) -> &BTreeMap<ColonyId, Vec<DiplomaticEvent>> {
        &self.history
    }

    /// Active trade agreements, keyed by partner.
    pub const fn active_trade_agreements(&self) -> &BTreeMap<ColonyId, TradeId> {
        &self.active_trade_agreements
    }

    /// Active alliances, keyed by fellow member.
    pub const fn active_alliances(&self) -> &BTreeMap<ColonyId, AllianceId> {
        &self.active_alliances
    }

    /// Active conflicts, keyed by opponent.
    pub const fn active_conflicts(&self) -> &BTreeMap<ColonyId, ConflictId> {
        &self.active_conflicts
    }

    /// Current borders, keyed by neighbour. Each entry holds one border.
    pub const fn territory_borders(&self) -> &BTreeMap<ColonyId, Vec<TerritoryBorder>> {
        &self.territory_borders
    }

    /// Colonies this colony currently rates as [`RelationKind::Enemy`].
    pub fn enemies(&self) -> impl Iterator<Item = ColonyId> + '_ {
        self.relations
            .iter()
            .filter(|(_, kind)| **kind == RelationKind::Enemy)
            .map(|(id, _)| *id)
    }
}

// ---------------------------------------------------------------------------
// RelationLedger
// ---------------------------------------------------------------------------

/// All colonies' diplomacies, keyed by colony ID.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationLedger {
    diplomacies: BTreeMap<ColonyId, ColonyDiplomacy>,
}

impl RelationLedger {
    /// Create an empty ledger.
    pub const fn new() -> Self {
        Self {
            diplomacies: BTreeMap::new(),
        }
    }

    /// Register a colony. Returns `false` (and changes nothing) if the
    /// colony is already known.
    ///
    /// The newcomer starts Neutral with [`DEFAULT_TRUST`] toward every
    /// registered colony, and every registered colony gains the same entry
    /// toward the newcomer. Existing pairs are never touched.
    pub fn register(&mut self, colony: ColonyId) -> bool {
        if self.diplomacies.contains_key(&colony) {
            return false;
        }
        let mut diplomacy = ColonyDiplomacy::new(colony);
        for (other_id, other) in &mut self.diplomacies {
            diplomacy.meet(*other_id);
            other.meet(colony);
        }
        self.diplomacies.insert(colony, diplomacy);
        true
    }

    /// Remove a colony and every other colony's pairwise entries for it.
    /// Survivors keep their history with the departed colony.
    pub fn forget(&mut self, colony: ColonyId) -> bool {
        if self.diplomacies.remove(&colony).is_none() {
            return false;
        }
        for other in self.diplomacies.values_mut() {
            other.forget(colony);
        }
        true
    }

    /// Whether the colony is registered.
    pub fn contains(&self, colony: ColonyId) -> bool {
        self.diplomacies.contains_key(&colony)
    }

    /// Number of registered colonies.
    pub fn len(&self) -> usize {
        self.diplomacies.len()
    }

    /// Whether no colony is registered.
    pub fn is_empty(&self) -> bool {
        self.diplomacies.is_empty()
    }

    /// Registered colony IDs in ascending order.
    pub fn colony_ids(&self) -> Vec<ColonyId> {
        self.diplomacies.keys().copied().collect()
    }

    /// Every unordered registered pair `(low, high)`.
    pub fn pairs(&self) -> Vec<(ColonyId, ColonyId)> {
        let ids = self.colony_ids();
        let mut pairs = Vec::new();
        for (i, a) in ids.iter().enumerate() {
            for b in ids.iter().skip(i.saturating_add(1)) {
                pairs.push((*a, *b));
            }
        }
        pairs
    }

    /// One colony's diplomacy.
    pub fn get(&self, colony: ColonyId) -> Option<&ColonyDiplomacy> {
        self.diplomacies.get(&colony)
    }

    /// Every diplomacy, keyed by colony.
    pub const fn diplomacies(&self) -> &BTreeMap<ColonyId, ColonyDiplomacy> {
        &self.diplomacies
    }

    fn pair_known(&self, a: ColonyId, b: ColonyId) -> bool {
        a != b && self.contains(a) && self.contains(b)
    }

    // -----------------------------------------------------------------------
    // Relation and trust (always symmetric)
    // -----------------------------------------------------------------------

    /// Relation between two colonies. Unknown pairs are Neutral.
    pub fn relation(&self, a: ColonyId, b: ColonyId) -> RelationKind {
        self.diplomacies
            .get(&a)
            .and_then(|d| d.relations.get(&b))
            .copied()
            .unwrap_or_default()
    }

    /// Trust between two colonies. Unknown pairs report [`DEFAULT_TRUST`].
    pub fn trust(&self, a: ColonyId, b: ColonyId) -> f64 {
        self.diplomacies
            .get(&a)
            .and_then(|d| d.trust_levels.get(&b))
            .copied()
            .unwrap_or(DEFAULT_TRUST)
    }

    /// Set the relation on both sides. Returns `false` if the pair is not
    /// registered.
    pub fn set_relation(&mut self, a: ColonyId, b: ColonyId, kind: RelationKind) -> bool {
        if !self.pair_known(a, b) {
            return false;
        }
        if let Some(d) = self.diplomacies.get_mut(&a) {
            d.relations.insert(b, kind);
        }
        if let Some(d) = self.diplomacies.get_mut(&b) {
            d.relations.insert(a, kind);
        }
        true
    }

    /// Set trust on both sides, clamped to `[0, 1]`. Returns the stored value.
    pub fn set_trust(&mut self, a: ColonyId, b: ColonyId, value: f64) -> f64 {
        let value = clamp_trust(value);
        if !self.pair_known(a, b) {
            return value;
        }
        if let Some(d) = self.diplomacies.get_mut(&a) {
            d.trust_levels.insert(b, value);
        }
        if let Some(d) = self.diplomacies.get_mut(&b) {
            d.trust_levels.insert(a, value);
        }
        value
    }

    /// Add `delta` to trust on both sides. Returns the new value.
    pub fn adjust_trust(&mut self, a: ColonyId, b: ColonyId, delta: f64) -> f64 {
        let current = self.trust(a, b);
        self.set_trust(a, b, current + delta)
    }

    /// Raise trust on both sides to at least `floor`. Returns the new value.
    pub fn raise_trust_to(&mut self, a: ColonyId, b: ColonyId, floor: f64) -> f64 {
        let current = self.trust(a, b);
        self.set_trust(a, b, current.max(floor))
    }

    // -----------------------------------------------------------------------
    // Reputation and history (one-sided)
    // -----------------------------------------------------------------------

    /// A colony's reputation. Unknown colonies report 0.
    pub fn reputation(&self, colony: ColonyId) -> f64 {
        self.diplomacies.get(&colony).map_or(0.0, |d| d.reputation)
    }

    /// Add `delta` to a colony's reputation. Returns the new value.
    pub fn adjust_reputation(&mut self, colony: ColonyId, delta: f64) -> f64 {
        self.diplomacies.get_mut(&colony).map_or(0.0, |d| {
            d.reputation = clamp_reputation(d.reputation + delta);
            d.reputation
        })
    }

    /// Append an event to `from`'s history with `to`. Not mirrored.
    pub fn record_event(&mut self, from: ColonyId, to: ColonyId, event: DiplomaticEvent) {
        if let Some(d) = self.diplomacies.get_mut(&from) {
            d.history.entry(to).or_default().push(event);
        }
    }

    // -----------------------------------------------------------------------
    // Back-references
    // -----------------------------------------------------------------------

    /// Point both sides' active-conflict entry at `id`.
    pub fn link_conflict(&mut self, a: ColonyId, b: ColonyId, id: ConflictId) {
        if let Some(d) = self.diplomacies.get_mut(&a) {
            d.active_conflicts.insert(b, id);
        }
        if let Some(d) = self.diplomacies.get_mut(&b) {
            d.active_conflicts.insert(a, id);
        }
    }

    /// Drop both sides' active-conflict entry.
    pub fn unlink_conflict(&mut self, a: ColonyId, b: ColonyId) {
        if let Some(d) = self.diplomacies.get_mut(&a) {
            d.active_conflicts.remove(&b);
        }
        if let Some(d) = self.diplomacies.get_mut(&b) {
            d.active_conflicts.remove(&a);
        }
    }

    /// The active conflict between two colonies, if any.
    pub fn conflict_between(&self, a: ColonyId, b: ColonyId) -> Option<ConflictId> {
        self.diplomacies
            .get(&a)
            .and_then(|d| d.active_conflicts.get(&b))
            .copied()
    }

    /// Whether the colony is party to any active conflict.
    pub fn at_war(&self, colony: ColonyId) -> bool {
        self.diplomacies
            .get(&colony)
            .is_some_and(|d| !d.active_conflicts.is_empty())
    }

    /// Point both sides' active-trade entry at `id`.
    pub fn link_trade(&mut self, a: ColonyId, b: ColonyId, id: TradeId) {
        if let Some(d) = self.diplomacies.get_mut(&a) {
            d.active_trade_agreements.insert(b, id);
        }
        if let Some(d) = self.diplomacies.get_mut(&b) {
            d.active_trade_agreements.insert(a, id);
        }
    }

    /// Drop both sides' active-trade entry if it still points at `id`.
    pub fn unlink_trade(&mut self, a: ColonyId, b: ColonyId, id: TradeId) {
        if let Some(d) = self.diplomacies.get_mut(&a) {
            if d.active_trade_agreements.get(&b) == Some(&id) {
                d.active_trade_agreements.remove(&b);
            }
        }
        if let Some(d) = self.diplomacies.get_mut(&b) {
            if d.active_trade_agreements.get(&a) == Some(&id) {
                d.active_trade_agreements.remove(&a);
            }
        }
    }

    /// The active trade agreement between two colonies, if any.
    pub fn trade_between(&self, a: ColonyId, b: ColonyId) -> Option<TradeId> {
        self.diplomacies
            .get(&a)
            .and_then(|d| d.active_trade_agreements.get(&b))
            .copied()
    }

    /// Point both sides' active-alliance entry at `id`.
    pub fn link_alliance(&mut self, a: ColonyId, b: ColonyId, id: AllianceId) {
        if let Some(d) = self.diplomacies.get_mut(&a) {
            d.active_alliances.insert(b, id);
        }
        if let Some(d) = self.diplomacies.get_mut(&b) {
            d.active_alliances.insert(a, id);
        }
    }

    /// Drop both sides' active-alliance entry if it still points at `id`.
    pub fn unlink_alliance(&mut self, a: ColonyId, b: ColonyId, id: AllianceId) {
        if let Some(d) = self.diplomacies.get_mut(&a) {
            if d.active_alliances.get(&b) == Some(&id) {
                d.active_alliances.remove(&b);
            }
        }
        if let Some(d) = self.diplomacies.get_mut(&b) {
            if d.active_alliances.get(&a) == Some(&id) {
                d.active_alliances.remove(&a);
            }
        }
    }

    /// The alliance linking two colonies, if any.
    pub fn alliance_between(&self, a: ColonyId, b: ColonyId) -> Option<AllianceId> {
        self.diplomacies
            .get(&a)
            .and_then(|d| d.active_alliances.get(&b))
            .copied()
    }

    // -----------------------------------------------------------------------
    // Borders
    // -----------------------------------------------------------------------

    /// Drop every colony's border entries.
    pub fn clear_borders(&mut self) {
        for d in self.diplomacies.values_mut() {
            d.territory_borders.clear();
        }
    }

    /// Store `border` on both sides as a single-element list, overwriting.
    pub fn set_border(&mut self, border: &TerritoryBorder) {
        let (a, b) = (border.colony1, border.colony2);
        if let Some(d) = self.diplomacies.get_mut(&a) {
            d.territory_borders.insert(b, vec![border.clone()]);
        }
        if let Some(d) = self.diplomacies.get_mut(&b) {
            d.territory_borders.insert(a, vec![border.clone()]);
        }
    }

    // -----------------------------------------------------------------------
    // Invariant checks
    // -----------------------------------------------------------------------

    /// Whether every registered pair holds identical relation and trust on
    /// both sides, and every value is within range.
    pub fn is_consistent(&self) -> bool {
        self.diplomacies.values().all(|d| {
            (REPUTATION_MIN..=REPUTATION_MAX).contains(&d.reputation)
                && d.relations.iter().all(|(other, kind)| {
                    self.diplomacies
                        .get(other)
                        .and_then(|o| o.relations.get(&d.colony_id))
                        == Some(kind)
                })
                && d.trust_levels.iter().all(|(other, trust)| {
                    (TRUST_MIN..=TRUST_MAX).contains(trust)
                        && self
                            .diplomacies
                            .get(other)
                            .and_then(|o| o.trust_levels.get(&d.colony_id))
                            .is_some_and(|t| t.to_bits() == trust.to_bits())
                })
        })
    }
}
