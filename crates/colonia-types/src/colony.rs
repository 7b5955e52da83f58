//! The colony snapshot handed to the engine every tick.
//!
//! Colonies are owned by the colony simulation. The engine reads them and
//! mutates only four things: size (casualties), territory (conquest),
//! fitness (temporary combat support) and resources (trade and sharing).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::enums::ResourceKind;
use crate::ids::ColonyId;

/// Resource units one colony member consumes. Drives surplus and need.
pub const RESOURCE_DEMAND_PER_MEMBER: f64 = 0.5;

/// A point on the 2D world plane. Used for territory cells and locations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Position {
    /// Create a position.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position.
    pub fn distance(&self, other: &Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// The point halfway between this position and another.
    pub fn midpoint(&self, other: &Self) -> Self {
        Self {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
        }
    }
}

/// Caste composition of a colony.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CasteCounts {
    /// Fighting caste.
    pub soldiers: u32,
    /// Labouring caste.
    pub workers: u32,
    /// Reproductive caste.
    pub queens: u32,
    /// Everyone else (scouts, nurses, drones).
    pub others: u32,
}

/// A live colony as seen by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Colony {
    /// Identifier assigned by the colony simulation.
    pub id: ColonyId,
    /// Population count. Casualties never push it below 1.
    pub size: u32,
    /// Territory cells held by the colony, in acquisition order.
    pub territory: Vec<Position>,
    /// Location of the colony's nest.
    pub location: Position,
    /// Caste composition.
    pub castes: CasteCounts,
    /// Evolutionary fitness scalar.
    pub fitness: f64,
    /// Resource inventory.
    pub resources: BTreeMap<ResourceKind, f64>,
}

impl Colony {
    /// Create a colony with no territory, no castes, no resources and a
    /// fitness of 1.0.
    pub const fn new(id: ColonyId, size: u32, location: Position) -> Self {
        Self {
            id,
            size,
            territory: Vec::new(),
            location,
            castes: CasteCounts {
                soldiers: 0,
                workers: 0,
                queens: 0,
                others: 0,
            },
            fitness: 1.0,
            resources: BTreeMap::new(),
        }
    }

    /// Replace the territory cells.
    #[must_use]
    pub fn with_territory(mut self, territory: Vec<Position>) -> Self {
        self.territory = territory;
        self
    }

    /// Replace the caste composition.
    #[must_use]
    pub fn with_castes(mut self, castes: CasteCounts) -> Self {
        self.castes = castes;
        self
    }

    /// Set the amount held of one resource.
    #[must_use]
    pub fn with_resource(mut self, kind: ResourceKind, amount: f64) -> Self {
        self.resources.insert(kind, amount);
        self
    }

    /// Amount currently held of a resource.
    pub fn amount(&self, kind: ResourceKind) -> f64 {
        self.resources.get(&kind).copied().unwrap_or(0.0)
    }

    /// Whether the colony holds at least every listed amount.
    pub fn can_afford(&self, cost: &BTreeMap<ResourceKind, f64>) -> bool {
        cost.iter().all(|(kind, amount)| self.amount(*kind) >= *amount)
    }

    /// Remove every listed amount. All-or-nothing: returns `false` and
    /// leaves the inventory untouched when anything is short.
    pub fn consume(&mut self, cost: &BTreeMap<ResourceKind, f64>) -> bool {
        if !self.can_afford(cost) {
            return false;
        }
        for (kind, amount) in cost {
            let entry = self.resources.entry(*kind).or_insert(0.0);
            *entry = (*entry - amount).max(0.0);
        }
        true
    }

    /// Add to a resource. Negative amounts are ignored.
    pub fn add(&mut self, kind: ResourceKind, amount: f64) {
        if amount <= 0.0 {
            return;
        }
        *self.resources.entry(kind).or_insert(0.0) += amount;
    }

    /// Take up to `amount` of a resource, returning what was actually taken.
    pub fn take(&mut self, kind: ResourceKind, amount: f64) -> f64 {
        let held = self.amount(kind);
        let taken = amount.clamp(0.0, held);
        if taken > 0.0 {
            self.resources.insert(kind, held - taken);
        }
        taken
    }

    /// Amount of a resource the population needs to sustain itself.
    ///
    /// Demand is the same for every resource type: each member needs
    /// [`RESOURCE_DEMAND_PER_MEMBER`] of each. The kind is taken so callers
    /// such as [`Colony::surplus`] and [`Colony::need`] read per resource.
    pub fn demand(&self, _kind: ResourceKind) -> f64 {
        f64::from(self.size) * RESOURCE_DEMAND_PER_MEMBER
    }

    /// Amount held beyond demand.
    pub fn surplus(&self, kind: ResourceKind) -> f64 {
        (self.amount(kind) - self.demand(kind)).max(0.0)
    }

    /// Amount missing to cover demand.
    pub fn need(&self, kind: ResourceKind) -> f64 {
        (self.demand(kind) - self.amount(kind)).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn colony() -> Colony {
        Colony::new(ColonyId(1), 40, Position::new(0.0, 0.0))
            .with_resource(ResourceKind::Food, 50.0)
            .with_resource(ResourceKind::Water, 5.0)
    }

    #[test]
    fn distance_and_midpoint() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(3.0, 4.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-9);
        let m = a.midpoint(&b);
        assert!((m.x - 1.5).abs() < 1e-9);
        assert!((m.y - 2.0).abs() < 1e-9);
    }

    #[test]
    fn consume_is_all_or_nothing() {
        let mut c = colony();
        let mut cost = BTreeMap::new();
        cost.insert(ResourceKind::Food, 10.0);
        cost.insert(ResourceKind::Water, 10.0);
        assert!(!c.can_afford(&cost));
        assert!(!c.consume(&cost));
        assert!((c.amount(ResourceKind::Food) - 50.0).abs() < 1e-9);

        cost.insert(ResourceKind::Water, 5.0);
        assert!(c.consume(&cost));
        assert!((c.amount(ResourceKind::Food) - 40.0).abs() < 1e-9);
        assert!(c.amount(ResourceKind::Water).abs() < 1e-9);
    }

    #[test]
    fn surplus_and_need_follow_demand() {
        let c = colony();
        // 40 members * 0.5 = 20 demand.
        assert!((c.surplus(ResourceKind::Food) - 30.0).abs() < 1e-9);
        assert!(c.need(ResourceKind::Food).abs() < 1e-9);
        assert!((c.need(ResourceKind::Water) - 15.0).abs() < 1e-9);
        assert!((c.need(ResourceKind::Energy) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn demand_is_uniform_across_resources() {
        let c = colony();
        for kind in ResourceKind::ALL {
            assert!((c.demand(kind) - 20.0).abs() < 1e-9);
        }
    }

    #[test]
    fn take_never_overdraws() {
        let mut c = colony();
        let taken = c.take(ResourceKind::Water, 9.0);
        assert!((taken - 5.0).abs() < 1e-9);
        assert!(c.amount(ResourceKind::Water).abs() < 1e-9);
    }

    #[test]
    fn add_ignores_negative_amounts() {
        let mut c = colony();
        c.add(ResourceKind::Energy, -3.0);
        assert!(c.amount(ResourceKind::Energy).abs() < 1e-9);
        c.add(ResourceKind::Energy, 3.0);
        assert!((c.amount(ResourceKind::Energy) - 3.0).abs() < 1e-9);
    }
}
