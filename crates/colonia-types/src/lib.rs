//! Shared type definitions for the Colonia diplomacy and warfare engine.
//!
//! This crate is the single source of truth for every type that crosses the
//! engine boundary: the colony snapshots handed in by the colony simulation
//! and the records handed out to viewers, loggers and persistence layers.
//!
//! # Modules
//!
//! - [`ids`] -- Integer newtypes for colonies and arena-allocated objects
//! - [`enums`] -- Relation kinds, conflict types, war goals, event kinds, resources
//! - [`colony`] -- The colony snapshot and its resource operations
//! - [`structs`] -- Conflicts, trade agreements, alliances, borders, events, stats

pub mod colony;
pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use colony::{CasteCounts, Colony, Position, RESOURCE_DEMAND_PER_MEMBER};
pub use enums::{
    AllianceKind, BattleOutcome, ConflictType, DiplomaticEventKind, RelationKind, ResourceKind,
    WarGoal,
};
pub use ids::{AllianceId, ColonyId, ConflictId, TradeId};
pub use structs::{
    Alliance, Conflict, DiplomaticEvent, MAX_RESOURCE_SHARE, PERMANENT, TerritoryBorder,
    TradeAgreement, WarfareStats,
};
