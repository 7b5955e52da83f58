//! Inter-colony diplomacy and warfare engine for the Colonia simulation.
//!
//! This crate holds every rule governing how colonies relate to each other:
//! pairwise relations and trust, shared borders, conflicts, trade and
//! alliances. It performs no I/O. The colony simulation hands in a slice of
//! colonies each tick and [`WarfareSystem::update`] mutates them in place
//! (casualties, conquered cells, combat support, traded resources).
//!
//! # Modules
//!
//! - [`alliance`] -- Alliance formation, sharing, shared defense, joint operations
//! - [`border`] -- Shared-border geometry between colony territories
//! - [`config`] -- Engine tuning parameters ([`WarfareConfig`])
//! - [`conflict`] -- Ignition, battle turns, termination and settlement
//! - [`diplomacy`] -- Periodic truce and normalization attempts
//! - [`error`] -- Error types for refusable operations ([`WarfareError`])
//! - [`ledger`] -- Symmetric relation and trust bookkeeping ([`RelationLedger`])
//! - [`military`] -- Strength, casualties and temporary fitness boosts
//! - [`system`] -- The facade ([`WarfareSystem`]), tick reports and snapshots
//! - [`trade`] -- Trade agreement creation, execution and expiry

pub mod alliance;
pub mod border;
pub mod config;
pub mod conflict;
pub mod diplomacy;
pub mod error;
pub mod ledger;
pub mod military;
pub mod system;
pub mod trade;

// Re-export primary types at crate root for convenience.
pub use config::{ConfigError, WarfareConfig};
pub use conflict::{classify_battle, ignition_probability, strength_ratio};
pub use error::WarfareError;
pub use ledger::{ColonyDiplomacy, DEFAULT_TRUST, RelationLedger};
pub use military::military_strength;
pub use system::{TickReport, WarfareSnapshot, WarfareSystem};
pub use trade::{relationship_multiplier, trust_bonus};
