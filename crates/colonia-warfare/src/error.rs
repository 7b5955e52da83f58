//! Error types for the colonia-warfare crate.
//!
//! Operations that can refuse a request return [`WarfareError`]. An `Err`
//! always means nothing was changed. Background passes inside
//! [`WarfareSystem::update`](crate::WarfareSystem::update) never surface
//! these errors; they log the refusal and move on to the next pair.

use colonia_types::{AllianceId, ColonyId, TradeId};

/// Errors returned by engine operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WarfareError {
    /// The colony is not registered in the relation ledger.
    #[error("unknown colony: {0}")]
    UnknownColony(ColonyId),

    /// Both sides of a bilateral operation are the same colony.
    #[error("colony {0} cannot act against itself")]
    SameColony(ColonyId),

    /// The two colonies are enemies.
    #[error("colonies {a} and {b} are enemies")]
    EnemyRelation {
        /// First colony of the pair.
        a: ColonyId,
        /// Second colony of the pair.
        b: ColonyId,
    },

    /// The two colonies are allies.
    #[error("colonies {a} and {b} are allied")]
    AlliedRelation {
        /// First colony of the pair.
        a: ColonyId,
        /// Second colony of the pair.
        b: ColonyId,
    },

    /// The two colonies are already fighting each other.
    #[error("colonies {a} and {b} are already in conflict")]
    AlreadyInConflict {
        /// First colony of the pair.
        a: ColonyId,
        /// Second colony of the pair.
        b: ColonyId,
    },

    /// An alliance needs at least two distinct members.
    #[error("alliance needs at least 2 distinct members, got {count}")]
    TooFewMembers {
        /// Number of distinct members supplied.
        count: usize,
    },

    /// No trade agreement with this ID exists.
    #[error("trade agreement not found: {0}")]
    TradeNotFound(TradeId),

    /// No alliance with this ID exists.
    #[error("alliance not found: {0}")]
    AllianceNotFound(AllianceId),

    /// The colony is not a member of the alliance.
    #[error("colony {colony} is not a member of alliance {alliance}")]
    NotAllianceMember {
        /// The alliance in question.
        alliance: AllianceId,
        /// The colony that is not a member.
        colony: ColonyId,
    },

    /// The two colonies share no border.
    #[error("no border between colonies {a} and {b}")]
    BorderNotFound {
        /// First colony of the pair.
        a: ColonyId,
        /// Second colony of the pair.
        b: ColonyId,
    },
}
