//! Enumeration types for the Colonia engine.
//!
//! Every tag that crosses the engine boundary is a closed enum: relation
//! kinds, conflict types, war goals, alliance kinds, event kinds and the
//! four collaborator resource types.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// A resource type supplied by the colony simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Food stores.
    Food,
    /// Water reserves.
    Water,
    /// Building materials.
    Materials,
    /// Stored energy.
    Energy,
}

impl ResourceKind {
    /// Every resource type, in a fixed iteration order.
    pub const ALL: [Self; 4] = [Self::Food, Self::Water, Self::Materials, Self::Energy];

    /// Lowercase name used in logs and event descriptions.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Food => "food",
            Self::Water => "water",
            Self::Materials => "materials",
            Self::Energy => "energy",
        }
    }
}

// ---------------------------------------------------------------------------
// Diplomatic relations
// ---------------------------------------------------------------------------

/// The symmetric diplomatic status between two colonies.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// No particular stance. Every pair starts here.
    #[default]
    Neutral,
    /// Members of a common alliance.
    Allied,
    /// Hostile; conflicts may ignite freely.
    Enemy,
    /// Cease-fire after a conflict.
    Truce,
    /// Regular trading partners.
    Trading,
    /// One side is subordinate to the other.
    Vassal,
}

impl RelationKind {
    /// Every relation kind, in a fixed iteration order.
    pub const ALL: [Self; 6] = [
        Self::Neutral,
        Self::Allied,
        Self::Enemy,
        Self::Truce,
        Self::Trading,
        Self::Vassal,
    ];

    /// Lowercase name used in logs and statistics.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Allied => "allied",
            Self::Enemy => "enemy",
            Self::Truce => "truce",
            Self::Trading => "trading",
            Self::Vassal => "vassal",
        }
    }
}

// ---------------------------------------------------------------------------
// Conflicts
// ---------------------------------------------------------------------------

/// The flavour of a conflict, which fixes its intensity range and turn cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    /// Small clash along a shared border.
    BorderSkirmish,
    /// Fight over resource access.
    ResourceWar,
    /// All-out war.
    TotalWar,
    /// Short hit-and-run incursion.
    Raid,
}

impl ConflictType {
    /// Inclusive range the initial intensity is drawn from.
    pub const fn intensity_range(self) -> (f64, f64) {
        match self {
            Self::BorderSkirmish => (0.2, 0.5),
            Self::ResourceWar => (0.4, 0.8),
            Self::TotalWar => (0.7, 1.0),
            Self::Raid => (0.1, 0.3),
        }
    }

    /// Number of turns after which the conflict is forced to end.
    pub const fn max_turns(self) -> u32 {
        match self {
            Self::Raid => 20,
            Self::TotalWar => 200,
            Self::BorderSkirmish | Self::ResourceWar => 100,
        }
    }
}

/// What the attacker is fighting for. Decides who won at settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarGoal {
    /// Seize territory cells.
    Territory,
    /// Bleed the defender's resources.
    Resources,
    /// Crush a much smaller rival.
    Dominance,
    /// Coordinated alliance offensive.
    AllianceDominance,
}

impl WarGoal {
    /// Lowercase name used in logs and event descriptions.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Territory => "territory",
            Self::Resources => "resources",
            Self::Dominance => "dominance",
            Self::AllianceDominance => "alliance_dominance",
        }
    }
}

/// The result of a single battle turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleOutcome {
    /// The attacker carried the turn.
    AttackerVictory,
    /// The defender repelled the attack.
    DefenderVictory,
    /// Neither side gained ground.
    Stalemate,
}

// ---------------------------------------------------------------------------
// Alliances
// ---------------------------------------------------------------------------

/// The declared purpose of an alliance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllianceKind {
    /// Mutual protection pact.
    Defensive,
    /// Pact aimed at common enemies.
    Offensive,
    /// Resource pooling pact.
    Economic,
    /// Full military alliance. Used for automatically formed alliances.
    Military,
}

// ---------------------------------------------------------------------------
// Diplomatic events
// ---------------------------------------------------------------------------

/// The kind of a [`DiplomaticEvent`](crate::DiplomaticEvent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiplomaticEventKind {
    /// A conflict was opened.
    WarDeclaration,
    /// A conflict ended in a settlement.
    PeaceTreaty,
    /// A trade agreement was signed.
    TradeAgreement,
    /// An alliance was formed.
    AllianceFormed,
    /// A colony walked out of an alliance.
    AllianceBroken,
    /// Former enemies agreed to a truce.
    TruceSigned,
    /// A truce relaxed back to neutrality.
    RelationsNormalized,
    /// An alliance launched a coordinated offensive.
    JointOperation,
    /// A shared border was fortified.
    BorderFortified,
}

impl DiplomaticEventKind {
    /// Snake-case tag used in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WarDeclaration => "war_declaration",
            Self::PeaceTreaty => "peace_treaty",
            Self::TradeAgreement => "trade_agreement",
            Self::AllianceFormed => "alliance_formed",
            Self::AllianceBroken => "alliance_broken",
            Self::TruceSigned => "truce_signed",
            Self::RelationsNormalized => "relations_normalized",
            Self::JointOperation => "joint_operation",
            Self::BorderFortified => "border_fortified",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_defaults_to_neutral() {
        assert_eq!(RelationKind::default(), RelationKind::Neutral);
    }

    #[test]
    fn intensity_ranges_are_ordered() {
        for kind in [
            ConflictType::BorderSkirmish,
            ConflictType::ResourceWar,
            ConflictType::TotalWar,
            ConflictType::Raid,
        ] {
            let (lo, hi) = kind.intensity_range();
            assert!(lo < hi);
            assert!((0.0..=1.0).contains(&lo));
            assert!((0.0..=1.0).contains(&hi));
        }
    }

    #[test]
    fn turn_caps_match_conflict_type() {
        assert_eq!(ConflictType::Raid.max_turns(), 20);
        assert_eq!(ConflictType::TotalWar.max_turns(), 200);
        assert_eq!(ConflictType::BorderSkirmish.max_turns(), 100);
        assert_eq!(ConflictType::ResourceWar.max_turns(), 100);
    }

    #[test]
    fn war_goal_serializes_snake_case() {
        let json = serde_json::to_string(&WarGoal::AllianceDominance).unwrap_or_default();
        assert_eq!(json, "\"alliance_dominance\"");
        assert_eq!(WarGoal::AllianceDominance.as_str(), "alliance_dominance");
    }
}
