//! Synthetic colony seeding and per-tick upkeep.
//!
//! The warfare engine expects a colony simulation to hand it colonies every
//! tick. The harness stands in for that simulation: it scatters colonies
//! over a square world, gives each a block of territory and a stockpile,
//! and between ticks regrows resources, charges upkeep and grows or shrinks
//! populations depending on whether they are fed.
//!
//! Every colony has a *specialty* resource that regrows three times faster
//! than the rest, so neighbours end up with complementary surpluses and the
//! automatic trade pass has something to match.

use colonia_types::{CasteCounts, Colony, ColonyId, Position, ResourceKind};
use colonia_warfare::military::count_to_f64;
use rand::Rng;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::EngineError;

// -----------------------------------------------------------------------
// Configuration
// -----------------------------------------------------------------------

/// Spawner settings, loaded from the `colonies` section of the config file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpawnerConfig {
    /// Number of colonies to seed.
    #[serde(default = "default_count")]
    pub count: u32,

    /// Side length of the square world.
    #[serde(default = "default_world_size")]
    pub world_size: f64,

    /// Smallest starting population.
    #[serde(default = "default_min_size")]
    pub min_size: u32,

    /// Largest starting population.
    #[serde(default = "default_max_size")]
    pub max_size: u32,

    /// Territory cells each colony starts with.
    #[serde(default = "default_territory_cells")]
    pub territory_cells: u32,

    /// Average starting amount of each resource.
    #[serde(default = "default_starting_stock")]
    pub starting_stock: f64,

    /// Resource units regrown per territory cell per tick.
    #[serde(default = "default_regrowth_per_cell")]
    pub regrowth_per_cell: f64,

    /// Resource units each member consumes per tick, per resource type.
    #[serde(default = "default_upkeep_per_member")]
    pub upkeep_per_member: f64,

    /// Per-tick chance that a fed colony gains a member.
    #[serde(default = "default_growth_chance")]
    pub growth_chance: f64,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            count: default_count(),
            world_size: default_world_size(),
            min_size: default_min_size(),
            max_size: default_max_size(),
            territory_cells: default_territory_cells(),
            starting_stock: default_starting_stock(),
            regrowth_per_cell: default_regrowth_per_cell(),
            upkeep_per_member: default_upkeep_per_member(),
            growth_chance: default_growth_chance(),
        }
    }
}

const fn default_count() -> u32 {
    8
}

const fn default_world_size() -> f64 {
    60.0
}

const fn default_min_size() -> u32 {
    30
}

const fn default_max_size() -> u32 {
    150
}

const fn default_territory_cells() -> u32 {
    9
}

const fn default_starting_stock() -> f64 {
    100.0
}

const fn default_regrowth_per_cell() -> f64 {
    0.5
}

const fn default_upkeep_per_member() -> f64 {
    0.02
}

const fn default_growth_chance() -> f64 {
    0.05
}

/// Territory blocks are laid out in rows of this many cells.
const TERRITORY_ROW: u32 = 3;

/// Regrowth multiplier for a colony's specialty resource.
const SPECIALTY_REGROWTH: f64 = 3.0;

// -----------------------------------------------------------------------
// Seeding
// -----------------------------------------------------------------------

/// The resource a colony regrows fastest. Rotates through
/// [`ResourceKind::ALL`] by colony ID.
pub fn specialty(id: ColonyId) -> ResourceKind {
    let len = u64::try_from(ResourceKind::ALL.len()).unwrap_or(1);
    let index = id
        .into_inner()
        .checked_rem(len)
        .and_then(|i| usize::try_from(i).ok())
        .unwrap_or(0);
    ResourceKind::ALL
        .get(index)
        .copied()
        .unwrap_or(ResourceKind::Food)
}

/// Seed `config.count` colonies with IDs `1..=count`.
///
/// # Errors
///
/// Returns [`EngineError::Spawner`] if the size range is inverted or the
/// world has no room.
pub fn spawn_colonies(
    config: &SpawnerConfig,
    rng: &mut impl Rng,
) -> Result<Vec<Colony>, EngineError> {
    if config.min_size == 0 || config.min_size > config.max_size {
        return Err(EngineError::Spawner {
            message: format!(
                "invalid size range {}..={}",
                config.min_size, config.max_size
            ),
        });
    }
    if config.world_size <= 0.0 {
        return Err(EngineError::Spawner {
            message: format!("world size must be positive, got {}", config.world_size),
        });
    }

    let mut colonies = Vec::new();
    for n in 1..=config.count {
        let id = ColonyId(u64::from(n));
        let location = Position::new(
            rng.random_range(0.0..=config.world_size),
            rng.random_range(0.0..=config.world_size),
        );
        let size = rng.random_range(config.min_size..=config.max_size);
        let mut colony = Colony::new(id, size, location)
            .with_castes(castes_for(size))
            .with_territory(territory_block(location, config.territory_cells));
        for kind in ResourceKind::ALL {
            let stock = config.starting_stock * rng.random_range(0.5..=1.5);
            colony = colony.with_resource(kind, stock);
        }

        info!(
            colony = %id,
            size,
            x = location.x,
            y = location.y,
            specialty = specialty(id).as_str(),
            "Spawned colony"
        );
        colonies.push(colony);
    }
    Ok(colonies)
}

/// Split a population into castes: a fifth soldiers, one queen, half
/// workers, the rest others.
pub fn castes_for(size: u32) -> CasteCounts {
    let soldiers = size.checked_div(5).unwrap_or(0);
    let queens = size.min(1);
    let workers = size.checked_div(2).unwrap_or(0);
    let others = size
        .saturating_sub(soldiers)
        .saturating_sub(queens)
        .saturating_sub(workers);
    CasteCounts {
        soldiers,
        workers,
        queens,
        others,
    }
}

/// A block of unit cells starting at `origin`, filled row by row.
pub fn territory_block(origin: Position, cells: u32) -> Vec<Position> {
    (0..cells)
        .map(|i| {
            let column = i.checked_rem(TERRITORY_ROW).unwrap_or(0);
            let row = i.checked_div(TERRITORY_ROW).unwrap_or(0);
            Position::new(origin.x + f64::from(column), origin.y + f64::from(row))
        })
        .collect()
}

// -----------------------------------------------------------------------
// Upkeep
// -----------------------------------------------------------------------

/// Advance every colony's economy by one tick.
///
/// Regrows resources in proportion to territory, charges per-member upkeep,
/// and adjusts population: a colony short of any resource loses a member
/// (never below 1), a fed colony gains one with `growth_chance`. Castes
/// are rebalanced after a size change.
pub fn tend_colonies(colonies: &mut [Colony], config: &SpawnerConfig, rng: &mut impl Rng) {
    for colony in colonies.iter_mut() {
        let cells = count_to_f64(colony.territory.len());
        let upkeep = f64::from(colony.size) * config.upkeep_per_member;
        let favoured = specialty(colony.id);
        let mut starving = false;

        for kind in ResourceKind::ALL {
            let mut regrowth = cells * config.regrowth_per_cell * rng.random_range(0.5..=1.5);
            if kind == favoured {
                regrowth *= SPECIALTY_REGROWTH;
            }
            colony.add(kind, regrowth);
            if colony.take(kind, upkeep) < upkeep {
                starving = true;
            }
        }

        let before = colony.size;
        if starving {
            colony.size = colony.size.saturating_sub(1).max(1);
        } else if rng.random::<f64>() < config.growth_chance {
            colony.size = colony.size.saturating_add(1);
        }
        if colony.size != before {
            colony.castes = castes_for(colony.size);
            debug!(colony = %colony.id, before, after = colony.size, starving, "Population changed");
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
mod tests {
    use std::collections::BTreeSet;

    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    #[test]
    fn spawns_requested_count_with_unique_ids() {
        let mut rng = SmallRng::seed_from_u64(1);
        let config = SpawnerConfig {
            count: 12,
            ..SpawnerConfig::default()
        };
        let colonies = spawn_colonies(&config, &mut rng).unwrap();

        assert_eq!(colonies.len(), 12);
        let ids: BTreeSet<ColonyId> = colonies.iter().map(|c| c.id).collect();
        assert_eq!(ids.len(), 12);
        for c in &colonies {
            assert!((config.min_size..=config.max_size).contains(&c.size));
            assert_eq!(c.territory.len(), 9);
            assert!(c.location.x >= 0.0 && c.location.x <= config.world_size);
            assert!(ResourceKind::ALL.iter().all(|k| c.amount(*k) >= 50.0));
        }
    }

    #[test]
    fn zero_colonies_is_empty() {
        let mut rng = SmallRng::seed_from_u64(2);
        let config = SpawnerConfig {
            count: 0,
            ..SpawnerConfig::default()
        };
        assert!(spawn_colonies(&config, &mut rng).unwrap().is_empty());
    }

    #[test]
    fn inverted_size_range_is_rejected() {
        let mut rng = SmallRng::seed_from_u64(3);
        let config = SpawnerConfig {
            min_size: 50,
            max_size: 10,
            ..SpawnerConfig::default()
        };
        assert!(matches!(
            spawn_colonies(&config, &mut rng),
            Err(EngineError::Spawner { .. })
        ));
    }

    #[test]
    fn castes_add_up() {
        for size in [1, 2, 7, 100, 151] {
            let c = castes_for(size);
            assert_eq!(c.soldiers + c.workers + c.queens + c.others, size);
        }
        assert_eq!(castes_for(100).soldiers, 20);
        assert_eq!(castes_for(1).queens, 1);
    }

    #[test]
    fn territory_block_fills_rows() {
        let cells = territory_block(Position::new(10.0, 20.0), 5);
        assert_eq!(cells.len(), 5);
        assert_eq!(cells[2], Position::new(12.0, 20.0));
        assert_eq!(cells[3], Position::new(10.0, 21.0));
    }

    #[test]
    fn specialties_rotate() {
        let kinds: BTreeSet<ResourceKind> = (1..=4).map(|n| specialty(ColonyId(n))).collect();
        assert_eq!(kinds.len(), 4);
        assert_eq!(specialty(ColonyId(1)), specialty(ColonyId(5)));
    }

    #[test]
    fn starving_colony_shrinks_but_survives() {
        let mut rng = SmallRng::seed_from_u64(4);
        let config = SpawnerConfig {
            regrowth_per_cell: 0.0,
            upkeep_per_member: 1.0,
            ..SpawnerConfig::default()
        };
        let mut colonies = vec![Colony::new(ColonyId(1), 3, Position::new(0.0, 0.0))];
        for _ in 0..10 {
            tend_colonies(&mut colonies, &config, &mut rng);
        }
        assert_eq!(colonies[0].size, 1);
        assert_eq!(colonies[0].castes.queens, 1);
    }

    #[test]
    fn fed_colony_grows() {
        let mut rng = SmallRng::seed_from_u64(5);
        let config = SpawnerConfig {
            growth_chance: 1.0,
            ..SpawnerConfig::default()
        };
        let mut colonies = spawn_colonies(
            &SpawnerConfig {
                count: 1,
                min_size: 40,
                max_size: 40,
                ..SpawnerConfig::default()
            },
            &mut rng,
        )
        .unwrap();
        tend_colonies(&mut colonies, &config, &mut rng);
        assert_eq!(colonies[0].size, 41);
        assert_eq!(colonies[0].castes.soldiers, 8);
    }
}
