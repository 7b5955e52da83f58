//! Military strength, casualties and temporary combat support.
//!
//! Shared by the conflict engine (battle turns) and the alliance engine
//! (shared defense and joint operations).
//!
//! ## Strength
//!
//! `(soldiers * 2 + workers * 0.3) * fitness * (1 + min(2, cells / 10))`
//!
//! ## Support boosts
//!
//! Allies lend strength by raising the supported colony's fitness. Every
//! boost is recorded as a [`FitnessBoost`] and subtracted again once the next
//! tick's battle turns are fought, so the colony simulation never sees a
//! lasting change.

use std::collections::BTreeMap;

use colonia_types::{Colony, ColonyId};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Strength contributed by one soldier.
const SOLDIER_WEIGHT: f64 = 2.0;

/// Strength contributed by one worker.
const WORKER_WEIGHT: f64 = 0.3;

/// Territory cells per unit of territory bonus.
const CELLS_PER_BONUS: f64 = 10.0;

/// Cap on the territory bonus.
const MAX_TERRITORY_BONUS: f64 = 2.0;

/// Population never drops below this through casualties.
pub const MIN_COLONY_SIZE: u32 = 1;

// ---------------------------------------------------------------------------
// Numeric helpers
// ---------------------------------------------------------------------------

/// Convert a collection length to `f64`, saturating at `u32::MAX`.
pub fn count_to_f64(count: usize) -> f64 {
    u32::try_from(count).map_or(f64::from(u32::MAX), f64::from)
}

/// Round a non-negative figure to the nearest whole member count.
///
/// Negative and NaN inputs map to 0; values beyond `u32::MAX` saturate.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn round_to_u32(value: f64) -> u32 {
    if value.is_nan() || value <= 0.0 {
        return 0;
    }
    if value >= f64::from(u32::MAX) {
        return u32::MAX;
    }
    value.round() as u32
}

/// Convert a count to an index below `len`, for picking random elements.
///
/// Returns `None` for an empty collection.
pub fn pick_index(len: usize, roll: f64) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let scaled = roll.clamp(0.0, 1.0) * count_to_f64(len);
    let index = usize::try_from(round_down(scaled)).unwrap_or(0);
    Some(index.min(len.saturating_sub(1)))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_down(value: f64) -> u32 {
    if value.is_nan() || value <= 0.0 {
        return 0;
    }
    if value >= f64::from(u32::MAX) {
        return u32::MAX;
    }
    value.floor() as u32
}

// ---------------------------------------------------------------------------
// Strength and casualties
// ---------------------------------------------------------------------------

/// Military strength of a colony.
pub fn military_strength(colony: &Colony) -> f64 {
    let castes = f64::from(colony.castes.soldiers) * SOLDIER_WEIGHT
        + f64::from(colony.castes.workers) * WORKER_WEIGHT;
    let cells = count_to_f64(colony.territory.len());
    let territory_bonus = 1.0 + (cells / CELLS_PER_BONUS).min(MAX_TERRITORY_BONUS);
    castes * colony.fitness.max(0.0) * territory_bonus
}

/// Remove `losses` members from a colony, never going below
/// [`MIN_COLONY_SIZE`]. Returns the number of members actually removed.
pub fn apply_casualties(colony: &mut Colony, losses: f64) -> u32 {
    let requested = round_to_u32(losses);
    let floor = colony.size.min(MIN_COLONY_SIZE);
    let new_size = colony.size.saturating_sub(requested).max(floor);
    let removed = colony.size.saturating_sub(new_size);
    colony.size = new_size;
    removed
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// Index from colony ID to its position in the caller's colony slice.
///
/// Rebuilt at the start of every update so that engine passes can look up
/// and mutate colonies by ID without holding overlapping borrows.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    positions: BTreeMap<ColonyId, usize>,
}

impl Roster {
    /// Index a colony slice. When an ID appears twice the first one wins.
    pub fn build(colonies: &[Colony]) -> Self {
        let mut positions = BTreeMap::new();
        for (index, colony) in colonies.iter().enumerate() {
            positions.entry(colony.id).or_insert(index);
        }
        Self { positions }
    }

    /// Whether the colony is present this tick.
    pub fn contains(&self, id: ColonyId) -> bool {
        self.positions.contains_key(&id)
    }

    /// Present colony IDs in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = ColonyId> + '_ {
        self.positions.keys().copied()
    }

    /// Borrow a colony by ID.
    pub fn get<'a>(&self, colonies: &'a [Colony], id: ColonyId) -> Option<&'a Colony> {
        self.positions.get(&id).and_then(|i| colonies.get(*i))
    }

    /// Mutably borrow a colony by ID.
    pub fn get_mut<'a>(&self, colonies: &'a mut [Colony], id: ColonyId) -> Option<&'a mut Colony> {
        self.positions.get(&id).and_then(|i| colonies.get_mut(*i))
    }
}

// ---------------------------------------------------------------------------
// Fitness boosts
// ---------------------------------------------------------------------------

/// A temporary fitness increase granted to a colony for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitnessBoost {
    /// The supported colony.
    pub colony: ColonyId,
    /// Fitness added, subtracted again on revert.
    pub delta: f64,
}

/// Raise `colony`'s fitness so its strength grows by `contribution`, at
/// most doubling it. Returns the boost to revert later, or `None` when the
/// colony has no strength to scale.
pub fn grant_boost(colony: &mut Colony, contribution: f64) -> Option<FitnessBoost> {
    let strength = military_strength(colony);
    if strength <= 0.0 || contribution <= 0.0 {
        return None;
    }
    let fraction = (contribution / strength).min(1.0);
    let delta = colony.fitness.max(0.0) * fraction;
    if delta <= 0.0 {
        return None;
    }
    colony.fitness += delta;
    Some(FitnessBoost {
        colony: colony.id,
        delta,
    })
}

/// Undo a boost. Fitness never drops below zero.
pub fn revert_boost(colony: &mut Colony, boost: &FitnessBoost) {
    colony.fitness = (colony.fitness - boost.delta).max(0.0);
}
