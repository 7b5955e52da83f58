//! Border calculator: shared borders between colony territories.
//!
//! For every unordered pair of colonies, every territory cell of one is
//! compared with every cell of the other. Any two cells within the
//! adjacency distance contribute a border point at their midpoint. The
//! border length is the path length through the points in discovery order,
//! which is a cheap approximation of the true border outline.
//!
//! Geometry is recomputed from scratch every tick. The conflict bookkeeping
//! of a pair (`disputed`, `fortifications`, `last_conflict_tick`) carries
//! over from the previous tick's record for the same pair.

use std::collections::BTreeMap;

use colonia_types::{Colony, ColonyId, Position, RelationKind, TerritoryBorder};

use crate::ledger::RelationLedger;

/// Border points shared by two territories, in discovery order.
pub fn border_points(a: &[Position], b: &[Position], adjacency_distance: f64) -> Vec<Position> {
    let mut points = Vec::new();
    for cell_a in a {
        for cell_b in b {
            if cell_a.distance(cell_b) <= adjacency_distance {
                points.push(cell_a.midpoint(cell_b));
            }
        }
    }
    points
}

/// Path length through `points` in the given order.
pub fn path_length(points: &[Position]) -> f64 {
    points
        .windows(2)
        .filter_map(|w| match w {
            [p, q] => Some(p.distance(q)),
            _ => None,
        })
        .sum()
}

/// Compute the borders between every pair of colonies.
///
/// Pairs without a single border point produce no record. Pairs are visited
/// in ascending ID order and each record stores the lower ID as `colony1`.
pub fn compute_borders(
    colonies: &[Colony],
    previous: &[TerritoryBorder],
    ledger: &RelationLedger,
    adjacency_distance: f64,
) -> Vec<TerritoryBorder> {
    let carried: BTreeMap<(ColonyId, ColonyId), &TerritoryBorder> = previous
        .iter()
        .map(|b| ((b.colony1, b.colony2), b))
        .collect();

    let mut sorted: Vec<&Colony> = colonies.iter().collect();
    sorted.sort_by_key(|c| c.id);
    sorted.dedup_by_key(|c| c.id);

    let mut borders = Vec::new();
    for (i, a) in sorted.iter().enumerate() {
        for b in sorted.iter().skip(i.saturating_add(1)) {
            let points = border_points(&a.territory, &b.territory, adjacency_distance);
            if points.is_empty() {
                continue;
            }
            let prior = carried.get(&(a.id, b.id));
            let last_conflict_tick = prior.and_then(|p| p.last_conflict_tick);
            let enemies = ledger.relation(a.id, b.id) == RelationKind::Enemy;
            borders.push(TerritoryBorder {
                colony1: a.id,
                colony2: b.id,
                length: path_length(&points),
                border_points: points,
                disputed: enemies
                    || last_conflict_tick.is_some()
                    || prior.is_some_and(|p| p.disputed),
                fortifications: prior.map_or(0, |p| p.fortifications),
                last_conflict_tick,
            });
        }
    }
    borders
}

#[cfg(test)]
mod tests {
    use super::*;

    fn colony(id: u64, cells: &[(f64, f64)]) -> Colony {
        let territory = cells.iter().map(|(x, y)| Position::new(*x, *y)).collect();
        Colony::new(ColonyId(id), 20, Position::new(0.0, 0.0)).with_territory(territory)
    }

    fn ledger(ids: &[u64]) -> RelationLedger {
        let mut ledger = RelationLedger::new();
        for id in ids {
            ledger.register(ColonyId(*id));
        }
        ledger
    }

    #[test]
    fn adjacent_cells_share_midpoint() {
        let a = [Position::new(0.0, 0.0)];
        let b = [Position::new(2.0, 0.0), Position::new(10.0, 0.0)];
        let points = border_points(&a, &b, 3.0);
        assert_eq!(points, vec![Position::new(1.0, 0.0)]);
    }

    #[test]
    fn cells_exactly_at_threshold_count() {
        let a = [Position::new(0.0, 0.0)];
        let b = [Position::new(3.0, 0.0)];
        assert_eq!(border_points(&a, &b, 3.0).len(), 1);
    }

    #[test]
    fn length_follows_discovery_order() {
        let points = [
            Position::new(0.0, 0.0),
            Position::new(3.0, 4.0),
            Position::new(3.0, 0.0),
        ];
        assert!((path_length(&points) - 9.0).abs() < 1e-9);
        assert!(path_length(&points[..1]).abs() < f64::EPSILON);
    }

    #[test]
    fn distant_colonies_have_no_border() {
        let colonies = vec![colony(1, &[(0.0, 0.0)]), colony(2, &[(50.0, 50.0)])];
        let borders = compute_borders(&colonies, &[], &ledger(&[1, 2]), 3.0);
        assert!(borders.is_empty());
    }

    #[test]
    fn border_stored_low_high() {
        let colonies = vec![colony(9, &[(1.0, 0.0)]), colony(4, &[(0.0, 0.0)])];
        let borders = compute_borders(&colonies, &[], &ledger(&[4, 9]), 3.0);
        assert_eq!(borders.len(), 1);
        let border = borders.first();
        assert_eq!(border.map(|b| b.colony1), Some(ColonyId(4)));
        assert_eq!(border.map(|b| b.colony2), Some(ColonyId(9)));
        assert!(border.is_some_and(|b| !b.disputed));
    }

    #[test]
    fn bookkeeping_carries_over() {
        let colonies = vec![colony(1, &[(0.0, 0.0)]), colony(2, &[(1.0, 0.0)])];
        let ledger = ledger(&[1, 2]);
        let mut first = compute_borders(&colonies, &[], &ledger, 3.0);
        if let Some(b) = first.first_mut() {
            b.fortifications = 2;
            b.last_conflict_tick = Some(40);
        }
        let second = compute_borders(&colonies, &first, &ledger, 3.0);
        let border = second.first();
        assert_eq!(border.map(|b| b.fortifications), Some(2));
        assert_eq!(border.and_then(|b| b.last_conflict_tick), Some(40));
        assert!(border.is_some_and(|b| b.disputed));
    }

    #[test]
    fn enemy_border_is_disputed() {
        let colonies = vec![colony(1, &[(0.0, 0.0)]), colony(2, &[(1.0, 0.0)])];
        let mut ledger = ledger(&[1, 2]);
        ledger.set_relation(ColonyId(1), ColonyId(2), RelationKind::Enemy);
        let borders = compute_borders(&colonies, &[], &ledger, 3.0);
        assert!(borders.first().is_some_and(|b| b.disputed));
    }
}
