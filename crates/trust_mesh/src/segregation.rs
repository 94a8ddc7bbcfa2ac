//! Neighbor Segregation
//!
//! Rebuilds every tower's neighbor list so that rogue-flagged towers are cut
//! out of the legitimate topology:
//! - a rogue tower has no neighbors
//! - a legitimate tower lists only legitimate towers, closest first, within
//!   `neighbor_radius`, at most `max_neighbors` of them
//!
//! The rebuild takes `&mut Registry` for its whole duration, so no estimator
//! can observe a half-updated topology.

use crate::registry::Registry;
use csiv_core::{Position, TopologyConfig, TowerId};
use tracing::debug;

/// Rebuild all neighbor lists under the isolation rule.
///
/// Candidates are sorted by `(distance, id)` so equal distances resolve
/// deterministically.
pub fn recompute_neighbors(registry: &mut Registry, topology: &TopologyConfig) {
    let legitimate: Vec<(TowerId, Position)> = registry
        .iter()
        .filter(|t| !t.is_rogue())
        .map(|t| (t.id(), t.position()))
        .collect();

    let mut links = 0usize;
    let mut isolated = 0usize;

    for tower in registry.iter_mut() {
        if tower.is_rogue {
            tower.neighbors.clear();
            isolated += 1;
            continue;
        }

        let mut candidates: Vec<(f64, TowerId)> = legitimate
            .iter()
            .filter(|(id, _)| *id != tower.id)
            .map(|(id, pos)| (tower.position.distance_to(pos), *id))
            .filter(|(distance, _)| *distance <= topology.neighbor_radius)
            .collect();
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        candidates.truncate(topology.max_neighbors);

        tower.neighbors = candidates.into_iter().map(|(_, id)| id).collect();
        links += tower.neighbors.len();
    }

    debug!(
        towers = registry.len(),
        isolated, links, "Neighbor lists rebuilt"
    );
}

/// Check the isolation invariant over the whole registry.
pub fn is_segregated(registry: &Registry) -> bool {
    registry.iter().all(|tower| {
        if tower.is_rogue() {
            tower.neighbors().is_empty()
        } else {
            tower.neighbors().iter().all(|id| {
                registry
                    .get(*id)
                    .map(|neighbor| !neighbor.is_rogue())
                    .unwrap_or(false)
            })
        }
    })
}
