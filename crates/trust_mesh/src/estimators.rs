//! Deviation Estimators
//!
//! Three independent signals in `[0, 1]`, computed per tower per evaluation:
//! - dVer: another tower advertises the same identity
//! - pVer: priority is implausibly high relative to the legitimate neighborhood
//! - spVer: signal strength departs from the tower's own running statistics
//!
//! dVer and pVer read the registry; spVer lives in `csiv_rf` because it only
//! needs the tower's own signal history.

use crate::registry::Registry;
use crate::tower::Tower;
use csiv_core::TopologyConfig;
use serde::{Deserialize, Serialize};

/// Result of the duplicate-identity estimator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IdentityDeviation {
    pub deviation: f64,
    pub duplicate: bool,
}

/// Result of the priority-deviation estimator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriorityDeviation {
    pub deviation: f64,
    /// Priority at least one step above the neighborhood median
    pub high_priority: bool,
    pub median: f64,
}

/// All three deviations of one evaluation, plus their flags.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Deviations {
    pub dver: f64,
    pub pver: f64,
    pub spver: f64,
    pub duplicate_identity: bool,
    pub high_priority: bool,
}

impl Deviations {
    /// True when every deviation is strictly below `ceiling`.
    pub fn all_below(&self, ceiling: f64) -> bool {
        self.dver < ceiling && self.pver < ceiling && self.spver < ceiling
    }
}

/// dVer: 1.0 when any *other* tower shares this tower's identity.
pub fn duplicate_identity(tower: &Tower, registry: &Registry) -> IdentityDeviation {
    let duplicate = registry
        .iter()
        .any(|other| other.id() != tower.id() && other.identity() == tower.identity());

    IdentityDeviation {
        deviation: if duplicate { 1.0 } else { 0.0 },
        duplicate,
    }
}

/// pVer: how far the tower's priority sits above its neighbors' median.
///
/// Neighbor ids missing from the registry are skipped. With no resolvable
/// neighbors the median is `baseline_priority`.
pub fn priority_deviation(
    tower: &Tower,
    registry: &Registry,
    topology: &TopologyConfig,
) -> PriorityDeviation {
    let mut priorities: Vec<f64> = tower
        .neighbors()
        .iter()
        .filter_map(|id| registry.get(*id))
        .map(|neighbor| f64::from(neighbor.priority()))
        .collect();

    let median = median(&mut priorities).unwrap_or_else(|| f64::from(topology.baseline_priority));
    let priority = f64::from(tower.priority());
    let headroom = f64::from(topology.max_priority) - median;

    let deviation = if priority > median && headroom > 0.0 {
        ((priority - median) / headroom).clamp(0.0, 1.0)
    } else {
        0.0
    };

    PriorityDeviation {
        deviation,
        high_priority: priority - median >= 1.0,
        median,
    }
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}
