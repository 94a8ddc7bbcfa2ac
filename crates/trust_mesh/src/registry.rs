//! Tower Registry
//!
//! Authoritative mapping from tower id to [`Tower`]. Iteration is ordered by
//! id so every pass over the registry is deterministic.

use crate::error::{Result, TrustMeshError};
use crate::segregation::recompute_neighbors;
use crate::tower::{Tower, TrustState};
use csiv_core::{Position, TopologyConfig, TowerId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Read-only view of a tower for logs and snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TowerSnapshot {
    pub id: TowerId,
    pub identity: String,
    pub priority: u8,
    pub state: TrustState,
    pub score: f64,
    pub is_rogue: bool,
    pub neighbors: Vec<TowerId>,
}

impl From<&Tower> for TowerSnapshot {
    fn from(tower: &Tower) -> Self {
        Self {
            id: tower.id,
            identity: tower.identity.clone(),
            priority: tower.priority,
            state: tower.state,
            score: tower.score,
            is_rogue: tower.is_rogue,
            neighbors: tower.neighbors.clone(),
        }
    }
}

/// Registry of every tower in the simulation
#[derive(Debug, Clone, Default)]
pub struct Registry {
    towers: BTreeMap<TowerId, Tower>,
    next_id: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            towers: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Allocate a fresh tower id. Ids are never reused; once `u32::MAX` has
    /// been handed out or inserted, allocation fails.
    pub fn next_id(&mut self) -> Result<TowerId> {
        let next = self.next_id.max(1);
        let id = u32::try_from(next).map_err(|_| TrustMeshError::IdsExhausted)?;
        self.next_id = next + 1;
        Ok(TowerId(id))
    }

    /// Insert a tower. Neighbor lists are not rebuilt; run segregation once the
    /// batch is complete.
    pub fn insert(&mut self, tower: Tower) -> Result<()> {
        let id = tower.id;
        if self.towers.contains_key(&id) {
            return Err(TrustMeshError::DuplicateTower(id));
        }
        self.next_id = self.next_id.max(u64::from(id.0) + 1);
        self.towers.insert(id, tower);
        Ok(())
    }

    pub fn get(&self, id: TowerId) -> Option<&Tower> {
        self.towers.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: TowerId) -> Option<&mut Tower> {
        self.towers.get_mut(&id)
    }

    pub fn contains(&self, id: TowerId) -> bool {
        self.towers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.towers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.towers.is_empty()
    }

    pub fn ids(&self) -> Vec<TowerId> {
        self.towers.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tower> {
        self.towers.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Tower> {
        self.towers.values_mut()
    }

    /// Tower closest to `point`, ties broken by lower id.
    pub fn nearest(&self, point: &Position) -> Option<&Tower> {
        self.towers.values().min_by(|a, b| {
            a.distance_to(point)
                .total_cmp(&b.distance_to(point))
                .then(a.id.cmp(&b.id))
        })
    }

    /// Flip a tower's rogue flag and rebuild every neighbor list.
    ///
    /// Returns the new flag.
    pub fn toggle_rogue(&mut self, id: TowerId, topology: &TopologyConfig) -> Result<bool> {
        let tower = self
            .towers
            .get_mut(&id)
            .ok_or(TrustMeshError::UnknownTower(id))?;
        let is_rogue = !tower.is_rogue;
        tower.set_rogue(is_rogue);
        info!(
            tower_id = %id,
            is_rogue,
            identity = %tower.identity,
            "Rogue flag toggled"
        );

        recompute_neighbors(self, topology);
        Ok(is_rogue)
    }

    /// One snapshot per tower, ordered by id.
    pub fn snapshot(&self) -> Vec<TowerSnapshot> {
        self.towers.values().map(TowerSnapshot::from).collect()
    }
}
