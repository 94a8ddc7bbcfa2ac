//! Chunked world generation around the observer.
//!
//! The plane is cut into square chunks. Chunks near the observer are queued
//! once and generated a few per tick, each adding a small batch of towers
//! followed by a full neighbor rebuild.

use csiv_core::{Position, SimulationConfig, TowerId};
use csiv_trust_mesh::{Registry, Result, Tower, TrustEngine, ROGUE_SUFFIX};
use rand::Rng;
use std::collections::{HashSet, VecDeque};
use tracing::{debug, info};

/// Attempts at finding a well-spaced position before accepting any position.
const PLACEMENT_ATTEMPTS: usize = 100;

/// Margin kept between generated towers and their chunk's edges.
const CHUNK_MARGIN: f64 = 20.0;

pub type ChunkCoord = (i64, i64);

/// Chunk containing `position`.
pub fn chunk_of(position: &Position, chunk_size: f64) -> ChunkCoord {
    (
        (position.x / chunk_size).floor() as i64,
        (position.y / chunk_size).floor() as i64,
    )
}

/// Tower registry plus the chunk bookkeeping that feeds it.
#[derive(Debug, Default)]
pub struct World {
    registry: Registry,
    seen: HashSet<ChunkCoord>,
    pending: VecDeque<ChunkCoord>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn generated_chunks(&self) -> usize {
        self.seen.len()
    }

    pub fn pending_chunks(&self) -> usize {
        self.pending.len()
    }

    /// Queue every chunk within the prefetch radius that has not been seen.
    pub fn enqueue_around(&mut self, observer: &Position, config: &SimulationConfig) {
        let (cx, cy) = chunk_of(observer, config.chunk_size);
        let r = config.prefetch_radius;

        for dx in -r..=r {
            for dy in -r..=r {
                let chunk = (cx + dx, cy + dy);
                if !self.seen.contains(&chunk) && !self.pending.contains(&chunk) {
                    self.pending.push_back(chunk);
                }
            }
        }
    }

    /// Generate up to `max_chunks_per_tick` queued chunks while under the tower cap.
    ///
    /// Returns the ids of the towers created.
    pub fn generate_pending<R: Rng + ?Sized>(
        &mut self,
        engine: &TrustEngine,
        config: &SimulationConfig,
        now: f64,
        rng: &mut R,
    ) -> Result<Vec<TowerId>> {
        let mut created = Vec::new();
        let mut done = 0;

        while done < config.max_chunks_per_tick && self.registry.len() < config.max_total_towers {
            let Some(chunk) = self.pending.pop_front() else {
                break;
            };
            if !self.seen.insert(chunk) {
                continue;
            }
            created.extend(self.generate_chunk(chunk, engine, config, now, rng)?);
            done += 1;
        }

        Ok(created)
    }

    /// Populate one chunk and rebuild the neighbor topology.
    pub fn generate_chunk<R: Rng + ?Sized>(
        &mut self,
        chunk: ChunkCoord,
        engine: &TrustEngine,
        config: &SimulationConfig,
        now: f64,
        rng: &mut R,
    ) -> Result<Vec<TowerId>> {
        let base = Position::new(
            chunk.0 as f64 * config.chunk_size,
            chunk.1 as f64 * config.chunk_size,
        );
        let mut occupied: Vec<Position> = self.registry.iter().map(Tower::position).collect();
        let count = rng.gen_range(config.towers_per_chunk_min..=config.towers_per_chunk_max);
        let mut rogue_created = false;
        let mut created = Vec::with_capacity(count as usize);

        for _ in 0..count {
            let position = place(&occupied, base, config, rng);
            let id = self.registry.next_id()?;

            let clone_of = if !rogue_created
                && !self.registry.is_empty()
                && rng.gen_bool(config.rogue_probability)
            {
                pick_identity(&self.registry, rng)
            } else {
                None
            };

            let tower = match clone_of {
                Some(identity) => {
                    rogue_created = true;
                    info!(tower_id = %id, cloned = %identity, "Rogue tower spawned");
                    Tower::new(id, position, config.rogue_priority, Some(identity), true)
                }
                None => {
                    let priority =
                        rng.gen_range(config.legit_priority_min..=config.legit_priority_max);
                    Tower::new(id, position, priority, None, false)
                }
            }
            .created_at(now);

            self.registry.insert(tower)?;
            occupied.push(position);
            created.push(id);
        }

        engine.recompute_neighbors(&mut self.registry);
        debug!(
            chunk_x = chunk.0,
            chunk_y = chunk.1,
            created = created.len(),
            total = self.registry.len(),
            "Chunk generated"
        );

        Ok(created)
    }
}

/// Identity of a random existing tower, without any rogue marker.
fn pick_identity<R: Rng + ?Sized>(registry: &Registry, rng: &mut R) -> Option<String> {
    let ids = registry.ids();
    if ids.is_empty() {
        return None;
    }
    let id = ids[rng.gen_range(0..ids.len())];
    registry
        .get(id)
        .map(|tower| tower.identity().replace(ROGUE_SUFFIX, ""))
}

/// Random position inside the chunk, preferring spots `min_tower_spacing` from every other tower.
fn place<R: Rng + ?Sized>(
    occupied: &[Position],
    base: Position,
    config: &SimulationConfig,
    rng: &mut R,
) -> Position {
    let lo = CHUNK_MARGIN;
    let hi = config.chunk_size - CHUNK_MARGIN;
    let draw = |rng: &mut R| base.offset(rng.gen_range(lo..hi), rng.gen_range(lo..hi));

    for _ in 0..PLACEMENT_ATTEMPTS {
        let candidate = draw(rng);
        if occupied
            .iter()
            .all(|other| other.distance_to(&candidate) >= config.min_tower_spacing)
        {
            return candidate;
        }
    }

    draw(rng)
}
