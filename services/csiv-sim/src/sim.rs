//! Headless simulation loop.
//!
//! Each tick advances the clock by one frame, moves the observer, generates
//! queued chunks, then evaluates every tower whose update interval elapsed.

use crate::sib::{self, Sib};
use crate::world::World;
use csiv_core::{Config, Position, SimulationConfig, TowerId};
use csiv_trust_mesh::{Evaluation, Result, TowerSnapshot, TrustEngine};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::BTreeMap;
use std::f64::consts::TAU;
use tracing::{debug, info};

/// Where the observer enters the world.
pub const OBSERVER_START: Position = Position::new(100.0, 100.0);

/// Chance per tick that the observer picks a new heading.
const TURN_PROBABILITY: f64 = 0.02;

/// Per-tower pacing the engine itself does not track.
#[derive(Debug, Clone)]
struct TowerClock {
    next_update: f64,
    next_sib: f64,
    tac: String,
}

/// Everything that happened during one tick.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub now: f64,
    pub created: Vec<TowerId>,
    pub evaluations: Vec<Evaluation>,
    pub sibs: Vec<Sib>,
}

pub struct Simulation {
    config: SimulationConfig,
    engine: TrustEngine,
    world: World,
    clocks: BTreeMap<TowerId, TowerClock>,
    observer: Position,
    heading: f64,
    now: f64,
    tick: u64,
    sib_enabled: bool,
    rng: StdRng,
}

impl Simulation {
    /// Build a simulation. `seed` overrides `simulation.seed`; with neither
    /// the generator is seeded from entropy.
    pub fn new(config: &Config, seed: Option<u64>) -> Result<Self> {
        config.simulation.validate()?;
        let engine = TrustEngine::from_config(config)?;
        let mut rng = match seed.or(config.simulation.seed) {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let heading = rng.gen_range(0.0..TAU);

        Ok(Self {
            config: config.simulation.clone(),
            engine,
            world: World::new(),
            clocks: BTreeMap::new(),
            observer: OBSERVER_START,
            heading,
            now: 0.0,
            tick: 0,
            sib_enabled: false,
            rng,
        })
    }

    pub fn engine(&self) -> &TrustEngine {
        &self.engine
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn observer(&self) -> Position {
        self.observer
    }

    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn set_sib_enabled(&mut self, enabled: bool) {
        self.sib_enabled = enabled;
    }

    /// Place the observer directly, e.g. for scripted runs.
    pub fn teleport(&mut self, position: Position) {
        self.observer = position;
    }

    /// Renderer fade for one tower at the current time.
    pub fn fade_progress(&self, id: TowerId) -> Option<f64> {
        self.world
            .registry()
            .get(id)
            .map(|tower| tower.fade_progress(self.now, self.config.fade_duration))
    }

    pub fn snapshot(&self) -> Vec<TowerSnapshot> {
        self.world.registry().snapshot()
    }

    /// Flip the rogue flag of the tower nearest the observer.
    pub fn toggle_nearest(&mut self) -> Result<Option<(TowerId, bool)>> {
        let Some(id) = self.world.registry().nearest(&self.observer).map(|t| t.id()) else {
            return Ok(None);
        };
        let is_rogue = self.engine.toggle_rogue(self.world.registry_mut(), id)?;
        Ok(Some((id, is_rogue)))
    }

    /// Run one frame.
    pub fn tick(&mut self) -> Result<TickReport> {
        self.tick += 1;
        self.now += self.config.frame_interval;
        self.walk();

        self.world.enqueue_around(&self.observer, &self.config);
        let created = self
            .world
            .generate_pending(&self.engine, &self.config, self.now, &mut self.rng)?;
        for id in &created {
            let clock = TowerClock {
                next_update: self.now,
                next_sib: self.now + self.rng.gen_range(1.0..3.0),
                tac: sib::random_tac(&mut self.rng),
            };
            self.clocks.insert(*id, clock);
        }
        if !created.is_empty() {
            info!(
                tick = self.tick,
                created = created.len(),
                total = self.world.registry().len(),
                "Towers generated"
            );
        }

        let mut evaluations = Vec::new();
        let mut sibs = Vec::new();
        for (&id, clock) in self.clocks.iter_mut() {
            if self.now >= clock.next_update {
                let evaluation = self.engine.evaluate(
                    self.world.registry_mut(),
                    id,
                    self.observer,
                    self.now,
                    &mut self.rng,
                )?;
                evaluations.push(evaluation);
                clock.next_update = self.now + self.config.tower_update_interval;
            }

            if self.sib_enabled && self.now >= clock.next_sib {
                if let Some(tower) = self.world.registry().get(id) {
                    let sib = sib::build(tower, &clock.tac, &mut self.rng);
                    debug!(tower_id = %id, summary = %sib::summary(&sib), "SIB broadcast");
                    sibs.push(sib);
                }
                clock.next_sib = self.now
                    + self
                        .rng
                        .gen_range(self.config.sib_interval_min..=self.config.sib_interval_max);
            }
        }

        Ok(TickReport {
            tick: self.tick,
            now: self.now,
            created,
            evaluations,
            sibs,
        })
    }

    fn walk(&mut self) {
        if self.rng.gen_bool(TURN_PROBABILITY) {
            self.heading = self.rng.gen_range(0.0..TAU);
        }
        let step = self.config.observer_speed * self.config.frame_interval;
        self.observer = self
            .observer
            .offset(step * self.heading.cos(), step * self.heading.sin());
    }
}
