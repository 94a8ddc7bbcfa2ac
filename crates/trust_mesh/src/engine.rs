//! Trust Engine
//!
//! Per-tower evaluation: vicinity gating, score decay, the three deviation
//! estimators, aggregation and the state machine, in that order.

use crate::error::{Result, TrustMeshError};
use crate::estimators::{duplicate_identity, priority_deviation, Deviations};
use crate::registry::Registry;
use crate::segregation::recompute_neighbors;
use crate::state::{self, Observation, Transition};
use crate::suspicion::{decay, score_increment};
use crate::tower::TrustState;
use csiv_core::{Config, EngineConfig, Position, SignalConfig, TopologyConfig, TowerId};
use csiv_rf::measure_signal;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Outcome of evaluating one tower.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub tower_id: TowerId,
    pub state: TrustState,
    pub score: f64,
    /// `(from, to)` when the state changed
    pub transition: Option<(TrustState, TrustState)>,
    /// `None` when the tower was outside the vicinity radius
    pub deviations: Option<Deviations>,
}

/// Immutable engine configuration plus the operations that use it.
#[derive(Debug, Clone)]
pub struct TrustEngine {
    engine: EngineConfig,
    signal: SignalConfig,
    topology: TopologyConfig,
}

impl TrustEngine {
    /// Build an engine from validated configuration sections.
    pub fn new(
        engine: EngineConfig,
        signal: SignalConfig,
        topology: TopologyConfig,
    ) -> Result<Self> {
        engine.validate()?;
        signal.validate()?;
        topology.validate()?;
        Ok(Self {
            engine,
            signal,
            topology,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.engine.clone(),
            config.signal.clone(),
            config.topology.clone(),
        )
    }

    pub fn engine_config(&self) -> &EngineConfig {
        &self.engine
    }

    pub fn signal_config(&self) -> &SignalConfig {
        &self.signal
    }

    pub fn topology_config(&self) -> &TopologyConfig {
        &self.topology
    }

    /// Swap in new engine tunables, e.g. after [`EngineConfig::adjust`].
    pub fn set_engine_config(&mut self, engine: EngineConfig) -> Result<()> {
        engine.validate()?;
        self.engine = engine;
        Ok(())
    }

    /// Rebuild every neighbor list under the segregation rule.
    pub fn recompute_neighbors(&self, registry: &mut Registry) {
        recompute_neighbors(registry, &self.topology);
    }

    /// Flip a tower's rogue flag and re-segregate the registry.
    pub fn toggle_rogue(&self, registry: &mut Registry, id: TowerId) -> Result<bool> {
        registry.toggle_rogue(id, &self.topology)
    }

    /// Evaluate one tower against the observer at time `now`.
    ///
    /// `rng` supplies the signal measurement noise.
    pub fn evaluate<R: Rng + ?Sized>(
        &self,
        registry: &mut Registry,
        id: TowerId,
        observer: Position,
        now: f64,
        rng: &mut R,
    ) -> Result<Evaluation> {
        let tower = registry.get(id).ok_or(TrustMeshError::UnknownTower(id))?;
        let distance = tower.distance_to(&observer);

        if distance > self.engine.vicinity_radius {
            let transition = state::out_of_vicinity(tower);
            return self.finish(registry, id, transition, now, None);
        }

        // Registry-wide reads happen before the tower is borrowed mutably.
        let identity = duplicate_identity(tower, registry);
        let priority = priority_deviation(tower, registry, &self.topology);
        let isolated = tower.neighbors().is_empty();

        let tower = registry
            .get_mut(id)
            .ok_or(TrustMeshError::UnknownTower(id))?;

        tower.score = decay(
            tower.score,
            now - tower.last_update_time,
            self.engine.t_half,
        );
        tower.last_update_time = now;

        let sample = measure_signal(&tower.position, &observer, &self.signal, rng);
        let signal = tower.signal.observe(sample, &self.signal);

        let deviations = Deviations {
            dver: identity.deviation,
            pver: priority.deviation,
            spver: signal.deviation,
            duplicate_identity: identity.duplicate,
            high_priority: priority.high_priority,
        };
        let delta = score_increment(&deviations, &self.engine);

        trace!(
            tower_id = %id,
            dver = deviations.dver,
            pver = deviations.pver,
            spver = deviations.spver,
            median_priority = priority.median,
            z = signal.z,
            delta,
            "Deviations computed"
        );

        let transition = if identity.duplicate && isolated {
            tower.score = delta;
            state::confirm_rogue()
        } else {
            tower.score += delta;
            let obs = Observation {
                now,
                distance,
                score: tower.score,
                deviations,
            };
            state::step(tower, &obs, &self.engine)
        };

        self.finish(registry, id, transition, now, Some(deviations))
    }

    /// Evaluate every tower once, in id order.
    pub fn evaluate_all<R: Rng + ?Sized>(
        &self,
        registry: &mut Registry,
        observer: Position,
        now: f64,
        rng: &mut R,
    ) -> Result<Vec<Evaluation>> {
        let mut evaluations = Vec::with_capacity(registry.len());
        for id in registry.ids() {
            evaluations.push(self.evaluate(registry, id, observer, now, &mut *rng)?);
        }
        Ok(evaluations)
    }

    fn finish(
        &self,
        registry: &mut Registry,
        id: TowerId,
        transition: Transition,
        now: f64,
        deviations: Option<Deviations>,
    ) -> Result<Evaluation> {
        let tower = registry
            .get_mut(id)
            .ok_or(TrustMeshError::UnknownTower(id))?;
        let from = tower.state;
        state::apply(tower, &transition, now, &self.engine);

        Ok(Evaluation {
            tower_id: id,
            state: tower.state,
            score: tower.score,
            transition: (from != tower.state).then_some((from, tower.state)),
            deviations,
        })
    }
}
