//! Shared fixtures for scenario tests

use csiv_core::{Config, Position, TowerId};
use csiv_trust_mesh::{Evaluation, Registry, Tower, TrustEngine};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Default configuration with signal noise disabled, so spVer is exact.
pub fn quiet_config() -> Config {
    let mut config = Config::default();
    config.signal.noise_fraction = 0.0;
    config
}

pub fn quiet_engine() -> TrustEngine {
    TrustEngine::from_config(&quiet_config()).unwrap()
}

pub fn seeded_rng() -> StdRng {
    StdRng::seed_from_u64(0x5EED)
}

/// Legitimate tower on the x axis with an explicit identity.
pub fn tower(id: u32, x: f64, priority: u8, identity: &str) -> Tower {
    Tower::new(
        TowerId(id),
        Position::new(x, 0.0),
        priority,
        Some(identity.to_string()),
        false,
    )
}

/// Registry holding `towers`, with neighbors already computed.
pub fn registry_with(engine: &TrustEngine, towers: Vec<Tower>) -> Registry {
    let mut registry = Registry::new();
    for tower in towers {
        registry.insert(tower).unwrap();
    }
    engine.recompute_neighbors(&mut registry);
    registry
}

/// Evaluate one tower with the observer at `observer`.
pub fn eval_at(
    engine: &TrustEngine,
    registry: &mut Registry,
    id: u32,
    observer: Position,
    now: f64,
    rng: &mut StdRng,
) -> Evaluation {
    engine
        .evaluate(registry, TowerId(id), observer, now, rng)
        .unwrap()
}
