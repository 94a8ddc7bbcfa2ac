//! Simulation Tests
//!
//! Generated worlds and full simulation runs: topology invariants, the tower
//! cap, determinism and the JSON surfaces the driver prints.

use crate::test_utils::*;
use csiv_core::{Config, Position, SimulationConfig};
use csiv_sim::{Simulation, World};
use csiv_trust_mesh::{is_segregated, Registry, TrustEngine, TrustState};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn assert_topology(registry: &Registry, engine: &TrustEngine) {
    let topology = engine.topology_config();
    assert!(is_segregated(registry));

    for tower in registry.iter() {
        assert!(tower.neighbors().len() <= topology.max_neighbors);
        assert!(!tower.neighbors().contains(&tower.id()));
        for id in tower.neighbors() {
            let neighbor = registry.get(*id).unwrap();
            assert!(tower.distance_to(&neighbor.position()) <= topology.neighbor_radius);
        }
    }
}

#[test]
fn rogue_heavy_world_stays_segregated() {
    let engine = quiet_engine();
    let config = SimulationConfig {
        rogue_probability: 0.5,
        ..SimulationConfig::default()
    };
    let mut rng = StdRng::seed_from_u64(21);
    let mut world = World::new();

    for cx in -3..=3 {
        for cy in -3..=3 {
            world
                .generate_chunk((cx, cy), &engine, &config, 0.0, &mut rng)
                .unwrap();
        }
    }

    assert!(world.registry().iter().any(|t| t.is_rogue()));
    assert_topology(world.registry(), &engine);
}

#[test]
fn simulation_respects_tower_cap() {
    let mut config = quiet_config();
    config.simulation.max_total_towers = 20;
    config.simulation.observer_speed = 600.0;
    let mut sim = Simulation::new(&config, Some(17)).unwrap();

    for _ in 0..1200 {
        sim.tick().unwrap();
    }

    let towers = sim.world().registry().len();
    assert!(towers >= 20);
    assert!(towers <= 20 + config.simulation.towers_per_chunk_max as usize);
    assert_topology(sim.world().registry(), sim.engine());
}

#[test]
fn toggling_mid_run_keeps_topology_valid() {
    let mut sim = Simulation::new(&quiet_config(), Some(8)).unwrap();

    for tick in 0..900 {
        if tick % 150 == 75 {
            sim.toggle_nearest().unwrap();
        }
        sim.tick().unwrap();
    }

    assert_topology(sim.world().registry(), sim.engine());
}

#[test]
fn snapshot_serializes_states_by_name() {
    let mut sim = Simulation::new(&Config::default(), Some(1)).unwrap();
    sim.set_sib_enabled(true);
    for _ in 0..60 {
        sim.tick().unwrap();
    }

    let json = serde_json::to_value(sim.snapshot()).unwrap();
    let states: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["state"].as_str().unwrap())
        .collect();

    assert!(!states.is_empty());
    assert!(states
        .iter()
        .all(|s| ["CLEAN", "SUSPECT", "BARRED", "PROBATION"].contains(s)));
}

#[test]
fn sib_barred_flag_tracks_state() {
    let mut sim = Simulation::new(&Config::default(), Some(12)).unwrap();
    sim.set_sib_enabled(true);

    for _ in 0..1800 {
        let report = sim.tick().unwrap();
        for sib in &report.sibs {
            let tower = sim.world().registry().get(sib.tower_id).unwrap();
            assert_eq!(sib.cell_barred, tower.state() == TrustState::Barred);
            assert_eq!(sib.identity, tower.identity());
        }
    }
}

#[test]
fn teleporting_away_gates_every_tower() {
    let mut sim = Simulation::new(&quiet_config(), Some(4)).unwrap();
    for _ in 0..120 {
        sim.tick().unwrap();
    }

    sim.teleport(Position::new(1.0e6, 1.0e6));
    // One update interval is enough for every existing tower to be evaluated.
    let mut gated = 0;
    for _ in 0..16 {
        let report = sim.tick().unwrap();
        for eval in report.evaluations.iter().filter(|e| e.deviations.is_none()) {
            assert_eq!(eval.state, TrustState::Clean);
            assert_eq!(eval.score, 0.0);
            gated += 1;
        }
    }
    assert!(gated > 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn generated_worlds_are_segregated(seed in any::<u64>(), rogue in 0.0f64..=1.0) {
        let engine = quiet_engine();
        let config = SimulationConfig {
            rogue_probability: rogue,
            ..SimulationConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(seed);
        let mut world = World::new();

        for cx in -2..=2 {
            for cy in -2..=2 {
                world
                    .generate_chunk((cx, cy), &engine, &config, 0.0, &mut rng)
                    .unwrap();
            }
        }

        prop_assert!(is_segregated(world.registry()));
        for tower in world.registry().iter().filter(|t| t.is_rogue()) {
            prop_assert!(tower.neighbors().is_empty());
        }
    }
}
