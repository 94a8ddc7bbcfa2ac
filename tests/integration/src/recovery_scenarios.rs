//! Recovery Scenarios
//!
//! Ways out of BARRED: probation after expiry, early recovery, out-of-range
//! clearing and vicinity gating.
//!
//! Most scenarios start from the same fixture: two neighboring towers
//! broadcasting the same identity, tower 1 evaluated from the origin until it
//! is barred at t=0.25 (expiry 5.25).

use crate::test_utils::*;
use csiv_core::{Position, TowerId};
use csiv_trust_mesh::{Registry, TrustEngine, TrustState};
use rand::rngs::StdRng;

const FAR: Position = Position::new(1000.0, 0.0);

fn barred_fixture(engine: &TrustEngine) -> (Registry, StdRng) {
    let mut registry = registry_with(
        engine,
        vec![tower(1, 0.0, 3, "CELL"), tower(2, 100.0, 3, "CELL")],
    );
    let mut rng = seeded_rng();

    eval_at(engine, &mut registry, 1, Position::ORIGIN, 0.0, &mut rng);
    let barred = eval_at(engine, &mut registry, 1, Position::ORIGIN, 0.25, &mut rng);
    assert_eq!(barred.state, TrustState::Barred);

    (registry, rng)
}

#[test]
fn probation_clears_after_clean_streak() {
    let engine = quiet_engine();
    let (mut registry, mut rng) = barred_fixture(&engine);

    // Tower 2 turns out to be the rogue; tower 1 no longer shares an identity.
    assert!(engine.toggle_rogue(&mut registry, TowerId(2)).unwrap());
    assert_eq!(registry.get(TowerId(2)).unwrap().identity(), "CELL_ROGUE");
    assert!(registry.get(TowerId(1)).unwrap().neighbors().is_empty());

    let still = eval_at(&engine, &mut registry, 1, Position::ORIGIN, 5.0, &mut rng);
    assert_eq!(still.state, TrustState::Barred);

    let probation = eval_at(&engine, &mut registry, 1, Position::ORIGIN, 5.25, &mut rng);
    assert_eq!(probation.state, TrustState::Probation);
    assert_eq!(registry.get(TowerId(1)).unwrap().probation_expiry(), 8.25);

    let first_clean = eval_at(&engine, &mut registry, 1, Position::ORIGIN, 5.5, &mut rng);
    assert_eq!(first_clean.state, TrustState::Probation);
    assert_eq!(registry.get(TowerId(1)).unwrap().clean_streak(), 1);

    let cleared = eval_at(&engine, &mut registry, 1, Position::ORIGIN, 5.75, &mut rng);
    assert_eq!(cleared.state, TrustState::Clean);
    assert_eq!(cleared.score, 0.0);
    assert_eq!(cleared.transition, Some((TrustState::Probation, TrustState::Clean)));

    let tower = registry.get(TowerId(1)).unwrap();
    assert_eq!(tower.cooldown_until(), 7.75);
    assert_eq!(tower.prev_state(), TrustState::Probation);
}

#[test]
fn deviation_during_probation_bars_again_with_backoff() {
    let engine = quiet_engine();
    let (mut registry, mut rng) = barred_fixture(&engine);

    engine.toggle_rogue(&mut registry, TowerId(2)).unwrap();
    let probation = eval_at(&engine, &mut registry, 1, Position::ORIGIN, 5.25, &mut rng);
    assert_eq!(probation.state, TrustState::Probation);

    // Tower 2 rejoins under the shared identity.
    assert!(!engine.toggle_rogue(&mut registry, TowerId(2)).unwrap());
    assert_eq!(registry.get(TowerId(2)).unwrap().identity(), "CELL");

    let rebarred = eval_at(&engine, &mut registry, 1, Position::ORIGIN, 5.5, &mut rng);
    assert_eq!(rebarred.state, TrustState::Barred);

    let tower = registry.get(TowerId(1)).unwrap();
    assert_eq!(tower.recent_bar_count(), 2);
    assert_eq!(tower.barred_expiry(), 15.5);
}

#[test]
fn quiet_barred_tower_recovers_before_expiry() {
    let mut config = quiet_config();
    config.engine.barred_base = 30.0;
    let engine = TrustEngine::from_config(&config).unwrap();
    let (mut registry, mut rng) = barred_fixture(&engine);
    engine.toggle_rogue(&mut registry, TowerId(2)).unwrap();

    // Score has only decayed to about 0.74 after ten seconds.
    let early = eval_at(&engine, &mut registry, 1, Position::ORIGIN, 10.25, &mut rng);
    assert_eq!(early.state, TrustState::Barred);

    // Another ten seconds brings it under half the suspect threshold.
    let recovered = eval_at(&engine, &mut registry, 1, Position::ORIGIN, 20.25, &mut rng);
    assert_eq!(recovered.state, TrustState::Clean);
    assert_eq!(recovered.transition, Some((TrustState::Barred, TrustState::Clean)));
    assert_eq!(registry.get(TowerId(1)).unwrap().cooldown_until(), 22.25);
}

#[test]
fn leaving_the_vicinity_resets_to_clean() {
    let engine = quiet_engine();
    let (mut registry, mut rng) = barred_fixture(&engine);

    let gated = eval_at(&engine, &mut registry, 1, FAR, 1.0, &mut rng);
    assert_eq!(gated.state, TrustState::Clean);
    assert_eq!(gated.score, 0.0);
    assert!(gated.deviations.is_none());
    assert_eq!(gated.transition, Some((TrustState::Barred, TrustState::Clean)));
    assert_eq!(registry.get(TowerId(1)).unwrap().cooldown_until(), 3.0);

    // Already clean: score stays zero, cooldown is not restarted.
    let again = eval_at(&engine, &mut registry, 1, FAR, 2.0, &mut rng);
    assert_eq!(again.state, TrustState::Clean);
    assert_eq!(again.score, 0.0);
    assert_eq!(again.transition, None);
    assert_eq!(registry.get(TowerId(1)).unwrap().cooldown_until(), 3.0);
}

#[test]
fn out_of_range_for_long_enough_clears_barred() {
    // Widen the vicinity so the clear distance is reachable without gating.
    let mut config = quiet_config();
    config.engine.vicinity_radius = 500.0;
    let engine = TrustEngine::from_config(&config).unwrap();
    let (mut registry, mut rng) = barred_fixture(&engine);
    let outside = Position::new(320.0, 0.0);

    let marked = eval_at(&engine, &mut registry, 1, outside, 1.0, &mut rng);
    assert_eq!(marked.state, TrustState::Barred);
    assert_eq!(registry.get(TowerId(1)).unwrap().out_of_range_since(), Some(1.0));

    let waiting = eval_at(&engine, &mut registry, 1, outside, 3.5, &mut rng);
    assert_eq!(waiting.state, TrustState::Barred);

    let cleared = eval_at(&engine, &mut registry, 1, outside, 4.0, &mut rng);
    assert_eq!(cleared.state, TrustState::Clean);
    assert_eq!(cleared.score, 0.0);
    assert_eq!(registry.get(TowerId(1)).unwrap().out_of_range_since(), None);
}

#[test]
fn returning_in_range_restarts_the_clear_timer() {
    let mut config = quiet_config();
    config.engine.vicinity_radius = 500.0;
    let engine = TrustEngine::from_config(&config).unwrap();
    let (mut registry, mut rng) = barred_fixture(&engine);
    let outside = Position::new(320.0, 0.0);

    eval_at(&engine, &mut registry, 1, outside, 1.0, &mut rng);
    eval_at(&engine, &mut registry, 1, Position::ORIGIN, 2.0, &mut rng);
    assert_eq!(registry.get(TowerId(1)).unwrap().out_of_range_since(), None);

    eval_at(&engine, &mut registry, 1, outside, 3.0, &mut rng);
    let waiting = eval_at(&engine, &mut registry, 1, outside, 4.5, &mut rng);
    assert_eq!(waiting.state, TrustState::Barred);
}

#[test]
fn cooldown_raises_the_suspect_threshold() {
    // The duplicate now adds 0.6: above 0.5, below the cooldown's 0.75.
    let mut config = quiet_config();
    config.engine.w_dver = 0.6;
    let engine = TrustEngine::from_config(&config).unwrap();
    let mut registry = registry_with(
        &engine,
        vec![tower(1, 0.0, 3, "CELL"), tower(2, 100.0, 3, "CELL")],
    );
    let mut rng = seeded_rng();

    let suspect = eval_at(&engine, &mut registry, 1, Position::ORIGIN, 0.0, &mut rng);
    assert_eq!(suspect.state, TrustState::Suspect);

    let gated = eval_at(&engine, &mut registry, 1, FAR, 0.25, &mut rng);
    assert_eq!(gated.state, TrustState::Clean);
    assert_eq!(registry.get(TowerId(1)).unwrap().cooldown_until(), 2.25);

    let held = eval_at(&engine, &mut registry, 1, Position::ORIGIN, 0.5, &mut rng);
    assert_eq!(held.state, TrustState::Clean);
    assert!((held.score - 0.6).abs() < 1e-12);

    let after = eval_at(&engine, &mut registry, 1, Position::ORIGIN, 2.5, &mut rng);
    assert_eq!(after.state, TrustState::Suspect);
}
