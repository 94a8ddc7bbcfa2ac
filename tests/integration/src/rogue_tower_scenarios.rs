//! Rogue Tower Scenarios
//!
//! Detection paths for towers that clone an identity or advertise an
//! inflated reselection priority.

use crate::test_utils::*;
use csiv_core::{Position, TowerId, Tunable};
use csiv_trust_mesh::{TrustEngine, TrustState};

#[test]
fn isolated_duplicates_are_barred_on_first_evaluation() {
    let engine = quiet_engine();
    let mut registry = registry_with(
        &engine,
        vec![tower(1, -100.0, 3, "CELL"), tower(2, 100.0, 3, "CELL")],
    );
    let mut rng = seeded_rng();

    // 200 units apart, beyond the neighbor radius.
    assert!(registry.get(TowerId(1)).unwrap().neighbors().is_empty());
    assert!(registry.get(TowerId(2)).unwrap().neighbors().is_empty());

    for id in [1, 2] {
        let eval = eval_at(&engine, &mut registry, id, Position::ORIGIN, 10.0, &mut rng);
        assert_eq!(eval.state, TrustState::Barred);
        assert_eq!(eval.transition, Some((TrustState::Clean, TrustState::Barred)));

        let tower = registry.get(TowerId(id)).unwrap();
        assert_eq!(tower.recent_bar_count(), 1);
        assert_eq!(tower.barred_expiry(), 15.0);
        assert!(tower.is_barred());
    }
}

#[test]
fn isolated_duplicate_rearms_on_every_evaluation() {
    let engine = quiet_engine();
    let mut registry = registry_with(
        &engine,
        vec![tower(1, -100.0, 3, "CELL"), tower(2, 100.0, 3, "CELL")],
    );
    let mut rng = seeded_rng();

    eval_at(&engine, &mut registry, 1, Position::ORIGIN, 10.0, &mut rng);
    eval_at(&engine, &mut registry, 1, Position::ORIGIN, 10.25, &mut rng);

    let tower = registry.get(TowerId(1)).unwrap();
    assert_eq!(tower.state(), TrustState::Barred);
    assert_eq!(tower.recent_bar_count(), 2);
    assert_eq!(tower.barred_expiry(), 20.25);
}

#[test]
fn connected_duplicate_escalates_through_suspect() {
    let engine = quiet_engine();
    let mut registry = registry_with(
        &engine,
        vec![tower(1, 0.0, 3, "CELL"), tower(2, 100.0, 3, "CELL")],
    );
    let mut rng = seeded_rng();

    let first = eval_at(&engine, &mut registry, 1, Position::ORIGIN, 0.0, &mut rng);
    assert_eq!(first.state, TrustState::Suspect);
    assert!(first.deviations.unwrap().duplicate_identity);

    let second = eval_at(&engine, &mut registry, 1, Position::ORIGIN, 0.25, &mut rng);
    assert_eq!(second.state, TrustState::Barred);
    assert_eq!(registry.get(TowerId(1)).unwrap().barred_expiry(), 5.25);
}

#[test]
fn priority_and_duplicate_combine_with_boost() {
    let engine = quiet_engine();
    let mut registry = registry_with(
        &engine,
        vec![tower(1, 0.0, 7, "CELL"), tower(2, 100.0, 3, "CELL")],
    );
    let mut rng = seeded_rng();

    let eval = eval_at(&engine, &mut registry, 1, Position::ORIGIN, 0.0, &mut rng);
    let devs = eval.deviations.unwrap();

    assert!(devs.duplicate_identity && devs.high_priority);
    assert_eq!(devs.pver, 1.0);
    // (1.5 * dVer + 1.0 * pVer) * (1 + 0.5)
    assert!((eval.score - 3.75).abs() < 1e-12);
    assert_eq!(eval.state, TrustState::Suspect);
}

#[test]
fn disabling_combo_boost_removes_amplification() {
    let config = quiet_config();
    let engine_config = config.engine.adjust(Tunable::ComboBoost, -10.0).unwrap();
    assert_eq!(engine_config.combo_boost, 0.0);
    let engine = TrustEngine::new(engine_config, config.signal, config.topology).unwrap();

    let mut registry = registry_with(
        &engine,
        vec![tower(1, 0.0, 7, "CELL"), tower(2, 100.0, 3, "CELL")],
    );
    let mut rng = seeded_rng();

    let eval = eval_at(&engine, &mut registry, 1, Position::ORIGIN, 0.0, &mut rng);
    assert!((eval.score - 2.5).abs() < 1e-12);
}

#[test]
fn honest_neighborhood_stays_clean() {
    let engine = quiet_engine();
    let mut registry = registry_with(
        &engine,
        vec![
            tower(1, 0.0, 3, "ALPHA"),
            tower(2, 80.0, 3, "BRAVO"),
            tower(3, -80.0, 3, "CHARLIE"),
        ],
    );
    let mut rng = seeded_rng();
    let observer = Position::new(10.0, 20.0);

    for step in 0..40 {
        let now = step as f64 * 0.25;
        for eval in engine
            .evaluate_all(&mut registry, observer, now, &mut rng)
            .unwrap()
        {
            assert_eq!(eval.state, TrustState::Clean, "tower {}", eval.tower_id);
        }
    }
}
