//! Suspicion Aggregator
//!
//! Combines the three deviations into a score increment and decays the
//! accumulated score with a continuous half-life between evaluations.

use crate::estimators::Deviations;
use csiv_core::EngineConfig;
use std::f64::consts::LN_2;

/// Decay `score` over `elapsed` seconds with half-life `t_half`.
///
/// Negative elapsed time (a clock step backwards) leaves the score unchanged;
/// the score never grows here.
pub fn decay(score: f64, elapsed: f64, t_half: f64) -> f64 {
    let elapsed = elapsed.max(0.0);
    let lambda = LN_2 / t_half;
    (score * (-lambda * elapsed).exp()).max(0.0)
}

/// Weighted sum of the deviations.
///
/// When the tower both duplicates an identity and advertises a high priority
/// the increment is multiplied by `1 + combo_boost`.
pub fn score_increment(deviations: &Deviations, engine: &EngineConfig) -> f64 {
    let delta = engine.w_dver * deviations.dver
        + engine.w_pver * deviations.pver
        + engine.w_spver * deviations.spver;

    if deviations.duplicate_identity && deviations.high_priority {
        delta * (1.0 + engine.combo_boost)
    } else {
        delta
    }
}
