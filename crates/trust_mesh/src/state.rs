//! Trust State Machine
//!
//! CLEAN -> SUSPECT -> BARRED -> PROBATION -> CLEAN, with early exits from
//! BARRED back to CLEAN. Each state has its own transition function that
//! reads the tower and the current observation and returns a [`Transition`]:
//! the next state plus the side effects to perform. [`apply`] is the only
//! place those effects touch the tower.
//!
//! # Invariants
//!
//! - Transitions depend only on the score, observer distance, elapsed time and
//!   the tower's own counters.
//! - BARRED durations follow `min(barred_base * 2^(n-1), barred_max)`.
//! - Any return to CLEAN zeroes the score and opens a cooldown window during
//!   which the SUSPECT threshold is raised.

use crate::estimators::Deviations;
use crate::tower::{Tower, TrustState};
use csiv_core::EngineConfig;
use tracing::{debug, info, warn};

/// What the engine saw for one tower in one evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub now: f64,
    /// Distance from the observer to the tower
    pub distance: f64,
    /// Score after decay and accumulation
    pub score: f64,
    pub deviations: Deviations,
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Zero the score and restart its decay clock
    ResetScore,
    /// Open the post-CLEAN hysteresis window
    StartCooldown,
    /// Count one more bar and arm `barred_expiry` with the backoff duration
    Bar,
    /// Arm `probation_expiry` and reset the clean streak
    EnterProbation,
    /// One more clean-looking evaluation while on probation
    CountCleanEvaluation,
    /// Start the out-of-range clear timer
    MarkOutOfRange,
    ClearOutOfRange,
}

/// Next state plus the effects to apply, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub next: TrustState,
    pub actions: Vec<Action>,
}

impl Transition {
    fn stay(state: TrustState) -> Self {
        Self {
            next: state,
            actions: Vec::new(),
        }
    }

    fn to(next: TrustState, actions: &[Action]) -> Self {
        Self {
            next,
            actions: actions.to_vec(),
        }
    }

    fn to_clean() -> Self {
        Self::to(
            TrustState::Clean,
            &[Action::ResetScore, Action::StartCooldown, Action::ClearOutOfRange],
        )
    }

    fn to_barred() -> Self {
        Self::to(TrustState::Barred, &[Action::Bar, Action::ClearOutOfRange])
    }
}

/// Transition for a tower beyond the vicinity radius.
///
/// The score always ends at zero; only a tower that was not already CLEAN
/// changes state and starts a cooldown.
pub fn out_of_vicinity(tower: &Tower) -> Transition {
    if tower.state == TrustState::Clean {
        Transition::to(TrustState::Clean, &[Action::ResetScore])
    } else {
        Transition::to_clean()
    }
}

/// Transition for an isolated tower that duplicates another identity.
///
/// Treated as a confirmed rogue: barred immediately, regardless of state.
pub fn confirm_rogue() -> Transition {
    Transition::to(
        TrustState::Barred,
        &[Action::Bar, Action::ClearOutOfRange, Action::StartCooldown],
    )
}

/// Evaluate the in-vicinity transition table for one tower.
pub fn step(tower: &Tower, obs: &Observation, engine: &EngineConfig) -> Transition {
    let mut transition = match tower.state {
        TrustState::Clean => from_clean(tower, obs, engine),
        TrustState::Suspect => from_suspect(obs, engine),
        TrustState::Barred => from_barred(tower, obs, engine),
        TrustState::Probation => from_probation(tower, obs, engine),
    };

    // Early recovery is checked after the table, for any tower still BARRED.
    if transition.next == TrustState::Barred {
        let bar_start = if tower.state == TrustState::Barred {
            tower.barred_start_time
        } else {
            obs.now
        };
        let recovered = obs.now - bar_start >= engine.t_min_recovery
            && obs.score < engine.theta_suspect * engine.recovery_score_factor;
        if recovered {
            transition.next = TrustState::Clean;
            transition.actions.extend_from_slice(&[
                Action::ResetScore,
                Action::StartCooldown,
                Action::ClearOutOfRange,
            ]);
        }
    }

    transition
}

fn from_clean(tower: &Tower, obs: &Observation, engine: &EngineConfig) -> Transition {
    let threshold = if obs.now < tower.cooldown_until {
        engine.theta_suspect * engine.cooldown_threshold_factor
    } else {
        engine.theta_suspect
    };

    if obs.score >= threshold {
        Transition::stay(TrustState::Suspect)
    } else {
        Transition::stay(TrustState::Clean)
    }
}

fn from_suspect(obs: &Observation, engine: &EngineConfig) -> Transition {
    if obs.score >= engine.theta_barred {
        Transition::to_barred()
    } else {
        Transition::stay(TrustState::Suspect)
    }
}

fn from_barred(tower: &Tower, obs: &Observation, engine: &EngineConfig) -> Transition {
    let mut actions = Vec::new();

    if obs.distance > engine.d_clear {
        match tower.out_of_range_since {
            None => actions.push(Action::MarkOutOfRange),
            Some(since) if obs.now - since >= engine.t_clear => return Transition::to_clean(),
            Some(_) => {}
        }
    } else if tower.out_of_range_since.is_some() {
        actions.push(Action::ClearOutOfRange);
    }

    if obs.now >= tower.barred_expiry {
        actions.push(Action::EnterProbation);
        return Transition {
            next: TrustState::Probation,
            actions,
        };
    }

    Transition {
        next: TrustState::Barred,
        actions,
    }
}

fn from_probation(tower: &Tower, obs: &Observation, engine: &EngineConfig) -> Transition {
    if !obs
        .deviations
        .all_below(engine.probation_deviation_ceiling)
    {
        return Transition::to_barred();
    }

    if tower.clean_streak + 1 >= engine.m_clean {
        let mut transition = Transition::to_clean();
        transition.actions.insert(0, Action::CountCleanEvaluation);
        transition
    } else {
        Transition::to(TrustState::Probation, &[Action::CountCleanEvaluation])
    }
}

/// Perform a transition's effects on `tower`, then record the state change.
pub fn apply(tower: &mut Tower, transition: &Transition, now: f64, engine: &EngineConfig) {
    for action in &transition.actions {
        match action {
            Action::ResetScore => {
                tower.score = 0.0;
                tower.last_update_time = now;
            }
            Action::StartCooldown => tower.cooldown_until = now + engine.cooldown_duration,
            Action::Bar => {
                tower.recent_bar_count = tower.recent_bar_count.saturating_add(1);
                tower.barred_expiry = now + engine.barred_duration(tower.recent_bar_count);
            }
            Action::EnterProbation => {
                tower.probation_expiry = now + engine.t_probation;
                tower.clean_streak = 0;
            }
            Action::CountCleanEvaluation => {
                tower.clean_streak = tower.clean_streak.saturating_add(1)
            }
            Action::MarkOutOfRange => tower.out_of_range_since = Some(now),
            Action::ClearOutOfRange => tower.out_of_range_since = None,
        }
    }

    let from = tower.state;
    tower.set_state(transition.next, now);
    if from == transition.next {
        return;
    }

    match transition.next {
        TrustState::Barred => warn!(
            tower_id = %tower.id,
            identity = %tower.identity,
            from = %from,
            score = tower.score,
            bar_count = tower.recent_bar_count,
            barred_until = tower.barred_expiry,
            "Tower barred"
        ),
        TrustState::Clean => info!(
            tower_id = %tower.id,
            from = %from,
            "Tower cleared"
        ),
        next => debug!(
            tower_id = %tower.id,
            from = %from,
            to = %next,
            score = tower.score,
            "Tower state changed"
        ),
    }
}
