//! Tower records and their trust state.

use csiv_core::{Position, TowerId};
use csiv_rf::SignalTracker;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity suffix carried by every rogue-flagged tower.
pub const ROGUE_SUFFIX: &str = "_ROGUE";

/// Trust state of a tower as seen by the observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrustState {
    /// Initial state; no evidence against the tower
    #[default]
    Clean,
    /// Suspicion score crossed the suspect threshold
    Suspect,
    /// Tower is barred from reselection for a backoff period
    Barred,
    /// Barring expired; the tower must look clean for a few evaluations
    Probation,
}

impl TrustState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrustState::Clean => "CLEAN",
            TrustState::Suspect => "SUSPECT",
            TrustState::Barred => "BARRED",
            TrustState::Probation => "PROBATION",
        }
    }
}

impl fmt::Display for TrustState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A simulated radio cell.
///
/// Fields are mutated only by the state machine and by segregation; external
/// collaborators read them through accessors. Serialize-only: a tower is
/// built with [`Tower::new`], never decoded.
#[derive(Debug, Clone, Serialize)]
pub struct Tower {
    pub(crate) id: TowerId,
    pub(crate) identity: String,
    pub(crate) is_rogue: bool,
    pub(crate) position: Position,
    pub(crate) priority: u8,
    pub(crate) neighbors: Vec<TowerId>,

    pub(crate) state: TrustState,
    pub(crate) prev_state: TrustState,
    pub(crate) last_state_change_time: f64,

    pub(crate) score: f64,
    pub(crate) last_update_time: f64,
    pub(crate) barred_expiry: f64,
    pub(crate) barred_start_time: f64,
    pub(crate) probation_expiry: f64,
    pub(crate) clean_streak: u32,
    pub(crate) recent_bar_count: u32,
    pub(crate) out_of_range_since: Option<f64>,
    pub(crate) cooldown_until: f64,

    pub(crate) signal: SignalTracker,
}

impl Tower {
    /// Create a CLEAN tower with a zero score and no neighbors.
    ///
    /// Without an explicit identity the tower is called `ID_<id>`. Rogue
    /// towers always carry the [`ROGUE_SUFFIX`] marker.
    pub fn new(
        id: TowerId,
        position: Position,
        priority: u8,
        identity: Option<String>,
        is_rogue: bool,
    ) -> Self {
        let mut identity = identity.unwrap_or_else(|| format!("ID_{}", id));
        if is_rogue && !identity.ends_with(ROGUE_SUFFIX) {
            identity.push_str(ROGUE_SUFFIX);
        }

        Self {
            id,
            identity,
            is_rogue,
            position,
            priority,
            neighbors: Vec::new(),
            state: TrustState::Clean,
            prev_state: TrustState::Clean,
            last_state_change_time: 0.0,
            score: 0.0,
            last_update_time: 0.0,
            barred_expiry: 0.0,
            barred_start_time: 0.0,
            probation_expiry: 0.0,
            clean_streak: 0,
            recent_bar_count: 0,
            out_of_range_since: None,
            cooldown_until: 0.0,
            signal: SignalTracker::new(),
        }
    }

    /// Stamp the creation time on the score and state clocks.
    pub fn created_at(mut self, now: f64) -> Self {
        self.last_update_time = now;
        self.last_state_change_time = now;
        self
    }

    pub fn id(&self) -> TowerId {
        self.id
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn is_rogue(&self) -> bool {
        self.is_rogue
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    /// Closest-first neighbor ids; always empty for a rogue tower.
    pub fn neighbors(&self) -> &[TowerId] {
        &self.neighbors
    }

    pub fn state(&self) -> TrustState {
        self.state
    }

    pub fn prev_state(&self) -> TrustState {
        self.prev_state
    }

    pub fn last_state_change_time(&self) -> f64 {
        self.last_state_change_time
    }

    /// Current suspicion score (never negative).
    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn last_update_time(&self) -> f64 {
        self.last_update_time
    }

    pub fn barred_expiry(&self) -> f64 {
        self.barred_expiry
    }

    pub fn barred_start_time(&self) -> f64 {
        self.barred_start_time
    }

    pub fn probation_expiry(&self) -> f64 {
        self.probation_expiry
    }

    pub fn clean_streak(&self) -> u32 {
        self.clean_streak
    }

    pub fn recent_bar_count(&self) -> u32 {
        self.recent_bar_count
    }

    pub fn out_of_range_since(&self) -> Option<f64> {
        self.out_of_range_since
    }

    pub fn cooldown_until(&self) -> f64 {
        self.cooldown_until
    }

    pub fn signal(&self) -> &SignalTracker {
        &self.signal
    }

    pub fn distance_to(&self, point: &Position) -> f64 {
        self.position.distance_to(point)
    }

    /// Barred flag as advertised in broadcast messages.
    pub fn is_barred(&self) -> bool {
        self.state == TrustState::Barred
    }

    /// Linear progress of the SUSPECT to BARRED colour fade.
    ///
    /// Any other transition renders at full progress immediately.
    pub fn fade_progress(&self, now: f64, fade_duration: f64) -> f64 {
        if self.prev_state == TrustState::Suspect && self.state == TrustState::Barred {
            let elapsed = (now - self.last_state_change_time).max(0.0);
            (elapsed / fade_duration).min(1.0)
        } else {
            1.0
        }
    }

    /// Flip the rogue flag, keeping the identity suffix in step.
    ///
    /// Neighbor lists are stale afterwards; callers go through
    /// [`crate::Registry::toggle_rogue`], which re-runs segregation.
    pub(crate) fn set_rogue(&mut self, is_rogue: bool) {
        self.is_rogue = is_rogue;
        if is_rogue {
            if !self.identity.ends_with(ROGUE_SUFFIX) {
                self.identity.push_str(ROGUE_SUFFIX);
            }
        } else {
            self.identity = self.identity.replace(ROGUE_SUFFIX, "");
        }
    }

    /// Record a state change; entering BARRED stamps the bar start time.
    pub(crate) fn set_state(&mut self, next: TrustState, now: f64) {
        if next == self.state {
            return;
        }
        self.prev_state = self.state;
        self.state = next;
        self.last_state_change_time = now;
        if next == TrustState::Barred {
            self.barred_start_time = now;
        }
    }
}
