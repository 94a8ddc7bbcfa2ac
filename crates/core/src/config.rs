//! Configuration management for CSIV.
//!
//! Every tunable lives in an immutable value passed explicitly into the
//! engine. Files are TOML; any omitted field falls back to its default, so an
//! empty file yields [`Config::default`].

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub signal: SignalConfig,
    pub topology: TopologyConfig,
    pub simulation: SimulationConfig,
}

/// Scoring weights, thresholds and timers consumed by `evaluate`.
///
/// All durations are in seconds of simulation clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Weight of the duplicate-identity deviation
    pub w_dver: f64,
    /// Weight of the priority deviation
    pub w_pver: f64,
    /// Weight of the signal deviation
    pub w_spver: f64,
    /// Score at which a CLEAN tower becomes SUSPECT
    pub theta_suspect: f64,
    /// Score at which a SUSPECT tower becomes BARRED
    pub theta_barred: f64,
    /// Extra multiplier applied when duplicate identity and high priority coincide
    pub combo_boost: f64,
    /// Half-life of the suspicion score
    pub t_half: f64,
    /// Observer distance beyond which towers are forced CLEAN
    pub vicinity_radius: f64,
    /// First BARRED duration
    pub barred_base: f64,
    /// Cap on any BARRED duration
    pub barred_max: f64,
    /// Time a BARRED tower must stay beyond `d_clear` before clearing
    pub t_clear: f64,
    /// Distance that starts the out-of-range clear timer
    pub d_clear: f64,
    /// Minimum time in BARRED before the low-score recovery applies
    pub t_min_recovery: f64,
    /// Length of the probation window
    pub t_probation: f64,
    /// Consecutive clean evaluations required to leave PROBATION
    pub m_clean: u32,
    /// Hysteresis window after any return to CLEAN
    pub cooldown_duration: f64,
    /// Multiplier on `theta_suspect` while a cooldown is active
    pub cooldown_threshold_factor: f64,
    /// Fraction of `theta_suspect` below which a BARRED tower may recover early
    pub recovery_score_factor: f64,
    /// Deviation ceiling for an evaluation to count as clean during probation
    pub probation_deviation_ceiling: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            w_dver: 1.5,
            w_pver: 1.0,
            w_spver: 1.0,
            theta_suspect: 0.5,
            theta_barred: 1.0,
            combo_boost: 0.5,
            t_half: 5.0,
            vicinity_radius: 250.0,
            barred_base: 5.0,
            barred_max: 30.0,
            t_clear: 3.0,
            d_clear: 300.0,
            t_min_recovery: 8.0,
            t_probation: 3.0,
            m_clean: 2,
            cooldown_duration: 2.0,
            cooldown_threshold_factor: 1.5,
            recovery_score_factor: 0.5,
            probation_deviation_ceiling: 0.1,
        }
    }
}

/// Runtime-adjustable engine tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tunable {
    WDver,
    WPver,
    WSpver,
    ThetaSuspect,
    ThetaBarred,
    ComboBoost,
}

impl EngineConfig {
    /// Return a copy with one tunable nudged by `delta`.
    ///
    /// Weights and the combo boost are floored at zero, thresholds are clamped
    /// to `[0, 1]`. The result is validated before it is handed back, so the
    /// caller keeps its previous value on error.
    pub fn adjust(&self, tunable: Tunable, delta: f64) -> Result<Self> {
        let mut next = self.clone();
        match tunable {
            Tunable::WDver => next.w_dver = (next.w_dver + delta).max(0.0),
            Tunable::WPver => next.w_pver = (next.w_pver + delta).max(0.0),
            Tunable::WSpver => next.w_spver = (next.w_spver + delta).max(0.0),
            Tunable::ThetaSuspect => {
                next.theta_suspect = (next.theta_suspect + delta).clamp(0.0, 1.0)
            }
            Tunable::ThetaBarred => next.theta_barred = (next.theta_barred + delta).clamp(0.0, 1.0),
            Tunable::ComboBoost => next.combo_boost = (next.combo_boost + delta).max(0.0),
        }
        next.validate()?;
        Ok(next)
    }

    /// Backoff duration for the `bar_count`-th consecutive bar (1-based).
    ///
    /// `min(barred_base * 2^(n-1), barred_max)`; a count of zero is treated as one.
    pub fn barred_duration(&self, bar_count: u32) -> f64 {
        let exponent = bar_count.saturating_sub(1).min(1024) as i32;
        (self.barred_base * 2f64.powi(exponent)).min(self.barred_max)
    }

    pub fn validate(&self) -> Result<()> {
        non_negative("engine.w_dver", self.w_dver)?;
        non_negative("engine.w_pver", self.w_pver)?;
        non_negative("engine.w_spver", self.w_spver)?;
        non_negative("engine.theta_suspect", self.theta_suspect)?;
        non_negative("engine.theta_barred", self.theta_barred)?;
        if self.theta_barred < self.theta_suspect {
            return Err(CoreError::invalid(
                "engine.theta_barred",
                format!(
                    "must be >= theta_suspect ({} < {})",
                    self.theta_barred, self.theta_suspect
                ),
            ));
        }
        non_negative("engine.combo_boost", self.combo_boost)?;
        positive("engine.t_half", self.t_half)?;
        positive("engine.vicinity_radius", self.vicinity_radius)?;
        positive("engine.barred_base", self.barred_base)?;
        positive("engine.barred_max", self.barred_max)?;
        if self.barred_max < self.barred_base {
            return Err(CoreError::invalid(
                "engine.barred_max",
                format!("must be >= barred_base ({})", self.barred_base),
            ));
        }
        non_negative("engine.t_clear", self.t_clear)?;
        non_negative("engine.d_clear", self.d_clear)?;
        non_negative("engine.t_min_recovery", self.t_min_recovery)?;
        non_negative("engine.t_probation", self.t_probation)?;
        if self.m_clean == 0 {
            return Err(CoreError::invalid("engine.m_clean", "must be at least 1"));
        }
        non_negative("engine.cooldown_duration", self.cooldown_duration)?;
        if !self.cooldown_threshold_factor.is_finite() || self.cooldown_threshold_factor < 1.0 {
            return Err(CoreError::invalid(
                "engine.cooldown_threshold_factor",
                "must be a finite value >= 1",
            ));
        }
        non_negative("engine.recovery_score_factor", self.recovery_score_factor)?;
        non_negative(
            "engine.probation_deviation_ceiling",
            self.probation_deviation_ceiling,
        )?;
        Ok(())
    }
}

/// Signal-strength model and spVer statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// EWMA smoothing factor for mean and variance
    pub beta: f64,
    /// Base z-score threshold
    pub z_base: f64,
    /// How strongly the coefficient of variation loosens the threshold
    pub alpha_cv: f64,
    /// Gaussian noise standard deviation as a fraction of the clean signal
    pub noise_fraction: f64,
    /// Floor applied to distance before taking its reciprocal
    pub min_distance: f64,
    /// Floor applied to the variance before the square root
    pub variance_floor: f64,
    /// Floor applied to the mean when computing the coefficient of variation
    pub mean_floor: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            beta: 0.2,
            z_base: 2.0,
            alpha_cv: 0.5,
            noise_fraction: 0.05,
            min_distance: 0.1,
            variance_floor: 1e-6,
            mean_floor: 1e-6,
        }
    }
}

impl SignalConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.beta > 0.0 && self.beta <= 1.0) {
            return Err(CoreError::invalid("signal.beta", "must lie in (0, 1]"));
        }
        positive("signal.z_base", self.z_base)?;
        non_negative("signal.alpha_cv", self.alpha_cv)?;
        non_negative("signal.noise_fraction", self.noise_fraction)?;
        positive("signal.min_distance", self.min_distance)?;
        positive("signal.variance_floor", self.variance_floor)?;
        positive("signal.mean_floor", self.mean_floor)?;
        Ok(())
    }
}

/// Neighbor segregation parameters and the priority scale read by pVer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    /// Maximum distance between neighbors
    pub neighbor_radius: f64,
    /// Maximum neighbors kept per legitimate tower (K)
    pub max_neighbors: usize,
    /// Median assumed when a tower has no resolvable neighbors
    pub baseline_priority: u8,
    /// Highest reselection priority on the scale
    pub max_priority: u8,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            neighbor_radius: 150.0,
            max_neighbors: 3,
            baseline_priority: 3,
            max_priority: 7,
        }
    }
}

impl TopologyConfig {
    pub fn validate(&self) -> Result<()> {
        non_negative("topology.neighbor_radius", self.neighbor_radius)?;
        if self.max_neighbors == 0 {
            return Err(CoreError::invalid(
                "topology.max_neighbors",
                "must be at least 1",
            ));
        }
        if self.baseline_priority > self.max_priority {
            return Err(CoreError::invalid(
                "topology.baseline_priority",
                format!("must not exceed max_priority ({})", self.max_priority),
            ));
        }
        Ok(())
    }
}

/// Headless world generation and pacing, read only by the simulation driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub chunk_size: f64,
    pub towers_per_chunk_min: u32,
    pub towers_per_chunk_max: u32,
    pub rogue_probability: f64,
    pub rogue_priority: u8,
    pub legit_priority_min: u8,
    pub legit_priority_max: u8,
    pub min_tower_spacing: f64,
    pub prefetch_radius: i64,
    pub max_chunks_per_tick: usize,
    pub max_total_towers: usize,
    /// Simulated seconds per frame
    pub frame_interval: f64,
    /// Minimum simulated seconds between evaluations of one tower
    pub tower_update_interval: f64,
    pub sib_interval_min: f64,
    pub sib_interval_max: f64,
    pub observer_speed: f64,
    /// Renderer fade from SUSPECT to BARRED
    pub fade_duration: f64,
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            chunk_size: 200.0,
            towers_per_chunk_min: 1,
            towers_per_chunk_max: 2,
            rogue_probability: 0.02,
            rogue_priority: 7,
            legit_priority_min: 2,
            legit_priority_max: 5,
            min_tower_spacing: 50.0,
            prefetch_radius: 1,
            max_chunks_per_tick: 1,
            max_total_towers: 150,
            frame_interval: 1.0 / 60.0,
            tower_update_interval: 0.25,
            sib_interval_min: 5.0,
            sib_interval_max: 12.0,
            observer_speed: 180.0,
            fade_duration: 1.5,
            seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        // Positions are drawn 20 units inside each chunk edge.
        if !self.chunk_size.is_finite() || self.chunk_size <= 40.0 {
            return Err(CoreError::invalid("simulation.chunk_size", "must exceed 40"));
        }
        if self.towers_per_chunk_min > self.towers_per_chunk_max {
            return Err(CoreError::invalid(
                "simulation.towers_per_chunk_min",
                "must not exceed towers_per_chunk_max",
            ));
        }
        if !(0.0..=1.0).contains(&self.rogue_probability) {
            return Err(CoreError::invalid(
                "simulation.rogue_probability",
                "must lie in [0, 1]",
            ));
        }
        if self.legit_priority_min > self.legit_priority_max {
            return Err(CoreError::invalid(
                "simulation.legit_priority_min",
                "must not exceed legit_priority_max",
            ));
        }
        non_negative("simulation.min_tower_spacing", self.min_tower_spacing)?;
        if self.prefetch_radius < 0 {
            return Err(CoreError::invalid(
                "simulation.prefetch_radius",
                "must not be negative",
            ));
        }
        positive("simulation.frame_interval", self.frame_interval)?;
        non_negative("simulation.tower_update_interval", self.tower_update_interval)?;
        positive("simulation.sib_interval_min", self.sib_interval_min)?;
        if self.sib_interval_max < self.sib_interval_min {
            return Err(CoreError::invalid(
                "simulation.sib_interval_max",
                "must be >= sib_interval_min",
            ));
        }
        non_negative("simulation.observer_speed", self.observer_speed)?;
        positive("simulation.fade_duration", self.fade_duration)?;
        Ok(())
    }
}

impl Config {
    /// Load and validate a TOML configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;
        self.signal.validate()?;
        self.topology.validate()?;
        self.simulation.validate()
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(CoreError::invalid(
            field,
            format!("must be finite and >= 0, got {}", value),
        ));
    }
    Ok(())
}

fn positive(field: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(CoreError::invalid(
            field,
            format!("must be finite and > 0, got {}", value),
        ));
    }
    Ok(())
}
