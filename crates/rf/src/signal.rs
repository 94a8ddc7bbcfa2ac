//! RF signal sampling

use csiv_core::{Position, SignalConfig};
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Instantaneous signal strength of a tower as seen by the observer.
///
/// Inverse distance (distance floored at `min_distance`) with multiplicative
/// Gaussian noise of `noise_fraction` of the clean value. Never negative.
pub fn measure_signal<R: Rng + ?Sized>(
    tower: &Position,
    observer: &Position,
    config: &SignalConfig,
    rng: &mut R,
) -> f64 {
    let distance = tower.distance_to(observer).max(config.min_distance);
    let base = 1.0 / distance;
    let sigma = config.noise_fraction * base;
    if sigma <= 0.0 || !sigma.is_finite() {
        return base;
    }
    let noise = Normal::new(0.0, sigma)
        .map(|normal| normal.sample(rng))
        .unwrap_or(0.0);
    (base + noise).max(0.0)
}
