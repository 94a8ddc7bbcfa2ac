//! Exponentially-weighted signal statistics and the spVer estimator.

use csiv_core::SignalConfig;
use serde::{Deserialize, Serialize};

/// Output of one spVer evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalDeviation {
    /// Deviation in `[0, 1]`
    pub deviation: f64,
    /// z-score of the sample against the running statistics
    pub z: f64,
    /// Adaptive threshold the z-score was compared against
    pub threshold: f64,
}

/// Running mean and variance of one tower's observed signal strength.
///
/// Lazily seeded by the first in-range sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalTracker {
    stats: Option<(f64, f64)>,
}

impl SignalTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exponentially-weighted mean, if any sample has been seen.
    pub fn mean(&self) -> Option<f64> {
        self.stats.map(|(mu, _)| mu)
    }

    /// Exponentially-weighted variance, if any sample has been seen.
    pub fn variance(&self) -> Option<f64> {
        self.stats.map(|(_, v)| v)
    }

    /// Fold `sample` into the statistics and score it.
    ///
    /// The mean is updated first and the variance and z-score are taken
    /// against the updated mean. The threshold loosens with the coefficient
    /// of variation: `z_base * (1 + alpha_cv * cv)`.
    pub fn observe(&mut self, sample: f64, config: &SignalConfig) -> SignalDeviation {
        let beta = config.beta;
        let (mu, v) = match self.stats {
            None => (sample, 0.0),
            Some((mu, v)) => {
                let mu = (1.0 - beta) * mu + beta * sample;
                let v = (1.0 - beta) * v + beta * (sample - mu).powi(2);
                (mu, v)
            }
        };
        self.stats = Some((mu, v));

        let sigma = v.max(config.variance_floor).sqrt();
        let z = (sample - mu).abs() / sigma;
        let cv = sigma / mu.max(config.mean_floor);
        let threshold = config.z_base * (1.0 + config.alpha_cv * cv);

        let deviation = if z > threshold {
            ((z - threshold) / threshold).min(1.0)
        } else {
            0.0
        };

        SignalDeviation {
            deviation,
            z,
            threshold,
        }
    }
}
