//! RF signal model for CSIV.
//!
//! Samples observer-relative signal strength and tracks per-tower running
//! statistics used by the signal-deviation estimator (spVer).

pub mod signal;
pub mod tracker;

pub use signal::measure_signal;
pub use tracker::{SignalDeviation, SignalTracker};
