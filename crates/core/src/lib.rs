//! Core functionality for the CSIV rogue-tower detection engine.
//!
//! This crate provides the shared identifiers, geometry, configuration and
//! error types used across the CSIV workspace.

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::{Config, EngineConfig, SignalConfig, SimulationConfig, TopologyConfig, Tunable};
pub use error::{CoreError, Result};
pub use types::{Position, TowerId};
