//! Trust Mesh
//!
//! Decides, per cell tower, whether a simulated observer should trust it:
//! - Tower registry and the segregated neighbor topology
//! - Identity (dVer), priority (pVer) and signal-physics (spVer) deviation estimators
//! - Decaying suspicion score with combo boosting
//! - CLEAN / SUSPECT / BARRED / PROBATION state machine with backoff and recovery
//!
//! The engine is synchronous and owns no clock; callers pass `now` in seconds.

pub mod engine;
pub mod error;
pub mod estimators;
pub mod registry;
pub mod segregation;
pub mod state;
pub mod suspicion;
pub mod tower;

pub use engine::{Evaluation, TrustEngine};
pub use error::{Result, TrustMeshError};
pub use estimators::{Deviations, IdentityDeviation, PriorityDeviation};
pub use registry::{Registry, TowerSnapshot};
pub use segregation::{is_segregated, recompute_neighbors};
pub use state::{Action, Observation, Transition};
pub use tower::{Tower, TrustState, ROGUE_SUFFIX};
