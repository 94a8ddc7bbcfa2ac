//! Trust mesh error types

use csiv_core::{CoreError, TowerId};
use thiserror::Error;

/// Errors surfaced by the trust engine and registry
#[derive(Debug, Error)]
pub enum TrustMeshError {
    #[error("Unknown tower: {0}")]
    UnknownTower(TowerId),

    #[error("Tower already registered: {0}")]
    DuplicateTower(TowerId),

    #[error("Tower id space exhausted")]
    IdsExhausted,

    #[error(transparent)]
    Config(#[from] CoreError),
}

pub type Result<T> = std::result::Result<T, TrustMeshError>;
