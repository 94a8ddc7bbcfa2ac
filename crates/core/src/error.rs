//! Core error types

use thiserror::Error;

/// Core error type for CSIV
#[derive(Debug, Error)]
pub enum CoreError {
    /// A tunable lies outside its documented domain
    #[error("Invalid configuration: {field} {reason}")]
    InvalidConfig {
        /// Offending field, dotted by section (e.g. `engine.w_dver`)
        field: &'static str,
        /// Human-readable constraint that was violated
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

impl CoreError {
    /// Shorthand for an [`CoreError::InvalidConfig`].
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        CoreError::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

/// Result alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
