//! Driver and CLI error types.

use relay_core::FleetError;
use thiserror::Error;

/// Errors raised while building or reporting a run.
#[derive(Debug, Error)]
pub enum SimError {
    /// The configuration or layout was rejected.
    #[error(transparent)]
    Fleet(#[from] FleetError),

    /// The grid has fewer free cells than agents to place.
    #[error("cannot place {needed} agents, only {available} free cells")]
    Placement {
        /// Agents requested.
        needed: usize,
        /// Free cells available.
        available: usize,
    },

    /// Output formatting error.
    #[error("format error: {0}")]
    Format(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for driver operations.
pub type Result<T> = std::result::Result<T, SimError>;
