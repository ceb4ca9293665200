//! Error types for the energy subsystem.

use thiserror::Error;

/// Result type for energy operations.
pub type Result<T> = std::result::Result<T, EnergyError>;

/// Errors raised by the station registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnergyError {
    /// The agent holds no station reservation.
    #[error("{agent} holds no charging station")]
    NotReserved {
        /// Agent that tried to release.
        agent: String,
    },
}
