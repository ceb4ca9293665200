//! Error types shared by the fleet crates.

use thiserror::Error;

/// Result type for fleet operations.
pub type Result<T> = std::result::Result<T, FleetError>;

/// Errors raised by the world boundary and the configuration layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FleetError {
    /// Configuration could not be read or failed validation.
    #[error("invalid configuration: {reason}")]
    Config {
        /// Description of what is wrong with the configuration.
        reason: String,
    },

    /// Zone identifier is not known to the world.
    #[error("zone not found: {zone}")]
    UnknownZone {
        /// Identifier of the missing zone.
        zone: String,
    },

    /// Zone is at capacity and rejected a package.
    #[error("zone {zone} is full (capacity {capacity})")]
    ZoneFull {
        /// Identifier of the full zone.
        zone: String,
        /// Configured capacity of the zone.
        capacity: usize,
    },

    /// Coordinate lies outside the grid.
    #[error("coordinate ({x}, {y}) is out of bounds")]
    OutOfBounds {
        /// Column of the rejected coordinate.
        x: i32,
        /// Row of the rejected coordinate.
        y: i32,
    },

    /// Cell is not passable or already taken.
    #[error("cell ({x}, {y}) is occupied")]
    CellOccupied {
        /// Column of the occupied cell.
        x: i32,
        /// Row of the occupied cell.
        y: i32,
    },

    /// Agent is not present in the world.
    #[error("agent not found: {agent}")]
    UnknownAgent {
        /// Name of the missing agent.
        agent: String,
    },
}

impl FleetError {
    /// Shorthand for a configuration error.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_config() {
        let err = FleetError::config("grid width must be positive");
        assert_eq!(
            err.to_string(),
            "invalid configuration: grid width must be positive"
        );
    }

    #[test]
    fn error_display_zone_full() {
        let err = FleetError::ZoneFull {
            zone: "R1".into(),
            capacity: 2,
        };
        assert_eq!(err.to_string(), "zone R1 is full (capacity 2)");
    }

    #[test]
    fn error_display_out_of_bounds() {
        let err = FleetError::OutOfBounds { x: -1, y: 4 };
        assert_eq!(err.to_string(), "coordinate (-1, 4) is out of bounds");
    }

    #[test]
    fn error_display_unknown_agent() {
        let err = FleetError::UnknownAgent {
            agent: "Agent7".into(),
        };
        assert_eq!(err.to_string(), "agent not found: Agent7");
    }
}
