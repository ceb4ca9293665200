//! Error types for the task coordinator.

use thiserror::Error;

/// Result type for coordinator operations.
pub type Result<T> = std::result::Result<T, CoordinatorError>;

/// Errors that can occur while managing tasks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    /// Package destination has no goal.
    #[error("no goal registered for destination {destination}")]
    UnknownDestination {
        /// Destination identifier of the package.
        destination: u32,
    },

    /// A task for this package already exists.
    #[error("task already exists for package {package}")]
    DuplicateTask {
        /// Package identifier.
        package: u32,
    },

    /// Agent has not been registered with the coordinator.
    #[error("agent not registered: {agent}")]
    AgentNotRegistered {
        /// Name of the unknown agent.
        agent: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_unknown_destination() {
        let err = CoordinatorError::UnknownDestination { destination: 9 };
        assert_eq!(err.to_string(), "no goal registered for destination 9");
    }

    #[test]
    fn error_display_duplicate_task() {
        let err = CoordinatorError::DuplicateTask { package: 4 };
        assert_eq!(err.to_string(), "task already exists for package 4");
    }

    #[test]
    fn error_display_agent_not_registered() {
        let err = CoordinatorError::AgentNotRegistered {
            agent: "Agent5".into(),
        };
        assert_eq!(err.to_string(), "agent not registered: Agent5");
    }
}
