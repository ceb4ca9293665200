//! Shared services and settings handed to every agent.

use std::sync::Arc;

use relay_coordinator::{GoalTable, TaskCoordinator};
use relay_core::{
    BehaviorConfig, Clock, DeliveryLedger, EnergyConfig, FleetConfig, MessageBus,
    NegotiationConfig,
};
use relay_energy::StationRegistry;

/// Fleet-wide services shared by all agents of one run.
///
/// Cloning is cheap; every field is reference counted.
#[derive(Clone)]
pub struct AgentServices {
    /// Task allocator.
    pub coordinator: Arc<TaskCoordinator>,
    /// Broadcast bus.
    pub bus: Arc<MessageBus>,
    /// Charging-station reservations.
    pub stations: Arc<StationRegistry>,
    /// Delivered packages.
    pub ledger: Arc<DeliveryLedger>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
    /// Goal cell per destination.
    pub goals: Arc<GoalTable>,
}

impl std::fmt::Debug for AgentServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentServices")
            .field("coordinator", &self.coordinator)
            .field("bus", &self.bus)
            .field("stations", &self.stations)
            .field("ledger", &self.ledger)
            .field("goals", &self.goals)
            .finish_non_exhaustive()
    }
}

/// Per-agent tunables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentSettings {
    /// Battery parameters.
    pub energy: EnergyConfig,
    /// Negotiation timing.
    pub negotiation: NegotiationConfig,
    /// Movement heuristics.
    pub behavior: BehaviorConfig,
}

impl AgentSettings {
    /// Extracts the agent-facing sections of a fleet configuration.
    #[must_use]
    pub fn from_config(config: &FleetConfig) -> Self {
        Self {
            energy: config.energy,
            negotiation: config.negotiation.clone(),
            behavior: config.behavior.clone(),
        }
    }
}
