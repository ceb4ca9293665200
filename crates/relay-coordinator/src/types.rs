//! Task and statistics types.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use relay_core::{
    AgentName, Coord, DestinationId, LayoutConfig, Package, PackageId, Role, ZoneId,
};

/// Identifier of a task, `Task-<package id>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(String);

impl TaskId {
    /// Builds the identifier of the task for `package`.
    #[must_use]
    pub fn for_package(package: PackageId) -> Self {
        Self(format!("Task-{package}"))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A delivery job for one package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Task identifier.
    pub id: TaskId,
    /// Package to deliver.
    pub package: PackageId,
    /// Destination of the package.
    pub destination: DestinationId,
    /// Zone the package waits in.
    pub source_zone: ZoneId,
    /// Position of the source zone.
    pub source: Coord,
    /// Position of the goal.
    pub goal: Coord,
    /// Auction priority, 1 to 3.
    pub priority: u8,
    /// Agent that claimed the task. Set exactly once.
    pub assigned_agent: Option<AgentName>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// True once an agent has claimed the task.
    #[must_use]
    pub const fn is_assigned(&self) -> bool {
        self.assigned_agent.is_some()
    }
}

/// Goal positions keyed by destination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalTable(BTreeMap<DestinationId, Coord>);

impl GoalTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the table from a layout.
    #[must_use]
    pub fn from_layout(layout: &LayoutConfig) -> Self {
        Self(layout.goals.iter().map(|g| (g.id, g.position)).collect())
    }

    /// Adds or replaces a goal.
    #[must_use]
    pub fn with_goal(mut self, id: DestinationId, position: Coord) -> Self {
        self.0.insert(id, position);
        self
    }

    /// Position of a goal.
    #[must_use]
    pub fn get(&self, id: DestinationId) -> Option<Coord> {
        self.0.get(&id).copied()
    }

    /// Position of the goal a package is headed to.
    #[must_use]
    pub fn goal_of(&self, package: &Package) -> Option<Coord> {
        self.get(package.destination())
    }
}

/// What the auction needs to know about a bidding agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    /// Agent name.
    pub name: AgentName,
    /// Current cell.
    pub position: Coord,
    /// Current energy level.
    pub energy: u32,
    /// Full-charge level.
    pub energy_capacity: u32,
    /// Energy spent per move.
    pub move_cost: u32,
    /// True while the agent holds a payload or an unfinished claim.
    pub carrying: bool,
}

impl AgentSnapshot {
    /// Creates a snapshot of an idle agent with a 100-unit battery and a
    /// one-unit move cost.
    #[must_use]
    pub fn new(name: AgentName, position: Coord, energy: u32) -> Self {
        Self {
            name,
            position,
            energy,
            energy_capacity: 100,
            move_cost: 1,
            carrying: false,
        }
    }

    /// Sets the battery capacity.
    #[must_use]
    pub const fn with_capacity(mut self, capacity: u32) -> Self {
        self.energy_capacity = capacity;
        self
    }

    /// Sets the energy spent per move.
    #[must_use]
    pub const fn with_move_cost(mut self, move_cost: u32) -> Self {
        self.move_cost = move_cost;
        self
    }

    /// Marks the agent as busy.
    #[must_use]
    pub const fn carrying(mut self, carrying: bool) -> Self {
        self.carrying = carrying;
        self
    }

    /// Energy as a fraction of capacity.
    #[must_use]
    pub fn energy_fraction(&self) -> f64 {
        if self.energy_capacity == 0 {
            return 0.0;
        }
        f64::from(self.energy) / f64::from(self.energy_capacity)
    }
}

/// Per-agent auction record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyRecord {
    /// Moving-average efficiency.
    pub efficiency: f64,
    /// Completed deliveries.
    pub deliveries: u32,
}

impl Default for EfficiencyRecord {
    fn default() -> Self {
        Self {
            efficiency: 1.0,
            deliveries: 0,
        }
    }
}

/// Relay-tier collector bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayCapacity {
    /// Relay-tier agents that have not retired.
    pub active_collectors: usize,
    /// Active collectors currently carrying a payload.
    pub busy_collectors: usize,
    /// Payloads routed to relays and not yet collected.
    pub committed_payloads: usize,
}

impl RelayCapacity {
    /// Collectors free to pick up a parked payload.
    #[must_use]
    pub const fn idle_collectors(&self) -> usize {
        self.active_collectors.saturating_sub(self.busy_collectors)
    }

    /// True when one more payload may be routed through a relay.
    #[must_use]
    pub const fn can_commit(&self) -> bool {
        self.committed_payloads < self.idle_collectors()
    }
}

/// Per-agent statistics line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStats {
    /// Agent name.
    pub name: AgentName,
    /// Role, once negotiated.
    pub role: Option<Role>,
    /// Current efficiency.
    pub efficiency: f64,
    /// Completed deliveries.
    pub deliveries: u32,
    /// True after a relay-tier agent finished its delivery.
    pub retired: bool,
}

/// Coordinator-wide statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorStats {
    /// Deliveries reported through efficiency updates.
    pub completed_tasks: u64,
    /// Tasks still waiting in queues.
    pub pending_tasks: usize,
    /// Tasks claimed so far.
    pub assigned_tasks: usize,
    /// Mean delivery duration in seconds.
    pub average_delivery_secs: f64,
    /// Mean energy spent per delivery.
    pub average_energy_used: f64,
    /// Per-agent lines in name order.
    pub agents: Vec<AgentStats>,
    /// Collector bookkeeping.
    pub relay: RelayCapacity,
}
