//! The task coordinator: queues, auction and efficiency feedback.
//!
//! One instance is created by the driver and shared by every agent through an
//! `Arc`. All state sits behind a single lock so that assigning a task and
//! removing it from its queue happen as one step.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use relay_core::{
    AgentName, AllocationConfig, Coord, Package, PackageId, Role, RoutingConfig, ZoneId,
};

use crate::error::{CoordinatorError, Result};
use crate::routing::{RouteDecision, RoutingInput, decide_route};
use crate::types::{
    AgentSnapshot, AgentStats, CoordinatorStats, EfficiencyRecord, GoalTable, RelayCapacity, Task,
    TaskId,
};
use crate::utility::{penalize_for_difficulty, priority_for, smoothed_efficiency, utility};

#[derive(Debug)]
struct ZoneQueue {
    zone: ZoneId,
    tasks: Vec<Task>,
}

#[derive(Debug, Default)]
struct CoordinatorState {
    queues: Vec<ZoneQueue>,
    assigned: HashMap<TaskId, Task>,
    records: BTreeMap<AgentName, EfficiencyRecord>,
    roles: HashMap<AgentName, Role>,
    retired: HashSet<AgentName>,
    busy_collectors: HashSet<AgentName>,
    committed_payloads: usize,
    completed_tasks: u64,
    total_delivery_time: Duration,
    total_energy_used: u64,
}

impl CoordinatorState {
    fn queue_mut(&mut self, zone: &ZoneId) -> &mut ZoneQueue {
        let index = match self.queues.iter().position(|q| &q.zone == zone) {
            Some(index) => index,
            None => {
                self.queues.push(ZoneQueue {
                    zone: zone.clone(),
                    tasks: Vec::new(),
                });
                self.queues.len() - 1
            }
        };
        &mut self.queues[index]
    }

    fn has_task_for(&self, package: PackageId) -> bool {
        self.queues
            .iter()
            .flat_map(|q| q.tasks.iter())
            .chain(self.assigned.values())
            .any(|t| t.package == package)
    }

    fn relay_capacity(&self) -> RelayCapacity {
        let active_collectors = self
            .roles
            .iter()
            .filter(|(name, role)| role.is_relay_tier() && !self.retired.contains(*name))
            .count();
        RelayCapacity {
            active_collectors,
            busy_collectors: self.busy_collectors.len(),
            committed_payloads: self.committed_payloads,
        }
    }

    /// Marks the task at `(queue, index)` as claimed by `agent`.
    fn assign(&mut self, queue: usize, index: usize, agent: &AgentSnapshot, config: &AllocationConfig) -> Task {
        let mut task = self.queues[queue].tasks.remove(index);
        task.assigned_agent = Some(agent.name.clone());

        let distance = agent.position.manhattan(task.source);
        let record = self.records.entry(agent.name.clone()).or_default();
        record.efficiency = penalize_for_difficulty(record.efficiency, distance, config);

        self.assigned.insert(task.id.clone(), task.clone());
        task
    }
}

/// Market-based allocator shared by the whole fleet.
#[derive(Debug)]
pub struct TaskCoordinator {
    allocation: AllocationConfig,
    routing: RoutingConfig,
    state: RwLock<CoordinatorState>,
}

impl TaskCoordinator {
    /// Creates a coordinator.
    #[must_use]
    pub fn new(allocation: AllocationConfig, routing: RoutingConfig) -> Self {
        Self {
            allocation,
            routing,
            state: RwLock::new(CoordinatorState::default()),
        }
    }

    /// Creates a coordinator with default weights and thresholds.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(AllocationConfig::default(), RoutingConfig::default())
    }

    /// Auction parameters.
    #[must_use]
    pub fn allocation_config(&self) -> &AllocationConfig {
        &self.allocation
    }

    /// Routing thresholds.
    #[must_use]
    pub fn routing_config(&self) -> &RoutingConfig {
        &self.routing
    }

    /// Adds an empty queue for `zone`. Queue order follows registration order.
    pub fn register_zone(&self, zone: &ZoneId) {
        self.state.write().queue_mut(zone);
    }

    /// Registers an agent with full efficiency and no deliveries.
    ///
    /// Registering twice keeps the existing record.
    pub fn register_agent(&self, agent: &AgentName) {
        let mut state = self.state.write();
        state.records.entry(agent.clone()).or_default();
        debug!(agent = %agent, "agent registered");
    }

    /// Records the negotiated role of an agent.
    pub fn assign_role(&self, agent: &AgentName, role: Role) {
        let mut state = self.state.write();
        state.records.entry(agent.clone()).or_default();
        state.roles.insert(agent.clone(), role);
        debug!(agent = %agent, role = %role, "role recorded");
    }

    /// Number of registered agents.
    #[must_use]
    pub fn registered_agents(&self) -> usize {
        self.state.read().records.len()
    }

    /// Creates and queues the task for a package waiting at `source`.
    pub fn try_create_task(&self, package: &Package, source: Coord, goals: &GoalTable) -> Result<Task> {
        let goal = goals
            .goal_of(package)
            .ok_or(CoordinatorError::UnknownDestination {
                destination: package.destination().value(),
            })?;

        let mut state = self.state.write();
        if state.has_task_for(package.id()) {
            return Err(CoordinatorError::DuplicateTask {
                package: package.id().value(),
            });
        }

        let task = Task {
            id: TaskId::for_package(package.id()),
            package: package.id(),
            destination: package.destination(),
            source_zone: package.source_zone().clone(),
            source,
            goal,
            priority: priority_for(package.id(), package.destination(), &self.allocation),
            assigned_agent: None,
            created_at: Utc::now(),
        };
        state.queue_mut(package.source_zone()).tasks.push(task.clone());

        debug!(
            task_id = %task.id,
            zone = %task.source_zone,
            priority = task.priority,
            "task created"
        );
        Ok(task)
    }

    /// Creates and queues a task, logging instead of failing.
    pub fn create_task(&self, package: &Package, source: Coord, goals: &GoalTable) -> Option<Task> {
        match self.try_create_task(package, source, goals) {
            Ok(task) => Some(task),
            Err(e) => {
                warn!(package = %package.id(), error = %e, "task not created");
                None
            }
        }
    }

    /// Runs the auction for one agent and claims the winning task.
    ///
    /// Returns `None` when the agent is busy, too low on energy, or nothing
    /// is queued.
    pub fn find_best_task_for_agent(&self, agent: &AgentSnapshot) -> Option<Task> {
        if agent.carrying || agent.energy < self.allocation.min_operating_energy {
            return None;
        }

        let mut state = self.state.write();
        let record = state.records.get(&agent.name).copied().unwrap_or_default();

        let mut ranked: Vec<(usize, u32)> = state
            .queues
            .iter()
            .enumerate()
            .filter_map(|(i, q)| q.tasks.first().map(|t| (i, agent.position.manhattan(t.source))))
            .collect();
        ranked.sort_by_key(|&(_, distance)| distance);

        let mut best: Option<(usize, usize)> = None;
        let mut best_utility = -1.0;
        for &(queue, _) in ranked.iter().take(self.allocation.zones_considered) {
            let tasks = &state.queues[queue].tasks;
            let mut order: Vec<usize> = (0..tasks.len()).collect();
            order.sort_by(|&a, &b| tasks[b].priority.cmp(&tasks[a].priority));

            for index in order {
                let task = &tasks[index];
                if task.is_assigned() {
                    continue;
                }
                let score = utility(agent, task, record, &self.allocation);
                if score > best_utility {
                    best_utility = score;
                    best = Some((queue, index));
                }
            }
        }

        let (queue, index) = best?;
        let task = state.assign(queue, index, agent, &self.allocation);
        info!(
            agent = %agent.name,
            task_id = %task.id,
            zone = %task.source_zone,
            utility = best_utility,
            "task allocated"
        );
        Some(task)
    }

    /// Claims the queued task of a specific package.
    ///
    /// Used when an agent already stands next to the payload.
    pub fn claim_task_for_package(&self, agent: &AgentSnapshot, package: PackageId) -> Option<Task> {
        if agent.carrying {
            return None;
        }
        let mut state = self.state.write();
        let (queue, index) = state.queues.iter().enumerate().find_map(|(qi, q)| {
            q.tasks
                .iter()
                .position(|t| t.package == package && !t.is_assigned())
                .map(|ti| (qi, ti))
        })?;
        let task = state.assign(queue, index, agent, &self.allocation);
        info!(agent = %agent.name, task_id = %task.id, "task claimed at zone");
        Some(task)
    }

    /// Feeds a finished delivery back into the agent's efficiency.
    pub fn update_agent_efficiency(&self, agent: &AgentName, duration: Duration, energy_used: u32) {
        let mut state = self.state.write();
        let record = state.records.entry(agent.clone()).or_default();
        record.efficiency = smoothed_efficiency(record.efficiency, duration, energy_used, &self.allocation);
        record.deliveries += 1;
        let efficiency = record.efficiency;
        let deliveries = record.deliveries;

        state.completed_tasks += 1;
        state.total_delivery_time += duration;
        state.total_energy_used += u64::from(energy_used);

        info!(
            agent = %agent,
            efficiency,
            deliveries,
            duration_ms = duration.as_millis() as u64,
            energy_used,
            "efficiency updated"
        );
    }

    /// Current efficiency record of an agent.
    #[must_use]
    pub fn record(&self, agent: &AgentName) -> Option<EfficiencyRecord> {
        self.state.read().records.get(agent).copied()
    }

    /// Hub-routing decision for an agent holding a payload for `goal`.
    #[must_use]
    pub fn route_decision(&self, agent: &AgentSnapshot, goal: Coord, relay: Coord) -> RouteDecision {
        let (registered_agents, completed_tasks) = {
            let state = self.state.read();
            (state.records.len(), state.completed_tasks)
        };
        let input = RoutingInput {
            agent: agent.position,
            energy: agent.energy,
            move_cost: agent.move_cost,
            goal,
            relay,
            registered_agents,
            completed_tasks,
        };
        decide_route(&input, &self.routing)
    }

    /// True when the payload should go through the relay at `relay`.
    #[must_use]
    pub fn should_use_relay(&self, agent: &AgentSnapshot, goal: Coord, relay: Coord) -> bool {
        self.route_decision(agent, goal, relay).via_relay
    }

    /// Current collector bookkeeping.
    #[must_use]
    pub fn relay_capacity(&self) -> RelayCapacity {
        self.state.read().relay_capacity()
    }

    /// Commits one payload to the relay tier if an idle collector can take it.
    pub fn reserve_relay_slot(&self) -> bool {
        let mut state = self.state.write();
        if !state.relay_capacity().can_commit() {
            return false;
        }
        state.committed_payloads += 1;
        true
    }

    /// Withdraws a commitment that will not be deposited after all.
    pub fn release_relay_slot(&self) {
        let mut state = self.state.write();
        state.committed_payloads = state.committed_payloads.saturating_sub(1);
    }

    /// A relay-tier agent picked up a parked payload.
    pub fn collect_from_relay(&self, agent: &AgentName) {
        let mut state = self.state.write();
        state.committed_payloads = state.committed_payloads.saturating_sub(1);
        state.busy_collectors.insert(agent.clone());
    }

    /// A collector dropped its payload and is idle again.
    pub fn release_collector(&self, agent: &AgentName) {
        if self.state.write().busy_collectors.remove(agent) {
            debug!(agent = %agent, "collector released");
        }
    }

    /// A relay-tier agent finished its delivery and left the fleet.
    pub fn retire_agent(&self, agent: &AgentName) {
        let mut state = self.state.write();
        state.busy_collectors.remove(agent);
        state.retired.insert(agent.clone());
        info!(agent = %agent, "agent retired");
    }

    /// Tasks still waiting in queues.
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.state.read().queues.iter().map(|q| q.tasks.len()).sum()
    }

    /// Every claimed task.
    #[must_use]
    pub fn assigned_tasks(&self) -> Vec<Task> {
        self.state.read().assigned.values().cloned().collect()
    }

    /// Snapshot of counters and per-agent records.
    #[must_use]
    pub fn statistics(&self) -> CoordinatorStats {
        let state = self.state.read();
        let completed = state.completed_tasks;
        let (average_delivery_secs, average_energy_used) = if completed == 0 {
            (0.0, 0.0)
        } else {
            (
                state.total_delivery_time.as_secs_f64() / completed as f64,
                state.total_energy_used as f64 / completed as f64,
            )
        };
        let agents = state
            .records
            .iter()
            .map(|(name, record)| AgentStats {
                name: name.clone(),
                role: state.roles.get(name).copied(),
                efficiency: record.efficiency,
                deliveries: record.deliveries,
                retired: state.retired.contains(name),
            })
            .collect();

        CoordinatorStats {
            completed_tasks: completed,
            pending_tasks: state.queues.iter().map(|q| q.tasks.len()).sum(),
            assigned_tasks: state.assigned.len(),
            average_delivery_secs,
            average_energy_used,
            agents,
            relay: state.relay_capacity(),
        }
    }
}

impl Default for TaskCoordinator {
    fn default() -> Self {
        Self::with_defaults()
    }
}
