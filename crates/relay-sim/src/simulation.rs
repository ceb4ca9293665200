//! Tick driver.
//!
//! A [`Simulation`] builds the grid and the shared services from a
//! [`FleetConfig`], places agents and packages from a seeded RNG, then runs
//! two phases: negotiation until every agent holds a role, and work until
//! every package is accounted for or the tick budget runs out. Agents step
//! in placement order and commit their moves immediately, so later agents
//! in the same tick see them.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, warn};

use relay_agent::{AgentServices, AgentSettings, BehaviorState, TransportAgent};
use relay_coordinator::{CoordinatorStats, GoalTable, TaskCoordinator};
use relay_core::{
    AgentName, Clock, Coord, DeliveryLedger, FleetConfig, GridWorld, ManualClock, MessageBus,
    Package, PackageId, Role, SystemClock, World, ZoneKind,
};
use relay_energy::StationRegistry;

use crate::error::{Result, SimError};

/// How the driver paces ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClockMode {
    /// A manual clock advanced one wait unit per tick. Deterministic.
    #[default]
    Stepped,
    /// The system clock, sleeping one wait unit between ticks.
    Realtime,
}

/// One run of the fleet.
pub struct Simulation {
    config: FleetConfig,
    mode: ClockMode,
    manual: Option<Arc<ManualClock>>,
    world: GridWorld,
    services: AgentServices,
    agents: Vec<TransportAgent>,
    rng: StdRng,
    next_package: u32,
    produced: usize,
    negotiation_ticks: u64,
    ticks: u64,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("mode", &self.mode)
            .field("agents", &self.agents.len())
            .field("produced", &self.produced)
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}

impl Simulation {
    /// Validates `config`, builds the world and places agents and the
    /// initial packages.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the grid cannot
    /// hold the requested agents.
    pub fn new(config: FleetConfig, mode: ClockMode) -> Result<Self> {
        config.validate()?;
        let mut world = GridWorld::from_layout(&config.layout)?;

        let manual = (mode == ClockMode::Stepped).then(|| Arc::new(ManualClock::new()));
        let clock: Arc<dyn Clock> = match &manual {
            Some(manual) => manual.clone(),
            None => Arc::new(SystemClock),
        };
        let coordinator = Arc::new(TaskCoordinator::new(
            config.allocation.clone(),
            config.routing.clone(),
        ));
        for zone in &config.layout.source_zones {
            coordinator.register_zone(&zone.id);
        }
        let services = AgentServices {
            coordinator,
            bus: Arc::new(MessageBus::new()),
            stations: Arc::new(StationRegistry::from_layout(&config.layout)),
            ledger: Arc::new(DeliveryLedger::new()),
            clock,
            goals: Arc::new(GoalTable::from_layout(&config.layout)),
        };

        let mut rng = StdRng::seed_from_u64(config.simulation.seed);
        let wanted = config.simulation.agents;
        let mut cells = world.free_cells();
        if cells.len() < wanted {
            return Err(SimError::Placement {
                needed: wanted,
                available: cells.len(),
            });
        }
        cells.shuffle(&mut rng);

        let settings = AgentSettings::from_config(&config);
        let mut agents = Vec::with_capacity(wanted);
        for (index, &at) in cells.iter().take(wanted).enumerate() {
            let name = AgentName::indexed(&config.negotiation.name_prefix, index);
            world.place_agent(name.clone(), at)?;
            agents.push(TransportAgent::spawn(
                name,
                at,
                settings.clone(),
                services.clone(),
            ));
        }

        let mut simulation = Self {
            config,
            mode,
            manual,
            world,
            services,
            agents,
            rng,
            next_package: 1,
            produced: 0,
            negotiation_ticks: 0,
            ticks: 0,
        };
        let initial = simulation
            .config
            .simulation
            .initial_packages
            .min(simulation.config.simulation.packages);
        simulation.produce(initial);
        info!(
            agents = simulation.agents.len(),
            packages = simulation.produced,
            seed = simulation.config.simulation.seed,
            "simulation ready"
        );
        Ok(simulation)
    }

    /// Runs both phases and reports the outcome.
    pub fn run(&mut self) -> SimulationReport {
        self.negotiate();
        while !self.is_finished() && self.ticks < self.config.simulation.max_ticks {
            self.tick();
        }
        let report = self.report();
        if report.completed {
            info!(ticks = report.ticks, delivered = report.delivered, "all packages handled");
        } else {
            warn!(
                ticks = report.ticks,
                delivered = report.delivered,
                packages = report.packages,
                "tick budget exhausted"
            );
        }
        report
    }

    /// Steps agents until every one of them holds a role or the negotiation
    /// budget runs out. Returns true when negotiation finished.
    pub fn negotiate(&mut self) -> bool {
        while self.negotiation_ticks < self.config.simulation.max_negotiation_ticks {
            if self.is_negotiated() {
                break;
            }
            self.negotiation_ticks += 1;
            self.step_agents();
            self.pace();
        }
        let done = self.is_negotiated();
        if done {
            info!(ticks = self.negotiation_ticks, "role negotiation finished");
        } else {
            warn!(ticks = self.negotiation_ticks, "role negotiation incomplete");
        }
        done
    }

    /// Runs one work tick: package generation, then every agent once.
    pub fn tick(&mut self) {
        self.ticks += 1;
        let interval = self.config.simulation.spawn_interval;
        if interval > 0 && self.ticks % interval == 0 {
            let batch = self.next_batch();
            self.produce(batch);
        }
        self.step_agents();
        self.pace();
    }

    /// True once every package has been produced and then delivered or lost.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.produced >= self.config.simulation.packages
            && self.delivered() + self.abandoned() >= self.config.simulation.packages
    }

    /// Packages delivered so far.
    #[must_use]
    pub fn delivered(&self) -> usize {
        self.services.ledger.count()
    }

    /// Packages dropped by agents for lack of energy.
    #[must_use]
    pub fn abandoned(&self) -> usize {
        self.agents.iter().map(|a| a.abandoned() as usize).sum()
    }

    /// Agents in placement order.
    #[must_use]
    pub fn agents(&self) -> &[TransportAgent] {
        &self.agents
    }

    /// The grid.
    #[must_use]
    pub const fn world(&self) -> &GridWorld {
        &self.world
    }

    /// Shared services.
    #[must_use]
    pub const fn services(&self) -> &AgentServices {
        &self.services
    }

    /// Packages produced so far.
    #[must_use]
    pub const fn produced(&self) -> usize {
        self.produced
    }

    /// Work ticks run so far.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    fn is_negotiated(&self) -> bool {
        self.agents
            .iter()
            .all(|a| a.state() != BehaviorState::Negotiating)
    }

    fn step_agents(&mut self) {
        for agent in &mut self.agents {
            agent.step(&mut self.world);
        }
    }

    fn pace(&self) {
        let unit = Duration::from_millis(self.config.negotiation.wait_unit_ms);
        match (&self.manual, self.mode) {
            (Some(clock), _) => clock.advance(unit),
            (None, ClockMode::Realtime) => thread::sleep(unit),
            (None, ClockMode::Stepped) => {}
        }
    }

    /// Size of the next generated batch: up to half of what remains, or the
    /// last two.
    fn next_batch(&mut self) -> usize {
        let remaining = self
            .config
            .simulation
            .packages
            .saturating_sub(self.produced);
        match remaining {
            0 => 0,
            1 | 2 => remaining,
            _ => self.rng.gen_range(0..=remaining / 2),
        }
    }

    fn produce(&mut self, count: usize) {
        let sources: Vec<_> = self
            .world
            .zones_of_kind(ZoneKind::Source)
            .iter()
            .map(|z| (z.id().clone(), z.position()))
            .collect();
        let goals: Vec<_> = self.config.layout.goals.iter().map(|g| g.id).collect();
        if sources.is_empty() || goals.is_empty() {
            return;
        }

        for _ in 0..count {
            let (zone, at) = sources[self.rng.gen_range(0..sources.len())].clone();
            let destination = goals[self.rng.gen_range(0..goals.len())];
            let package = Package::new(PackageId::new(self.next_package), destination, zone.clone());
            self.next_package += 1;

            if let Err(e) = self.world.add_package(&zone, package.clone()) {
                warn!(zone = %zone, error = %e, "package rejected");
                continue;
            }
            self.services
                .coordinator
                .create_task(&package, at, &self.services.goals);
            self.produced += 1;
            debug!(package = %package.id(), zone = %zone, destination = %destination, "package created");
        }
    }

    /// Snapshot of the run so far.
    #[must_use]
    pub fn report(&self) -> SimulationReport {
        SimulationReport {
            seed: self.config.simulation.seed,
            packages: self.config.simulation.packages,
            produced: self.produced,
            delivered: self.delivered(),
            abandoned: self.abandoned(),
            negotiation_ticks: self.negotiation_ticks,
            ticks: self.ticks,
            completed: self.is_finished(),
            agents: self.agents.iter().map(AgentReport::from_agent).collect(),
            coordinator: self.services.coordinator.statistics(),
        }
    }
}

/// Per-agent line of a [`SimulationReport`].
#[derive(Debug, Clone, Serialize)]
pub struct AgentReport {
    /// Agent name.
    pub name: AgentName,
    /// Negotiated role.
    pub role: Option<Role>,
    /// Final state.
    pub state: BehaviorState,
    /// Final cell.
    pub position: Coord,
    /// Final battery level.
    pub energy: u32,
    /// Deliveries completed.
    pub deliveries: u32,
    /// Payloads dropped.
    pub abandoned: u32,
}

impl AgentReport {
    fn from_agent(agent: &TransportAgent) -> Self {
        Self {
            name: agent.name().clone(),
            role: agent.role(),
            state: agent.state(),
            position: agent.position(),
            energy: agent.energy().level(),
            deliveries: agent.deliveries(),
            abandoned: agent.abandoned(),
        }
    }
}

/// Outcome of a run.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    /// Seed used for placement and packages.
    pub seed: u64,
    /// Packages the run was asked to produce.
    pub packages: usize,
    /// Packages actually produced.
    pub produced: usize,
    /// Packages delivered.
    pub delivered: usize,
    /// Packages lost to abandonment.
    pub abandoned: usize,
    /// Ticks spent negotiating roles.
    pub negotiation_ticks: u64,
    /// Work ticks.
    pub ticks: u64,
    /// True when every package was delivered or lost before the budget ran out.
    pub completed: bool,
    /// Per-agent outcome.
    pub agents: Vec<AgentReport>,
    /// Coordinator statistics.
    pub coordinator: CoordinatorStats,
}

impl SimulationReport {
    /// Number of agents that negotiated `role`.
    #[must_use]
    pub fn role_count(&self, role: Role) -> usize {
        self.agents.iter().filter(|a| a.role == Some(role)).count()
    }
}
