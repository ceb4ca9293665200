//! The transport agent and its per-tick step.
//!
//! Every tick runs the same dispatch, highest priority first:
//!
//! 1. drain the mailbox
//! 2. `Negotiating`: advance the negotiation and nothing else
//! 3. `Charging`: charge, release the station once full
//! 4. `GoingToCharge`: walk to a reserved station
//! 5. critical energy: drop any payload and go charge
//! 6. role logic, split by tier

use std::time::Instant;

use tracing::{debug, info, warn};

use relay_coordinator::{AgentSnapshot, Task};
use relay_core::{
    AgentName, Coord, DestinationId, Envelope, Message, Package, PackageState, Role, World,
    ZoneKind,
};
use relay_energy::{EnergyEvent, EnergyModel};
use relay_negotiation::{NegotiationPhase, Negotiator};

use crate::movement::{self, Retreat};
use crate::services::{AgentServices, AgentSettings};
use crate::state::{BehaviorState, Cargo, TransportLeg};

mod relay_tier;
mod source_tier;

#[cfg(test)]
mod tests;

/// One member of the fleet.
#[derive(Debug)]
pub struct TransportAgent {
    name: AgentName,
    position: Coord,
    state: BehaviorState,
    role: Option<Role>,
    energy: EnergyModel,
    negotiator: Negotiator,
    claimed: Option<Task>,
    cargo: Option<Cargo>,
    help_requested: bool,
    deliveries: u32,
    abandoned: u32,
    settings: AgentSettings,
    services: AgentServices,
}

impl TransportAgent {
    /// Creates an agent standing at `position` with a full battery.
    ///
    /// The agent joins the bus, announces itself and registers with the
    /// coordinator before returning.
    pub fn spawn(
        name: AgentName,
        position: Coord,
        settings: AgentSettings,
        services: AgentServices,
    ) -> Self {
        let negotiator = Negotiator::start(
            name.clone(),
            &settings.negotiation,
            &services.bus,
            services.clock.as_ref(),
        );
        services.coordinator.register_agent(&name);
        debug!(agent = %name, x = position.x, y = position.y, "agent spawned");
        Self {
            energy: EnergyModel::new(settings.energy),
            name,
            position,
            state: BehaviorState::Negotiating,
            role: None,
            negotiator,
            claimed: None,
            cargo: None,
            help_requested: false,
            deliveries: 0,
            abandoned: 0,
            settings,
            services,
        }
    }

    /// Replaces the battery level.
    #[must_use]
    pub fn with_energy(mut self, level: u32) -> Self {
        self.energy = EnergyModel::with_level(self.settings.energy, level);
        self
    }

    /// Agent name.
    #[must_use]
    pub fn name(&self) -> &AgentName {
        &self.name
    }

    /// Current cell.
    #[must_use]
    pub const fn position(&self) -> Coord {
        self.position
    }

    /// Current behavior state.
    #[must_use]
    pub const fn state(&self) -> BehaviorState {
        self.state
    }

    /// Negotiated role, `None` while negotiating.
    #[must_use]
    pub const fn role(&self) -> Option<Role> {
        self.role
    }

    /// Battery.
    #[must_use]
    pub const fn energy(&self) -> &EnergyModel {
        &self.energy
    }

    /// Negotiation state, including retained notifications.
    #[must_use]
    pub const fn negotiator(&self) -> &Negotiator {
        &self.negotiator
    }

    /// Task claimed but not yet picked up.
    #[must_use]
    pub const fn claimed_task(&self) -> Option<&Task> {
        self.claimed.as_ref()
    }

    /// Payload in hand.
    #[must_use]
    pub const fn cargo(&self) -> Option<&Cargo> {
        self.cargo.as_ref()
    }

    /// True while the agent holds a payload or a claim.
    #[must_use]
    pub const fn is_carrying(&self) -> bool {
        self.cargo.is_some() || self.claimed.is_some()
    }

    /// True while waiting for a charging station to free up.
    #[must_use]
    pub const fn is_waiting_for_station(&self) -> bool {
        self.help_requested
    }

    /// Deliveries completed by this agent.
    #[must_use]
    pub const fn deliveries(&self) -> u32 {
        self.deliveries
    }

    /// Payloads dropped for lack of energy.
    #[must_use]
    pub const fn abandoned(&self) -> u32 {
        self.abandoned
    }

    /// Auction view of this agent.
    #[must_use]
    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot::new(self.name.clone(), self.position, self.energy.level())
            .with_capacity(self.energy.capacity())
            .with_move_cost(self.energy.move_cost())
            .carrying(self.is_carrying())
    }

    /// Runs one tick and returns the resulting state.
    pub fn step(&mut self, world: &mut dyn World) -> BehaviorState {
        if self.state.is_terminal() {
            return self.state;
        }
        self.drain_mailbox();

        match self.state {
            BehaviorState::Negotiating => self.negotiate(),
            BehaviorState::Charging => self.charge(),
            BehaviorState::GoingToCharge => self.go_to_charge(world),
            _ if self.energy.needs_charging() => self.abandon_and_recharge(),
            _ => match self.role {
                Some(Role::SourceToRelay) => self.step_source_tier(world),
                Some(Role::RelayToGoal) => self.step_relay_tier(world),
                None => {}
            },
        }
        self.state
    }

    fn drain_mailbox(&mut self) {
        for envelope in self.services.bus.drain(&self.name) {
            match envelope.message {
                Message::HelpRequest { agent, at } => self.answer_help(&agent, at),
                Message::HelpOffer { agent, .. } => {
                    debug!(agent = %self.name, from = %agent, "help offered");
                    self.help_requested = false;
                }
                Message::LowEnergy { agent, level, .. } => {
                    debug!(agent = %self.name, from = %agent, level, "peer low on energy");
                }
                message => {
                    self.negotiator.absorb(Envelope {
                        from: envelope.from,
                        message,
                    });
                }
            }
        }
    }

    fn answer_help(&self, requester: &AgentName, at: Coord) {
        if self.state != BehaviorState::Free || self.energy.needs_charging() {
            return;
        }
        let offer = Message::HelpOffer {
            agent: self.name.clone(),
            at: self.position,
        };
        if self.services.bus.send(&self.name, requester, offer) {
            debug!(
                agent = %self.name,
                to = %requester,
                x = at.x,
                y = at.y,
                "help offer sent"
            );
        }
    }

    fn negotiate(&mut self) {
        let phase = self
            .negotiator
            .step(&self.services.bus, self.services.clock.as_ref());
        if phase != NegotiationPhase::Complete {
            return;
        }
        let role = self.negotiator.claim(&self.services.bus);
        self.role = Some(role);
        self.services.coordinator.assign_role(&self.name, role);
        self.state = BehaviorState::Free;
        info!(agent = %self.name, role = %role, "agent ready");
    }

    fn charge(&mut self) {
        if self.services.stations.reservation_of(&self.name).is_none() {
            self.head_to_charger("station reservation lost");
            return;
        }
        if let Some(EnergyEvent::FullyCharged) = self.energy.charge() {
            debug!(agent = %self.name, "fully charged");
        }
        if self.energy.is_full() {
            if let Err(e) = self.services.stations.release(&self.name) {
                warn!(agent = %self.name, error = %e, "station release failed");
            }
            self.state = BehaviorState::Free;
            info!(agent = %self.name, level = self.energy.level(), "charging complete");
        }
    }

    fn go_to_charge(&mut self, world: &mut dyn World) {
        let Some(station) = self
            .services
            .stations
            .reserve_nearest(&self.name, self.position)
        else {
            if !self.help_requested {
                self.help_requested = true;
                self.services.bus.broadcast(
                    &self.name,
                    &Message::HelpRequest {
                        agent: self.name.clone(),
                        at: self.position,
                    },
                );
                warn!(agent = %self.name, level = self.energy.level(), "no free charging station");
            }
            return;
        };
        self.help_requested = false;

        if self.position.is_adjacent(station.position) {
            self.state = BehaviorState::Charging;
            info!(agent = %self.name, station = %station.id, "charging started");
            return;
        }
        self.move_toward(world, station.position);
    }

    fn abandon_and_recharge(&mut self) {
        if let Some(cargo) = self.cargo.take() {
            let coordinator = &self.services.coordinator;
            if cargo.leg.is_relay() {
                coordinator.release_relay_slot();
            }
            coordinator.release_collector(&self.name);
            self.abandoned += 1;
            warn!(
                agent = %self.name,
                package = %cargo.package.id(),
                level = self.energy.level(),
                "payload abandoned"
            );
        }
        self.head_to_charger("critical energy");
    }

    fn head_to_charger(&mut self, reason: &str) {
        self.state = BehaviorState::GoingToCharge;
        info!(agent = %self.name, level = self.energy.level(), reason, "heading to charger");
    }

    /// Takes one greedy step toward `target`. Returns false when no move
    /// was possible.
    fn move_toward(&mut self, world: &mut dyn World, target: Coord) -> bool {
        let Some(to) = movement::next_step(&*world, self.position, target) else {
            return false;
        };
        if let Err(e) = world.move_agent(&self.name, self.position, to) {
            warn!(agent = %self.name, error = %e, "move rejected");
            return false;
        }
        self.position = to;
        if let Some(EnergyEvent::BecameLow { level }) = self.energy.consume_move() {
            self.services.bus.broadcast(
                &self.name,
                &Message::LowEnergy {
                    agent: self.name.clone(),
                    at: self.position,
                    level,
                },
            );
            warn!(agent = %self.name, level, "energy low");
        }
        true
    }

    fn retreat(&mut self, world: &mut dyn World, retreat: &Retreat<'_>) -> bool {
        match retreat.target(&*world, self.position) {
            Some(target) => {
                self.move_toward(world, target);
                false
            }
            None => true,
        }
    }

    fn relay_positions(world: &dyn World) -> Vec<Coord> {
        world
            .zones_of_kind(ZoneKind::Relay)
            .iter()
            .map(|z| z.position())
            .collect()
    }

    /// Hands a payload over at its goal and reports the outcome.
    fn deliver(&mut self, mut cargo: Cargo) {
        cargo.package.set_state(PackageState::Arrived);
        let total = self.services.ledger.record(&self.name, &cargo.package);
        let duration = self
            .services
            .clock
            .now()
            .saturating_duration_since(cargo.picked_at);
        let spent = cargo.energy_spent(self.energy.level());
        self.services
            .coordinator
            .update_agent_efficiency(&self.name, duration, spent);
        self.deliveries += 1;
        info!(
            agent = %self.name,
            package = %cargo.package.id(),
            delivered = total,
            energy_used = spent,
            "package delivered"
        );
    }

    fn pick_up(&mut self, mut package: Package, leg: TransportLeg) {
        package.set_state(PackageState::InTransit);
        let level = self.energy.level();
        info!(
            agent = %self.name,
            package = %package.id(),
            via_relay = leg.is_relay(),
            "payload picked up"
        );
        self.cargo = Some(Cargo {
            package,
            leg,
            picked_at: self.now(),
            energy_at_pickup: level,
            route_energy: level,
        });
        self.state = BehaviorState::Transporting;
    }

    fn now(&self) -> Instant {
        self.services.clock.now()
    }

    fn goal_leg(&self, destination: DestinationId) -> Option<TransportLeg> {
        self.services
            .goals
            .get(destination)
            .map(|at| TransportLeg::ToGoal { destination, at })
    }
}
