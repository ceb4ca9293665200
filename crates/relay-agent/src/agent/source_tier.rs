//! Role 0: source zones to relay zones, or straight to the goal.

use tracing::{debug, info, warn};

use relay_coordinator::Task;
use relay_core::{
    Coord, DestinationId, Message, Package, PackageId, PackageState, World, Zone, ZoneId, ZoneKind,
};

use crate::movement::{self, Retreat};
use crate::state::{BehaviorState, TransportLeg};

use super::TransportAgent;

impl TransportAgent {
    pub(super) fn step_source_tier(&mut self, world: &mut dyn World) {
        match self.state {
            BehaviorState::Free => self.seek_work(world),
            BehaviorState::Transporting => self.carry(world),
            BehaviorState::MovingAway => self.clear_relays(world),
            _ => {}
        }
    }

    fn seek_work(&mut self, world: &mut dyn World) {
        if !self.energy.has_sufficient_energy_for_task() {
            self.head_to_charger("not enough energy for a task");
            return;
        }
        if self.claimed.is_none() {
            self.claimed = self
                .services
                .coordinator
                .find_best_task_for_agent(&self.snapshot());
        }
        if self.claimed.is_none() {
            self.claimed = self.claim_adjacent_payload(&*world);
        }
        match self.claimed.clone() {
            Some(task) => self.fetch(world, &task),
            None => self.wait_near_sources(world),
        }
    }

    fn claim_adjacent_payload(&self, world: &dyn World) -> Option<Task> {
        let snapshot = self.snapshot();
        for zone_id in movement::adjacent_zones(world, self.position, ZoneKind::Source) {
            let Some(zone) = world.zone(&zone_id) else {
                continue;
            };
            let waiting: Vec<PackageId> = zone.packages().map(Package::id).collect();
            for package in waiting {
                if let Some(task) = self
                    .services
                    .coordinator
                    .claim_task_for_package(&snapshot, package)
                {
                    return Some(task);
                }
            }
        }
        None
    }

    fn fetch(&mut self, world: &mut dyn World, task: &Task) {
        if !self.position.is_adjacent(task.source) {
            self.move_toward(world, task.source);
            return;
        }

        let package = world
            .zone_mut(&task.source_zone)
            .and_then(|zone| zone.remove_package(task.package));
        self.claimed = None;
        let Some(package) = package else {
            warn!(agent = %self.name, task_id = %task.id, "claimed package is gone");
            return;
        };
        let leg = self.plan_route(&*world, package.destination(), task.goal);
        self.pick_up(package, leg);
    }

    /// Picks the leg for a fresh or re-evaluated payload.
    ///
    /// A relay is used only when the heuristic prefers it and a collector
    /// slot could be reserved.
    fn plan_route(
        &self,
        world: &dyn World,
        destination: DestinationId,
        goal: Coord,
    ) -> TransportLeg {
        let direct = TransportLeg::ToGoal {
            destination,
            at: goal,
        };
        let Some(relay) = movement::nearest_open_relay(world, self.position, None) else {
            return direct;
        };
        let coordinator = &self.services.coordinator;
        let decision = coordinator.route_decision(&self.snapshot(), goal, relay.at);
        if !decision.via_relay {
            return direct;
        }
        if !coordinator.reserve_relay_slot() {
            debug!(agent = %self.name, relay = %relay.id, "no idle collector, going direct");
            return direct;
        }
        debug!(
            agent = %self.name,
            relay = %relay.id,
            reason = ?decision.reason,
            direct = decision.direct_distance,
            via_relay = decision.relay_distance,
            "routing through relay"
        );
        TransportLeg::ToRelay {
            zone: relay.id,
            at: relay.at,
        }
    }

    fn reconsider_route(&mut self, world: &dyn World) {
        let threshold = self.services.coordinator.routing_config().reroute_energy_drop;
        let level = self.energy.level();
        let Some(cargo) = self.cargo.as_ref() else {
            return;
        };
        if cargo.route_energy.saturating_sub(level) < threshold {
            return;
        }
        let destination = cargo.package.destination();
        let was_relay = cargo.leg.is_relay();
        let Some(goal) = self.services.goals.get(destination) else {
            return;
        };

        if was_relay {
            self.services.coordinator.release_relay_slot();
        }
        let leg = self.plan_route(world, destination, goal);
        debug!(agent = %self.name, level, via_relay = leg.is_relay(), "route re-evaluated");
        if let Some(cargo) = self.cargo.as_mut() {
            cargo.leg = leg;
            cargo.route_energy = level;
        }
    }

    fn carry(&mut self, world: &mut dyn World) {
        self.reconsider_route(&*world);
        let Some(leg) = self.cargo.as_ref().map(|c| c.leg.clone()) else {
            self.state = BehaviorState::Free;
            return;
        };
        match leg {
            TransportLeg::ToRelay { zone, at } => {
                if self.position.is_adjacent(at) {
                    self.deposit(world, &zone, at);
                } else {
                    self.move_toward(world, at);
                }
            }
            TransportLeg::ToGoal { at, .. } => {
                if self.position == at {
                    if let Some(cargo) = self.cargo.take() {
                        self.deliver(cargo);
                    }
                    self.state = BehaviorState::MovingAway;
                } else {
                    self.move_toward(world, at);
                }
            }
        }
    }

    fn deposit(&mut self, world: &mut dyn World, zone: &ZoneId, at: Coord) {
        if world.zone(zone).is_none_or(Zone::is_full) {
            match movement::nearest_open_relay(&*world, self.position, Some(zone)) {
                Some(other) => {
                    info!(agent = %self.name, full = %zone, relay = %other.id, "relay full, retargeting");
                    if let Some(cargo) = self.cargo.as_mut() {
                        cargo.leg = TransportLeg::ToRelay {
                            zone: other.id,
                            at: other.at,
                        };
                    }
                }
                None => debug!(agent = %self.name, "every relay is full, waiting"),
            }
            return;
        }

        let Some(mut cargo) = self.cargo.take() else {
            return;
        };
        cargo.package.set_state(PackageState::AtRelay);
        let added = world
            .zone_mut(zone)
            .map(|z| z.add_package(cargo.package.clone()));
        match added {
            Some(Ok(())) => {}
            Some(Err(e)) => {
                warn!(agent = %self.name, relay = %zone, error = %e, "deposit rejected");
                cargo.package.set_state(PackageState::InTransit);
                self.cargo = Some(cargo);
                return;
            }
            None => {
                warn!(agent = %self.name, relay = %zone, "relay zone vanished");
                cargo.package.set_state(PackageState::InTransit);
                self.cargo = Some(cargo);
                return;
            }
        }

        self.services.bus.broadcast(
            &self.name,
            &Message::PayloadAtRelay {
                package: cargo.package.id(),
                relay: zone.clone(),
                at,
                destination: cargo.package.destination(),
            },
        );
        info!(
            agent = %self.name,
            package = %cargo.package.id(),
            relay = %zone,
            "payload deposited"
        );
        self.state = BehaviorState::MovingAway;
    }

    fn clear_relays(&mut self, world: &mut dyn World) {
        let relays = Self::relay_positions(&*world);
        let sources: Vec<_> = world
            .zones_of_kind(ZoneKind::Source)
            .iter()
            .map(|z| z.position())
            .collect();
        let retreat = Retreat {
            avoid: &relays,
            clearance: self.settings.behavior.relay_clearance,
            radius: self.settings.behavior.relay_search_radius,
            attract: &sources,
        };
        if self.retreat(world, &retreat) {
            self.state = BehaviorState::Free;
            debug!(agent = %self.name, "clear of relays");
        }
    }

    fn wait_near_sources(&mut self, world: &mut dyn World) {
        let behavior = &self.settings.behavior;
        let target = movement::nearest_loaded_source(&*world, &self.name, self.position, behavior)
            .or_else(|| movement::idle_source(&*world, &self.name, self.position, behavior));
        let Some(target) = target else {
            return;
        };
        if !self.position.is_adjacent(target.at) {
            self.move_toward(world, target.at);
        }
    }
}
