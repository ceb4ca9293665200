//! Role 1: relay zones to goals, one delivery per agent.

use tracing::{debug, info, warn};

use relay_core::{Message, Package, World, Zone};

use crate::movement::{self, Retreat, ZoneTarget};
use crate::state::BehaviorState;

use super::TransportAgent;

impl TransportAgent {
    pub(super) fn step_relay_tier(&mut self, world: &mut dyn World) {
        match self.state {
            BehaviorState::Free => self.collect(world),
            BehaviorState::Transporting => self.finish_delivery(world),
            BehaviorState::MovingAway => self.state = BehaviorState::Free,
            _ => {}
        }
    }

    fn collect(&mut self, world: &mut dyn World) {
        if !self.energy.has_sufficient_energy_for_task() {
            self.head_to_charger("not enough energy for a task");
            return;
        }
        let target = self
            .notified_relay(&*world)
            .or_else(|| movement::nearest_loaded_relay(&*world, self.position));
        match target {
            Some(relay) if self.position.is_adjacent(relay.at) => self.take_from_relay(world, &relay),
            Some(relay) => {
                self.move_toward(world, relay.at);
            }
            None => self.idle_clear_of_relays(world),
        }
    }

    /// Oldest retained notice whose payload still sits in its relay.
    fn notified_relay(&mut self, world: &dyn World) -> Option<ZoneTarget> {
        self.negotiator.prune_retained(|envelope| match &envelope.message {
            Message::PayloadAtRelay { package, relay, .. } => world
                .zone(relay)
                .is_some_and(|z| z.packages().any(|p| p.id() == *package)),
            _ => true,
        });
        self.negotiator
            .retained()
            .iter()
            .find_map(|envelope| match &envelope.message {
                Message::PayloadAtRelay { relay, at, .. } => Some(ZoneTarget {
                    id: relay.clone(),
                    at: *at,
                }),
                _ => None,
            })
    }

    fn take_from_relay(&mut self, world: &mut dyn World, relay: &ZoneTarget) {
        let Some(destination) = world
            .zone(&relay.id)
            .and_then(Zone::first_package)
            .map(Package::destination)
        else {
            return;
        };
        let Some(leg) = self.goal_leg(destination) else {
            warn!(agent = %self.name, destination = %destination, "no goal for payload");
            return;
        };
        let Some(package) = world.zone_mut(&relay.id).and_then(Zone::take_first) else {
            return;
        };

        let taken = package.id();
        self.negotiator.prune_retained(|envelope| {
            !matches!(&envelope.message, Message::PayloadAtRelay { package, .. } if *package == taken)
        });
        self.services.coordinator.collect_from_relay(&self.name);
        debug!(agent = %self.name, relay = %relay.id, "collected from relay");
        self.pick_up(package, leg);
    }

    fn finish_delivery(&mut self, world: &mut dyn World) {
        let Some(target) = self.cargo.as_ref().map(|c| c.leg.target()) else {
            self.state = BehaviorState::Free;
            return;
        };
        if self.position != target {
            self.move_toward(world, target);
            return;
        }

        if let Some(cargo) = self.cargo.take() {
            self.deliver(cargo);
        }
        self.services.coordinator.retire_agent(&self.name);
        world.remove_agent(self.position);
        self.services.bus.unregister(&self.name);
        self.state = BehaviorState::Delivered;
        info!(agent = %self.name, "relay agent left the grid");
    }

    fn idle_clear_of_relays(&mut self, world: &mut dyn World) {
        let relays = Self::relay_positions(&*world);
        let retreat = Retreat {
            avoid: &relays,
            clearance: self.settings.behavior.idle_relay_clearance,
            radius: self.settings.behavior.idle_search_radius,
            attract: &[],
        };
        self.retreat(world, &retreat);
    }
}
