use std::sync::Arc;
use std::time::Duration;

use relay_coordinator::{GoalTable, TaskCoordinator};
use relay_core::{
    AgentName, Coord, DeliveryLedger, DestinationId, EnergyConfig, GridWorld,
    LayoutConfig, ManualClock, Message, MessageBus, MessageKind, Package, PackageId, Role,
    StationId, World, Zone, ZoneId,
};
use relay_energy::StationRegistry;

use super::TransportAgent;
use crate::services::{AgentServices, AgentSettings};
use crate::state::{BehaviorState, TransportLeg};

const TICK: Duration = Duration::from_millis(100);

struct Harness {
    world: GridWorld,
    clock: Arc<ManualClock>,
    services: AgentServices,
    agents: Vec<TransportAgent>,
}

impl Harness {
    fn new() -> Self {
        Self::with_stations(StationRegistry::from_layout(&LayoutConfig::default()))
    }

    fn with_stations(stations: StationRegistry) -> Self {
        let layout = LayoutConfig::default();
        let clock = Arc::new(ManualClock::new());
        let services = AgentServices {
            coordinator: Arc::new(TaskCoordinator::with_defaults()),
            bus: Arc::new(MessageBus::new()),
            stations: Arc::new(stations),
            ledger: Arc::new(DeliveryLedger::new()),
            clock: clock.clone(),
            goals: Arc::new(GoalTable::from_layout(&layout)),
        };
        for zone in &layout.source_zones {
            services.coordinator.register_zone(&zone.id);
        }
        Self {
            world: GridWorld::from_layout(&layout).unwrap(),
            clock,
            services,
            agents: Vec::new(),
        }
    }

    fn spawn(&mut self, name: &str, x: i32, y: i32) {
        self.spawn_with(name, x, y, AgentSettings::default(), 100);
    }

    fn spawn_with(&mut self, name: &str, x: i32, y: i32, settings: AgentSettings, energy: u32) {
        let name = AgentName::new(name);
        let at = Coord::new(x, y);
        self.world.place_agent(name.clone(), at).unwrap();
        let agent = TransportAgent::spawn(name, at, settings, self.services.clone()).with_energy(energy);
        self.agents.push(agent);
    }

    fn tick(&mut self) {
        for agent in &mut self.agents {
            agent.step(&mut self.world);
        }
        self.clock.advance(TICK);
    }

    fn tick_one(&mut self, index: usize) -> BehaviorState {
        let state = self.agents[index].step(&mut self.world);
        self.clock.advance(TICK);
        state
    }

    fn negotiate(&mut self) {
        let settled = self.run_until(20, |h| {
            h.agents
                .iter()
                .all(|a| a.state() != BehaviorState::Negotiating)
        });
        assert!(settled, "negotiation did not finish");
    }

    fn add_package(&mut self, id: u32, destination: u32, zone: &str) {
        let zone = ZoneId::new(zone);
        let package = Package::new(PackageId::new(id), DestinationId::new(destination), zone.clone());
        let source = self.world.zone(&zone).unwrap().position();
        self.world.add_package(&zone, package.clone()).unwrap();
        self.services
            .coordinator
            .create_task(&package, source, &self.services.goals)
            .unwrap();
    }

    fn run_until(&mut self, max_ticks: usize, mut done: impl FnMut(&Self) -> bool) -> bool {
        for _ in 0..max_ticks {
            if done(self) {
                return true;
            }
            self.tick();
        }
        done(self)
    }

    fn run_one_until(&mut self, index: usize, max_ticks: usize, mut done: impl FnMut(&Self) -> bool) -> bool {
        for _ in 0..max_ticks {
            if done(self) {
                return true;
            }
            self.tick_one(index);
        }
        done(self)
    }

    fn fill_relay(&mut self, zone: &str, first_id: u32) {
        let zone = ZoneId::new(zone);
        let mut id = first_id;
        while self.world.zone(&zone).is_some_and(|z| !z.is_full()) {
            let package = Package::new(PackageId::new(id), DestinationId::new(2), zone.clone());
            self.world.add_package(&zone, package).unwrap();
            id += 1;
        }
    }

    fn relay_leg(&self, index: usize) -> Option<ZoneId> {
        match self.agents[index].cargo().map(|c| &c.leg) {
            Some(TransportLeg::ToRelay { zone, .. }) => Some(zone.clone()),
            _ => None,
        }
    }

    fn observer(&self) -> AgentName {
        let observer = AgentName::new("Observer");
        self.services.bus.register(&observer);
        observer
    }

    fn drained_kinds(&self, agent: &AgentName) -> Vec<MessageKind> {
        self.services
            .bus
            .drain(agent)
            .into_iter()
            .map(|e| e.message.kind())
            .collect()
    }
}

// ============================================================================
// Negotiation
// ============================================================================

#[test]
fn five_agents_split_two_and_three() {
    let mut h = Harness::new();
    for (i, x) in [1, 4, 7, 10, 13].into_iter().enumerate() {
        h.spawn(&format!("Agent{i}"), x, 5);
    }
    let start: Vec<Coord> = h.agents.iter().map(TransportAgent::position).collect();

    h.tick();
    assert!(h.agents.iter().all(|a| a.state() == BehaviorState::Negotiating));
    h.negotiate();

    let roles: Vec<_> = h.agents.iter().map(TransportAgent::role).collect();
    assert_eq!(
        roles,
        vec![
            Some(Role::SourceToRelay),
            Some(Role::SourceToRelay),
            Some(Role::RelayToGoal),
            Some(Role::RelayToGoal),
            Some(Role::RelayToGoal),
        ]
    );
    assert!(h.agents.iter().all(|a| a.state() == BehaviorState::Free));
    let now: Vec<Coord> = h.agents.iter().map(TransportAgent::position).collect();
    assert_eq!(start, now);
    assert_eq!(h.services.coordinator.relay_capacity().active_collectors, 3);
}

#[test]
fn relay_tier_keeps_role_claims() {
    let mut h = Harness::new();
    h.spawn("Agent0", 1, 5);
    h.spawn("Agent1", 4, 5);
    h.negotiate();
    // One more tick so the last claims are drained.
    h.tick();

    assert!(h.agents[0].negotiator().retained().is_empty());
    assert!(
        h.agents[1]
            .negotiator()
            .retained()
            .iter()
            .any(|e| e.message.kind() == MessageKind::RoleClaim)
    );
}

// ============================================================================
// Source tier
// ============================================================================

#[test]
fn source_tier_delivers_directly() {
    let mut h = Harness::new();
    h.spawn("Agent0", 6, 17);
    h.spawn("Agent1", 0, 10);
    h.negotiate();
    h.add_package(1, 1, "A1");

    assert!(h.run_until(100, |h| h.services.ledger.count() == 1));
    let agent = &h.agents[0];
    assert_eq!(agent.deliveries(), 1);
    assert!(!agent.is_carrying());
    assert_eq!(agent.position(), Coord::new(5, 0));
    assert!(h.services.ledger.contains(PackageId::new(1)));

    let stats = h.services.coordinator.statistics();
    assert_eq!(stats.completed_tasks, 1);
    assert_eq!(stats.pending_tasks, 0);
    assert_eq!(h.world.packages_in_zones(), 0);
}

#[test]
fn relay_hand_off_ends_with_retired_collector() {
    let mut h = Harness::new();
    h.spawn("Agent0", 12, 17);
    h.spawn("Agent1", 16, 12);
    h.negotiate();
    h.add_package(1, 2, "A3");
    let relay = ZoneId::new("R1");

    let mut parked = false;
    let done = h.run_until(300, |h| {
        parked |= h.world.zone(&relay).is_some_and(|z| z.len() == 1);
        h.services.ledger.count() == 1
    });
    assert!(done);
    assert!(parked);

    assert_eq!(h.agents[0].deliveries(), 0);
    assert_eq!(h.agents[1].deliveries(), 1);
    assert_eq!(h.agents[1].state(), BehaviorState::Delivered);
    assert_eq!(h.world.position_of(&AgentName::new("Agent1")), None);
    assert!(!h.services.bus.registered().contains(&AgentName::new("Agent1")));

    let capacity = h.services.coordinator.relay_capacity();
    assert_eq!(capacity.active_collectors, 0);
    assert_eq!(capacity.committed_payloads, 0);

    // Terminal agents ignore further ticks.
    assert_eq!(h.tick_one(1), BehaviorState::Delivered);
}

#[test]
fn full_relay_sends_payload_to_another_relay() {
    let mut h = Harness::new();
    h.spawn("Agent0", 12, 17);
    h.spawn("Agent1", 16, 12);
    h.negotiate();
    h.add_package(1, 2, "A3");

    assert!(h.run_one_until(0, 5, |h| h.relay_leg(0).is_some()));
    assert_eq!(h.relay_leg(0), Some(ZoneId::new("R1")));
    h.fill_relay("R1", 100);

    assert!(h.run_one_until(0, 30, |h| h.relay_leg(0) != Some(ZoneId::new("R1"))));
    assert_eq!(h.relay_leg(0), Some(ZoneId::new("R2")));
    assert_eq!(h.agents[0].state(), BehaviorState::Transporting);
    assert_eq!(h.world.zone(&ZoneId::new("R1")).map(Zone::len), Some(2));
}

#[test]
fn payload_waits_while_every_relay_is_full() {
    let mut h = Harness::new();
    h.spawn("Agent0", 12, 17);
    h.spawn("Agent1", 16, 12);
    h.negotiate();
    h.add_package(1, 2, "A3");

    assert!(h.run_one_until(0, 5, |h| h.relay_leg(0).is_some()));
    for (i, relay) in ["R1", "R2", "R3", "R4"].into_iter().enumerate() {
        h.fill_relay(relay, 100 + 10 * i as u32);
    }

    for _ in 0..30 {
        h.tick_one(0);
    }
    assert_eq!(h.agents[0].state(), BehaviorState::Transporting);
    assert_eq!(h.relay_leg(0), Some(ZoneId::new("R1")));
    assert!(h.agents[0].position().is_adjacent(Coord::new(12, 10)));

    let freed = h.world.zone_mut(&ZoneId::new("R3")).and_then(Zone::take_first);
    assert!(freed.is_some());
    h.tick_one(0);
    assert_eq!(h.relay_leg(0), Some(ZoneId::new("R3")));
}

#[test]
fn no_idle_collector_means_direct_route() {
    let mut h = Harness::new();
    h.spawn("Agent0", 12, 18);
    h.spawn("Agent1", 0, 10);
    h.negotiate();
    h.services.coordinator.retire_agent(&AgentName::new("Agent1"));
    h.add_package(1, 2, "A3");

    h.tick_one(0);
    let leg = h.agents[0].cargo().map(|c| c.leg.clone());
    assert!(matches!(leg, Some(TransportLeg::ToGoal { .. })));
    assert_eq!(h.services.coordinator.relay_capacity().committed_payloads, 0);
}

#[test]
fn critical_energy_drops_payload_silently() {
    let mut h = Harness::new();
    let costly = AgentSettings {
        energy: EnergyConfig {
            move_cost: 3,
            ..EnergyConfig::default()
        },
        ..AgentSettings::default()
    };
    h.spawn_with("Agent0", 6, 18, costly, 60);
    h.spawn("Agent1", 0, 10);
    h.negotiate();
    let observer = h.observer();
    h.add_package(1, 1, "A1");

    assert!(h.run_until(40, |h| h.agents[0].state() == BehaviorState::GoingToCharge));
    let agent = &h.agents[0];
    assert_eq!(agent.abandoned(), 1);
    assert!(agent.cargo().is_none());
    assert_eq!(h.services.ledger.count(), 0);
    assert_eq!(h.world.packages_in_zones(), 0);
    assert_eq!(h.services.coordinator.pending_tasks(), 0);
    assert_eq!(h.services.coordinator.statistics().completed_tasks, 0);
    assert!(h.drained_kinds(&observer).contains(&MessageKind::LowEnergy));
}

#[test]
fn abandoning_a_relay_leg_frees_the_collector_slot() {
    let mut h = Harness::new();
    let costly = AgentSettings {
        energy: EnergyConfig {
            move_cost: 6,
            ..EnergyConfig::default()
        },
        ..AgentSettings::default()
    };
    h.spawn_with("Agent0", 12, 18, costly, 60);
    h.spawn("Agent1", 16, 12);
    h.negotiate();
    h.add_package(1, 2, "A3");

    let mut saw_relay_leg = false;
    let abandoned = h.run_one_until(0, 20, |h| {
        saw_relay_leg |= h.relay_leg(0).is_some();
        h.agents[0].abandoned() == 1
    });
    assert!(abandoned);
    assert!(saw_relay_leg);
    assert!(h.agents[0].cargo().is_none());

    let coordinator = &h.services.coordinator;
    assert_eq!(coordinator.relay_capacity().committed_payloads, 0);
    assert!(coordinator.reserve_relay_slot());
}

#[test]
fn collector_dropping_its_payload_is_idle_again() {
    let mut h = Harness::new();
    h.spawn("Agent0", 6, 17);
    let costly = AgentSettings {
        energy: EnergyConfig {
            move_cost: 8,
            ..EnergyConfig::default()
        },
        ..AgentSettings::default()
    };
    h.spawn_with("Agent1", 13, 10, costly, 60);
    h.negotiate();
    assert_eq!(h.agents[1].role(), Some(Role::RelayToGoal));
    h.fill_relay("R1", 50);

    assert_eq!(h.tick_one(1), BehaviorState::Transporting);
    assert_eq!(h.services.coordinator.relay_capacity().busy_collectors, 1);

    assert!(h.run_one_until(1, 20, |h| h.agents[1].abandoned() == 1));
    let capacity = h.services.coordinator.relay_capacity();
    assert_eq!(capacity.active_collectors, 1);
    assert_eq!(capacity.busy_collectors, 0);
    assert_eq!(h.agents[1].state(), BehaviorState::GoingToCharge);
}

#[test]
fn claim_survives_a_charging_detour() {
    let mut h = Harness::new();
    h.spawn_with("Agent0", 6, 14, AgentSettings::default(), 62);
    h.spawn("Agent1", 0, 10);
    h.negotiate();
    h.add_package(1, 1, "A1");

    assert!(h.run_until(10, |h| h.agents[0].state() == BehaviorState::GoingToCharge));
    assert_eq!(
        h.agents[0].claimed_task().map(|t| t.package),
        Some(PackageId::new(1))
    );
    assert_eq!(h.services.coordinator.pending_tasks(), 0);

    assert!(h.run_until(200, |h| h.agents[0].cargo().is_some()));
    assert_eq!(
        h.agents[0].cargo().map(|c| c.package.id()),
        Some(PackageId::new(1))
    );
    assert!(h.agents[0].claimed_task().is_none());
}

// ============================================================================
// Energy and stations
// ============================================================================

#[test]
fn charging_cycle_releases_station() {
    let mut h = Harness::new();
    h.spawn_with("Agent0", 3, 3, AgentSettings::default(), 30);
    h.spawn("Agent1", 0, 10);
    h.negotiate();

    assert!(h.run_until(10, |h| h.agents[0].state() == BehaviorState::Charging));
    let agent = AgentName::new("Agent0");
    assert_eq!(
        h.services.stations.reservation_of(&agent).map(|s| s.id),
        Some(StationId::new("station1"))
    );

    assert!(h.run_until(30, |h| h.agents[0].state() != BehaviorState::Charging));
    assert!(h.agents[0].energy().is_full());
    assert_eq!(h.services.stations.reserved_count(), 0);
}

#[test]
fn charging_without_reservation_reserves_again() {
    let mut h = Harness::new();
    h.spawn_with("Agent0", 3, 3, AgentSettings::default(), 30);
    h.spawn("Agent1", 0, 10);
    h.negotiate();
    assert!(h.run_until(10, |h| h.agents[0].state() == BehaviorState::Charging));

    let agent = AgentName::new("Agent0");
    assert!(h.services.stations.release(&agent).is_ok());
    assert_eq!(h.tick_one(0), BehaviorState::GoingToCharge);
    assert_eq!(h.tick_one(0), BehaviorState::Charging);
    assert!(h.services.stations.reservation_of(&agent).is_some());
}

#[test]
fn help_request_and_offer() {
    let mut h = Harness::with_stations(StationRegistry::new(Vec::new()));
    h.spawn_with("Agent0", 3, 3, AgentSettings::default(), 30);
    h.spawn("Agent1", 0, 10);
    h.negotiate();
    let observer = h.observer();
    let agent0 = AgentName::new("Agent0");

    assert_eq!(h.tick_one(0), BehaviorState::GoingToCharge);
    h.tick_one(0);
    assert!(h.agents[0].is_waiting_for_station());
    h.tick_one(0);
    assert_eq!(h.drained_kinds(&observer), vec![MessageKind::HelpRequest]);

    h.tick_one(1);
    assert_eq!(h.services.bus.pending(&agent0), 1);

    h.tick_one(0);
    assert!(h.agents[0].is_waiting_for_station());
    assert_eq!(h.drained_kinds(&observer), vec![MessageKind::HelpRequest]);
}

#[test]
fn charging_agents_do_not_offer_help() {
    let mut h = Harness::with_stations(StationRegistry::new(Vec::new()));
    h.spawn_with("Agent0", 3, 3, AgentSettings::default(), 30);
    h.spawn_with("Agent1", 0, 10, AgentSettings::default(), 30);
    h.negotiate();

    h.tick();
    h.tick();
    h.tick();
    let kinds = h.drained_kinds(&AgentName::new("Agent0"));
    assert!(!kinds.contains(&MessageKind::HelpOffer));
}

// ============================================================================
// Relay tier
// ============================================================================

#[test]
fn idle_collector_keeps_clear_of_relays() {
    let mut h = Harness::new();
    h.spawn("Agent0", 1, 1);
    h.spawn("Agent1", 10, 11);
    h.negotiate();

    h.run_until(30, |_| false);
    let at = h.agents[1].position();
    let relays = [Coord::new(12, 10), Coord::new(12, 9), Coord::new(9, 10), Coord::new(9, 9)];
    let nearest = relays
        .iter()
        .map(|r| at.euclidean(*r))
        .fold(f64::INFINITY, f64::min);
    assert!(nearest >= 4.0, "collector idles {nearest} from a relay");
    assert_eq!(h.agents[1].state(), BehaviorState::Free);

    let before = h.agents[1].position();
    h.tick();
    assert_eq!(h.agents[1].position(), before);
}

#[test]
fn collector_follows_payload_notice() {
    let mut h = Harness::new();
    h.spawn("Agent0", 1, 1);
    h.spawn("Agent1", 16, 12);
    h.negotiate();

    let package = Package::new(PackageId::new(9), DestinationId::new(2), ZoneId::new("A3"));
    h.world.add_package(&ZoneId::new("R1"), package).unwrap();
    h.services.bus.broadcast(
        &AgentName::new("Agent0"),
        &Message::PayloadAtRelay {
            package: PackageId::new(9),
            relay: ZoneId::new("R1"),
            at: Coord::new(12, 10),
            destination: DestinationId::new(2),
        },
    );

    assert!(h.run_until(20, |h| h.agents[1].state() == BehaviorState::Transporting));
    assert_eq!(h.world.zone(&ZoneId::new("R1")).map(|z| z.len()), Some(0));
    assert!(h.agents[1].negotiator().retained().iter().all(|e| e.message.kind() != MessageKind::PayloadAtRelay));
    assert_eq!(h.services.coordinator.relay_capacity().busy_collectors, 1);
}

#[test]
fn snapshot_reports_claims_as_carrying() {
    let mut h = Harness::new();
    h.spawn("Agent0", 6, 10);
    h.spawn("Agent1", 0, 10);
    h.negotiate();
    assert!(!h.agents[0].snapshot().carrying);

    h.add_package(1, 1, "A1");
    h.tick_one(0);
    let snapshot = h.agents[0].snapshot();
    assert!(snapshot.carrying);
    assert_eq!(snapshot.energy, 99);
    assert_eq!(snapshot.position, Coord::new(6, 11));
}
