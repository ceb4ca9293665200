//! Full runs of the default fleet through the tick driver.
//!
//! Default world: 20x20 grid, source zones A1..A3 on the bottom row, four
//! relay zones in the middle, goals 1 and 2 on the top row, one charging
//! station per corner.

use relay_agent::BehaviorState;
use relay_core::{FleetConfig, Role};
use relay_sim::{ClockMode, Simulation, SimulationReport};

// ============================================================================
// Helper Functions
// ============================================================================

fn default_fleet() -> FleetConfig {
    let mut config = FleetConfig::default();
    config.simulation.agents = 5;
    config.simulation.packages = 10;
    config.simulation.initial_packages = 10;
    config
}

fn run(config: FleetConfig) -> (Simulation, SimulationReport) {
    let mut sim = Simulation::new(config, ClockMode::Stepped).unwrap();
    let report = sim.run();
    (sim, report)
}

// ============================================================================
// Scenario
// ============================================================================

#[test]
fn five_agents_deliver_ten_packages() {
    let (sim, report) = run(default_fleet());

    assert!(report.completed, "run did not finish: {report:?}");
    assert_eq!(report.delivered, 10);
    assert_eq!(report.abandoned, 0);
    assert_eq!(sim.services().ledger.count(), 10);

    assert_eq!(report.role_count(Role::SourceToRelay), 2);
    assert_eq!(report.role_count(Role::RelayToGoal), 3);
    assert!(sim.agents().iter().all(|a| !a.is_carrying()));
}

#[test]
fn every_package_is_delivered_once() {
    let (sim, _) = run(default_fleet());
    let mut ids: Vec<u32> = sim
        .services()
        .ledger
        .records()
        .iter()
        .map(|r| r.package.value())
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, (1..=10).collect::<Vec<_>>());
}

#[test]
fn coordinator_books_balance_after_run() {
    let (sim, report) = run(default_fleet());
    let stats = &report.coordinator;

    assert_eq!(stats.completed_tasks, 10);
    assert_eq!(stats.pending_tasks, 0);
    assert_eq!(stats.assigned_tasks, 10);
    assert_eq!(stats.relay.committed_payloads, 0);
    assert_eq!(sim.world().packages_in_zones(), 0);
    assert!(stats.average_energy_used > 0.0);
}

#[test]
fn relay_agents_leave_after_their_delivery() {
    let (sim, report) = run(default_fleet());

    for agent in &report.agents {
        if agent.state == BehaviorState::Delivered {
            assert_eq!(agent.role, Some(Role::RelayToGoal));
            assert_eq!(agent.deliveries, 1);
            assert_eq!(sim.world().position_of(&agent.name), None);
        }
        if agent.role == Some(Role::RelayToGoal) {
            assert!(agent.deliveries <= 1);
        }
    }
    let role0: u32 = report
        .agents
        .iter()
        .filter(|a| a.role == Some(Role::SourceToRelay))
        .map(|a| a.deliveries)
        .sum();
    let role1: u32 = report
        .agents
        .iter()
        .filter(|a| a.role == Some(Role::RelayToGoal))
        .map(|a| a.deliveries)
        .sum();
    assert_eq!(role0 + role1, 10);
}

#[test]
fn same_seed_same_outcome() {
    let (_, a) = run(default_fleet());
    let (_, b) = run(default_fleet());

    assert_eq!(a.ticks, b.ticks);
    assert_eq!(a.delivered, b.delivered);
    let positions = |r: &SimulationReport| r.agents.iter().map(|x| x.position).collect::<Vec<_>>();
    assert_eq!(positions(&a), positions(&b));
}

#[test]
fn report_is_json_serializable() {
    let (_, report) = run(default_fleet());
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["delivered"], 10);
    assert_eq!(json["agents"].as_array().map(Vec::len), Some(5));
}
