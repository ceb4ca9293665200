//! Hub-routing heuristic: relay or direct delivery.

use serde::{Deserialize, Serialize};

use relay_core::{Coord, RoutingConfig};

/// Snapshot the heuristic decides on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingInput {
    /// Agent position.
    pub agent: Coord,
    /// Agent energy level.
    pub energy: u32,
    /// Energy the agent spends per move.
    pub move_cost: u32,
    /// Goal of the payload.
    pub goal: Coord,
    /// Candidate relay zone.
    pub relay: Coord,
    /// Agents registered with the coordinator.
    pub registered_agents: usize,
    /// Deliveries completed so far.
    pub completed_tasks: u64,
}

/// Why a route was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteReason {
    /// Long trip and the relay detour is acceptable.
    LongTripDetour,
    /// Short trip and the relay is practically on the way.
    ShortTripDetour,
    /// The goal is out of reach on the current charge but the relay is not.
    EnergyReach,
    /// Many agents and few completions; relays take a longer detour.
    HighLoad,
    /// Direct delivery is preferred.
    Direct,
}

/// Outcome of the heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDecision {
    /// True to drop the payload at the relay.
    pub via_relay: bool,
    /// Rule that decided.
    pub reason: RouteReason,
    /// Manhattan distance agent to goal.
    pub direct_distance: u32,
    /// Manhattan distance agent to relay to goal.
    pub relay_distance: u32,
}

/// Decides between relay and direct delivery.
///
/// The distance rule applies first. The energy and load overrides can only
/// turn a direct decision into a relay one.
#[must_use]
pub fn decide_route(input: &RoutingInput, config: &RoutingConfig) -> RouteDecision {
    let direct_distance = input.agent.manhattan(input.goal);
    let to_relay = input.agent.manhattan(input.relay);
    let relay_distance = to_relay + input.relay.manhattan(input.goal);

    let d = f64::from(direct_distance);
    let r = f64::from(relay_distance);
    let decision = |via_relay, reason| RouteDecision {
        via_relay,
        reason,
        direct_distance,
        relay_distance,
    };

    if d > config.long_distance {
        if r <= config.long_detour_ratio * d {
            return decision(true, RouteReason::LongTripDetour);
        }
    } else if r <= config.short_detour_ratio * d {
        return decision(true, RouteReason::ShortTripDetour);
    }

    let energy = f64::from(input.energy);
    let per_cell = f64::from(input.move_cost);
    let direct_need = d * per_cell + config.energy_reserve;
    let relay_need = f64::from(to_relay) * per_cell + config.energy_reserve;
    if energy < direct_need && energy >= relay_need {
        return decision(true, RouteReason::EnergyReach);
    }

    let high_load = input.registered_agents > config.high_load_agents
        && input.completed_tasks < config.high_load_completed;
    if high_load && r <= config.loaded_detour_ratio * d {
        return decision(true, RouteReason::HighLoad);
    }

    decision(false, RouteReason::Direct)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    fn input(agent: (i32, i32), goal: (i32, i32), relay: (i32, i32)) -> RoutingInput {
        RoutingInput {
            agent: Coord::new(agent.0, agent.1),
            energy: 100,
            move_cost: 1,
            goal: Coord::new(goal.0, goal.1),
            relay: Coord::new(relay.0, relay.1),
            registered_agents: 5,
            completed_tasks: 0,
        }
    }

    #[test_case((9, 18), (5, 0), (12, 10), true, RouteReason::LongTripDetour ; "long trip via nearby relay")]
    #[test_case((9, 18), (5, 0), (9, 9), true, RouteReason::LongTripDetour ; "long trip relay on the way")]
    #[test_case((0, 0), (19, 0), (0, 19), false, RouteReason::Direct ; "long trip relay far off course")]
    #[test_case((9, 12), (9, 5), (9, 9), true, RouteReason::ShortTripDetour ; "short trip relay on path")]
    #[test_case((5, 6), (5, 0), (9, 9), false, RouteReason::Direct ; "short trip relay behind")]
    fn distance_rules(
        agent: (i32, i32),
        goal: (i32, i32),
        relay: (i32, i32),
        via_relay: bool,
        reason: RouteReason,
    ) {
        let decision = decide_route(&input(agent, goal, relay), &RoutingConfig::default());
        assert_eq!(decision.via_relay, via_relay);
        assert_eq!(decision.reason, reason);
    }

    #[test]
    fn distances_are_reported() {
        let decision = decide_route(&input((9, 18), (5, 0), (12, 10)), &RoutingConfig::default());
        assert_eq!(decision.direct_distance, 22);
        assert_eq!(decision.relay_distance, 28);
    }

    #[test]
    fn low_energy_prefers_reachable_relay() {
        let mut low = input((0, 0), (19, 0), (0, 10));
        low.energy = 15;
        let decision = decide_route(&low, &RoutingConfig::default());
        assert!(decision.via_relay);
        assert_eq!(decision.reason, RouteReason::EnergyReach);

        low.energy = 100;
        assert!(!decide_route(&low, &RoutingConfig::default()).via_relay);
    }

    #[test]
    fn energy_override_needs_relay_in_reach() {
        let mut stranded = input((0, 0), (19, 0), (0, 10));
        stranded.energy = 5;
        assert!(!decide_route(&stranded, &RoutingConfig::default()).via_relay);
    }

    #[test]
    fn costly_moves_put_goal_out_of_reach() {
        // D = 19 and the relay is 10 cells away; 30 energy covers the goal
        // at one unit per move but only the relay at two.
        let mut agent = input((0, 0), (19, 0), (0, 10));
        agent.energy = 30;
        let decision = decide_route(&agent, &RoutingConfig::default());
        assert!(!decision.via_relay);

        agent.move_cost = 2;
        let decision = decide_route(&agent, &RoutingConfig::default());
        assert!(decision.via_relay);
        assert_eq!(decision.reason, RouteReason::EnergyReach);

        agent.move_cost = 3;
        assert!(!decide_route(&agent, &RoutingConfig::default()).via_relay);
    }

    #[test]
    fn high_load_widens_detour() {
        // D = 30, R = 40: beyond 1.3 * D but within 1.4 * D.
        let mut busy = input((0, 0), (15, 15), (0, 20));
        assert!(!decide_route(&busy, &RoutingConfig::default()).via_relay);

        busy.registered_agents = 6;
        busy.completed_tasks = 3;
        let decision = decide_route(&busy, &RoutingConfig::default());
        assert!(decision.via_relay);
        assert_eq!(decision.reason, RouteReason::HighLoad);

        busy.completed_tasks = 10;
        assert!(!decide_route(&busy, &RoutingConfig::default()).via_relay);
    }

    #[test]
    fn agent_on_goal_goes_direct() {
        let decision = decide_route(&input((5, 0), (5, 0), (9, 9)), &RoutingConfig::default());
        assert!(!decision.via_relay);
    }

    proptest! {
        #[test]
        fn decision_is_deterministic(
            ax in 0i32..20, ay in 0i32..20,
            gx in 0i32..20, gy in 0i32..20,
            rx in 0i32..20, ry in 0i32..20,
            energy in 0u32..=100,
            registered in 0usize..10,
            completed in 0u64..20,
        ) {
            let input = RoutingInput {
                agent: Coord::new(ax, ay),
                energy,
                move_cost: 1,
                goal: Coord::new(gx, gy),
                relay: Coord::new(rx, ry),
                registered_agents: registered,
                completed_tasks: completed,
            };
            let config = RoutingConfig::default();
            prop_assert_eq!(decide_route(&input, &config), decide_route(&input, &config));
        }

        #[test]
        fn relay_on_straight_path_is_always_taken(ay in 0i32..9, gy in 11i32..20) {
            let input = RoutingInput {
                agent: Coord::new(4, ay),
                energy: 100,
                move_cost: 1,
                goal: Coord::new(4, gy),
                relay: Coord::new(4, 10),
                registered_agents: 5,
                completed_tasks: 0,
            };
            prop_assert!(decide_route(&input, &RoutingConfig::default()).via_relay);
        }
    }
}
