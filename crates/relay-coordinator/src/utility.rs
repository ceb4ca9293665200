//! Auction scoring and efficiency arithmetic.
//!
//! Every function here is pure so the auction can be tested number by number.

use std::time::Duration;

use relay_core::{AllocationConfig, DestinationId, PackageId};

use crate::types::{AgentSnapshot, EfficiencyRecord, Task};

/// Energy figures are expressed against a 100-unit battery.
const ENERGY_SCALE: f64 = 100.0;

/// Priority of a new task: 1, plus one for the preferred destination, plus one
/// for early package ids.
#[must_use]
pub fn priority_for(package: PackageId, destination: DestinationId, config: &AllocationConfig) -> u8 {
    let mut priority = 1;
    if destination == config.preferred_destination {
        priority += 1;
    }
    if package.value() < config.early_package_threshold {
        priority += 1;
    }
    priority
}

/// Utility of `task` for `agent`.
#[must_use]
pub fn utility(
    agent: &AgentSnapshot,
    task: &Task,
    record: EfficiencyRecord,
    config: &AllocationConfig,
) -> f64 {
    let to_source = f64::from(agent.position.manhattan(task.source));
    let to_goal = f64::from(task.source.manhattan(task.goal));
    let proximity =
        ((-config.source_decay * to_source).exp() + (-config.destination_decay * to_goal).exp()) / 2.0;

    let battery = if agent.energy_fraction() > config.battery_cutoff {
        1.0
    } else {
        0.0
    };

    let delivery_bonus = (config.delivery_bonus_base
        - config.delivery_bonus_step * f64::from(record.deliveries))
    .max(0.0);
    let priority_bonus = f64::from(task.priority) * config.priority_bonus;

    config.distance_weight * proximity
        + config.battery_weight * battery
        + config.efficiency_weight * record.efficiency
        + delivery_bonus
        + priority_bonus
}

/// Efficiency after accepting a task `distance` cells away.
#[must_use]
pub fn penalize_for_difficulty(efficiency: f64, distance: u32, config: &AllocationConfig) -> f64 {
    let difficulty = f64::from(distance) / config.difficulty_scale;
    (efficiency * (1.0 - difficulty * config.difficulty_penalty)).max(config.efficiency_floor)
}

/// Efficiency after a delivery that took `duration` and spent `energy`.
#[must_use]
pub fn smoothed_efficiency(
    previous: f64,
    duration: Duration,
    energy: u32,
    config: &AllocationConfig,
) -> f64 {
    let time_score = 1.0 / (1.0 + duration.as_secs_f64());
    let energy_score = 1.0 - f64::from(energy) / ENERGY_SCALE;
    let sample = config.time_score_weight * time_score + (1.0 - config.time_score_weight) * energy_score;
    config.efficiency_smoothing * sample + (1.0 - config.efficiency_smoothing) * previous
}
