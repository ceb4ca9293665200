//! Fleet configuration.
//!
//! Configuration is a JSON document. Every section and field is optional and
//! falls back to the defaults below, so `{}` is a valid configuration.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FleetError, Result};
use crate::types::{Coord, DestinationId, StationId, ZoneId};
use crate::world::GridBounds;

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    /// Grid, zones, goals and stations.
    pub layout: LayoutConfig,
    /// Battery model.
    pub energy: EnergyConfig,
    /// Role negotiation timing.
    pub negotiation: NegotiationConfig,
    /// Auction weights.
    pub allocation: AllocationConfig,
    /// Hub-routing thresholds.
    pub routing: RoutingConfig,
    /// Movement and spacing heuristics.
    pub behavior: BehaviorConfig,
    /// Driver settings.
    pub simulation: SimulationConfig,
}

impl FleetConfig {
    /// Loads and validates a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            FleetError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&contents)
    }

    /// Parses and validates a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| FleetError::config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| FleetError::config(format!("failed to serialize config: {e}")))
    }

    /// Checks internal consistency.
    pub fn validate(&self) -> Result<()> {
        self.layout.validate()?;
        self.energy.validate()?;
        self.negotiation.validate()?;
        if self.simulation.agents == 0 {
            return Err(FleetError::config("simulation.agents must be at least 1"));
        }
        Ok(())
    }
}

/// A source zone placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceZoneSpec {
    /// Zone identifier.
    pub id: ZoneId,
    /// Cell occupied by the zone.
    pub position: Coord,
}

/// A relay zone placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayZoneSpec {
    /// Zone identifier.
    pub id: ZoneId,
    /// Cell occupied by the zone.
    pub position: Coord,
    /// Maximum number of parked packages.
    pub capacity: usize,
}

/// A delivery goal placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalSpec {
    /// Destination identifier carried by packages.
    pub id: DestinationId,
    /// Goal cell.
    pub position: Coord,
}

/// A charging station placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationSpec {
    /// Station identifier.
    pub id: StationId,
    /// Cell occupied by the station.
    pub position: Coord,
}

/// Static layout of the world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Number of columns.
    pub width: i32,
    /// Number of rows.
    pub height: i32,
    /// Source zones in registration order.
    pub source_zones: Vec<SourceZoneSpec>,
    /// Relay zones in registration order.
    pub relay_zones: Vec<RelayZoneSpec>,
    /// Delivery goals.
    pub goals: Vec<GoalSpec>,
    /// Charging stations.
    pub charging_stations: Vec<StationSpec>,
    /// Impassable cells.
    pub obstacles: Vec<Coord>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        let source = |id: &str, x, y| SourceZoneSpec {
            id: ZoneId::new(id),
            position: Coord::new(x, y),
        };
        let relay = |id: &str, x, y| RelayZoneSpec {
            id: ZoneId::new(id),
            position: Coord::new(x, y),
            capacity: 2,
        };
        let station = |id: &str, x, y| StationSpec {
            id: StationId::new(id),
            position: Coord::new(x, y),
        };
        Self {
            width: 20,
            height: 20,
            source_zones: vec![
                source("A1", 6, 19),
                source("A2", 9, 19),
                source("A3", 12, 19),
            ],
            relay_zones: vec![
                relay("R1", 12, 10),
                relay("R2", 12, 9),
                relay("R3", 9, 10),
                relay("R4", 9, 9),
            ],
            goals: vec![
                GoalSpec {
                    id: DestinationId::new(1),
                    position: Coord::new(5, 0),
                },
                GoalSpec {
                    id: DestinationId::new(2),
                    position: Coord::new(15, 0),
                },
            ],
            charging_stations: vec![
                station("station1", 2, 2),
                station("station2", 17, 2),
                station("station3", 2, 17),
                station("station4", 17, 17),
            ],
            obstacles: Vec::new(),
        }
    }
}

impl LayoutConfig {
    /// Grid bounds described by this layout.
    #[must_use]
    pub const fn bounds(&self) -> GridBounds {
        GridBounds::new(self.width, self.height)
    }

    /// Position of a goal.
    #[must_use]
    pub fn goal_position(&self, id: DestinationId) -> Option<Coord> {
        self.goals.iter().find(|g| g.id == id).map(|g| g.position)
    }

    fn validate(&self) -> Result<()> {
        if self.width <= 0 || self.height <= 0 {
            return Err(FleetError::config(format!(
                "grid must be non-empty, got {}x{}",
                self.width, self.height
            )));
        }
        if self.source_zones.is_empty() {
            return Err(FleetError::config("at least one source zone is required"));
        }
        if self.goals.is_empty() {
            return Err(FleetError::config("at least one goal is required"));
        }
        if let Some(relay) = self.relay_zones.iter().find(|r| r.capacity == 0) {
            return Err(FleetError::config(format!(
                "relay zone {} must have a positive capacity",
                relay.id
            )));
        }

        let bounds = self.bounds();
        let mut seen = HashSet::new();
        let positions = self
            .source_zones
            .iter()
            .map(|z| z.position)
            .chain(self.relay_zones.iter().map(|z| z.position))
            .chain(self.goals.iter().map(|g| g.position))
            .chain(self.charging_stations.iter().map(|s| s.position))
            .chain(self.obstacles.iter().copied());
        for position in positions {
            if !bounds.contains(position) {
                return Err(FleetError::config(format!(
                    "{position} lies outside the {}x{} grid",
                    self.width, self.height
                )));
            }
            if !seen.insert(position) {
                return Err(FleetError::config(format!("{position} is used twice")));
            }
        }
        Ok(())
    }
}

/// Battery model parameters. Levels are whole units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyConfig {
    /// Full charge.
    pub capacity: u32,
    /// Energy spent per accepted move.
    pub move_cost: u32,
    /// At or below this level the agent must recharge.
    pub low_threshold: u32,
    /// Minimum level to accept new work.
    pub task_threshold: u32,
    /// Energy restored per charging tick.
    pub charging_rate: u32,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            move_cost: 1,
            low_threshold: 20,
            task_threshold: 60,
            charging_rate: 5,
        }
    }
}

impl EnergyConfig {
    fn validate(&self) -> Result<()> {
        if self.capacity == 0 || self.charging_rate == 0 {
            return Err(FleetError::config(
                "energy capacity and charging rate must be positive",
            ));
        }
        if self.low_threshold >= self.task_threshold || self.task_threshold > self.capacity {
            return Err(FleetError::config(format!(
                "energy thresholds must satisfy low < task <= capacity, got {} / {} / {}",
                self.low_threshold, self.task_threshold, self.capacity
            )));
        }
        Ok(())
    }
}

/// Negotiation timing and naming convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NegotiationConfig {
    /// Base time unit in milliseconds.
    pub wait_unit_ms: u64,
    /// Listen phase length in wait units.
    pub listen_units: u32,
    /// Time from start until negotiation completes, in wait units.
    pub finalize_units: u32,
    /// Prefix of conventional agent names.
    pub name_prefix: String,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            wait_unit_ms: 100,
            listen_units: 4,
            finalize_units: 9,
            name_prefix: "Agent".to_string(),
        }
    }
}

impl NegotiationConfig {
    fn validate(&self) -> Result<()> {
        if self.listen_units >= self.finalize_units {
            return Err(FleetError::config(format!(
                "negotiation listen_units ({}) must be below finalize_units ({})",
                self.listen_units, self.finalize_units
            )));
        }
        Ok(())
    }
}

/// Auction parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationConfig {
    /// Weight of the proximity term.
    pub distance_weight: f64,
    /// Weight of the battery term.
    pub battery_weight: f64,
    /// Weight of the efficiency term.
    pub efficiency_weight: f64,
    /// Decay rate for agent-to-source distance.
    pub source_decay: f64,
    /// Decay rate for source-to-goal distance.
    pub destination_decay: f64,
    /// Battery fraction above which the battery term applies.
    pub battery_cutoff: f64,
    /// Agents below this energy are not offered tasks.
    pub min_operating_energy: u32,
    /// Bonus for agents with no deliveries yet.
    pub delivery_bonus_base: f64,
    /// Bonus reduction per completed delivery.
    pub delivery_bonus_step: f64,
    /// Utility added per priority point.
    pub priority_bonus: f64,
    /// Number of nearest queues examined per auction.
    pub zones_considered: usize,
    /// Destination that earns a priority point.
    pub preferred_destination: DestinationId,
    /// Package ids below this earn a priority point.
    pub early_package_threshold: u32,
    /// Distance that counts as one unit of difficulty.
    pub difficulty_scale: f64,
    /// Efficiency penalty per unit of difficulty.
    pub difficulty_penalty: f64,
    /// Lower bound for efficiency after penalties.
    pub efficiency_floor: f64,
    /// Weight of the new sample in the efficiency average.
    pub efficiency_smoothing: f64,
    /// Weight of the time score inside a sample; the energy score gets the rest.
    pub time_score_weight: f64,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            distance_weight: 0.7,
            battery_weight: 0.1,
            efficiency_weight: 0.2,
            source_decay: 0.2,
            destination_decay: 0.05,
            battery_cutoff: 0.2,
            min_operating_energy: 15,
            delivery_bonus_base: 0.5,
            delivery_bonus_step: 0.05,
            priority_bonus: 0.2,
            zones_considered: 2,
            preferred_destination: DestinationId::new(1),
            early_package_threshold: 5,
            difficulty_scale: 20.0,
            difficulty_penalty: 0.1,
            efficiency_floor: 0.5,
            efficiency_smoothing: 0.7,
            time_score_weight: 0.6,
        }
    }
}

/// Hub-routing thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Direct distance above which a trip counts as long.
    pub long_distance: f64,
    /// Allowed detour ratio for long trips.
    pub long_detour_ratio: f64,
    /// Allowed detour ratio for short trips.
    pub short_detour_ratio: f64,
    /// Allowed detour ratio under high load.
    pub loaded_detour_ratio: f64,
    /// Registered agents above this count signal high load.
    pub high_load_agents: usize,
    /// Completed tasks below this count signal high load.
    pub high_load_completed: u64,
    /// Energy kept in reserve for handling when projecting a trip.
    ///
    /// The per-cell part of the projection is the agent's own
    /// `EnergyConfig::move_cost`, so reachability follows what a move
    /// actually spends.
    pub energy_reserve: f64,
    /// Energy drop since the last routing decision that triggers a new one.
    pub reroute_energy_drop: u32,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            long_distance: 10.0,
            long_detour_ratio: 1.3,
            short_detour_ratio: 1.05,
            loaded_detour_ratio: 1.4,
            high_load_agents: 5,
            high_load_completed: 10,
            energy_reserve: 1.5,
            reroute_energy_drop: 25,
        }
    }
}

/// Movement and spacing heuristics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Radius used to count nearby agents around a zone.
    pub congestion_radius: f64,
    /// Score penalty per nearby agent.
    pub congestion_penalty: f64,
    /// Distance role-0 agents keep from relays after a deposit.
    pub relay_clearance: f64,
    /// Search radius for the post-deposit retreat.
    pub relay_search_radius: i32,
    /// Distance idle role-1 agents keep from relays.
    pub idle_relay_clearance: f64,
    /// Search radius for the idle retreat.
    pub idle_search_radius: i32,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            congestion_radius: 3.0,
            congestion_penalty: 5.0,
            relay_clearance: 8.0,
            relay_search_radius: 3,
            idle_relay_clearance: 4.0,
            idle_search_radius: 2,
        }
    }
}

/// Driver settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of agents to spawn.
    pub agents: usize,
    /// Total number of packages to produce.
    pub packages: usize,
    /// Packages produced before the first tick.
    pub initial_packages: usize,
    /// Ticks between further package batches, 0 to disable.
    pub spawn_interval: u64,
    /// Seed for placement and package generation.
    pub seed: u64,
    /// Upper bound on work ticks.
    pub max_ticks: u64,
    /// Upper bound on negotiation ticks.
    pub max_negotiation_ticks: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            agents: 5,
            packages: 10,
            initial_packages: 10,
            spawn_interval: 10,
            seed: 42,
            max_ticks: 5_000,
            max_negotiation_ticks: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        assert!(FleetConfig::default().validate().is_ok());
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config = FleetConfig::from_json("{}");
        assert_eq!(config, Ok(FleetConfig::default()));
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config = FleetConfig::from_json(r#"{"energy": {"charging_rate": 10}}"#);
        let config = config.unwrap_or_default();
        assert_eq!(config.energy.charging_rate, 10);
        assert_eq!(config.energy.low_threshold, 20);
        assert_eq!(config.layout.source_zones.len(), 3);
    }

    #[test]
    fn default_layout_matches_reference_world() {
        let layout = LayoutConfig::default();
        assert_eq!(layout.goal_position(DestinationId::new(1)), Some(Coord::new(5, 0)));
        assert_eq!(layout.goal_position(DestinationId::new(2)), Some(Coord::new(15, 0)));
        assert_eq!(layout.goal_position(DestinationId::new(3)), None);
        assert_eq!(layout.relay_zones.len(), 4);
        assert_eq!(layout.charging_stations.len(), 4);
    }

    #[test]
    fn rejects_malformed_json() {
        let err = FleetConfig::from_json("{not json");
        assert!(matches!(err, Err(FleetError::Config { .. })));
    }

    #[test]
    fn rejects_inverted_energy_thresholds() {
        let mut config = FleetConfig::default();
        config.energy.low_threshold = 70;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_out_of_bounds_zone() {
        let mut config = FleetConfig::default();
        config.layout.source_zones[0].position = Coord::new(40, 0);
        let err = config.validate();
        assert!(matches!(err, Err(FleetError::Config { reason }) if reason.contains("outside")));
    }

    #[test]
    fn rejects_overlapping_fixtures() {
        let mut config = FleetConfig::default();
        config.layout.obstacles.push(Coord::new(5, 0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_capacity_relay() {
        let mut config = FleetConfig::default();
        config.layout.relay_zones[0].capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_negotiation_with_short_finalize() {
        let mut config = FleetConfig::default();
        config.negotiation.finalize_units = 4;
        assert!(config.validate().is_err());
    }

    #[test]
    fn round_trips_through_file() {
        let config = FleetConfig::default();
        let json = config.to_json().unwrap_or_default();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let loaded = FleetConfig::from_file(file.path());
        assert_eq!(loaded, Ok(config));
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = FleetConfig::from_file("/nonexistent/relay-fleet.json");
        assert!(matches!(err, Err(FleetError::Config { reason }) if reason.contains("failed to read")));
    }
}
