//! Charging-station registry.
//!
//! A station is free for an agent when nobody else holds a reservation on it.
//! Each agent holds at most one reservation at a time.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use relay_core::{AgentName, Coord, LayoutConfig, StationId};

use crate::error::{EnergyError, Result};

/// A charging station fixture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargingStation {
    /// Station identifier.
    pub id: StationId,
    /// Cell occupied by the station.
    pub position: Coord,
}

/// Shared reservation table for charging stations.
#[derive(Debug, Default)]
pub struct StationRegistry {
    stations: Vec<ChargingStation>,
    reservations: RwLock<HashMap<StationId, AgentName>>,
}

impl StationRegistry {
    /// Creates a registry over `stations`.
    #[must_use]
    pub fn new(stations: Vec<ChargingStation>) -> Self {
        Self {
            stations,
            reservations: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a registry from the stations of a layout.
    #[must_use]
    pub fn from_layout(layout: &LayoutConfig) -> Self {
        Self::new(
            layout
                .charging_stations
                .iter()
                .map(|s| ChargingStation {
                    id: s.id.clone(),
                    position: s.position,
                })
                .collect(),
        )
    }

    /// All stations in registration order.
    #[must_use]
    pub fn stations(&self) -> &[ChargingStation] {
        &self.stations
    }

    /// Looks up a station.
    #[must_use]
    pub fn station(&self, id: &StationId) -> Option<&ChargingStation> {
        self.stations.iter().find(|s| &s.id == id)
    }

    /// Station reserved by `agent`, if any.
    #[must_use]
    pub fn reservation_of(&self, agent: &AgentName) -> Option<ChargingStation> {
        let reservations = self.reservations.read();
        let id = reservations
            .iter()
            .find(|(_, holder)| *holder == agent)
            .map(|(id, _)| id)?;
        self.station(id).cloned()
    }

    fn nearest_unreserved<'a>(
        stations: &'a [ChargingStation],
        reservations: &HashMap<StationId, AgentName>,
        agent: &AgentName,
        from: Coord,
    ) -> Option<&'a ChargingStation> {
        let mut best: Option<(&ChargingStation, f64)> = None;
        for station in stations {
            if reservations.get(&station.id).is_some_and(|h| h != agent) {
                continue;
            }
            let distance = from.euclidean(station.position);
            if best.is_none_or(|(_, d)| distance < d) {
                best = Some((station, distance));
            }
        }
        best.map(|(station, _)| station)
    }

    /// Reserves the nearest free station for `agent` in one step.
    ///
    /// Returns the agent's existing reservation when it already holds one.
    pub fn reserve_nearest(&self, agent: &AgentName, from: Coord) -> Option<ChargingStation> {
        let mut reservations = self.reservations.write();
        if let Some(id) = reservations
            .iter()
            .find(|(_, holder)| *holder == agent)
            .map(|(id, _)| id.clone())
        {
            return self.station(&id).cloned();
        }
        let station = Self::nearest_unreserved(&self.stations, &reservations, agent, from)?.clone();
        reservations.insert(station.id.clone(), agent.clone());
        info!(
            agent = %agent,
            station = %station.id,
            x = station.position.x,
            y = station.position.y,
            "station reserved"
        );
        Some(station)
    }

    /// Releases whatever `agent` holds.
    ///
    /// # Errors
    ///
    /// Returns [`EnergyError::NotReserved`] when the agent holds nothing.
    pub fn release(&self, agent: &AgentName) -> Result<StationId> {
        let mut reservations = self.reservations.write();
        let id = reservations
            .iter()
            .find(|(_, holder)| *holder == agent)
            .map(|(id, _)| id.clone())
            .ok_or_else(|| EnergyError::NotReserved {
                agent: agent.to_string(),
            })?;
        reservations.remove(&id);
        debug!(agent = %agent, station = %id, "station released");
        Ok(id)
    }

    /// Number of reserved stations.
    #[must_use]
    pub fn reserved_count(&self) -> usize {
        self.reservations.read().len()
    }
}
