//! In-memory [`World`] backed by hash maps.

use std::collections::HashMap;

use tracing::debug;

use crate::config::LayoutConfig;
use crate::error::{FleetError, Result};
use crate::types::{AgentName, Coord, DestinationId, StationId, ZoneId};
use crate::world::{CellContent, GridBounds, Package, World, Zone};

/// Rectangular grid holding fixtures, zones and agents.
#[derive(Debug, Clone)]
pub struct GridWorld {
    bounds: GridBounds,
    fixtures: HashMap<Coord, CellContent>,
    zones: Vec<Zone>,
    agents: Vec<(AgentName, Coord)>,
}

impl GridWorld {
    /// Creates an empty grid.
    #[must_use]
    pub fn new(bounds: GridBounds) -> Self {
        Self {
            bounds,
            fixtures: HashMap::new(),
            zones: Vec::new(),
            agents: Vec::new(),
        }
    }

    /// Builds a grid from a layout.
    pub fn from_layout(layout: &LayoutConfig) -> Result<Self> {
        let mut world = Self::new(layout.bounds());
        for entry in &layout.source_zones {
            world.add_zone(Zone::source(entry.id.clone(), entry.position))?;
        }
        for entry in &layout.relay_zones {
            world.add_zone(Zone::relay(entry.id.clone(), entry.position, entry.capacity))?;
        }
        for goal in &layout.goals {
            world.add_goal(goal.id, goal.position)?;
        }
        for station in &layout.charging_stations {
            world.add_station(station.id.clone(), station.position)?;
        }
        for &obstacle in &layout.obstacles {
            world.add_obstacle(obstacle)?;
        }
        debug!(
            width = layout.width,
            height = layout.height,
            zones = world.zones.len(),
            "grid built"
        );
        Ok(world)
    }

    fn claim_fixture(&mut self, at: Coord, content: CellContent) -> Result<()> {
        if !self.bounds.contains(at) {
            return Err(FleetError::OutOfBounds { x: at.x, y: at.y });
        }
        if self.fixtures.contains_key(&at) || self.agent_at(at).is_some() {
            return Err(FleetError::CellOccupied { x: at.x, y: at.y });
        }
        self.fixtures.insert(at, content);
        Ok(())
    }

    /// Places a zone.
    pub fn add_zone(&mut self, zone: Zone) -> Result<()> {
        self.claim_fixture(zone.position(), CellContent::Zone(zone.id().clone()))?;
        self.zones.push(zone);
        Ok(())
    }

    /// Places a goal cell.
    pub fn add_goal(&mut self, id: DestinationId, at: Coord) -> Result<()> {
        self.claim_fixture(at, CellContent::Goal(id))
    }

    /// Places a charging station.
    pub fn add_station(&mut self, id: StationId, at: Coord) -> Result<()> {
        self.claim_fixture(at, CellContent::Station(id))
    }

    /// Places an obstacle.
    pub fn add_obstacle(&mut self, at: Coord) -> Result<()> {
        self.claim_fixture(at, CellContent::Obstacle)
    }

    /// Places an agent on a free cell.
    pub fn place_agent(&mut self, agent: AgentName, at: Coord) -> Result<()> {
        if !self.is_free(at) {
            return Err(FleetError::CellOccupied { x: at.x, y: at.y });
        }
        self.agents.push((agent, at));
        Ok(())
    }

    /// Adds a package to a zone.
    pub fn add_package(&mut self, zone: &ZoneId, package: Package) -> Result<()> {
        self.zone_mut(zone)
            .ok_or_else(|| FleetError::UnknownZone {
                zone: zone.to_string(),
            })?
            .add_package(package)
    }

    /// Current position of an agent.
    #[must_use]
    pub fn position_of(&self, agent: &AgentName) -> Option<Coord> {
        self.agents
            .iter()
            .find(|(name, _)| name == agent)
            .map(|&(_, at)| at)
    }

    fn agent_at(&self, at: Coord) -> Option<&AgentName> {
        self.agents
            .iter()
            .find(|&&(_, pos)| pos == at)
            .map(|(name, _)| name)
    }

    /// Every free cell, row by row.
    #[must_use]
    pub fn free_cells(&self) -> Vec<Coord> {
        (0..self.bounds.height)
            .flat_map(|y| (0..self.bounds.width).map(move |x| Coord::new(x, y)))
            .filter(|&c| self.is_free(c) && !self.fixtures.contains_key(&c))
            .collect()
    }

    /// Total packages held in all zones.
    #[must_use]
    pub fn packages_in_zones(&self) -> usize {
        self.zones.iter().map(Zone::len).sum()
    }
}

impl World for GridWorld {
    fn bounds(&self) -> GridBounds {
        self.bounds
    }

    fn query_cell(&self, at: Coord) -> Option<CellContent> {
        if let Some(name) = self.agent_at(at) {
            return Some(CellContent::Agent(name.clone()));
        }
        self.fixtures.get(&at).cloned()
    }

    fn list_agents(&self) -> Vec<(AgentName, Coord)> {
        self.agents.clone()
    }

    fn move_agent(&mut self, agent: &AgentName, from: Coord, to: Coord) -> Result<()> {
        if !from.is_adjacent(to) {
            return Err(FleetError::CellOccupied { x: to.x, y: to.y });
        }
        if !self.bounds.contains(to) {
            return Err(FleetError::OutOfBounds { x: to.x, y: to.y });
        }
        if !self.is_free(to) {
            return Err(FleetError::CellOccupied { x: to.x, y: to.y });
        }
        let entry = self
            .agents
            .iter_mut()
            .find(|(name, at)| name == agent && *at == from)
            .ok_or_else(|| FleetError::UnknownAgent {
                agent: agent.to_string(),
            })?;
        entry.1 = to;
        Ok(())
    }

    fn remove_agent(&mut self, at: Coord) -> Option<AgentName> {
        let index = self.agents.iter().position(|&(_, pos)| pos == at)?;
        Some(self.agents.remove(index).0)
    }

    fn zone(&self, id: &ZoneId) -> Option<&Zone> {
        self.zones.iter().find(|z| z.id() == id)
    }

    fn zone_mut(&mut self, id: &ZoneId) -> Option<&mut Zone> {
        self.zones.iter_mut().find(|z| z.id() == id)
    }

    fn zones(&self) -> Vec<&Zone> {
        self.zones.iter().collect()
    }
}
