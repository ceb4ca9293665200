//! The world boundary: cells, zones and packages.
//!
//! Agents only see the grid through the [`World`] trait. The in-memory
//! implementation lives in [`crate::grid`].

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::{FleetError, Result};
use crate::types::{AgentName, Coord, DestinationId, Direction, PackageId, StationId, ZoneId};

/// Lifecycle of a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PackageState {
    /// Waiting in its source zone.
    #[default]
    Waiting,
    /// Carried by an agent.
    InTransit,
    /// Parked in a relay zone.
    AtRelay,
    /// Delivered to its goal.
    Arrived,
}

/// A payload to be delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    id: PackageId,
    destination: DestinationId,
    source_zone: ZoneId,
    state: PackageState,
}

impl Package {
    /// Creates a waiting package.
    #[must_use]
    pub fn new(id: PackageId, destination: DestinationId, source_zone: ZoneId) -> Self {
        Self {
            id,
            destination,
            source_zone,
            state: PackageState::Waiting,
        }
    }

    /// Package identifier.
    #[must_use]
    pub const fn id(&self) -> PackageId {
        self.id
    }

    /// Destination identifier.
    #[must_use]
    pub const fn destination(&self) -> DestinationId {
        self.destination
    }

    /// Zone the package was produced in.
    #[must_use]
    pub fn source_zone(&self) -> &ZoneId {
        &self.source_zone
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> PackageState {
        self.state
    }

    /// Updates the lifecycle state.
    pub fn set_state(&mut self, state: PackageState) {
        self.state = state;
    }
}

/// Kind of zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneKind {
    /// Where packages appear. Unbounded.
    Source,
    /// Bounded intermediate holding area.
    Relay,
}

/// A zone occupying one cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    id: ZoneId,
    kind: ZoneKind,
    position: Coord,
    capacity: Option<usize>,
    packages: VecDeque<Package>,
}

impl Zone {
    /// Creates an unbounded source zone.
    #[must_use]
    pub fn source(id: ZoneId, position: Coord) -> Self {
        Self {
            id,
            kind: ZoneKind::Source,
            position,
            capacity: None,
            packages: VecDeque::new(),
        }
    }

    /// Creates a relay zone holding at most `capacity` packages.
    #[must_use]
    pub fn relay(id: ZoneId, position: Coord, capacity: usize) -> Self {
        Self {
            id,
            kind: ZoneKind::Relay,
            position,
            capacity: Some(capacity),
            packages: VecDeque::new(),
        }
    }

    /// Zone identifier.
    #[must_use]
    pub fn id(&self) -> &ZoneId {
        &self.id
    }

    /// Zone kind.
    #[must_use]
    pub const fn kind(&self) -> ZoneKind {
        self.kind
    }

    /// Cell occupied by the zone.
    #[must_use]
    pub const fn position(&self) -> Coord {
        self.position
    }

    /// Capacity limit, `None` when unbounded.
    #[must_use]
    pub const fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Packages held, oldest first.
    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.packages.iter()
    }

    /// Oldest package held.
    #[must_use]
    pub fn first_package(&self) -> Option<&Package> {
        self.packages.front()
    }

    /// Number of packages held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// True when the zone holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// True when another package would exceed capacity.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.capacity.is_some_and(|cap| self.packages.len() >= cap)
    }

    /// Adds a package. A full zone rejects it and is left unchanged.
    pub fn add_package(&mut self, package: Package) -> Result<()> {
        if let Some(capacity) = self.capacity {
            if self.packages.len() >= capacity {
                return Err(FleetError::ZoneFull {
                    zone: self.id.to_string(),
                    capacity,
                });
            }
        }
        self.packages.push_back(package);
        Ok(())
    }

    /// Removes a specific package.
    pub fn remove_package(&mut self, id: PackageId) -> Option<Package> {
        let index = self.packages.iter().position(|p| p.id == id)?;
        self.packages.remove(index)
    }

    /// Removes the oldest package.
    pub fn take_first(&mut self) -> Option<Package> {
        self.packages.pop_front()
    }
}

/// What a cell holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellContent {
    /// An agent stands here.
    Agent(AgentName),
    /// A source or relay zone.
    Zone(ZoneId),
    /// A charging station.
    Station(StationId),
    /// A delivery goal. Agents may enter it.
    Goal(DestinationId),
    /// Impassable terrain.
    Obstacle,
}

impl CellContent {
    /// True when an agent may step onto the cell.
    #[must_use]
    pub const fn is_passable(&self) -> bool {
        matches!(self, Self::Goal(_))
    }
}

/// Grid dimensions. Valid coordinates are `0..width` by `0..height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridBounds {
    /// Number of columns.
    pub width: i32,
    /// Number of rows.
    pub height: i32,
}

impl GridBounds {
    /// Creates bounds.
    #[must_use]
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// True when `at` lies on the grid.
    #[must_use]
    pub const fn contains(&self, at: Coord) -> bool {
        at.x >= 0 && at.y >= 0 && at.x < self.width && at.y < self.height
    }
}

/// Grid access used by agents.
pub trait World {
    /// Grid dimensions.
    fn bounds(&self) -> GridBounds;

    /// Content of a cell, `None` when empty.
    fn query_cell(&self, at: Coord) -> Option<CellContent>;

    /// Every agent currently placed, in placement order.
    fn list_agents(&self) -> Vec<(AgentName, Coord)>;

    /// Neighbouring cells in direction order, without any filtering.
    fn candidate_moves(&self, from: Coord) -> Vec<(Direction, Coord)> {
        Direction::ALL.iter().map(|&d| (d, from.step(d))).collect()
    }

    /// Moves `agent` from `from` to the adjacent cell `to`.
    fn move_agent(&mut self, agent: &AgentName, from: Coord, to: Coord) -> Result<()>;

    /// Removes the agent standing at `at`.
    fn remove_agent(&mut self, at: Coord) -> Option<AgentName>;

    /// Looks up a zone.
    fn zone(&self, id: &ZoneId) -> Option<&Zone>;

    /// Looks up a zone for mutation.
    fn zone_mut(&mut self, id: &ZoneId) -> Option<&mut Zone>;

    /// All zones in registration order.
    fn zones(&self) -> Vec<&Zone>;

    /// True when `at` is on the grid and passable.
    fn is_free(&self, at: Coord) -> bool {
        self.bounds().contains(at) && self.query_cell(at).is_none_or(|c| c.is_passable())
    }

    /// Candidate moves that land on free cells.
    fn legal_moves(&self, from: Coord) -> Vec<(Direction, Coord)> {
        self.candidate_moves(from)
            .into_iter()
            .filter(|&(_, to)| self.is_free(to))
            .collect()
    }

    /// Zones of one kind in registration order.
    fn zones_of_kind(&self, kind: ZoneKind) -> Vec<&Zone> {
        self.zones().into_iter().filter(|z| z.kind() == kind).collect()
    }

    /// Number of agents other than `except` within `radius` of `at`.
    fn agents_near(&self, at: Coord, radius: f64, except: Option<&AgentName>) -> usize {
        self.list_agents()
            .iter()
            .filter(|(name, pos)| Some(name) != except && at.euclidean(*pos) <= radius)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn package(id: u32) -> Package {
        Package::new(PackageId::new(id), DestinationId::new(1), ZoneId::new("A1"))
    }

    #[test]
    fn package_state_transitions() {
        let mut p = package(1);
        assert_eq!(p.state(), PackageState::Waiting);
        p.set_state(PackageState::Arrived);
        assert_eq!(p.state(), PackageState::Arrived);
    }

    #[test]
    fn source_zone_is_unbounded() {
        let mut zone = Zone::source(ZoneId::new("A1"), Coord::new(6, 19));
        for id in 0..100 {
            assert!(zone.add_package(package(id)).is_ok());
        }
        assert!(!zone.is_full());
        assert_eq!(zone.len(), 100);
    }

    #[test]
    fn relay_zone_rejects_when_full() {
        let mut zone = Zone::relay(ZoneId::new("R1"), Coord::new(12, 10), 1);
        assert!(zone.add_package(package(1)).is_ok());
        assert!(zone.is_full());

        let err = zone.add_package(package(2));
        assert!(matches!(err, Err(FleetError::ZoneFull { capacity: 1, .. })));
        assert_eq!(zone.len(), 1);
        assert_eq!(zone.first_package().map(Package::id), Some(PackageId::new(1)));
    }

    #[test]
    fn remove_specific_package() {
        let mut zone = Zone::source(ZoneId::new("A1"), Coord::new(6, 19));
        for id in 1..=3 {
            assert!(zone.add_package(package(id)).is_ok());
        }
        let removed = zone.remove_package(PackageId::new(2));
        assert_eq!(removed.map(|p| p.id()), Some(PackageId::new(2)));
        assert!(zone.remove_package(PackageId::new(2)).is_none());
        let ids: Vec<_> = zone.packages().map(Package::id).collect();
        assert_eq!(ids, vec![PackageId::new(1), PackageId::new(3)]);
    }

    #[test]
    fn only_goals_are_passable() {
        assert!(CellContent::Goal(DestinationId::new(1)).is_passable());
        assert!(!CellContent::Obstacle.is_passable());
        assert!(!CellContent::Zone(ZoneId::new("A1")).is_passable());
        assert!(!CellContent::Station(StationId::new("S1")).is_passable());
        assert!(!CellContent::Agent(AgentName::new("Agent0")).is_passable());
    }

    #[test]
    fn bounds_contains() {
        let bounds = GridBounds::new(20, 20);
        assert!(bounds.contains(Coord::new(0, 0)));
        assert!(bounds.contains(Coord::new(19, 19)));
        assert!(!bounds.contains(Coord::new(20, 0)));
        assert!(!bounds.contains(Coord::new(0, -1)));
    }

    proptest! {
        #[test]
        fn relay_occupancy_never_exceeds_capacity(capacity in 1usize..6, attempts in 0u32..20) {
            let mut zone = Zone::relay(ZoneId::new("R1"), Coord::new(0, 0), capacity);
            for id in 0..attempts {
                let _ = zone.add_package(package(id));
                prop_assert!(zone.len() <= capacity);
            }
        }
    }
}
