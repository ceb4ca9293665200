//! Behavior states and the payload an agent carries.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use relay_core::{Coord, DestinationId, Package, ZoneId};

/// Where an agent is in its work cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorState {
    /// Running the role negotiation.
    Negotiating,
    /// Idle, or walking to a claimed payload.
    Free,
    /// Carrying a payload.
    Transporting,
    /// Clearing the relay area after a hand-off.
    MovingAway,
    /// Walking to a charging station.
    GoingToCharge,
    /// Standing next to a station and charging.
    Charging,
    /// Relay-tier agent finished its delivery and left the grid.
    Delivered,
}

impl BehaviorState {
    /// True for the terminal state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered)
    }
}

impl fmt::Display for BehaviorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Negotiating => "negotiating",
            Self::Free => "free",
            Self::Transporting => "transporting",
            Self::MovingAway => "moving-away",
            Self::GoingToCharge => "going-to-charge",
            Self::Charging => "charging",
            Self::Delivered => "delivered",
        };
        f.write_str(name)
    }
}

/// Where a carried payload is headed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportLeg {
    /// Drop the payload at a relay zone.
    ToRelay {
        /// Relay zone.
        zone: ZoneId,
        /// Position of the relay zone.
        at: Coord,
    },
    /// Deliver the payload to its goal cell.
    ToGoal {
        /// Destination of the payload.
        destination: DestinationId,
        /// Goal cell.
        at: Coord,
    },
}

impl TransportLeg {
    /// Cell the agent walks toward.
    #[must_use]
    pub const fn target(&self) -> Coord {
        match self {
            Self::ToRelay { at, .. } | Self::ToGoal { at, .. } => *at,
        }
    }

    /// True for the relay leg.
    #[must_use]
    pub const fn is_relay(&self) -> bool {
        matches!(self, Self::ToRelay { .. })
    }
}

/// A payload in an agent's hands.
#[derive(Debug, Clone)]
pub struct Cargo {
    /// The package itself.
    pub package: Package,
    /// Current leg.
    pub leg: TransportLeg,
    /// When the payload was picked up.
    pub picked_at: Instant,
    /// Energy level at pickup.
    pub energy_at_pickup: u32,
    /// Energy level when the route was last evaluated.
    pub route_energy: u32,
}

impl Cargo {
    /// Energy spent since pickup given the current level.
    #[must_use]
    pub const fn energy_spent(&self, level: u32) -> u32 {
        self.energy_at_pickup.saturating_sub(level)
    }
}
