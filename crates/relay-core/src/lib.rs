//! Shared vocabulary for the relay fleet.
//!
//! `relay-core` holds everything the fleet crates agree on and nothing that
//! makes decisions:
//!
//! - **Identifiers and geometry**: [`AgentName`], [`ZoneId`], [`Coord`], [`Role`]
//! - **Messaging**: the closed [`Message`] set and the mailbox-based [`MessageBus`]
//! - **Time**: the [`Clock`] trait with system and manual implementations
//! - **World boundary**: the [`World`] trait, [`Zone`], [`Package`] and the
//!   in-memory [`GridWorld`]
//! - **Configuration**: [`FleetConfig`], loaded from JSON
//! - **Deliveries**: the shared [`DeliveryLedger`]
//!
//! # Example
//!
//! ```rust
//! use relay_core::{FleetConfig, GridWorld, World, ZoneKind};
//!
//! let config = FleetConfig::default();
//! let world = GridWorld::from_layout(&config.layout).unwrap();
//! assert_eq!(world.zones_of_kind(ZoneKind::Source).len(), 3);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

pub mod clock;
pub mod config;
pub mod error;
pub mod grid;
pub mod ledger;
pub mod message;
pub mod types;
pub mod world;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    AllocationConfig, BehaviorConfig, EnergyConfig, FleetConfig, GoalSpec, LayoutConfig,
    NegotiationConfig, RelayZoneSpec, RoutingConfig, SimulationConfig, SourceZoneSpec,
    StationSpec,
};
pub use error::{FleetError, Result};
pub use grid::GridWorld;
pub use ledger::{DeliveryLedger, DeliveryRecord};
pub use message::{Envelope, Message, MessageBus, MessageKind};
pub use types::{AgentName, Coord, DestinationId, Direction, PackageId, Role, StationId, ZoneId};
pub use world::{CellContent, GridBounds, Package, PackageState, World, Zone, ZoneKind};
