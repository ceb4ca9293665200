//! Behavior of a single transport agent.
//!
//! A [`TransportAgent`] owns its position, battery, negotiation state and
//! payload. Everything it shares with the rest of the fleet (coordinator,
//! message bus, stations, ledger, clock) arrives through [`AgentServices`],
//! so agents never hold references to each other.
//!
//! # States
//!
//! ```text
//!             ┌─────────────┐
//!             │ Negotiating │
//!             └──────┬──────┘
//!                    ▼
//!   ┌──────────►   Free   ◄────────────┐
//!   │                │                 │
//!   │        pickup  ▼                 │ clear of relays
//!   │          Transporting ──────► MovingAway
//!   │                │   deposit / deliver (role 0)
//!   │                │
//!   │                └────────────► Delivered   (role 1, terminal)
//!   │
//!   │  full     Charging ◄── adjacent ── GoingToCharge ◄── low energy
//!   └──────────────┘                                       (any state)
//! ```
//!
//! Role 0 carries payloads from source zones to a relay zone, or straight to
//! the goal when the detour does not pay off. Role 1 collects parked
//! payloads, delivers exactly one and leaves the grid.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use relay_agent::{AgentServices, AgentSettings, BehaviorState, TransportAgent};
//! use relay_coordinator::{GoalTable, TaskCoordinator};
//! use relay_core::{
//!     AgentName, Coord, DeliveryLedger, GridWorld, LayoutConfig, ManualClock, MessageBus,
//! };
//! use relay_energy::StationRegistry;
//!
//! let layout = LayoutConfig::default();
//! let mut world = GridWorld::from_layout(&layout).unwrap();
//! let services = AgentServices {
//!     coordinator: Arc::new(TaskCoordinator::with_defaults()),
//!     bus: Arc::new(MessageBus::new()),
//!     stations: Arc::new(StationRegistry::from_layout(&layout)),
//!     ledger: Arc::new(DeliveryLedger::new()),
//!     clock: Arc::new(ManualClock::new()),
//!     goals: Arc::new(GoalTable::from_layout(&layout)),
//! };
//!
//! let name = AgentName::new("Agent0");
//! world.place_agent(name.clone(), Coord::new(1, 1)).unwrap();
//! let mut agent = TransportAgent::spawn(name, Coord::new(1, 1), AgentSettings::default(), services);
//! assert_eq!(agent.step(&mut world), BehaviorState::Negotiating);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

pub mod agent;
pub mod movement;
pub mod services;
pub mod state;

pub use agent::TransportAgent;
pub use movement::{Retreat, ZoneTarget, congestion_score, next_step};
pub use services::{AgentServices, AgentSettings};
pub use state::{BehaviorState, Cargo, TransportLeg};
