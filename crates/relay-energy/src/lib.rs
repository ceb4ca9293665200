//! Energy model for relay fleet agents.
//!
//! Every agent carries an [`EnergyModel`]: an integer battery that drains one
//! unit per move, recharges at a fixed rate at a station, and reports
//! threshold crossings as edge-triggered [`EnergyEvent`]s.
//!
//! Stations are shared through a [`StationRegistry`]. An agent reserves the
//! nearest free station before heading there and releases it once full.
//!
//! # Thresholds
//!
//! | Check | Default | Meaning |
//! |-------|---------|---------|
//! | `needs_charging` | level ≤ 20 | abandon work and recharge |
//! | `has_sufficient_energy_for_task` | level ≥ 60 | may accept new work |
//!
//! # Example
//!
//! ```rust
//! use relay_core::{AgentName, Coord, EnergyConfig, LayoutConfig};
//! use relay_energy::{EnergyModel, StationRegistry};
//!
//! let mut battery = EnergyModel::new(EnergyConfig::default());
//! battery.consume(85);
//! assert!(battery.needs_charging());
//!
//! let stations = StationRegistry::from_layout(&LayoutConfig::default());
//! let station = stations.reserve_nearest(&AgentName::new("Agent0"), Coord::new(3, 3));
//! assert!(station.is_some());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod model;
pub mod stations;

pub use error::{EnergyError, Result};
pub use model::{EnergyEvent, EnergyModel};
pub use stations::{ChargingStation, StationRegistry};
