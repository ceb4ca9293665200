//! # relay-sim
//!
//! Reference driver for the relay fleet.
//!
//! Builds a [`relay_core::GridWorld`] and the shared services from a
//! [`relay_core::FleetConfig`], spawns agents on seeded free cells, feeds
//! packages into the source zones and steps every agent once per tick.
//!
//! ```text
//! ┌───────────┐  FleetConfig  ┌────────────┐  step(&mut world)  ┌────────────────┐
//! │ relay-sim │──────────────►│ Simulation │───────────────────►│ TransportAgent │ ×N
//! └───────────┘               └─────┬──────┘                    └───────┬────────┘
//!                                   │ create_task                      │
//!                                   ▼                                  ▼
//!                           ┌─────────────────┐   Arc<…>    ┌──────────────────┐
//!                           │ TaskCoordinator │◄────────────│  AgentServices   │
//!                           └─────────────────┘             └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use relay_core::{FleetConfig, Role};
//! use relay_sim::{ClockMode, Simulation};
//!
//! let mut config = FleetConfig::default();
//! config.simulation.packages = 0;
//! let mut sim = Simulation::new(config, ClockMode::Stepped).unwrap();
//! let report = sim.run();
//! assert_eq!(report.role_count(Role::SourceToRelay), 2);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;
pub mod simulation;

pub use cli::{Cli, Commands, InitConfigArgs, RunArgs};
pub use error::{Result, SimError};
pub use output::write_report;
pub use simulation::{AgentReport, ClockMode, Simulation, SimulationReport};
