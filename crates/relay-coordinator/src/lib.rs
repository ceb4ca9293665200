//! Market-based task allocation for the relay fleet.
//!
//! The [`TaskCoordinator`] is the one piece of shared decision-making in the
//! fleet. It owns the per-zone task queues, runs a utility auction when an
//! idle agent asks for work, and learns from finished deliveries through an
//! efficiency moving average.
//!
//! # Architecture
//!
//! ```text
//!   source zones                      TaskCoordinator
//!  ┌────┬────┬────┐   create_task   ┌──────────────────────────┐
//!  │ A1 │ A2 │ A3 │ ──────────────► │ queues (one per zone)    │
//!  └────┴────┴────┘                 │ assigned tasks           │
//!                                   │ efficiency records       │
//!        agent ── find_best ──────► │ relay collector counts   │
//!        agent ◄─ Task ──────────── │                          │
//!        agent ── update_agent_ ──► │                          │
//!                 efficiency        └──────────────────────────┘
//! ```
//!
//! # Utility
//!
//! | Term        | Weight | Value                                       |
//! |-------------|--------|---------------------------------------------|
//! | proximity   | 0.7    | mean of `e^(-0.2·d_src)` and `e^(-0.05·d_goal)` |
//! | battery     | 0.1    | 1 above 20% charge, else 0                  |
//! | efficiency  | 0.2    | moving average, starts at 1.0               |
//! | bonus       | 1      | `max(0, 0.5 - 0.05·deliveries)`             |
//! | priority    | 1      | `0.2·priority`                              |
//!
//! # Example
//!
//! ```rust
//! use relay_coordinator::{AgentSnapshot, GoalTable, TaskCoordinator};
//! use relay_core::{AgentName, Coord, DestinationId, LayoutConfig, Package, PackageId, ZoneId};
//!
//! let coordinator = TaskCoordinator::with_defaults();
//! let goals = GoalTable::from_layout(&LayoutConfig::default());
//! let package = Package::new(PackageId::new(1), DestinationId::new(1), ZoneId::new("A1"));
//! coordinator.create_task(&package, Coord::new(6, 19), &goals);
//!
//! let agent = AgentSnapshot::new(AgentName::new("Agent0"), Coord::new(6, 18), 100);
//! let task = coordinator.find_best_task_for_agent(&agent);
//! assert_eq!(task.map(|t| t.package), Some(PackageId::new(1)));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

pub mod coordinator;
pub mod error;
pub mod routing;
pub mod types;
pub mod utility;

pub use coordinator::TaskCoordinator;
pub use error::{CoordinatorError, Result};
pub use routing::{RouteDecision, RouteReason, RoutingInput, decide_route};
pub use types::{
    AgentSnapshot, AgentStats, CoordinatorStats, EfficiencyRecord, GoalTable, RelayCapacity, Task,
    TaskId,
};
pub use utility::{penalize_for_difficulty, priority_for, smoothed_efficiency, utility};
