//! Decentralized role negotiation.
//!
//! Agents split themselves into two tiers without a coordinator. Each agent
//! announces itself, listens for a while, ranks its own name against the
//! conventional names `Agent0..Agent{N-1}`, and claims role 0 when its rank
//! falls in the lower half. Exactly `floor(N/2)` agents end up in role 0 no
//! matter which messages arrive.
//!
//! # Phases
//!
//! ```text
//!  start ──► Listen ──(4 units)──► Claim ──► Finalize ──(9 units)──► Complete
//!              │                     │
//!              │ Announce            │ RoleClaim (broadcast once)
//! ```
//!
//! Deadlines are measured on an injected [`relay_core::Clock`], so tests drive
//! negotiation with a [`relay_core::ManualClock`].

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

pub mod negotiator;
pub mod protocol;

pub use negotiator::{Disposition, NegotiationPhase, NegotiationTiming, Negotiator};
pub use protocol::{convention_rank, role0_quota, role_for_rank};
