//! Rank and role rules shared by every negotiator.
//!
//! The total agent count is only known by convention: agents are assumed to
//! be named `prefix + i` for `i in 0..total`. An agent's rank is the number of
//! conventional names that sort before its own name.

use relay_core::{AgentName, Role};

/// Number of conventional names that sort lexicographically before `name`.
#[must_use]
pub fn convention_rank(name: &AgentName, total: usize, prefix: &str) -> usize {
    (0..total)
        .filter(|&i| AgentName::indexed(prefix, i) < *name)
        .count()
}

/// How many agents take [`Role::SourceToRelay`].
#[must_use]
pub const fn role0_quota(total: usize) -> usize {
    total / 2
}

/// Role for an agent of the given rank.
#[must_use]
pub const fn role_for_rank(rank: usize, total: usize) -> Role {
    if rank < role0_quota(total) {
        Role::SourceToRelay
    } else {
        Role::RelayToGoal
    }
}
