//! Per-agent negotiation state machine.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use relay_core::{AgentName, Clock, Envelope, Message, MessageBus, NegotiationConfig, Role};

use crate::protocol::{convention_rank, role0_quota, role_for_rank};

/// Retained notifications kept per agent; older ones are dropped first.
const RETAINED_LIMIT: usize = 64;

/// Negotiation progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NegotiationPhase {
    /// Collecting announcements.
    Listen,
    /// Computing and broadcasting the role claim.
    Claim,
    /// Waiting for the finalize deadline.
    Finalize,
    /// Role fixed for the rest of the run.
    Complete,
}

/// What happened to an absorbed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Kept in the notification cache.
    Retained,
    /// Parsed and dropped.
    Discarded,
}

/// Phase deadlines measured from negotiation start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiationTiming {
    /// Base time unit.
    pub wait_unit: Duration,
    /// Listen phase length in units.
    pub listen_units: u32,
    /// Time to completion in units.
    pub finalize_units: u32,
}

impl NegotiationTiming {
    /// Builds timing from configuration.
    #[must_use]
    pub fn from_config(config: &NegotiationConfig) -> Self {
        Self {
            wait_unit: Duration::from_millis(config.wait_unit_ms),
            listen_units: config.listen_units,
            finalize_units: config.finalize_units,
        }
    }

    /// End of the listen phase.
    #[must_use]
    pub fn listen_deadline(&self) -> Duration {
        self.wait_unit * self.listen_units
    }

    /// Completion time.
    #[must_use]
    pub fn finalize_deadline(&self) -> Duration {
        self.wait_unit * self.finalize_units
    }
}

/// Runs the three-phase negotiation for one agent.
#[derive(Debug, Clone)]
pub struct Negotiator {
    agent: AgentName,
    prefix: String,
    timing: NegotiationTiming,
    started_at: Instant,
    phase: NegotiationPhase,
    known_total: usize,
    rank: Option<usize>,
    role: Option<Role>,
    peers: BTreeSet<AgentName>,
    known_role0_count: usize,
    retained: Vec<Envelope>,
}

impl Negotiator {
    /// Registers `agent` on the bus, announces it and starts listening.
    pub fn start(
        agent: AgentName,
        config: &NegotiationConfig,
        bus: &MessageBus,
        clock: &dyn Clock,
    ) -> Self {
        bus.register(&agent);
        bus.broadcast(
            &agent,
            &Message::Announce {
                agent: agent.clone(),
            },
        );
        debug!(agent = %agent, "negotiation started");
        Self {
            agent,
            prefix: config.name_prefix.clone(),
            timing: NegotiationTiming::from_config(config),
            started_at: clock.now(),
            phase: NegotiationPhase::Listen,
            known_total: 0,
            rank: None,
            role: None,
            peers: BTreeSet::new(),
            known_role0_count: 0,
            retained: Vec::new(),
        }
    }

    /// Agent this negotiator speaks for.
    #[must_use]
    pub fn agent(&self) -> &AgentName {
        &self.agent
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> NegotiationPhase {
        self.phase
    }

    /// True once the finalize deadline has passed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.phase == NegotiationPhase::Complete
    }

    /// Claimed role, `None` while undecided.
    #[must_use]
    pub const fn role(&self) -> Option<Role> {
        self.role
    }

    /// Rank computed at claim time.
    #[must_use]
    pub const fn rank(&self) -> Option<usize> {
        self.rank
    }

    /// Agent count snapshotted at the end of the listen phase.
    #[must_use]
    pub const fn known_total(&self) -> usize {
        self.known_total
    }

    /// Peers heard from via announcements and claims.
    #[must_use]
    pub fn peers(&self) -> &BTreeSet<AgentName> {
        &self.peers
    }

    /// Largest role-0 count advertised by any claim, including our own.
    #[must_use]
    pub const fn known_role0_count(&self) -> usize {
        self.known_role0_count
    }

    /// Cached notifications, oldest first.
    #[must_use]
    pub fn retained(&self) -> &[Envelope] {
        &self.retained
    }

    /// Drops cached notifications for which `keep` returns false.
    pub fn prune_retained(&mut self, keep: impl FnMut(&Envelope) -> bool) {
        self.retained.retain(keep);
    }

    fn retains(&self) -> bool {
        self.role.is_none_or(Role::is_relay_tier)
    }

    /// Parses one incoming message.
    ///
    /// Role claims and relay notifications are cached by undecided and
    /// relay-tier agents. Everything else is dropped after parsing.
    pub fn absorb(&mut self, envelope: Envelope) -> Disposition {
        match &envelope.message {
            Message::Announce { agent } => {
                if agent != &self.agent {
                    self.peers.insert(agent.clone());
                }
                Disposition::Discarded
            }
            Message::RoleClaim {
                agent, role0_count, ..
            } => {
                if agent != &self.agent {
                    self.peers.insert(agent.clone());
                }
                self.known_role0_count = self.known_role0_count.max(*role0_count);
                self.retain(envelope)
            }
            Message::PayloadAtRelay { .. } => self.retain(envelope),
            Message::LowEnergy { .. } | Message::HelpRequest { .. } | Message::HelpOffer { .. } => {
                Disposition::Discarded
            }
        }
    }

    fn retain(&mut self, envelope: Envelope) -> Disposition {
        if !self.retains() {
            return Disposition::Discarded;
        }
        if self.retained.len() >= RETAINED_LIMIT {
            self.retained.remove(0);
        }
        self.retained.push(envelope);
        Disposition::Retained
    }

    /// Advances the protocol according to elapsed time.
    ///
    /// Phases whose deadlines have already passed are run in the same call.
    pub fn step(&mut self, bus: &MessageBus, clock: &dyn Clock) -> NegotiationPhase {
        let elapsed = clock.now().saturating_duration_since(self.started_at);

        if self.phase == NegotiationPhase::Listen && elapsed >= self.timing.listen_deadline() {
            self.known_total = bus.registered_count().max(self.peers.len() + 1);
            debug!(
                agent = %self.agent,
                known_total = self.known_total,
                "listen phase over"
            );
            self.phase = NegotiationPhase::Claim;
        }

        if self.phase == NegotiationPhase::Claim {
            self.claim(bus);
            self.phase = NegotiationPhase::Finalize;
        }

        if self.phase == NegotiationPhase::Finalize && elapsed >= self.timing.finalize_deadline() {
            self.phase = NegotiationPhase::Complete;
            info!(
                agent = %self.agent,
                role = ?self.role,
                rank = ?self.rank,
                total = self.known_total,
                "negotiation complete"
            );
        }

        self.phase
    }

    /// Computes and broadcasts the role claim. Later calls return the same
    /// role without broadcasting again.
    pub fn claim(&mut self, bus: &MessageBus) -> Role {
        if let Some(role) = self.role {
            return role;
        }
        if self.known_total == 0 {
            self.known_total = bus.registered_count().max(self.peers.len() + 1);
        }
        let total = self.known_total;
        let rank = convention_rank(&self.agent, total, &self.prefix);
        let role = role_for_rank(rank, total);
        let quota = role0_quota(total);

        self.rank = Some(rank);
        self.role = Some(role);
        self.known_role0_count = self.known_role0_count.max(quota);
        if !role.is_relay_tier() {
            self.retained.clear();
        }

        bus.broadcast(
            &self.agent,
            &Message::RoleClaim {
                agent: self.agent.clone(),
                role,
                rank,
                role0_count: quota,
            },
        );
        info!(agent = %self.agent, role = %role, rank, total, "role claimed");
        role
    }
}
