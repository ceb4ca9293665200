//! Broadcast messages and the per-agent mailbox bus.
//!
//! Broadcasting never calls into the receiver. Messages are queued in the
//! receiver's mailbox and drained at the start of its next step.

use std::collections::VecDeque;
use std::fmt;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::types::{AgentName, Coord, DestinationId, PackageId, Role, ZoneId};

/// Closed set of messages exchanged between agents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// An agent joined the fleet.
    Announce {
        /// Announcing agent.
        agent: AgentName,
    },
    /// An agent settled on a role.
    RoleClaim {
        /// Claiming agent.
        agent: AgentName,
        /// Claimed role.
        role: Role,
        /// Rank computed by the claimant.
        rank: usize,
        /// Number of role-0 agents the claimant expects.
        role0_count: usize,
    },
    /// A payload was deposited at a relay zone.
    PayloadAtRelay {
        /// Deposited package.
        package: PackageId,
        /// Relay zone holding the package.
        relay: ZoneId,
        /// Position of the relay zone.
        at: Coord,
        /// Final destination of the package.
        destination: DestinationId,
    },
    /// An agent entered the low-energy band.
    LowEnergy {
        /// Agent reporting low energy.
        agent: AgentName,
        /// Current position.
        at: Coord,
        /// Remaining energy.
        level: u32,
    },
    /// An agent is stuck and asks for assistance.
    HelpRequest {
        /// Requesting agent.
        agent: AgentName,
        /// Current position.
        at: Coord,
    },
    /// Reply to a [`Message::HelpRequest`].
    HelpOffer {
        /// Offering agent.
        agent: AgentName,
        /// Current position.
        at: Coord,
    },
}

/// Tag of a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// [`Message::Announce`].
    Announce,
    /// [`Message::RoleClaim`].
    RoleClaim,
    /// [`Message::PayloadAtRelay`].
    PayloadAtRelay,
    /// [`Message::LowEnergy`].
    LowEnergy,
    /// [`Message::HelpRequest`].
    HelpRequest,
    /// [`Message::HelpOffer`].
    HelpOffer,
}

impl Message {
    /// Returns the tag of this message.
    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        match self {
            Self::Announce { .. } => MessageKind::Announce,
            Self::RoleClaim { .. } => MessageKind::RoleClaim,
            Self::PayloadAtRelay { .. } => MessageKind::PayloadAtRelay,
            Self::LowEnergy { .. } => MessageKind::LowEnergy,
            Self::HelpRequest { .. } => MessageKind::HelpRequest,
            Self::HelpOffer { .. } => MessageKind::HelpOffer,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Announce => "ANNOUNCE",
            Self::RoleClaim => "ROLE_CLAIM",
            Self::PayloadAtRelay => "PAYLOAD_AT_RELAY",
            Self::LowEnergy => "LOW_ENERGY",
            Self::HelpRequest => "HELP_REQUEST",
            Self::HelpOffer => "HELP_OFFER",
        };
        f.write_str(name)
    }
}

/// A message together with its sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Sending agent.
    pub from: AgentName,
    /// Message body.
    pub message: Message,
}

#[derive(Debug)]
struct Mailbox {
    owner: AgentName,
    pending: VecDeque<Envelope>,
}

/// Registry of agent mailboxes.
///
/// Registration order is preserved and doubles as the fleet roster used to
/// count agents during negotiation.
#[derive(Debug, Default)]
pub struct MessageBus {
    mailboxes: Mutex<Vec<Mailbox>>,
}

impl MessageBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a mailbox for `agent`. Returns false if one already exists.
    pub fn register(&self, agent: &AgentName) -> bool {
        let mut mailboxes = self.mailboxes.lock();
        if mailboxes.iter().any(|m| &m.owner == agent) {
            return false;
        }
        mailboxes.push(Mailbox {
            owner: agent.clone(),
            pending: VecDeque::new(),
        });
        true
    }

    /// Removes the mailbox of `agent`, discarding anything still queued.
    pub fn unregister(&self, agent: &AgentName) -> bool {
        let mut mailboxes = self.mailboxes.lock();
        let before = mailboxes.len();
        mailboxes.retain(|m| &m.owner != agent);
        mailboxes.len() != before
    }

    /// Queues `message` for every registered agent except `from`.
    ///
    /// Returns the number of recipients.
    pub fn broadcast(&self, from: &AgentName, message: &Message) -> usize {
        let mut mailboxes = self.mailboxes.lock();
        let mut delivered = 0;
        for mailbox in mailboxes.iter_mut().filter(|m| &m.owner != from) {
            mailbox.pending.push_back(Envelope {
                from: from.clone(),
                message: message.clone(),
            });
            delivered += 1;
        }
        trace!(from = %from, kind = %message.kind(), recipients = delivered, "broadcast");
        delivered
    }

    /// Queues `message` for a single agent. Returns false if `to` is unknown.
    pub fn send(&self, from: &AgentName, to: &AgentName, message: Message) -> bool {
        let mut mailboxes = self.mailboxes.lock();
        match mailboxes.iter_mut().find(|m| &m.owner == to) {
            Some(mailbox) => {
                mailbox.pending.push_back(Envelope {
                    from: from.clone(),
                    message,
                });
                true
            }
            None => false,
        }
    }

    /// Takes every queued message for `agent`, oldest first.
    pub fn drain(&self, agent: &AgentName) -> Vec<Envelope> {
        let mut mailboxes = self.mailboxes.lock();
        mailboxes
            .iter_mut()
            .find(|m| &m.owner == agent)
            .map(|m| m.pending.drain(..).collect())
            .unwrap_or_default()
    }

    /// Number of messages waiting for `agent`.
    #[must_use]
    pub fn pending(&self, agent: &AgentName) -> usize {
        self.mailboxes
            .lock()
            .iter()
            .find(|m| &m.owner == agent)
            .map_or(0, |m| m.pending.len())
    }

    /// Names of all registered agents in registration order.
    #[must_use]
    pub fn registered(&self) -> Vec<AgentName> {
        self.mailboxes.lock().iter().map(|m| m.owner.clone()).collect()
    }

    /// Number of registered mailboxes.
    #[must_use]
    pub fn registered_count(&self) -> usize {
        self.mailboxes.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(n: &str) -> AgentName {
        AgentName::new(n)
    }

    fn announce(n: &str) -> Message {
        Message::Announce { agent: name(n) }
    }

    #[test]
    fn register_is_idempotent() {
        let bus = MessageBus::new();
        assert!(bus.register(&name("Agent0")));
        assert!(!bus.register(&name("Agent0")));
        assert_eq!(bus.registered_count(), 1);
    }

    #[test]
    fn broadcast_skips_sender() {
        let bus = MessageBus::new();
        for n in ["Agent0", "Agent1", "Agent2"] {
            bus.register(&name(n));
        }

        let recipients = bus.broadcast(&name("Agent0"), &announce("Agent0"));

        assert_eq!(recipients, 2);
        assert_eq!(bus.pending(&name("Agent0")), 0);
        assert_eq!(bus.pending(&name("Agent1")), 1);
        assert_eq!(bus.pending(&name("Agent2")), 1);
    }

    #[test]
    fn drain_returns_messages_in_order_and_empties_mailbox() {
        let bus = MessageBus::new();
        bus.register(&name("Agent0"));
        bus.register(&name("Agent1"));

        bus.broadcast(&name("Agent1"), &announce("Agent1"));
        bus.send(
            &name("Agent1"),
            &name("Agent0"),
            Message::HelpOffer {
                agent: name("Agent1"),
                at: Coord::new(1, 1),
            },
        );

        let drained = bus.drain(&name("Agent0"));
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].message.kind(), MessageKind::Announce);
        assert_eq!(drained[1].message.kind(), MessageKind::HelpOffer);
        assert!(bus.drain(&name("Agent0")).is_empty());
    }

    #[test]
    fn send_to_unknown_agent_fails() {
        let bus = MessageBus::new();
        bus.register(&name("Agent0"));
        assert!(!bus.send(&name("Agent0"), &name("Ghost"), announce("Agent0")));
    }

    #[test]
    fn unregister_stops_delivery() {
        let bus = MessageBus::new();
        bus.register(&name("Agent0"));
        bus.register(&name("Agent1"));
        assert!(bus.unregister(&name("Agent1")));

        assert_eq!(bus.broadcast(&name("Agent0"), &announce("Agent0")), 0);
        assert_eq!(bus.registered(), vec![name("Agent0")]);
    }

    #[test]
    fn message_serializes_with_type_tag() {
        let json = serde_json::to_string(&announce("Agent3")).unwrap_or_default();
        assert!(json.contains("\"type\":\"announce\""));
        assert!(json.contains("Agent3"));
    }

    #[test]
    fn kind_display_is_wire_style() {
        assert_eq!(MessageKind::PayloadAtRelay.to_string(), "PAYLOAD_AT_RELAY");
    }
}
