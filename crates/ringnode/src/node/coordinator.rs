//! Coordination node state machine.
//!
//! Owns the Lamport clock, the leader pointer, the election flag, the
//! membership set and the token flag. It performs no IO: every transition
//! returns the effects the runtime has to carry out.
//!
//! Protocol summary:
//! - Election (bully): broadcast `Election`; any higher node answers
//!   `ImHigher` and runs its own attempt. Whoever hears nothing before the
//!   timeout broadcasts `ImLeader` and then `WhoIsOnline`.
//! - Presence: `WhoIsOnline` resets the receiver's view to the asker, the
//!   receiver answers `ImOnline`, everyone records `ImOnline` senders.
//! - Token ring: the holder uses the resource, then addresses `Token` to
//!   the next higher online id, wrapping to the lowest.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ringleader_common::constants::{
    ELECTION_TIMEOUT_MS, RESOURCE_MAX_HOLD_MS, RESOURCE_MIN_HOLD_MS,
};
use ringleader_common::{Envelope, LamportClock, NodeId, PayloadTag, Recipient, RingleaderError};
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Duration;

use super::effect::Effect;

/// Protocol timings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeTimings {
    /// How long an election attempt waits for `ImHigher`
    pub election_timeout: Duration,
    /// Shortest critical-section occupancy
    pub min_hold: Duration,
    /// Longest critical-section occupancy
    pub max_hold: Duration,
}

impl Default for NodeTimings {
    fn default() -> Self {
        Self {
            election_timeout: Duration::from_millis(ELECTION_TIMEOUT_MS),
            min_hold: Duration::from_millis(RESOURCE_MIN_HOLD_MS),
            max_hold: Duration::from_millis(RESOURCE_MAX_HOLD_MS),
        }
    }
}

/// Result of trying to hand the token on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenPass {
    /// This node did not hold the token; nothing was sent
    NotHolding,
    /// The token was addressed to `to`
    Passed { to: NodeId, envelope: Envelope },
}

/// Point-in-time view of a node, served by the status surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeStatus {
    pub node_id: NodeId,
    pub clock: u64,
    pub leader: Option<NodeId>,
    pub electing: bool,
    pub online: Vec<NodeId>,
    pub holds_token: bool,
}

/// One participant of the group
#[derive(Debug)]
pub struct CoordinationNode {
    id: NodeId,
    clock: LamportClock,
    leader: Option<NodeId>,
    electing: bool,
    /// Identifies the currently armed election timer
    election_attempt: u64,
    online: BTreeSet<NodeId>,
    holds_token: bool,
    timings: NodeTimings,
    rng: StdRng,
}

impl CoordinationNode {
    pub fn new(id: NodeId, timings: NodeTimings) -> Self {
        Self::with_rng(id, timings, StdRng::from_os_rng())
    }

    /// Deterministic hold times, for simulations
    pub fn with_seed(id: NodeId, timings: NodeTimings, seed: u64) -> Self {
        Self::with_rng(id, timings, StdRng::seed_from_u64(seed))
    }

    fn with_rng(id: NodeId, timings: NodeTimings, rng: StdRng) -> Self {
        Self {
            id,
            clock: LamportClock::new(),
            leader: None,
            electing: false,
            election_attempt: 0,
            online: BTreeSet::new(),
            holds_token: false,
            timings,
            rng,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn clock(&self) -> u64 {
        self.clock.value()
    }

    pub fn leader(&self) -> Option<NodeId> {
        self.leader
    }

    pub fn is_electing(&self) -> bool {
        self.electing
    }

    pub fn online(&self) -> &BTreeSet<NodeId> {
        &self.online
    }

    pub fn holds_token(&self) -> bool {
        self.holds_token
    }

    pub fn status(&self) -> NodeStatus {
        NodeStatus {
            node_id: self.id,
            clock: self.clock.value(),
            leader: self.leader,
            electing: self.electing,
            online: self.online.iter().copied().collect(),
            holds_token: self.holds_token,
        }
    }

    /// Returns true if `envelope` is addressed to this node and not our own echo
    pub fn accepts(&self, envelope: &Envelope) -> bool {
        envelope.sender() != self.id && envelope.recipient().includes(self.id)
    }

    /// Handle one envelope delivered by the bus
    pub fn receive(&mut self, envelope: &Envelope) -> Vec<Effect> {
        if !self.accepts(envelope) {
            tracing::trace!(
                node = %self.id,
                sender = %envelope.sender(),
                to = %envelope.recipient(),
                "Envelope filtered"
            );
            return Vec::new();
        }

        let clock = self.clock.observe(envelope.clock());
        let sender = envelope.sender();
        let mut effects = vec![Effect::Received {
            from: sender,
            tag: envelope.tag(),
            clock,
        }];

        match envelope.tag() {
            PayloadTag::Election => {
                if self.id > sender {
                    effects.push(self.send(PayloadTag::ImHigher, Recipient::Node(sender)));
                    effects.extend(self.start_election());
                }
            }
            PayloadTag::ImHigher => {
                if self.electing {
                    tracing::debug!(node = %self.id, higher = %sender, "Abandoning election");
                }
                self.electing = false;
            }
            PayloadTag::ImLeader => {
                self.leader = Some(sender);
                tracing::info!(node = %self.id, leader = %sender, "Leader acknowledged");
            }
            PayloadTag::WhoIsOnline => {
                self.online.clear();
                self.online.insert(sender);
                effects.push(self.send(PayloadTag::ImOnline, Recipient::Broadcast));
            }
            PayloadTag::ImOnline => {
                self.online.insert(sender);
            }
            PayloadTag::Token => {
                if self.holds_token {
                    // A second token merges into the one we hold
                    tracing::warn!(node = %self.id, from = %sender, "Duplicate token received");
                } else {
                    self.holds_token = true;
                    effects.extend(self.use_resource());
                }
            }
        }

        effects
    }

    /// Begin an election attempt unless one is already outstanding
    pub fn start_election(&mut self) -> Vec<Effect> {
        if self.electing {
            return Vec::new();
        }

        self.electing = true;
        self.election_attempt += 1;
        tracing::info!(node = %self.id, attempt = self.election_attempt, "Starting election");

        vec![
            self.send(PayloadTag::Election, Recipient::Broadcast),
            Effect::ArmElectionTimer {
                attempt: self.election_attempt,
                after: self.timings.election_timeout,
            },
        ]
    }

    /// Election timer expiry. Nobody higher answered: take the lead.
    pub fn on_election_timeout(&mut self, attempt: u64) -> Vec<Effect> {
        if !self.electing || attempt != self.election_attempt {
            return Vec::new();
        }

        self.electing = false;
        self.leader = Some(self.id);
        tracing::info!(node = %self.id, "Elected leader");

        vec![
            self.send(PayloadTag::ImLeader, Recipient::Broadcast),
            self.send(PayloadTag::WhoIsOnline, Recipient::Broadcast),
        ]
    }

    /// Request a bounded stay in the critical section
    pub fn use_resource(&mut self) -> Vec<Effect> {
        if !self.holds_token {
            return Vec::new();
        }

        let (min, max) = (self.timings.min_hold, self.timings.max_hold.max(self.timings.min_hold));
        let hold_for = self.rng.random_range(min..=max);
        vec![Effect::UseResource { hold_for }]
    }

    /// Called when the critical section is over; hands the token on
    pub fn release_resource(&mut self) -> Result<TokenPass, RingleaderError> {
        self.pass_token()
    }

    /// Give this node the token without receiving it (first token of the group).
    ///
    /// Returns false, changing nothing, if a token is already held here.
    pub fn seed_token(&mut self) -> bool {
        if self.holds_token {
            tracing::warn!(node = %self.id, "Token already held, ignoring seed");
            return false;
        }

        tracing::info!(node = %self.id, "Token seeded");
        self.holds_token = true;
        true
    }

    /// Discard a token that cannot be passed. Returns whether one was held.
    pub fn drop_token(&mut self) -> bool {
        std::mem::replace(&mut self.holds_token, false)
    }

    /// Address the token to the next online node in ascending id order.
    ///
    /// With an empty membership set the token stays held and
    /// `EmptyMembership` is returned.
    pub fn pass_token(&mut self) -> Result<TokenPass, RingleaderError> {
        if !self.holds_token {
            return Ok(TokenPass::NotHolding);
        }

        let to = self
            .next_holder()
            .ok_or(RingleaderError::EmptyMembership { holder: self.id })?;

        let envelope = self.stamp(PayloadTag::Token, Recipient::Node(to));
        self.holds_token = false;
        tracing::debug!(node = %self.id, to = %to, "Token passed");

        Ok(TokenPass::Passed { to, envelope })
    }

    fn next_holder(&self) -> Option<NodeId> {
        self.online
            .range((std::ops::Bound::Excluded(self.id), std::ops::Bound::Unbounded))
            .next()
            .or_else(|| self.online.first())
            .copied()
    }

    fn send(&mut self, tag: PayloadTag, recipient: Recipient) -> Effect {
        Effect::Publish(self.stamp(tag, recipient))
    }

    fn stamp(&mut self, tag: PayloadTag, recipient: Recipient) -> Envelope {
        Envelope::new(self.id, recipient, tag, self.clock.tick())
    }
}
