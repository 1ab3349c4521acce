//! Core types shared across Ringleader components.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::BROADCAST_SENTINEL;
use crate::error::RingleaderError;

/// Identity of one node in the group.
///
/// Numeric order matters: the highest id wins elections, and the token
/// circulates in ascending id order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl From<u32> for NodeId {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Addressee of an envelope.
///
/// On the wire this is a single integer where `-1` means every node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Recipient {
    Broadcast,
    Node(NodeId),
}

impl Recipient {
    /// Returns true if a node with `id` should accept an envelope addressed here
    pub fn includes(&self, id: NodeId) -> bool {
        match self {
            Self::Broadcast => true,
            Self::Node(target) => *target == id,
        }
    }
}

impl From<NodeId> for Recipient {
    fn from(id: NodeId) -> Self {
        Self::Node(id)
    }
}

impl From<Recipient> for i64 {
    fn from(recipient: Recipient) -> Self {
        match recipient {
            Recipient::Broadcast => BROADCAST_SENTINEL,
            Recipient::Node(id) => i64::from(id.value()),
        }
    }
}

impl TryFrom<i64> for Recipient {
    type Error = RingleaderError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value == BROADCAST_SENTINEL {
            return Ok(Self::Broadcast);
        }

        u32::try_from(value)
            .map(|id| Self::Node(NodeId::new(id)))
            .map_err(|_| RingleaderError::MalformedEnvelope(format!("invalid recipient {value}")))
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Broadcast => f.write_str("all"),
            Self::Node(id) => write!(f, "{id}"),
        }
    }
}

/// What an envelope means. Closed set; new behaviour needs a new variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayloadTag {
    /// "I am trying to become leader"
    Election,
    /// Reply to `Election` from a node with a higher id
    ImHigher,
    /// Sender won the election
    ImLeader,
    /// Start of a membership round
    WhoIsOnline,
    /// Answer to `WhoIsOnline`
    ImOnline,
    /// Mutual-exclusion token handed to the recipient
    Token,
}

impl PayloadTag {
    pub const ALL: [PayloadTag; 6] = [
        Self::Election,
        Self::ImHigher,
        Self::ImLeader,
        Self::WhoIsOnline,
        Self::ImOnline,
        Self::Token,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Election => "Election",
            Self::ImHigher => "ImHigher",
            Self::ImLeader => "ImLeader",
            Self::WhoIsOnline => "WhoIsOnline",
            Self::ImOnline => "ImOnline",
            Self::Token => "Token",
        }
    }
}

impl fmt::Display for PayloadTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
