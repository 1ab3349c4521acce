//! The message unit exchanged on the broadcast bus.
//!
//! Wire format is flat JSON:
//!
//! ```text
//! {"sender": 1, "to": -1, "data": "Election", "clock": 4}
//! ```
//!
//! `to = -1` addresses every node. Field names are kept stable so nodes of
//! different builds can share a channel.

use serde::{Deserialize, Serialize};

use crate::error::RingleaderError;
use crate::types::{NodeId, PayloadTag, Recipient};

/// One immutable message on the bus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    sender: NodeId,
    #[serde(rename = "to")]
    recipient: Recipient,
    #[serde(rename = "data")]
    tag: PayloadTag,
    clock: u64,
}

impl Envelope {
    pub fn new(sender: NodeId, recipient: Recipient, tag: PayloadTag, clock: u64) -> Self {
        Self {
            sender,
            recipient,
            tag,
            clock,
        }
    }

    pub fn sender(&self) -> NodeId {
        self.sender
    }

    pub fn recipient(&self) -> Recipient {
        self.recipient
    }

    pub fn tag(&self) -> PayloadTag {
        self.tag
    }

    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// Serialize for publishing
    pub fn encode(&self) -> Result<Vec<u8>, RingleaderError> {
        serde_json::to_vec(self).map_err(|e| RingleaderError::MalformedEnvelope(e.to_string()))
    }

    /// Parse a payload received from the bus.
    ///
    /// Anything outside the closed tag set, or missing a field, is rejected.
    pub fn decode(payload: &[u8]) -> Result<Self, RingleaderError> {
        serde_json::from_slice(payload).map_err(|e| RingleaderError::MalformedEnvelope(e.to_string()))
    }
}
