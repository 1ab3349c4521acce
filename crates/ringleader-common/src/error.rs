//! Common error types for Ringleader components.

use thiserror::Error;

use crate::types::NodeId;

/// Common errors across Ringleader components
#[derive(Debug, Error)]
pub enum RingleaderError {
    /// Payload could not be parsed into an envelope
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// Token holder knows no peer to hand the token to
    #[error("Node {holder} holds the token but its membership set is empty")]
    EmptyMembership { holder: NodeId },

    /// Message bus connection/operation error
    #[error("Bus error: {0}")]
    Bus(String),

    /// The node's event loop is no longer running
    #[error("Node runtime stopped")]
    RuntimeStopped,
}

impl RingleaderError {
    /// Returns true if this error should be retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Bus(_))
    }
}
