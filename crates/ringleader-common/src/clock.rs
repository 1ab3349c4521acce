//! Lamport logical clock.

use serde::{Deserialize, Serialize};

/// Logical clock owned by exactly one node.
///
/// Every local event (a send, or an accepted receive) moves the value
/// strictly forward. It never decreases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LamportClock(u64);

impl LamportClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Advance for an outgoing message and return the value to stamp on it
    pub fn tick(&mut self) -> u64 {
        self.0 = self.0.saturating_add(1);
        self.0
    }

    /// Merge a remote timestamp: `max(local, remote) + 1`
    pub fn observe(&mut self, remote: u64) -> u64 {
        self.0 = self.0.max(remote).saturating_add(1);
        self.0
    }
}
