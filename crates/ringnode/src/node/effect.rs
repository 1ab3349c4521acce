use ringleader_common::{Envelope, NodeId, PayloadTag};
use std::time::Duration;

/// Something the coordination state machine wants done.
///
/// Every `CoordinationNode` transition returns a list of these; the runtime
/// executes them against the bus and the timers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// An envelope was accepted (used for the diagnostics log).
    Received {
        from: NodeId,
        tag: PayloadTag,
        clock: u64,
    },

    /// Publish an already-stamped envelope on the bus.
    Publish(Envelope),

    /// Fire `on_election_timeout(attempt)` after `after`.
    ArmElectionTimer { attempt: u64, after: Duration },

    /// Occupy the shared resource for `hold_for`, then release it.
    UseResource { hold_for: Duration },
}

impl Effect {
    /// The envelope carried by a `Publish` effect
    pub fn as_publish(&self) -> Option<&Envelope> {
        match self {
            Self::Publish(envelope) => Some(envelope),
            _ => None,
        }
    }
}
