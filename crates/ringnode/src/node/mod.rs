//! Coordination node: protocol state machine and its runtime.
//!
//! Implements:
//! - Lamport-stamped envelope handling
//! - Bully election with a reply timeout
//! - Presence tracking (`WhoIsOnline` / `ImOnline`)
//! - Token-ring mutual exclusion

mod coordinator;
mod effect;
mod runtime;
mod section;

pub use coordinator::{CoordinationNode, NodeStatus, NodeTimings, TokenPass};
pub use effect::Effect;
pub use runtime::{NodeHandle, NodeRuntime};
pub use section::{CriticalSection, SimulatedWork};
