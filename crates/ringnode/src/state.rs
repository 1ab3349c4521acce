//! Application state shared with the status routes.

use ringleader_common::NodeId;

use crate::diagnostics::Diagnostics;
use crate::node::NodeHandle;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Handle to the running coordination node
    pub node: NodeHandle,

    /// Clock logs of this process
    pub diagnostics: Diagnostics,
}

impl AppState {
    pub fn new(node: NodeHandle, diagnostics: Diagnostics) -> Self {
        Self { node, diagnostics }
    }

    pub fn node_id(&self) -> NodeId {
        self.node.node_id()
    }
}
