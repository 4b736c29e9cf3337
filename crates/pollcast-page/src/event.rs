//! User interaction forwarded by the host.

use serde::{Deserialize, Serialize};

use crate::NodeId;

/// Something the viewer did on the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageEvent {
    /// A selection control changed state.
    InputChanged { node: NodeId, checked: bool },
    /// An element was clicked.
    Click { node: NodeId },
    /// A character key was pressed.
    KeyPress { key: char },
}

impl PageEvent {
    /// The node the event targets, if any.
    pub fn target(&self) -> Option<NodeId> {
        match self {
            PageEvent::InputChanged { node, .. } | PageEvent::Click { node } => Some(*node),
            PageEvent::KeyPress { .. } => None,
        }
    }
}
