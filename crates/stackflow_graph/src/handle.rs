// SPDX-License-Identifier: MIT OR Apache-2.0
//! Named ports ("handles") on nodes.
//!
//! Handles are identified by name and are fixed per [`NodeKind`]; see
//! [`NodeKind::input_handles`] and [`NodeKind::output_handles`].
//!
//! [`NodeKind`]: crate::node::NodeKind
//! [`NodeKind::input_handles`]: crate::node::NodeKind::input_handles
//! [`NodeKind::output_handles`]: crate::node::NodeKind::output_handles

use serde::{Deserialize, Serialize};

/// Single output of every producing node
pub const OUTPUT: &str = "output";
/// Single input of knowledge base and output nodes
pub const INPUT: &str = "input";
/// LLM input carrying the user query
pub const QUERY_INPUT: &str = "query-input";
/// LLM input carrying retrieved context
pub const CONTEXT_INPUT: &str = "context-input";

/// Handle direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleDirection {
    /// Receives values (edge target side)
    Input,
    /// Emits values (edge source side)
    Output,
}

impl HandleDirection {
    /// The direction a connection must end on when started from this one
    pub fn opposite(self) -> Self {
        match self {
            Self::Input => Self::Output,
            Self::Output => Self::Input,
        }
    }
}

/// A handle on a specific node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandleRef {
    /// Owning node
    pub node: crate::node::NodeId,
    /// Handle name
    pub name: &'static str,
    /// Handle direction
    pub direction: HandleDirection,
}
