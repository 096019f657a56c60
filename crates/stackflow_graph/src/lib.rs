// SPDX-License-Identifier: MIT OR Apache-2.0
//! Flow graph core for `StackFlow`.
//!
//! This crate models an AI stack as a graph of pipeline stages:
//! - User query
//! - Knowledge base
//! - LLM
//! - Output
//!
//! ## Architecture
//!
//! Every edit produces a new [`Graph`] snapshot that replaces the one held by
//! the [`GraphStore`]:
//! - Change batches for nodes and edges
//! - Connection validation
//! - Value propagation along edges
//! - An egui canvas that turns gestures into [`CanvasEvent`]s

pub mod node;
pub mod handle;
pub mod edge;
pub mod graph;
pub mod changes;
pub mod connection;
pub mod factory;
pub mod propagation;
pub mod template;
pub mod ui;

pub use node::{Node, NodeConfig, NodeId, NodeKind, Position};
pub use handle::HandleDirection;
pub use edge::{ConnectionCandidate, Edge, EdgeId};
pub use graph::{Graph, GraphStore};
pub use changes::{EdgeChange, NodeChange};
pub use connection::ConnectionError;
pub use factory::NodeFactory;
pub use propagation::PropagationReport;
pub use template::StartLayout;
pub use ui::{CanvasController, CanvasEvent, NodeActions, PaletteItem};
