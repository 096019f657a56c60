// SPDX-License-Identifier: MIT OR Apache-2.0
//! Starting layouts for a new editing session.

use crate::edge::Edge;
use crate::graph::Graph;
use crate::node::{Node, NodeKind, Position};
use serde::{Deserialize, Serialize};

/// Which graph a new session starts with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StartLayout {
    /// One node per kind, wired as the default pipeline
    #[default]
    Starter,
    /// Blank canvas
    Empty,
}

impl StartLayout {
    /// Build the graph for this layout
    pub fn build(self) -> Graph {
        match self {
            Self::Starter => starter_graph(),
            Self::Empty => Graph::new("Untitled Stack"),
        }
    }

    /// Display name
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Starter => "Starter pipeline",
            Self::Empty => "Empty canvas",
        }
    }
}

/// The default pipeline: query feeds the knowledge base and the LLM, the
/// knowledge base feeds the LLM context, the LLM feeds the output.
pub fn starter_graph() -> Graph {
    let mut graph = Graph::new("Chat With PDF");

    let nodes = [
        ("user-query", NodeKind::UserQuery, Position::new(100.0, 100.0)),
        ("knowledge-base", NodeKind::KnowledgeBase, Position::new(400.0, 100.0)),
        ("llm", NodeKind::Llm, Position::new(700.0, 100.0)),
        ("output", NodeKind::Output, Position::new(1000.0, 100.0)),
    ];
    for (id, kind, position) in nodes {
        graph.add_node(Node::with_defaults(id, kind, position));
    }

    let edges = [
        ("user-query-to-kb", "user-query", "knowledge-base"),
        ("user-query-to-llm", "user-query", "llm"),
        ("kb-to-llm", "knowledge-base", "llm"),
        ("llm-to-output", "llm", "output"),
    ];
    for (id, source, target) in edges {
        graph.insert_edge(Edge::new(id, source, target));
    }

    graph
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starter_topology() {
        let graph = starter_graph();
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 4);
        for kind in NodeKind::ALL {
            assert_eq!(graph.nodes().filter(|n| n.kind() == kind).count(), 1);
        }
    }

    #[test]
    fn test_empty_layout() {
        let graph = StartLayout::Empty.build();
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);
    }
}
