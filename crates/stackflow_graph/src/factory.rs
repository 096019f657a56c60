// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node creation with unique, counter-based IDs.

use crate::graph::Graph;
use crate::node::{Node, NodeId, NodeKind, Position};

/// Creates nodes with default data and fresh IDs.
///
/// IDs have the form `{slug}-{n}` where `n` comes from a counter owned by the
/// factory, so rapid successive calls never collide. Counter values whose ID
/// is already taken in the target graph are skipped.
#[derive(Debug, Clone, Default)]
pub struct NodeFactory {
    next: u64,
}

impl NodeFactory {
    /// Create a factory whose counter starts at 1
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a factory whose counter starts past every `{slug}-{n}` ID in the graph
    pub fn for_graph(graph: &Graph) -> Self {
        let highest = graph
            .node_ids()
            .filter_map(|id| {
                let (prefix, suffix) = id.as_str().rsplit_once('-')?;
                NodeKind::from_payload(prefix)?;
                suffix.parse::<u64>().ok()
            })
            .max()
            .unwrap_or(0);
        Self { next: highest }
    }

    /// Create a node of the given kind at the given position, with an ID not
    /// used in `graph`
    pub fn create_node(&mut self, kind: NodeKind, position: Position, graph: &Graph) -> Node {
        let id = loop {
            self.next += 1;
            let id = NodeId::from(format!("{}-{}", kind.slug(), self.next));
            if !graph.contains_node(&id) {
                break id;
            }
        };
        tracing::debug!(node = %id, x = position.x, y = position.y, "Created node");
        Node::with_defaults(id, kind, position)
    }

    /// Create a node from a palette drop payload. Unknown payloads create nothing.
    pub fn create_from_payload(
        &mut self,
        payload: &str,
        position: Position,
        graph: &Graph,
    ) -> Option<Node> {
        match NodeKind::from_payload(payload) {
            Some(kind) => Some(self.create_node(kind, position, graph)),
            None => {
                tracing::debug!(payload, "Ignoring drop with unknown node kind");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeConfig;
    use crate::template::starter_graph;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_distinct() {
        let graph = Graph::new("test");
        let mut factory = NodeFactory::new();
        let ids: HashSet<_> = (0..500)
            .map(|i| {
                let kind = NodeKind::ALL[i % NodeKind::ALL.len()];
                factory.create_node(kind, Position::default(), &graph).id
            })
            .collect();
        assert_eq!(ids.len(), 500);
    }

    #[test]
    fn test_default_data() {
        let mut factory = NodeFactory::new();
        let node = factory.create_node(NodeKind::Llm, Position::new(120.0, 80.0), &Graph::new("test"));
        assert_eq!(node.kind(), NodeKind::Llm);
        assert_eq!(node.position, Position::new(120.0, 80.0));
        assert!(node.id.as_str().starts_with("llm-"));
        match node.config() {
            NodeConfig::Llm(llm) => {
                assert_eq!(llm.model, "GPT 4o- Mini");
                assert_eq!(llm.temperature, 0.75);
                assert!(llm.web_search_enabled);
                assert!(llm.prompt.contains("{context}"));
                assert!(llm.prompt.contains("{query}"));
            }
            other => panic!("unexpected config {other:?}"),
        }
    }

    #[test]
    fn test_for_graph_skips_existing_ids() {
        let mut graph = starter_graph();
        graph.add_node(Node::with_defaults("llm-7", NodeKind::Llm, Position::default()));

        let mut factory = NodeFactory::for_graph(&graph);
        let node = factory.create_node(NodeKind::Output, Position::default(), &graph);
        assert_eq!(node.id.as_str(), "output-8");
        assert!(!graph.contains_node(&node.id));
    }

    #[test]
    fn test_skips_ids_added_after_seeding() {
        let mut graph = Graph::new("test");
        let mut factory = NodeFactory::for_graph(&graph);
        graph.add_node(Node::with_defaults("llm-1", NodeKind::Llm, Position::default()));
        graph.add_node(Node::with_defaults("llm-2", NodeKind::Llm, Position::default()));

        let node = factory.create_node(NodeKind::Llm, Position::default(), &graph);
        assert_eq!(node.id.as_str(), "llm-3");
    }

    #[test]
    fn test_unknown_payload() {
        let graph = Graph::new("test");
        let mut factory = NodeFactory::new();
        assert!(factory.create_from_payload("chart", Position::default(), &graph).is_none());
        assert!(factory.create_from_payload("output", Position::default(), &graph).is_some());
    }
}
