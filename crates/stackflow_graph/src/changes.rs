// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pure application of node and edge change batches.
//!
//! Changes that name an unknown ID are stale UI events and are skipped
//! without error.

use crate::edge::{Edge, EdgeId};
use crate::graph::Graph;
use crate::node::{Node, NodeId, Position};
use serde::{Deserialize, Serialize};

/// A single change to the node set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeChange {
    /// Move a node
    Position(NodeId, Position),
    /// Select or deselect a node
    Select(NodeId, bool),
    /// Remove a node together with its edges
    Remove(NodeId),
    /// Add a node on top of the render order
    Add(Node),
}

/// A single change to the edge set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EdgeChange {
    /// Insert an edge without connection rules
    Add(Edge),
    /// Remove an edge
    Remove(EdgeId),
    /// Select or deselect an edge
    Select(EdgeId, bool),
}

/// Fold node changes into a new snapshot, in input order.
///
/// Removing a node prunes its edges in the same transition.
pub fn apply_node_changes(changes: &[NodeChange], graph: &Graph) -> Graph {
    let mut next = graph.clone();
    for change in changes {
        apply_node_change(change, &mut next);
    }
    next
}

/// Fold edge changes into a new snapshot, in input order
pub fn apply_edge_changes(changes: &[EdgeChange], graph: &Graph) -> Graph {
    let mut next = graph.clone();
    for change in changes {
        apply_edge_change(change, &mut next);
    }
    next
}

fn apply_node_change(change: &NodeChange, graph: &mut Graph) {
    match change {
        NodeChange::Position(id, position) => match graph.node_mut(id) {
            Some(node) => node.position = *position,
            None => tracing::debug!(node = %id, "Ignoring position change for unknown node"),
        },
        NodeChange::Select(id, selected) => match graph.node_mut(id) {
            Some(node) => node.selected = *selected,
            None => tracing::debug!(node = %id, "Ignoring selection change for unknown node"),
        },
        NodeChange::Remove(id) => {
            if graph.remove_node(id).is_none() {
                tracing::debug!(node = %id, "Ignoring removal of unknown node");
            }
        }
        NodeChange::Add(node) => {
            if !graph.add_node(node.clone()) {
                tracing::debug!(node = %node.id, "Ignoring add of duplicate node id");
            }
        }
    }
}

fn apply_edge_change(change: &EdgeChange, graph: &mut Graph) {
    match change {
        EdgeChange::Add(edge) => {
            if !graph.insert_edge(edge.clone()) {
                tracing::debug!(edge = %edge.id, "Ignoring edge with duplicate id or missing endpoint");
            }
        }
        EdgeChange::Remove(id) => {
            if graph.remove_edge(id).is_none() {
                tracing::debug!(edge = %id, "Ignoring removal of unknown edge");
            }
        }
        EdgeChange::Select(id, selected) => match graph.edge_mut(id) {
            Some(edge) => edge.selected = *selected,
            None => tracing::debug!(edge = %id, "Ignoring selection change for unknown edge"),
        },
    }
}

/// Changes that remove every selected node and edge
pub fn selection_removal(graph: &Graph) -> (Vec<NodeChange>, Vec<EdgeChange>) {
    let nodes = graph
        .nodes()
        .filter(|n| n.selected)
        .map(|n| NodeChange::Remove(n.id.clone()))
        .collect();
    let edges = graph
        .edges()
        .filter(|e| e.selected)
        .map(|e| EdgeChange::Remove(e.id.clone()))
        .collect();
    (nodes, edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;
    use crate::template::starter_graph;

    #[test]
    fn test_remove_prunes_edges() {
        let graph = starter_graph();
        let next = apply_node_changes(&[NodeChange::Remove("knowledge-base".into())], &graph);

        let mut remaining: Vec<_> = next.edges().map(|e| e.id.as_str().to_string()).collect();
        remaining.sort();
        assert_eq!(remaining, vec!["llm-to-output", "user-query-to-llm"]);
        assert!(next.edges().all(|e| !e.involves_node(&"knowledge-base".into())));
        assert_eq!(next.node_count(), 3);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let graph = starter_graph();
        let change = NodeChange::Remove("llm".into());
        let once = apply_node_changes(&[change.clone()], &graph);
        let twice = apply_node_changes(&[change.clone(), change], &graph);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_no_dangling_edges_after_any_removals() {
        let graph = starter_graph();
        let ids: Vec<NodeId> = graph.node_ids().cloned().collect();

        // Every subset of the starter nodes, removed in order
        for mask in 0u32..(1 << ids.len()) {
            let changes: Vec<_> = ids
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, id)| NodeChange::Remove(id.clone()))
                .collect();
            let next = apply_node_changes(&changes, &graph);
            for edge in next.edges() {
                assert!(next.contains_node(&edge.source));
                assert!(next.contains_node(&edge.target));
            }
        }
    }

    #[test]
    fn test_unknown_ids_are_ignored() {
        let graph = starter_graph();
        let next = apply_node_changes(
            &[
                NodeChange::Position("ghost".into(), Position::new(5.0, 5.0)),
                NodeChange::Select("ghost".into(), true),
                NodeChange::Remove("ghost".into()),
            ],
            &graph,
        );
        assert_eq!(next, graph);

        let next = apply_edge_changes(
            &[
                EdgeChange::Remove("ghost".into()),
                EdgeChange::Select("ghost".into(), true),
            ],
            &graph,
        );
        assert_eq!(next, graph);
    }

    #[test]
    fn test_changes_apply_in_order() {
        let graph = Graph::new("test");
        let node = Node::with_defaults("a", NodeKind::Output, Position::default());
        let next = apply_node_changes(
            &[
                NodeChange::Add(node.clone()),
                NodeChange::Position("a".into(), Position::new(10.0, 20.0)),
                NodeChange::Select("a".into(), true),
                NodeChange::Add(node),
            ],
            &graph,
        );
        assert_eq!(next.node_count(), 1);
        let a = next.node(&"a".into()).unwrap();
        assert_eq!(a.position, Position::new(10.0, 20.0));
        assert!(a.selected);
    }

    #[test]
    fn test_edge_changes() {
        let graph = starter_graph();
        let next = apply_edge_changes(
            &[
                EdgeChange::Remove("kb-to-llm".into()),
                EdgeChange::Add(Edge::new("manual", "knowledge-base", "output")),
                EdgeChange::Add(Edge::new("dangling", "knowledge-base", "missing")),
                EdgeChange::Add(Edge::new("llm-to-output", "user-query", "output")),
            ],
            &graph,
        );
        assert_eq!(next.edge_count(), 4);
        assert!(!next.contains_edge(&"kb-to-llm".into()));
        assert!(next.contains_edge(&"manual".into()));
        assert!(!next.contains_edge(&"dangling".into()));
        assert_eq!(next.edge(&"llm-to-output".into()).unwrap().source, NodeId::from("llm"));
    }

    #[test]
    fn test_selection_removal() {
        let graph = starter_graph();
        let graph = apply_node_changes(&[NodeChange::Select("output".into(), true)], &graph);
        let graph = apply_edge_changes(&[EdgeChange::Select("kb-to-llm".into(), true)], &graph);

        let (nodes, edges) = selection_removal(&graph);
        assert_eq!(nodes, vec![NodeChange::Remove("output".into())]);
        assert_eq!(edges, vec![EdgeChange::Remove("kb-to-llm".into())]);
    }
}
