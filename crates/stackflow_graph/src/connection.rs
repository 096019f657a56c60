// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection rules: whether a proposed edge may be created.

use crate::edge::{ConnectionCandidate, Edge, EdgeId};
use crate::graph::Graph;
use crate::handle::HandleDirection;
use crate::node::NodeId;

/// Why a connection candidate was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Source and target are the same node
    #[error("Self-loop not allowed")]
    SelfLoop,

    /// A named handle does not exist on the node
    #[error("Node {node} has no {direction:?} handle named {handle:?}")]
    UnknownHandle {
        /// Node the handle was looked up on
        node: NodeId,
        /// Requested handle name
        handle: String,
        /// Requested direction
        direction: HandleDirection,
    },

    /// The edge would close a directed cycle
    #[error("Connecting {from} to {to} would create a cycle")]
    WouldCreateCycle {
        /// Candidate source
        from: NodeId,
        /// Candidate target
        to: NodeId,
    },
}

/// Validate a candidate and append the new edge.
///
/// Parallel edges between the same endpoints are allowed; every accepted
/// candidate gets its own fresh ID.
pub fn try_connect(candidate: &ConnectionCandidate, graph: &Graph) -> Result<Graph, ConnectionError> {
    let edge = validate(candidate, graph)?;
    let mut next = graph.clone();
    next.insert_edge(edge);
    Ok(next)
}

/// Like [`try_connect`], but a rejected candidate leaves the graph unchanged
pub fn connect(candidate: &ConnectionCandidate, graph: &Graph) -> Graph {
    match try_connect(candidate, graph) {
        Ok(next) => next,
        Err(err) => {
            tracing::debug!("Connection rejected: {err}");
            graph.clone()
        }
    }
}

/// Check a candidate and build the edge it would create
pub fn validate(candidate: &ConnectionCandidate, graph: &Graph) -> Result<Edge, ConnectionError> {
    let ConnectionCandidate {
        source,
        target,
        source_handle,
        target_handle,
    } = candidate;

    // Validate nodes exist
    let source_node = graph
        .node(source)
        .ok_or_else(|| ConnectionError::NodeNotFound(source.clone()))?;
    let target_node = graph
        .node(target)
        .ok_or_else(|| ConnectionError::NodeNotFound(target.clone()))?;

    // Prevent self-loops
    if source == target {
        return Err(ConnectionError::SelfLoop);
    }

    // Validate named handles exist
    if let Some(handle) = source_handle {
        if !source_node.kind().has_handle(handle, HandleDirection::Output) {
            return Err(ConnectionError::UnknownHandle {
                node: source.clone(),
                handle: handle.clone(),
                direction: HandleDirection::Output,
            });
        }
    }
    if let Some(handle) = target_handle {
        if !target_node.kind().has_handle(handle, HandleDirection::Input) {
            return Err(ConnectionError::UnknownHandle {
                node: target.clone(),
                handle: handle.clone(),
                direction: HandleDirection::Input,
            });
        }
    }

    // The new edge closes a cycle iff the source is already downstream of the target
    if graph.reaches(target, source) {
        return Err(ConnectionError::WouldCreateCycle {
            from: source.clone(),
            to: target.clone(),
        });
    }

    Ok(Edge {
        id: next_edge_id(graph, source, target),
        source: source.clone(),
        target: target.clone(),
        source_handle: source_handle.clone(),
        target_handle: target_handle.clone(),
        selected: false,
    })
}

/// First free `{source}-to-{target}-{n}` edge ID
pub fn next_edge_id(graph: &Graph, source: &NodeId, target: &NodeId) -> EdgeId {
    (1u64..)
        .map(|n| EdgeId(format!("{source}-to-{target}-{n}")))
        .find(|id| !graph.contains_edge(id))
        .unwrap_or_else(|| EdgeId(format!("{source}-to-{target}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle;
    use crate::node::{Node, NodeKind, Position};
    use crate::template::starter_graph;

    fn pair() -> Graph {
        let mut graph = Graph::new("test");
        graph.add_node(Node::with_defaults("a", NodeKind::UserQuery, Position::default()));
        graph.add_node(Node::with_defaults("b", NodeKind::Llm, Position::default()));
        graph
    }

    #[test]
    fn test_parallel_edges_allowed() {
        let graph = pair();
        let candidate = ConnectionCandidate::new("a", "b");
        let graph = connect(&candidate, &graph);
        let graph = connect(&candidate, &graph);

        assert_eq!(graph.edge_count(), 2);
        let ids: Vec<_> = graph.edges().map(|e| e.id.clone()).collect();
        assert_ne!(ids[0], ids[1]);
        assert!(graph.edges().all(|e| e.source == NodeId::from("a") && e.target == NodeId::from("b")));
    }

    #[test]
    fn test_self_loop_rejected() {
        let graph = pair();
        let result = try_connect(&ConnectionCandidate::new("a", "a"), &graph);
        assert_eq!(result.unwrap_err(), ConnectionError::SelfLoop);
        assert_eq!(connect(&ConnectionCandidate::new("b", "b"), &graph), graph);
    }

    #[test]
    fn test_missing_node_rejected() {
        let graph = pair();
        let result = try_connect(&ConnectionCandidate::new("a", "ghost"), &graph);
        assert_eq!(result.unwrap_err(), ConnectionError::NodeNotFound("ghost".into()));
    }

    #[test]
    fn test_handles_checked() {
        let graph = pair();
        let ok = ConnectionCandidate::new("a", "b")
            .with_handles(Some(handle::OUTPUT), Some(handle::CONTEXT_INPUT));
        let next = try_connect(&ok, &graph).unwrap();
        let edge = next.edges().next().unwrap();
        assert_eq!(edge.target_handle.as_deref(), Some(handle::CONTEXT_INPUT));

        let bad = ConnectionCandidate::new("a", "b").with_handles(None, Some("bogus"));
        assert!(matches!(
            try_connect(&bad, &graph),
            Err(ConnectionError::UnknownHandle { .. })
        ));
    }

    #[test]
    fn test_cycle_rejected() {
        let graph = starter_graph();
        let result = try_connect(&ConnectionCandidate::new("output", "user-query"), &graph);
        assert!(matches!(result, Err(ConnectionError::WouldCreateCycle { .. })));
    }

    #[test]
    fn test_edge_ids_skip_taken() {
        let mut graph = pair();
        graph.insert_edge(Edge::new("a-to-b-1", "a", "b"));
        assert_eq!(next_edge_id(&graph, &"a".into(), &"b".into()), EdgeId::from("a-to-b-2"));
    }
}
