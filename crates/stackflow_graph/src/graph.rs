// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph snapshot and the store that holds the current one.

use crate::edge::{Edge, EdgeId};
use crate::node::{Node, NodeId};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// A flow graph snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    /// Graph name
    pub name: String,
    /// Nodes in render order
    nodes: IndexMap<NodeId, Node>,
    /// Edges between nodes
    edges: IndexMap<EdgeId, Edge>,
}

impl Graph {
    /// Create a new empty graph
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: IndexMap::new(),
            edges: IndexMap::new(),
        }
    }

    /// Add a node on top of the render order.
    ///
    /// Returns `false` if a node with the same ID already exists.
    pub fn add_node(&mut self, node: Node) -> bool {
        if self.nodes.contains_key(&node.id) {
            return false;
        }
        self.nodes.insert(node.id.clone(), node);
        true
    }

    /// Remove a node and every edge touching it.
    ///
    /// Downstream nodes lose the inputs those edges fed.
    pub fn remove_node(&mut self, node_id: &NodeId) -> Option<Node> {
        if !self.nodes.contains_key(node_id) {
            return None;
        }
        let fed: Vec<_> = self
            .edges_from(node_id)
            .filter_map(|e| Some((e.target.clone(), self.input_handle(e)?)))
            .collect();
        let node = self.nodes.shift_remove(node_id)?;
        self.edges.retain(|_, e| !e.involves_node(node_id));
        for (target, handle) in fed {
            self.release_input(&target, &handle);
        }
        Some(node)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: &NodeId) -> Option<&Node> {
        self.nodes.get(node_id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: &NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(node_id)
    }

    /// Check whether a node exists
    pub fn contains_node(&self, node_id: &NodeId) -> bool {
        self.nodes.contains_key(node_id)
    }

    /// Get all nodes in render order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all nodes mutably
    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.values_mut()
    }

    /// Get all node IDs in render order
    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Insert an edge as-is.
    ///
    /// Returns `false` if the ID is taken or an endpoint is missing. No
    /// connection rules are checked here, see [`crate::connection`].
    pub fn insert_edge(&mut self, edge: Edge) -> bool {
        if self.edges.contains_key(&edge.id)
            || !self.nodes.contains_key(&edge.source)
            || !self.nodes.contains_key(&edge.target)
        {
            return false;
        }
        self.edges.insert(edge.id.clone(), edge);
        true
    }

    /// Remove an edge.
    ///
    /// The target forgets the input the edge fed unless another edge still
    /// feeds the same handle.
    pub fn remove_edge(&mut self, edge_id: &EdgeId) -> Option<Edge> {
        let handle = self.edges.get(edge_id).and_then(|e| self.input_handle(e));
        let edge = self.edges.shift_remove(edge_id)?;
        if let Some(handle) = handle {
            self.release_input(&edge.target, &handle);
        }
        Some(edge)
    }

    /// Input handle an edge writes into on its target
    pub fn input_handle(&self, edge: &Edge) -> Option<String> {
        if let Some(handle) = &edge.target_handle {
            return Some(handle.clone());
        }
        let source = self.nodes.get(&edge.source)?;
        let target = self.nodes.get(&edge.target)?;
        Some(target.kind().default_input_handle(source.kind()).to_string())
    }

    fn release_input(&mut self, target: &NodeId, handle: &str) {
        let still_fed = self
            .edges
            .values()
            .any(|e| e.target == *target && self.input_handle(e).as_deref() == Some(handle));
        if still_fed {
            return;
        }
        if let Some(node) = self.nodes.get_mut(target) {
            node.clear_input(handle);
        }
    }

    /// Get an edge by ID
    pub fn edge(&self, edge_id: &EdgeId) -> Option<&Edge> {
        self.edges.get(edge_id)
    }

    /// Get a mutable edge by ID
    pub fn edge_mut(&mut self, edge_id: &EdgeId) -> Option<&mut Edge> {
        self.edges.get_mut(edge_id)
    }

    /// Check whether an edge exists
    pub fn contains_edge(&self, edge_id: &EdgeId) -> bool {
        self.edges.contains_key(edge_id)
    }

    /// Get all edges
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Get all edges mutably
    pub fn edges_mut(&mut self) -> impl Iterator<Item = &mut Edge> {
        self.edges.values_mut()
    }

    /// Edges leaving a node
    pub fn edges_from<'a>(&'a self, node_id: &'a NodeId) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.values().filter(move |e| e.source == *node_id)
    }

    /// Edges entering a node
    pub fn edges_to<'a>(&'a self, node_id: &'a NodeId) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.values().filter(move |e| e.target == *node_id)
    }

    /// Edges touching a node
    pub fn edges_for_node<'a>(&'a self, node_id: &'a NodeId) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.values().filter(move |e| e.involves_node(node_id))
    }

    /// Get the number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Check whether `to` can be reached from `from` by following edges
    pub fn reaches(&self, from: &NodeId, to: &NodeId) -> bool {
        self.reachable_from(from).contains(to)
    }

    /// Nodes reachable from `start` (excluding `start` unless it lies on a cycle)
    pub fn reachable_from(&self, start: &NodeId) -> IndexSet<NodeId> {
        let mut seen = IndexSet::new();
        let mut queue = VecDeque::from([start.clone()]);

        while let Some(current) = queue.pop_front() {
            for edge in self.edges_from(&current) {
                if seen.insert(edge.target.clone()) {
                    queue.push_back(edge.target.clone());
                }
            }
        }

        seen
    }

    /// Nodes downstream of `start` in topological order.
    ///
    /// Returns `(ordered, cyclic)`: `ordered` lists every reachable node whose
    /// upstream (within the reachable set) is acyclic; `cyclic` lists the
    /// reachable nodes that sit on or behind a directed cycle. Edges back into
    /// `start` are ignored, so `start` never appears in either list.
    pub fn downstream_order(&self, start: &NodeId) -> (Vec<NodeId>, Vec<NodeId>) {
        let mut reachable = self.reachable_from(start);
        reachable.shift_remove(start);

        // Kahn's algorithm restricted to the reachable subgraph
        let mut in_degree: HashMap<&NodeId, usize> = reachable.iter().map(|id| (id, 0)).collect();
        for edge in self.edges.values() {
            if edge.target == *start || !reachable.contains(&edge.target) {
                continue;
            }
            if edge.source == *start || reachable.contains(&edge.source) {
                if let Some(degree) = in_degree.get_mut(&edge.target) {
                    *degree += 1;
                }
            }
        }

        let mut ready: VecDeque<NodeId> = VecDeque::new();
        for edge in self.edges_from(start) {
            if let Some(degree) = in_degree.get_mut(&edge.target) {
                *degree -= 1;
                if *degree == 0 {
                    ready.push_back(edge.target.clone());
                }
            }
        }

        let mut ordered = Vec::new();
        while let Some(current) = ready.pop_front() {
            for edge in self.edges_from(&current) {
                if edge.target == *start {
                    continue;
                }
                if let Some(degree) = in_degree.get_mut(&edge.target) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push_back(edge.target.clone());
                    }
                }
            }
            ordered.push(current);
        }

        let cyclic = reachable
            .into_iter()
            .filter(|id| !ordered.contains(id))
            .collect();

        (ordered, cyclic)
    }

    /// Serialize to pretty RON
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Deserialize from RON
    pub fn from_ron(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(text)
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

/// Holds the authoritative graph snapshot for one editing session.
///
/// The held snapshot is never mutated in place: [`GraphStore::update`] runs a
/// transition over the current snapshot and swaps in the result. Readers that
/// kept an earlier [`Arc<Graph>`] continue to see that complete snapshot.
#[derive(Debug, Clone)]
pub struct GraphStore {
    snapshot: Arc<Graph>,
    revision: u64,
}

impl GraphStore {
    /// Create a store holding the given graph
    pub fn new(graph: Graph) -> Self {
        Self {
            snapshot: Arc::new(graph),
            revision: 0,
        }
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<Graph> {
        Arc::clone(&self.snapshot)
    }

    /// Borrow the current snapshot
    pub fn graph(&self) -> &Graph {
        &self.snapshot
    }

    /// Number of snapshot replacements so far
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Apply a transition and swap in its result.
    ///
    /// Returns `true` if the new snapshot differs from the old one.
    pub fn update(&mut self, transition: impl FnOnce(&Graph) -> Graph) -> bool {
        let next = transition(&self.snapshot);
        if next == *self.snapshot {
            return false;
        }
        self.snapshot = Arc::new(next);
        self.revision += 1;
        true
    }

    /// Replace the snapshot wholesale (loading a template, clearing the canvas)
    pub fn reset(&mut self, graph: Graph) {
        self.snapshot = Arc::new(graph);
        self.revision += 1;
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new(Graph::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle;
    use crate::node::{NodeKind, Position};
    use crate::template::starter_graph;

    fn chain(ids: &[&str]) -> Graph {
        let mut graph = Graph::new("test");
        for id in ids {
            graph.add_node(Node::with_defaults(*id, NodeKind::KnowledgeBase, Position::default()));
        }
        for pair in ids.windows(2) {
            graph.insert_edge(Edge::new(format!("{}-{}", pair[0], pair[1]), pair[0], pair[1]));
        }
        graph
    }

    #[test]
    fn test_remove_node_prunes_edges() {
        let mut graph = chain(&["a", "b", "c"]);
        graph.remove_node(&NodeId::from("b"));
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_removed_edges_release_inputs() {
        let mut graph = starter_graph();
        let llm = NodeId::from("llm");
        for handle in [handle::QUERY_INPUT, handle::CONTEXT_INPUT] {
            graph.node_mut(&llm).unwrap().set_input(handle, "stale");
        }

        graph.remove_edge(&EdgeId::from("kb-to-llm"));
        assert_eq!(graph.node(&llm).unwrap().input(handle::CONTEXT_INPUT), None);
        assert_eq!(graph.node(&llm).unwrap().input(handle::QUERY_INPUT), Some("stale"));

        graph.remove_node(&NodeId::from("user-query"));
        assert_eq!(graph.node(&llm).unwrap().input(handle::QUERY_INPUT), None);
    }

    #[test]
    fn test_parallel_edge_keeps_input() {
        let mut graph = chain(&["a", "b"]);
        graph.insert_edge(Edge::new("a-to-b-2", "a", "b"));
        let b = NodeId::from("b");
        graph.node_mut(&b).unwrap().set_input(handle::INPUT, "kept");

        graph.remove_edge(&EdgeId::from("a-to-b-2"));
        assert_eq!(graph.node(&b).unwrap().input(handle::INPUT), Some("kept"));
    }

    #[test]
    fn test_insert_edge_requires_endpoints() {
        let mut graph = chain(&["a"]);
        assert!(!graph.insert_edge(Edge::new("dangling", "a", "missing")));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_downstream_order() {
        let mut graph = chain(&["a", "b", "c"]);
        graph.add_node(Node::with_defaults("d", NodeKind::Output, Position::default()));
        graph.insert_edge(Edge::new("a-c", "a", "c"));
        graph.insert_edge(Edge::new("d-a", "d", "a"));

        let (ordered, cyclic) = graph.downstream_order(&NodeId::from("a"));
        assert_eq!(ordered, vec![NodeId::from("b"), NodeId::from("c")]);
        assert!(cyclic.is_empty());
    }

    #[test]
    fn test_downstream_order_reports_cycles() {
        let mut graph = chain(&["a", "b", "c"]);
        graph.insert_edge(Edge::new("c-b", "c", "b"));

        let (ordered, cyclic) = graph.downstream_order(&NodeId::from("a"));
        assert!(ordered.is_empty());
        assert_eq!(cyclic.len(), 2);
    }

    #[test]
    fn test_store_replaces_snapshot() {
        let mut store = GraphStore::new(chain(&["a", "b"]));
        let before = store.snapshot();

        let changed = store.update(|graph| {
            let mut next = graph.clone();
            next.remove_node(&NodeId::from("a"));
            next
        });

        assert!(changed);
        assert_eq!(store.revision(), 1);
        assert_eq!(before.node_count(), 2);
        assert_eq!(before.edge_count(), 1);
        assert_eq!(store.graph().node_count(), 1);
    }

    #[test]
    fn test_store_ignores_identity_transition() {
        let mut store = GraphStore::new(chain(&["a"]));
        assert!(!store.update(Graph::clone));
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn test_ron_round_trip() {
        let graph = chain(&["a", "b"]);
        let text = graph.to_ron().unwrap();
        assert_eq!(Graph::from_ron(&text).unwrap(), graph);
    }
}
