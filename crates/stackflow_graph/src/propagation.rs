// SPDX-License-Identifier: MIT OR Apache-2.0
//! Value propagation through the pipeline.
//!
//! Editing a node's input writes the value into that node, computes its output
//! and pushes it along every outgoing edge. Downstream nodes are recomputed in
//! topological order so a single edit reaches the end of the pipeline.

use crate::graph::Graph;
use crate::handle;
use crate::node::{Node, NodeConfig, NodeId, NodeKind};
use indexmap::IndexSet;

/// What a propagation pass touched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropagationReport {
    /// Nodes whose data was written, in write order
    pub updated: Vec<NodeId>,
    /// Downstream nodes on a cycle: they received values but were not recomputed
    pub skipped: Vec<NodeId>,
}

impl PropagationReport {
    /// Check whether nothing was written
    pub fn is_empty(&self) -> bool {
        self.updated.is_empty()
    }
}

/// Set a node's input and push the result downstream.
///
/// Unknown node IDs leave the graph unchanged. Nodes not reachable from
/// `node_id` are never touched.
pub fn propagate(graph: &Graph, node_id: &NodeId, input: &str) -> (Graph, PropagationReport) {
    let mut next = graph.clone();
    let mut report = PropagationReport::default();

    match next.node_mut(node_id) {
        Some(start) => receive(start, input, None),
        None => {
            tracing::debug!(node = %node_id, "Ignoring input for unknown node");
            return (next, report);
        }
    }
    let mut updated = IndexSet::from([node_id.clone()]);

    let (ordered, cyclic) = graph.downstream_order(node_id);
    if !cyclic.is_empty() {
        tracing::warn!(
            node = %node_id,
            cyclic = ?cyclic,
            "Downstream cycle detected, nodes on it are not recomputed"
        );
    }

    for current in std::iter::once(node_id).chain(ordered.iter()) {
        let Some(source) = next.node(current) else {
            continue;
        };
        let output = transform(source);
        let source_kind = source.kind();

        let targets: Vec<_> = next
            .edges_from(current)
            .filter(|edge| edge.target != *node_id)
            .map(|edge| (edge.target.clone(), edge.target_handle.clone()))
            .collect();

        for (target_id, target_handle) in targets {
            let Some(target) = next.node_mut(&target_id) else {
                continue;
            };
            let handle = target_handle
                .unwrap_or_else(|| target.kind().default_input_handle(source_kind).to_string());
            receive(target, &output, Some(&handle));
            updated.insert(target_id);
        }
    }

    report.updated = updated.into_iter().collect();
    report.skipped = cyclic;
    tracing::debug!(
        node = %node_id,
        updated = report.updated.len(),
        skipped = report.skipped.len(),
        "Propagated input"
    );
    (next, report)
}

/// Re-run propagation from a node using the value it already holds
pub fn repropagate(graph: &Graph, node_id: &NodeId) -> (Graph, PropagationReport) {
    let input = match graph.node(node_id) {
        Some(node) => match node.config() {
            NodeConfig::UserQuery(config) => config.query.clone(),
            _ => node.value().to_string(),
        },
        None => String::new(),
    };
    propagate(graph, node_id, &input)
}

/// Write an incoming value into a node
fn receive(node: &mut Node, value: &str, handle: Option<&str>) {
    node.set_value(value);
    if let Some(handle) = handle {
        node.set_input(handle, value);
    }
    match node.kind() {
        NodeKind::UserQuery => {
            node.edit_config(|config| {
                if let NodeConfig::UserQuery(query) = config {
                    query.query = value.to_string();
                }
            });
        }
        NodeKind::Output => {
            node.edit_config(|config| {
                if let NodeConfig::Output(output) = config {
                    output.output_text = value.to_string();
                }
            });
        }
        NodeKind::KnowledgeBase | NodeKind::Llm => {}
    }
}

/// Compute the value a node emits on its output handle
pub fn transform(node: &Node) -> String {
    match node.config() {
        NodeConfig::UserQuery(_) => node.value().split_whitespace().collect::<Vec<_>>().join(" "),
        NodeConfig::KnowledgeBase(_) => node.value().to_string(),
        NodeConfig::Llm(llm) => fill_prompt(
            &llm.prompt,
            node.input(handle::QUERY_INPUT).unwrap_or_default(),
            node.input(handle::CONTEXT_INPUT).unwrap_or_default(),
        ),
        NodeConfig::Output(_) => node.value().to_string(),
    }
}

/// Substitute `{query}` and `{context}` in one scan of the template.
///
/// Inserted text is never scanned again, so placeholders typed by the user
/// stay literal.
pub fn fill_prompt(template: &str, query: &str, context: &str) -> String {
    const QUERY: &str = "{query}";
    const CONTEXT: &str = "{context}";

    let mut filled = String::with_capacity(template.len() + query.len() + context.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        filled.push_str(&rest[..start]);
        let tail = &rest[start..];
        if let Some(after) = tail.strip_prefix(QUERY) {
            filled.push_str(query);
            rest = after;
        } else if let Some(after) = tail.strip_prefix(CONTEXT) {
            filled.push_str(context);
            rest = after;
        } else {
            filled.push('{');
            rest = &tail[1..];
        }
    }
    filled.push_str(rest);
    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::{apply_edge_changes, EdgeChange};
    use crate::edge::Edge;
    use crate::node::{NodeConfig, Position};
    use crate::template::starter_graph;

    fn two_nodes() -> Graph {
        let mut graph = Graph::new("test");
        graph.add_node(Node::with_defaults("u", NodeKind::UserQuery, Position::default()));
        graph.add_node(Node::with_defaults("d", NodeKind::KnowledgeBase, Position::default()));
        graph.add_node(Node::with_defaults("x", NodeKind::Output, Position::default()));
        graph.insert_edge(Edge::new("u-to-d", "u", "d"));
        graph
    }

    #[test]
    fn test_single_hop() {
        let graph = two_nodes();
        let (next, report) = propagate(&graph, &"u".into(), "hello");

        let u = next.node(&"u".into()).unwrap();
        let d = next.node(&"d".into()).unwrap();
        assert_eq!(u.value(), "hello");
        assert_eq!(d.value(), transform(u));
        assert_eq!(d.input(handle::INPUT), Some("hello"));
        assert_eq!(next.node(&"x".into()), graph.node(&"x".into()));
        assert_eq!(report.updated, vec![NodeId::from("u"), NodeId::from("d")]);
    }

    #[test]
    fn test_query_is_normalized() {
        let graph = two_nodes();
        let (next, _) = propagate(&graph, &"u".into(), "  what   is\tthis ");
        assert_eq!(next.node(&"u".into()).unwrap().value(), "  what   is\tthis ");
        assert_eq!(next.node(&"d".into()).unwrap().value(), "what is this");
    }

    #[test]
    fn test_starter_pipeline_fills_output() {
        let graph = starter_graph();
        let (next, report) = propagate(&graph, &"user-query".into(), "summarize chapter 2");

        let llm = next.node(&"llm".into()).unwrap();
        assert_eq!(llm.input(handle::QUERY_INPUT), Some("summarize chapter 2"));
        assert_eq!(llm.input(handle::CONTEXT_INPUT), Some("summarize chapter 2"));

        let output = next.node(&"output".into()).unwrap();
        let expected = "You are a helpful PDF assistant. Use web search if the PDF lacks context CONTEXT: summarize chapter 2 User Query: summarize chapter 2";
        assert_eq!(output.value(), expected);
        match output.config() {
            NodeConfig::Output(config) => assert_eq!(config.output_text, expected),
            other => panic!("unexpected config {other:?}"),
        }
        assert_eq!(report.updated.len(), 4);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_unknown_node_is_noop() {
        let graph = starter_graph();
        let (next, report) = propagate(&graph, &"ghost".into(), "hi");
        assert_eq!(next, graph);
        assert!(report.is_empty());
    }

    #[test]
    fn test_cycle_nodes_are_skipped() {
        // Edges added as raw changes bypass the connection rules
        let graph = apply_edge_changes(
            &[
                EdgeChange::Add(Edge::new("out-to-llm", "output", "llm")),
                EdgeChange::Add(Edge::new("llm-to-query", "llm", "user-query")),
            ],
            &starter_graph(),
        );
        let (next, report) = propagate(&graph, &"user-query".into(), "hello");

        assert_eq!(next.node(&"user-query".into()).unwrap().value(), "hello");
        assert_eq!(next.node(&"knowledge-base".into()).unwrap().value(), "hello");
        let mut skipped: Vec<_> = report.skipped.iter().map(NodeId::as_str).collect();
        skipped.sort_unstable();
        assert_eq!(skipped, vec!["llm", "output"]);
        // The LLM still received the query but was never recomputed
        assert_eq!(
            next.node(&"llm".into()).unwrap().input(handle::QUERY_INPUT),
            Some("hello")
        );
        assert_eq!(next.node(&"output".into()).unwrap().value(), "");
    }

    #[test]
    fn test_repropagate_uses_current_prompt() {
        let graph = starter_graph();
        let (graph, _) = propagate(&graph, &"user-query".into(), "q");
        let mut graph = graph;
        graph.node_mut(&"llm".into()).unwrap().edit_config(|config| {
            if let NodeConfig::Llm(llm) = config {
                llm.prompt = "Q={query} C={context}".to_string();
            }
        });

        let (next, _) = repropagate(&graph, &"llm".into());
        assert_eq!(next.node(&"output".into()).unwrap().value(), "Q=q C=q");
        assert_eq!(next.node(&"user-query".into()), graph.node(&"user-query".into()));
    }

    #[test]
    fn test_query_placeholders_stay_literal() {
        let mut graph = starter_graph();
        graph.node_mut(&"llm".into()).unwrap().edit_config(|config| {
            if let NodeConfig::Llm(llm) = config {
                llm.prompt = "Q={query}".to_string();
            }
        });

        let (next, _) = propagate(&graph, &"user-query".into(), "explain {context}");
        assert_eq!(next.node(&"output".into()).unwrap().value(), "Q=explain {context}");
    }

    #[test]
    fn test_disconnected_context_is_dropped() {
        let mut graph = starter_graph();
        graph.node_mut(&"llm".into()).unwrap().edit_config(|config| {
            if let NodeConfig::Llm(llm) = config {
                llm.prompt = "Q={query} C={context}".to_string();
            }
        });
        let (graph, _) = propagate(&graph, &"user-query".into(), "q");
        let graph = apply_edge_changes(&[EdgeChange::Remove("kb-to-llm".into())], &graph);

        let (next, _) = repropagate(&graph, &"llm".into());
        assert_eq!(next.node(&"output".into()).unwrap().value(), "Q=q C=");
    }

    #[test]
    fn test_fill_prompt() {
        assert_eq!(fill_prompt("{context}|{query}", "{context}", "{query}"), "{query}|{context}");
        assert_eq!(fill_prompt("{ {unknown} {query", "q", "c"), "{ {unknown} {query");
        assert_eq!(fill_prompt("{{query}}", "q", "c"), "{q}");
        assert_eq!(fill_prompt("", "q", "c"), "");
    }
}
