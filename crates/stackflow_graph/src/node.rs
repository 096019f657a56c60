// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the flow graph.
//!
//! A node is one stage of an AI stack pipeline. The set of stages is closed:
//! [`NodeKind`] enumerates them and every kind-specific lookup (handles,
//! defaults, styling, transforms) is an exhaustive match over it.

use crate::handle::{self, HandleDirection};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Default embedding model of a knowledge base node
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-large";
/// Default model of an LLM node
pub const DEFAULT_LLM_MODEL: &str = "GPT 4o- Mini";
/// Default prompt template of an LLM node
pub const DEFAULT_LLM_PROMPT: &str = "You are a helpful PDF assistant. Use web search if the PDF lacks context CONTEXT: {context} User Query: {query}";
/// Default sampling temperature of an LLM node
pub const DEFAULT_TEMPERATURE: f32 = 0.75;
/// Embedding models offered by the inspector
pub const EMBEDDING_MODELS: [&str; 2] = ["text-embedding-3-large", "text-embedding-3-small"];
/// LLM models offered by the inspector
pub const LLM_MODELS: [&str; 3] = ["GPT 4o- Mini", "GPT-4", "GPT-3.5-turbo"];
/// Allowed temperature range
pub const TEMPERATURE_RANGE: std::ops::RangeInclusive<f32> = 0.0..=2.0;

/// Unique identifier for a node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    /// Create a node ID from any string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw ID
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Position on the canvas (graph space)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate
    pub x: f32,
    /// Vertical coordinate
    pub y: f32,
}

impl Position {
    /// Create a position
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Offset by a delta
    pub fn translated(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl From<[f32; 2]> for Position {
    fn from([x, y]: [f32; 2]) -> Self {
        Self::new(x, y)
    }
}

/// The pipeline stage a node represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    /// Entry point where the user's query is typed
    UserQuery,
    /// Document store queried for context
    KnowledgeBase,
    /// Language model call
    Llm,
    /// Final answer display
    Output,
}

impl NodeKind {
    /// All kinds, in palette order
    pub const ALL: [NodeKind; 4] = [
        NodeKind::UserQuery,
        NodeKind::Llm,
        NodeKind::KnowledgeBase,
        NodeKind::Output,
    ];

    /// Wire name, also used as the palette drag payload
    pub fn slug(self) -> &'static str {
        match self {
            Self::UserQuery => "userQuery",
            Self::KnowledgeBase => "knowledgeBase",
            Self::Llm => "llm",
            Self::Output => "output",
        }
    }

    /// Decode a palette drop payload. Unknown payloads decode to `None`.
    pub fn from_payload(payload: &str) -> Option<Self> {
        match payload.trim() {
            "userQuery" => Some(Self::UserQuery),
            "knowledgeBase" => Some(Self::KnowledgeBase),
            "llm" => Some(Self::Llm),
            "output" => Some(Self::Output),
            _ => None,
        }
    }

    /// Display name
    pub fn display_name(self) -> &'static str {
        match self {
            Self::UserQuery => "User Query",
            Self::KnowledgeBase => "Knowledge Base",
            Self::Llm => "LLM (OpenAI)",
            Self::Output => "Output",
        }
    }

    /// One-line description shown under the title
    pub fn description(self) -> &'static str {
        match self {
            Self::UserQuery => "Entry point for queries",
            Self::KnowledgeBase => "Let LLM search info in your file",
            Self::Llm => "Run a query with OpenAI LLM",
            Self::Output => "Output of the result nodes as text",
        }
    }

    /// Header color (RGB)
    pub fn color(self) -> [u8; 3] {
        match self {
            Self::UserQuery => [59, 130, 246],
            Self::KnowledgeBase => [34, 160, 94],
            Self::Llm => [147, 51, 234],
            Self::Output => [234, 130, 20],
        }
    }

    /// Input handle names, in drawing order
    pub fn input_handles(self) -> &'static [&'static str] {
        match self {
            Self::UserQuery => &[],
            Self::KnowledgeBase | Self::Output => &[handle::INPUT],
            Self::Llm => &[handle::QUERY_INPUT, handle::CONTEXT_INPUT],
        }
    }

    /// Output handle names, in drawing order
    pub fn output_handles(self) -> &'static [&'static str] {
        match self {
            Self::UserQuery | Self::KnowledgeBase | Self::Llm => &[handle::OUTPUT],
            Self::Output => &[],
        }
    }

    /// Check whether this kind declares a handle with the given name and direction
    pub fn has_handle(self, name: &str, direction: HandleDirection) -> bool {
        let handles = match direction {
            HandleDirection::Input => self.input_handles(),
            HandleDirection::Output => self.output_handles(),
        };
        handles.contains(&name)
    }

    /// Input handle that receives values from an edge without an explicit target handle
    pub fn default_input_handle(self, source: NodeKind) -> &'static str {
        match (self, source) {
            (Self::Llm, Self::KnowledgeBase) => handle::CONTEXT_INPUT,
            (Self::Llm, _) => handle::QUERY_INPUT,
            _ => handle::INPUT,
        }
    }

    /// Default configuration payload for a freshly created node
    pub fn default_config(self) -> NodeConfig {
        match self {
            Self::UserQuery => NodeConfig::UserQuery(UserQueryConfig::default()),
            Self::KnowledgeBase => NodeConfig::KnowledgeBase(KnowledgeBaseConfig::default()),
            Self::Llm => NodeConfig::Llm(LlmConfig::default()),
            Self::Output => NodeConfig::Output(OutputConfig::default()),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// User query payload
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQueryConfig {
    /// The query text
    pub query: String,
}

/// Knowledge base payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBaseConfig {
    /// Embedding model name
    pub embedding_model: String,
    /// Provider API key
    pub api_key: String,
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            api_key: String::new(),
        }
    }
}

/// LLM payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmConfig {
    /// Model name
    pub model: String,
    /// Provider API key
    pub api_key: String,
    /// Prompt template with `{context}` and `{query}` placeholders
    pub prompt: String,
    /// Sampling temperature, kept within [`TEMPERATURE_RANGE`]
    pub temperature: f32,
    /// Whether web search may supplement missing context
    pub web_search_enabled: bool,
    /// Search API key
    pub serf_api_key: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_LLM_MODEL.to_string(),
            api_key: String::new(),
            prompt: DEFAULT_LLM_PROMPT.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            web_search_enabled: true,
            serf_api_key: String::new(),
        }
    }
}

/// Output payload
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputConfig {
    /// Text shown in the output node
    pub output_text: String,
}

/// Kind-specific node configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeConfig {
    /// User query
    UserQuery(UserQueryConfig),
    /// Knowledge base
    KnowledgeBase(KnowledgeBaseConfig),
    /// LLM
    Llm(LlmConfig),
    /// Output
    Output(OutputConfig),
}

impl NodeConfig {
    /// The kind this payload belongs to
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::UserQuery(_) => NodeKind::UserQuery,
            Self::KnowledgeBase(_) => NodeKind::KnowledgeBase,
            Self::Llm(_) => NodeKind::Llm,
            Self::Output(_) => NodeKind::Output,
        }
    }

    /// Clamp values that have a valid range
    fn normalize(&mut self) {
        if let Self::Llm(llm) = self {
            if !llm.temperature.is_finite() {
                llm.temperature = DEFAULT_TEMPERATURE;
            }
            llm.temperature = llm
                .temperature
                .clamp(*TEMPERATURE_RANGE.start(), *TEMPERATURE_RANGE.end());
        }
    }
}

/// Data carried by a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    /// Most recent value written into the node
    #[serde(default)]
    pub value: String,
    /// Last value received on each input handle
    #[serde(default)]
    pub inputs: BTreeMap<String, String>,
    /// Kind-specific configuration
    pub config: NodeConfig,
}

/// A node instance in the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Position on the canvas
    pub position: Position,
    /// Whether the node is selected in the editor
    #[serde(default)]
    pub selected: bool,
    data: NodeData,
}

impl Node {
    /// Create a node with the given configuration
    pub fn new(id: impl Into<NodeId>, position: Position, mut config: NodeConfig) -> Self {
        config.normalize();
        Self {
            id: id.into(),
            position,
            selected: false,
            data: NodeData {
                value: String::new(),
                inputs: BTreeMap::new(),
                config,
            },
        }
    }

    /// Create a node of the given kind with default configuration
    pub fn with_defaults(id: impl Into<NodeId>, kind: NodeKind, position: Position) -> Self {
        Self::new(id, position, kind.default_config())
    }

    /// The node kind. Fixed for the lifetime of the node.
    pub fn kind(&self) -> NodeKind {
        self.data.config.kind()
    }

    /// Node data
    pub fn data(&self) -> &NodeData {
        &self.data
    }

    /// Configuration payload
    pub fn config(&self) -> &NodeConfig {
        &self.data.config
    }

    /// Current value
    pub fn value(&self) -> &str {
        &self.data.value
    }

    /// Value last received on an input handle
    pub fn input(&self, handle: &str) -> Option<&str> {
        self.data.inputs.get(handle).map(String::as_str)
    }

    /// Set the current value
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.data.value = value.into();
    }

    /// Record a value received on an input handle
    pub fn set_input(&mut self, handle: impl Into<String>, value: impl Into<String>) {
        self.data.inputs.insert(handle.into(), value.into());
    }

    /// Forget the value received on an input handle
    pub fn clear_input(&mut self, handle: &str) {
        self.data.inputs.remove(handle);
    }

    /// Edit the configuration in place.
    ///
    /// Returns `false` and leaves the node untouched if the edit would change
    /// the node kind.
    pub fn edit_config(&mut self, edit: impl FnOnce(&mut NodeConfig)) -> bool {
        let mut config = self.data.config.clone();
        edit(&mut config);
        self.replace_config(config)
    }

    /// Replace the configuration with one of the same kind
    pub fn replace_config(&mut self, mut config: NodeConfig) -> bool {
        if config.kind() != self.kind() {
            tracing::debug!(
                node = %self.id,
                from = %self.kind(),
                to = %config.kind(),
                "Rejected config edit that changes the node kind"
            );
            return false;
        }
        config.normalize();
        self.data.config = config;
        true
    }

    /// Set the position
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = Position::new(x, y);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_decoding() {
        for kind in NodeKind::ALL {
            assert_eq!(NodeKind::from_payload(kind.slug()), Some(kind));
        }
        assert_eq!(NodeKind::from_payload("custom"), None);
        assert_eq!(NodeKind::from_payload(""), None);
    }

    #[test]
    fn test_kind_is_immutable() {
        let mut node = Node::with_defaults("llm", NodeKind::Llm, Position::default());
        let changed = node.edit_config(|config| {
            *config = NodeConfig::Output(OutputConfig::default());
        });
        assert!(!changed);
        assert_eq!(node.kind(), NodeKind::Llm);
        assert_eq!(node.config(), &NodeConfig::Llm(LlmConfig::default()));
    }

    #[test]
    fn test_temperature_clamped() {
        let mut node = Node::with_defaults("llm", NodeKind::Llm, Position::default());
        assert!(node.edit_config(|config| {
            if let NodeConfig::Llm(llm) = config {
                llm.temperature = 7.5;
            }
        }));
        match node.config() {
            NodeConfig::Llm(llm) => assert_eq!(llm.temperature, 2.0),
            other => panic!("unexpected config {other:?}"),
        }
    }

    #[test]
    fn test_default_handles() {
        assert_eq!(
            NodeKind::Llm.default_input_handle(NodeKind::UserQuery),
            handle::QUERY_INPUT
        );
        assert_eq!(
            NodeKind::Llm.default_input_handle(NodeKind::KnowledgeBase),
            handle::CONTEXT_INPUT
        );
        assert_eq!(
            NodeKind::Output.default_input_handle(NodeKind::Llm),
            handle::INPUT
        );
        assert!(NodeKind::UserQuery.input_handles().is_empty());
        assert!(NodeKind::Output.output_handles().is_empty());
    }

    #[test]
    fn test_serialization() {
        let node = Node::with_defaults("kb", NodeKind::KnowledgeBase, Position::new(1.0, 2.0));
        let ron_str = ron::ser::to_string_pretty(&node, ron::ser::PrettyConfig::default()).unwrap();
        let loaded: Node = ron::from_str(&ron_str).unwrap();
        assert_eq!(loaded, node);
        assert_eq!(loaded.kind(), NodeKind::KnowledgeBase);
    }
}
