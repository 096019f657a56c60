// SPDX-License-Identifier: MIT OR Apache-2.0
//! Backend wire types.
//!
//! Field names are camelCase on the wire; the snake_case spelling the backend
//! emits is accepted as an alias.

use serde::{Deserialize, Deserializer, Serialize};

/// `null` decodes to the type's default
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A saved stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stack {
    /// Server-assigned ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Stack name
    pub name: String,
    /// Stack description
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Creation timestamp
    #[serde(default, alias = "created_at", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Last update timestamp
    #[serde(default, alias = "updated_at", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Body of `POST /api/stacks`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateStackRequest {
    /// Stack name
    pub name: String,
    /// Stack description
    pub description: String,
}

impl CreateStackRequest {
    /// Build a request from form input. Both fields are trimmed and must be non-empty.
    pub fn from_form(name: &str, description: &str) -> Option<Self> {
        let name = name.trim();
        let description = description.trim();
        if name.is_empty() || description.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            description: description.to_string(),
        })
    }
}

/// LLM configuration stored by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmDetails {
    /// Server-assigned ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display name
    pub name: String,
    /// Model name
    pub model: String,
    /// Provider name
    pub provider: String,
    /// Provider API key
    #[serde(default, alias = "api_key", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Provider base URL
    #[serde(default, alias = "base_url", skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Sampling temperature
    pub temperature: f64,
    /// Maximum number of generated tokens
    #[serde(alias = "max_tokens")]
    pub max_tokens: f64,
    /// Creation timestamp
    #[serde(default, alias = "created_at", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Last update timestamp
    #[serde(default, alias = "updated_at", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Body of `PUT /api/llm/details`; unset fields are left unchanged
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLlmRequest {
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Model name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Provider name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Provider API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Provider base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Maximum number of generated tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<f64>,
}

/// Storage type of a knowledge base
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeBaseType {
    /// Vector store
    Vector,
    /// Document store
    Document,
    /// Database
    Database,
}

/// Knowledge base configuration stored by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBaseDetails {
    /// Server-assigned ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display name
    pub name: String,
    /// Description
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Storage type
    #[serde(rename = "type")]
    pub kind: KnowledgeBaseType,
    /// Source location
    pub source: String,
    /// Database connection string
    #[serde(default, alias = "connection_string", skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<String>,
    /// Provider API key
    #[serde(default, alias = "api_key", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Index name
    #[serde(default, alias = "index_name", skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
    /// Embedding model name
    #[serde(default, alias = "embedding_model", skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    /// Chunk size used when indexing
    #[serde(alias = "chunk_size")]
    pub chunk_size: u32,
    /// Overlap between chunks
    #[serde(alias = "chunk_overlap")]
    pub chunk_overlap: u32,
    /// Creation timestamp
    #[serde(default, alias = "created_at", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Last update timestamp
    #[serde(default, alias = "updated_at", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Body of `PUT /api/knowledge-base/details`; unset fields are left unchanged
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateKnowledgeBaseRequest {
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Storage type
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<KnowledgeBaseType>,
    /// Source location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Database connection string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<String>,
    /// Provider API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Index name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
    /// Embedding model name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    /// Chunk size used when indexing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<u32>,
    /// Overlap between chunks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_overlap: Option<u32>,
}
