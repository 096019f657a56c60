// SPDX-License-Identifier: MIT OR Apache-2.0
//! Request state for the backend resources.
//!
//! [`StackState`] and [`ConfigState`] are updated only by applying
//! [`ApiEvent`]s, so every request moves through pending, fulfilled and
//! rejected the same way.

use crate::models::{KnowledgeBaseDetails, LlmDetails, Stack};

/// Progress of one request
#[derive(Debug, Clone, PartialEq)]
pub enum RequestPhase<T> {
    /// Request sent
    Pending,
    /// Request succeeded
    Fulfilled(T),
    /// Request failed with a user-facing message
    Rejected(String),
}

/// Progress report for a backend call
#[derive(Debug, Clone, PartialEq)]
pub enum ApiEvent {
    /// `GET /api/stacks`
    FetchStacks(RequestPhase<Vec<Stack>>),
    /// `POST /api/stacks`
    CreateStack(RequestPhase<Stack>),
    /// `GET /api/stack/details`
    FetchStackDetails(RequestPhase<LlmDetails>),
    /// `PUT /api/llm/details`
    UpdateLlm(RequestPhase<LlmDetails>),
    /// `PUT /api/knowledge-base/details`
    UpdateKnowledgeBase(RequestPhase<KnowledgeBaseDetails>),
}

/// Saved stacks and the state of the requests that load and create them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StackState {
    /// Known stacks, in server order
    pub stacks: Vec<Stack>,
    /// List request in flight
    pub loading: bool,
    /// List request error
    pub error: Option<String>,
    /// Create request in flight
    pub create_loading: bool,
    /// Create request error
    pub create_error: Option<String>,
}

impl StackState {
    /// Apply a request event. Events for other resources are ignored.
    pub fn apply(&mut self, event: &ApiEvent) {
        match event {
            ApiEvent::FetchStacks(phase) => match phase {
                RequestPhase::Pending => {
                    self.loading = true;
                    self.error = None;
                }
                RequestPhase::Fulfilled(stacks) => {
                    self.loading = false;
                    self.stacks = stacks.clone();
                }
                RequestPhase::Rejected(message) => {
                    self.loading = false;
                    self.error = Some(message.clone());
                }
            },
            ApiEvent::CreateStack(phase) => match phase {
                RequestPhase::Pending => {
                    self.create_loading = true;
                    self.create_error = None;
                }
                RequestPhase::Fulfilled(stack) => {
                    self.create_loading = false;
                    self.stacks.push(stack.clone());
                }
                RequestPhase::Rejected(message) => {
                    self.create_loading = false;
                    self.create_error = Some(message.clone());
                }
            },
            _ => {}
        }
    }

    /// Clear both error fields
    pub fn clear_errors(&mut self) {
        self.error = None;
        self.create_error = None;
    }

    /// Clear the create error
    pub fn clear_create_error(&mut self) {
        self.create_error = None;
    }
}

/// LLM and knowledge base configuration and their request state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigState {
    /// Stored LLM configuration
    pub llm_details: Option<LlmDetails>,
    /// LLM fetch in flight
    pub llm_loading: bool,
    /// LLM fetch error
    pub llm_error: Option<String>,
    /// LLM update in flight
    pub llm_update_loading: bool,
    /// LLM update error
    pub llm_update_error: Option<String>,

    /// Stored knowledge base configuration
    pub knowledge_base_details: Option<KnowledgeBaseDetails>,
    /// Knowledge base fetch in flight
    pub knowledge_base_loading: bool,
    /// Knowledge base fetch error
    pub knowledge_base_error: Option<String>,
    /// Knowledge base update in flight
    pub knowledge_base_update_loading: bool,
    /// Knowledge base update error
    pub knowledge_base_update_error: Option<String>,
}

impl ConfigState {
    /// Apply a request event. Events for other resources are ignored.
    pub fn apply(&mut self, event: &ApiEvent) {
        match event {
            ApiEvent::FetchStackDetails(phase) => match phase {
                RequestPhase::Pending => {
                    self.llm_loading = true;
                    self.llm_error = None;
                }
                RequestPhase::Fulfilled(details) => {
                    self.llm_loading = false;
                    self.llm_details = Some(details.clone());
                }
                RequestPhase::Rejected(message) => {
                    self.llm_loading = false;
                    self.llm_error = Some(message.clone());
                }
            },
            ApiEvent::UpdateLlm(phase) => match phase {
                RequestPhase::Pending => {
                    self.llm_update_loading = true;
                    self.llm_update_error = None;
                }
                RequestPhase::Fulfilled(details) => {
                    self.llm_update_loading = false;
                    self.llm_details = Some(details.clone());
                }
                RequestPhase::Rejected(message) => {
                    self.llm_update_loading = false;
                    self.llm_update_error = Some(message.clone());
                }
            },
            ApiEvent::UpdateKnowledgeBase(phase) => match phase {
                RequestPhase::Pending => {
                    self.knowledge_base_update_loading = true;
                    self.knowledge_base_update_error = None;
                }
                RequestPhase::Fulfilled(details) => {
                    self.knowledge_base_update_loading = false;
                    self.knowledge_base_details = Some(details.clone());
                }
                RequestPhase::Rejected(message) => {
                    self.knowledge_base_update_loading = false;
                    self.knowledge_base_update_error = Some(message.clone());
                }
            },
            _ => {}
        }
    }

    /// Clear the LLM fetch and update errors
    pub fn clear_llm_errors(&mut self) {
        self.llm_error = None;
        self.llm_update_error = None;
    }

    /// Clear the LLM update error
    pub fn clear_llm_update_error(&mut self) {
        self.llm_update_error = None;
    }

    /// Clear the knowledge base fetch and update errors
    pub fn clear_knowledge_base_errors(&mut self) {
        self.knowledge_base_error = None;
        self.knowledge_base_update_error = None;
    }

    /// Clear the knowledge base update error
    pub fn clear_knowledge_base_update_error(&mut self) {
        self.knowledge_base_update_error = None;
    }

    /// Clear every error field
    pub fn clear_all_errors(&mut self) {
        self.clear_llm_errors();
        self.clear_knowledge_base_errors();
    }

    /// Any request in flight
    pub fn is_busy(&self) -> bool {
        self.llm_loading
            || self.llm_update_loading
            || self.knowledge_base_loading
            || self.knowledge_base_update_loading
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::KnowledgeBaseType;

    fn stack(name: &str) -> Stack {
        Stack {
            id: Some(format!("{name}-id")),
            name: name.to_string(),
            description: String::new(),
            created_at: None,
            updated_at: None,
        }
    }

    fn llm(model: &str) -> LlmDetails {
        LlmDetails {
            id: None,
            name: "default".to_string(),
            model: model.to_string(),
            provider: "openai".to_string(),
            api_key: None,
            base_url: None,
            temperature: 0.7,
            max_tokens: 1000.0,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_fetch_replaces_stacks() {
        let mut state = StackState {
            stacks: vec![stack("old")],
            error: Some("stale".to_string()),
            ..Default::default()
        };

        state.apply(&ApiEvent::FetchStacks(RequestPhase::Pending));
        assert!(state.loading);
        assert!(state.error.is_none());

        state.apply(&ApiEvent::FetchStacks(RequestPhase::Fulfilled(vec![
            stack("a"),
            stack("b"),
        ])));
        assert!(!state.loading);
        let names: Vec<_> = state.stacks.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_create_appends() {
        let mut state = StackState {
            stacks: vec![stack("a")],
            ..Default::default()
        };
        state.apply(&ApiEvent::CreateStack(RequestPhase::Pending));
        assert!(state.create_loading);
        assert!(!state.loading);

        state.apply(&ApiEvent::CreateStack(RequestPhase::Fulfilled(stack("b"))));
        assert!(!state.create_loading);
        assert_eq!(state.stacks.len(), 2);
        assert_eq!(state.stacks[1].name, "b");
    }

    #[test]
    fn test_rejections_keep_data() {
        let mut state = StackState {
            stacks: vec![stack("a")],
            ..Default::default()
        };
        state.apply(&ApiEvent::FetchStacks(RequestPhase::Pending));
        state.apply(&ApiEvent::FetchStacks(RequestPhase::Rejected(
            "Failed to fetch stacks".to_string(),
        )));
        state.apply(&ApiEvent::CreateStack(RequestPhase::Rejected(
            "Name taken".to_string(),
        )));

        assert_eq!(state.stacks.len(), 1);
        assert!(!state.loading);
        assert_eq!(state.error.as_deref(), Some("Failed to fetch stacks"));
        assert_eq!(state.create_error.as_deref(), Some("Name taken"));

        state.clear_create_error();
        assert!(state.create_error.is_none());
        assert!(state.error.is_some());

        state.clear_errors();
        assert!(state.error.is_none());
    }

    #[test]
    fn test_stack_state_ignores_config_events() {
        let mut state = StackState::default();
        state.apply(&ApiEvent::UpdateLlm(RequestPhase::Pending));
        assert_eq!(state, StackState::default());
    }

    #[test]
    fn test_llm_fetch_and_update_are_tracked_separately() {
        let mut state = ConfigState::default();

        state.apply(&ApiEvent::FetchStackDetails(RequestPhase::Pending));
        state.apply(&ApiEvent::UpdateLlm(RequestPhase::Pending));
        assert!(state.llm_loading);
        assert!(state.llm_update_loading);
        assert!(state.is_busy());

        state.apply(&ApiEvent::FetchStackDetails(RequestPhase::Fulfilled(llm("GPT-4"))));
        assert!(!state.llm_loading);
        assert!(state.llm_update_loading);

        state.apply(&ApiEvent::UpdateLlm(RequestPhase::Fulfilled(llm("GPT-3.5-turbo"))));
        assert!(!state.is_busy());
        assert_eq!(
            state.llm_details.as_ref().map(|d| d.model.as_str()),
            Some("GPT-3.5-turbo")
        );
    }

    #[test]
    fn test_knowledge_base_update() {
        let mut state = ConfigState::default();
        state.apply(&ApiEvent::UpdateKnowledgeBase(RequestPhase::Pending));
        assert!(state.knowledge_base_update_loading);

        let details = KnowledgeBaseDetails {
            id: None,
            name: "docs".to_string(),
            description: String::new(),
            kind: KnowledgeBaseType::Vector,
            source: "uploads/".to_string(),
            connection_string: None,
            api_key: None,
            index_name: None,
            embedding_model: Some("text-embedding-3-large".to_string()),
            chunk_size: 1000,
            chunk_overlap: 200,
            created_at: None,
            updated_at: None,
        };
        state.apply(&ApiEvent::UpdateKnowledgeBase(RequestPhase::Fulfilled(details.clone())));
        assert!(!state.knowledge_base_update_loading);
        assert_eq!(state.knowledge_base_details, Some(details));
    }

    #[test]
    fn test_clear_config_errors() {
        let mut state = ConfigState::default();
        state.apply(&ApiEvent::FetchStackDetails(RequestPhase::Rejected("a".to_string())));
        state.apply(&ApiEvent::UpdateLlm(RequestPhase::Rejected("b".to_string())));
        state.apply(&ApiEvent::UpdateKnowledgeBase(RequestPhase::Rejected("c".to_string())));
        state.knowledge_base_error = Some("d".to_string());

        state.clear_llm_update_error();
        assert_eq!(state.llm_error.as_deref(), Some("a"));
        assert!(state.llm_update_error.is_none());

        state.clear_knowledge_base_update_error();
        assert_eq!(state.knowledge_base_error.as_deref(), Some("d"));

        state.clear_all_errors();
        assert!(state.llm_error.is_none());
        assert!(state.knowledge_base_error.is_none());
    }
}
