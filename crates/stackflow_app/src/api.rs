// SPDX-License-Identifier: MIT OR Apache-2.0
//! REST client for the stack backend.
//!
//! [`ApiClient`] performs the HTTP calls. [`ApiService`] runs them on a tokio
//! runtime and reports each request's progress as [`ApiEvent`]s over a channel
//! the UI thread drains once per frame.

use crate::models::{
    CreateStackRequest, KnowledgeBaseDetails, LlmDetails, Stack, UpdateKnowledgeBaseRequest,
    UpdateLlmRequest,
};
use crate::settings::ApiSettings;
use crate::store::{ApiEvent, RequestPhase};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;
use thiserror::Error;

/// Fallback messages shown when the backend gives no reason
pub mod fallback {
    /// `GET /api/stacks`
    pub const FETCH_STACKS: &str = "Failed to fetch stacks";
    /// `POST /api/stacks`
    pub const CREATE_STACK: &str = "Failed to create stack";
    /// `GET /api/stack/details`
    pub const FETCH_STACK_DETAILS: &str = "Failed to fetch Stack details";
    /// `PUT /api/llm/details`
    pub const UPDATE_LLM: &str = "Failed to update LLM details";
    /// `PUT /api/knowledge-base/details`
    pub const UPDATE_KNOWLEDGE_BASE: &str = "Failed to update Knowledge Base details";
}

/// REST client errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request could not be sent or the response could not be read
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Message extracted from the response body
        message: String,
    },

    /// Response body did not match the expected shape
    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Message to show the user: the backend's reason if it gave one, else `fallback`
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Status { message, .. } => message.clone(),
            Self::Transport(_) | Self::Decode(_) => fallback.to_string(),
        }
    }
}

/// Reason carried by an error response body: its `message` field, else its
/// `detail` field, else `fallback`
pub fn extract_error_message(body: &[u8], fallback: &str) -> String {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) else {
        return fallback.to_string();
    };
    ["message", "detail"]
        .iter()
        .find_map(|key| value.get(key).and_then(serde_json::Value::as_str))
        .filter(|message| !message.trim().is_empty())
        .map_or_else(|| fallback.to_string(), str::to_string)
}

/// HTTP client bound to one backend
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for the configured backend
    pub fn new(settings: &ApiSettings) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Backend base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `GET /api/stacks`
    pub async fn fetch_stacks(&self) -> Result<Vec<Stack>, ApiError> {
        self.send(self.client.get(self.url("/api/stacks")), fallback::FETCH_STACKS)
            .await
    }

    /// `POST /api/stacks`
    pub async fn create_stack(&self, request: &CreateStackRequest) -> Result<Stack, ApiError> {
        self.send_json(
            self.client.post(self.url("/api/stacks")),
            request,
            fallback::CREATE_STACK,
        )
        .await
    }

    /// `GET /api/stack/details`
    pub async fn fetch_stack_details(&self) -> Result<LlmDetails, ApiError> {
        self.send(
            self.client.get(self.url("/api/stack/details")),
            fallback::FETCH_STACK_DETAILS,
        )
        .await
    }

    /// `PUT /api/llm/details`
    pub async fn update_llm_details(&self, request: &UpdateLlmRequest) -> Result<LlmDetails, ApiError> {
        self.send_json(
            self.client.put(self.url("/api/llm/details")),
            request,
            fallback::UPDATE_LLM,
        )
        .await
    }

    /// `PUT /api/knowledge-base/details`
    pub async fn update_knowledge_base_details(
        &self,
        request: &UpdateKnowledgeBaseRequest,
    ) -> Result<KnowledgeBaseDetails, ApiError> {
        self.send_json(
            self.client.put(self.url("/api/knowledge-base/details")),
            request,
            fallback::UPDATE_KNOWLEDGE_BASE,
        )
        .await
    }

    async fn send_json<B, T>(
        &self,
        request: reqwest::RequestBuilder,
        body: &B,
        fallback: &str,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(request.json(body), fallback).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        fallback: &str,
    ) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: extract_error_message(&body, fallback),
            });
        }

        Ok(serde_json::from_slice(&body)?)
    }
}

/// Runs requests in the background and reports them as [`ApiEvent`]s.
///
/// Each call sends a pending event immediately and a fulfilled or rejected
/// event once the request completes. Overlapping calls are not coalesced.
pub struct ApiService {
    runtime: tokio::runtime::Runtime,
    client: ApiClient,
    tx: Sender<ApiEvent>,
    rx: Receiver<ApiEvent>,
}

impl ApiService {
    /// Create the service and its runtime
    pub fn new(settings: &ApiSettings) -> Result<Self, crate::app::AppError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("stackflow-api")
            .enable_all()
            .build()?;
        let client = ApiClient::new(settings)?;
        let (tx, rx) = mpsc::channel();
        tracing::info!("API client targeting {}", client.base_url());
        Ok(Self {
            runtime,
            client,
            tx,
            rx,
        })
    }

    /// Events received since the last call
    pub fn drain(&self) -> Vec<ApiEvent> {
        self.rx.try_iter().collect()
    }

    /// Load the stack list
    pub fn fetch_stacks(&self) {
        self.spawn(ApiEvent::FetchStacks, fallback::FETCH_STACKS, |client| async move {
            client.fetch_stacks().await
        });
    }

    /// Create a stack
    pub fn create_stack(&self, request: CreateStackRequest) {
        self.spawn(ApiEvent::CreateStack, fallback::CREATE_STACK, |client| async move {
            client.create_stack(&request).await
        });
    }

    /// Load the stored LLM configuration
    pub fn fetch_stack_details(&self) {
        self.spawn(
            ApiEvent::FetchStackDetails,
            fallback::FETCH_STACK_DETAILS,
            |client| async move { client.fetch_stack_details().await },
        );
    }

    /// Update the stored LLM configuration
    pub fn update_llm_details(&self, request: UpdateLlmRequest) {
        self.spawn(ApiEvent::UpdateLlm, fallback::UPDATE_LLM, |client| async move {
            client.update_llm_details(&request).await
        });
    }

    /// Update the stored knowledge base configuration
    pub fn update_knowledge_base_details(&self, request: UpdateKnowledgeBaseRequest) {
        self.spawn(
            ApiEvent::UpdateKnowledgeBase,
            fallback::UPDATE_KNOWLEDGE_BASE,
            |client| async move { client.update_knowledge_base_details(&request).await },
        );
    }

    fn spawn<T, F, Fut>(&self, event: fn(RequestPhase<T>) -> ApiEvent, fallback: &'static str, call: F)
    where
        T: Send + 'static,
        F: FnOnce(ApiClient) -> Fut,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        // A closed channel means the UI is shutting down
        let _ = self.tx.send(event(RequestPhase::Pending));

        let tx = self.tx.clone();
        let request = call(self.client.clone());
        self.runtime.spawn(async move {
            let phase = match request.await {
                Ok(value) => RequestPhase::Fulfilled(value),
                Err(err) => {
                    tracing::warn!("{fallback}: {err}");
                    RequestPhase::Rejected(err.user_message(fallback))
                }
            };
            let _ = tx.send(event(phase));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_field_wins() {
        let body = br#"{"message": "Name taken", "detail": "ignored"}"#;
        assert_eq!(extract_error_message(body, fallback::CREATE_STACK), "Name taken");
    }

    #[test]
    fn test_detail_field() {
        let body = br#"{"detail": "LLM configuration not found"}"#;
        assert_eq!(
            extract_error_message(body, fallback::FETCH_STACK_DETAILS),
            "LLM configuration not found"
        );
    }

    #[test]
    fn test_fallback() {
        assert_eq!(extract_error_message(b"", fallback::FETCH_STACKS), "Failed to fetch stacks");
        assert_eq!(
            extract_error_message(b"<html>502</html>", fallback::UPDATE_LLM),
            "Failed to update LLM details"
        );
        // Validation errors carry a list in `detail`
        let body = br#"{"detail": [{"loc": ["body", "name"], "msg": "field required"}]}"#;
        assert_eq!(extract_error_message(body, fallback::CREATE_STACK), "Failed to create stack");
    }

    #[test]
    fn test_user_message() {
        let err = ApiError::Status {
            status: 404,
            message: "Stack not found".to_string(),
        };
        assert_eq!(err.user_message(fallback::FETCH_STACKS), "Stack not found");

        let decode = serde_json::from_str::<Stack>("{}").unwrap_err();
        assert_eq!(
            ApiError::Decode(decode).user_message(fallback::FETCH_STACKS),
            "Failed to fetch stacks"
        );
    }

    #[test]
    fn test_base_url_normalized() {
        let settings = ApiSettings {
            base_url: "http://localhost:8000/".to_string(),
            timeout_secs: 5,
        };
        let client = ApiClient::new(&settings).unwrap();
        assert_eq!(client.url("/api/stacks"), "http://localhost:8000/api/stacks");
    }
}
