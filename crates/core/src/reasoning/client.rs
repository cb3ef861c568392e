//! # Reasoning Client
//!
//! Transport seam for the external reasoning service. The client sends a
//! stage task (instruction + structured context) and returns the raw
//! assistant text without interpreting it — recovering structure from
//! that text is the extractor's job.

use crate::error::ServiceError;
use crate::models::ReasoningConfig;
use crate::stages::{StageName, StageTask};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Transport for one reasoning call.
#[async_trait]
pub trait ReasoningClient: Send + Sync {
    /// Send a stage task and return the raw response text.
    async fn complete(&self, task: &StageTask) -> Result<String, ServiceError>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: String,
}

/// OpenAI-compatible chat-completions client (OpenAI, OpenRouter, local
/// Ollama-style endpoints). One reqwest client, reused across calls;
/// each call is an independent request/response.
pub struct HttpReasoningClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    retryable_status: Vec<u16>,
}

impl HttpReasoningClient {
    pub fn new(config: &ReasoningConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| anyhow::anyhow!("failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            endpoint: config.endpoint(),
            model: config.model.clone(),
            api_key: config.resolve_api_key()?,
            retryable_status: config.retry.retryable_status.clone(),
        })
    }
}

#[async_trait]
impl ReasoningClient for HttpReasoningClient {
    async fn complete(&self, task: &StageTask) -> Result<String, ServiceError> {
        let url = format!("{}/chat/completions", self.endpoint);
        let context = serde_json::to_string_pretty(&task.context).unwrap_or_default();
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: task.instruction.clone(),
                },
                ChatMessage {
                    role: "user",
                    content: context,
                },
            ],
            temperature: 0.0,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    ServiceError::transport(format!("request failed: {}", e))
                } else {
                    ServiceError::permanent(format!("request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let code = status.as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::status(
                code,
                self.retryable_status.contains(&code),
                format!("service returned status {}: {}", code, body),
            ));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::permanent(format!("unreadable response body: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ServiceError::permanent("response contained no choices"))
    }
}

/// Deterministic client for tests and offline runs: replays a scripted
/// sequence of results and records which stages called it.
pub struct StubReasoningClient {
    responses: Mutex<VecDeque<Result<String, ServiceError>>>,
    seen: Mutex<Vec<StageName>>,
}

impl StubReasoningClient {
    pub fn new(responses: Vec<Result<String, ServiceError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Script that answers every call with the same error.
    pub fn always_err(err: ServiceError, calls: usize) -> Self {
        Self::new(vec![Err(err); calls])
    }

    /// Stages that have called this client, in order.
    pub fn seen_stages(&self) -> Vec<StageName> {
        self.seen.lock().expect("stub lock poisoned").clone()
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.seen.lock().expect("stub lock poisoned").len()
    }
}

#[async_trait]
impl ReasoningClient for StubReasoningClient {
    async fn complete(&self, task: &StageTask) -> Result<String, ServiceError> {
        self.seen.lock().expect("stub lock poisoned").push(task.stage);
        self.responses
            .lock()
            .expect("stub lock poisoned")
            .pop_front()
            .unwrap_or_else(|| Err(ServiceError::permanent("stub script exhausted")))
    }
}
