//! Traits and wire types for the ContextLLM backend

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for backend operations
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("API error: HTTP {status}: {body}")]
    ApiError { status: u16, body: String },
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Body of `POST /api/query`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryRequest {
    pub user_prompt: String,
    pub uid: String,
}

/// Successful reply of `POST /api/query`; either field may be absent
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QueryReply {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub chosen_llm: Option<String>,
}

impl QueryReply {
    pub fn new(answer: impl Into<String>, chosen_llm: impl Into<String>) -> Self {
        Self {
            answer: Some(answer.into()),
            chosen_llm: Some(chosen_llm.into()),
        }
    }
}

/// Body of `POST /api/post_context`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContextPost {
    pub context: String,
}

impl ContextPost {
    /// Two-line pairing of one user turn with the assistant reply
    pub fn pair(user: &str, assistant: &str) -> Self {
        Self {
            context: format!("User: {}\nAssistant: {}", user, assistant),
        }
    }
}

/// Reply of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

/// Answers user prompts
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// Send one prompt on behalf of `uid`
    async fn query(&self, prompt: &str, uid: &str) -> ProviderResult<QueryReply>;
}

/// Receives user/assistant pairs for context logging
#[async_trait]
pub trait ContextSink: Send + Sync {
    async fn post_context(&self, user: &str, assistant: &str) -> ProviderResult<()>;
}

/// Supplies the voice path's model tag and context lines.
///
/// Both lookups are infallible: implementations return their defaults when
/// the source is unavailable.
#[async_trait]
pub trait VoiceSettingsSource: Send + Sync {
    async fn voice_llm(&self) -> String;

    async fn context(&self) -> Vec<String>;
}
