//! reqwest client for the ContextLLM backend HTTP API

use async_trait::async_trait;
use contextllm_core::config::Config;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::base::{
    ContextPost, ContextSink, HealthStatus, ProviderError, ProviderResult, QueryBackend,
    QueryReply, QueryRequest, VoiceSettingsSource,
};

/// Values returned by the voice-settings lookups when the backend fails
#[derive(Debug, Clone)]
pub struct VoiceDefaults {
    pub llm: String,
    pub context: Vec<String>,
}

impl Default for VoiceDefaults {
    fn default() -> Self {
        Self {
            llm: "gpt".to_string(),
            context: vec![
                "This is a placeholder context. RAG pipeline not yet implemented.".to_string(),
            ],
        }
    }
}

#[derive(Debug, Deserialize)]
struct VoiceLlmResponse {
    #[serde(default)]
    chosen_llm: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContextResponse {
    #[serde(default)]
    context: Option<Vec<String>>,
}

/// HTTP client for every endpoint the engine consumes
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    voice_defaults: VoiceDefaults,
}

impl HttpBackend {
    /// Create a client for `base_url` (e.g. `http://localhost:8080`)
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url,
            voice_defaults: VoiceDefaults::default(),
        }
    }

    /// Create a client from the loaded configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.backend.base_url.clone(),
            Duration::from_secs(config.backend.timeout_secs),
        )
        .with_voice_defaults(VoiceDefaults {
            llm: config.engine.default_llm.clone(),
            context: vec![config.voice.placeholder_context.clone()],
        })
    }

    pub fn with_voice_defaults(mut self, defaults: VoiceDefaults) -> Self {
        self.voice_defaults = defaults;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Fail with `ApiError` on any non-success status
    async fn check_status(response: reqwest::Response) -> ProviderResult<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(ProviderError::ApiError {
            status: status.as_u16(),
            body,
        })
    }

    /// Decode a successful response body
    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> ProviderResult<T> {
        let response = Self::check_status(response).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ProviderResult<T> {
        let response = self.client.get(self.url(path)).send().await?;
        Self::read_json(response).await
    }

    /// `GET /health`
    pub async fn health(&self) -> ProviderResult<HealthStatus> {
        self.get_json("/health").await
    }

    async fn fetch_voice_llm(&self) -> ProviderResult<String> {
        let data: VoiceLlmResponse = self.get_json("/api/get_voice_llm").await?;
        data.chosen_llm
            .filter(|llm| !llm.trim().is_empty())
            .ok_or_else(|| ProviderError::InvalidResponse("missing chosen_llm".to_string()))
    }

    async fn fetch_context(&self) -> ProviderResult<Vec<String>> {
        let data: ContextResponse = self.get_json("/api/get_context").await?;
        data.context
            .ok_or_else(|| ProviderError::InvalidResponse("missing context".to_string()))
    }
}

#[async_trait]
impl QueryBackend for HttpBackend {
    async fn query(&self, prompt: &str, uid: &str) -> ProviderResult<QueryReply> {
        let request = QueryRequest {
            user_prompt: prompt.to_string(),
            uid: uid.to_string(),
        };
        debug!("Sending query to {} for uid {}", self.base_url, uid);

        let response = self
            .client
            .post(self.url("/api/query"))
            .json(&request)
            .send()
            .await?;
        Self::read_json(response).await
    }
}

#[async_trait]
impl ContextSink for HttpBackend {
    async fn post_context(&self, user: &str, assistant: &str) -> ProviderResult<()> {
        let body = ContextPost::pair(user, assistant);
        let response = self
            .client
            .post(self.url("/api/post_context"))
            .json(&body)
            .send()
            .await?;
        Self::check_status(response).await?;
        debug!("Posted conversation pair to context");
        Ok(())
    }
}

#[async_trait]
impl VoiceSettingsSource for HttpBackend {
    async fn voice_llm(&self) -> String {
        match self.fetch_voice_llm().await {
            Ok(llm) => llm,
            Err(e) => {
                warn!("Voice LLM lookup failed, using default: {}", e);
                self.voice_defaults.llm.clone()
            }
        }
    }

    async fn context(&self) -> Vec<String> {
        match self.fetch_context().await {
            Ok(context) => context,
            Err(e) => {
                warn!("Context lookup failed, using placeholder: {}", e);
                self.voice_defaults.context.clone()
            }
        }
    }
}
