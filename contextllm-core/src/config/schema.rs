//! Configuration schema definitions

use crate::session::RegistrySettings;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root configuration for ContextLLM
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Query backend connection
    #[serde(default)]
    pub backend: BackendConfig,
    /// Conversation engine behaviour
    #[serde(default)]
    pub engine: EngineConfig,
    /// Voice path defaults
    #[serde(default)]
    pub voice: VoiceConfig,
    /// Identity used when querying the backend
    #[serde(default)]
    pub identity: IdentityConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            overrides: HashMap::new(),
        }
    }
}

/// Query backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the backend, without the `/api` suffix
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Conversation engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Model tag assumed before any backend reply names one
    #[serde(default = "default_llm")]
    pub default_llm: String,
    /// Title of a session with no messages
    #[serde(default = "default_placeholder_title")]
    pub placeholder_title: String,
    /// Characters of the first message kept in a derived title
    #[serde(default = "default_title_prefix_chars")]
    pub title_prefix_chars: usize,
    /// Window within which an identical voice message counts as a duplicate
    #[serde(default = "default_dedup_window_ms")]
    pub dedup_window_ms: u64,
    /// Assistant text shown when a query fails
    #[serde(default = "default_error_message")]
    pub error_message: String,
    /// Assistant text used when the backend reply carries no answer
    #[serde(default = "default_fallback_answer")]
    pub fallback_answer: String,
}

fn default_llm() -> String {
    "gpt".to_string()
}

fn default_placeholder_title() -> String {
    "New chat".to_string()
}

fn default_title_prefix_chars() -> usize {
    30
}

fn default_dedup_window_ms() -> u64 {
    1000
}

fn default_error_message() -> String {
    "Sorry, I encountered an error while processing your request. Please try again.".to_string()
}

fn default_fallback_answer() -> String {
    "Sorry, I couldn't generate a response.".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_llm: default_llm(),
            placeholder_title: default_placeholder_title(),
            title_prefix_chars: default_title_prefix_chars(),
            dedup_window_ms: default_dedup_window_ms(),
            error_message: default_error_message(),
            fallback_answer: default_fallback_answer(),
        }
    }
}

impl EngineConfig {
    /// Settings handed to the session registry
    pub fn registry_settings(&self) -> RegistrySettings {
        RegistrySettings {
            placeholder_title: self.placeholder_title.clone(),
            title_prefix_chars: self.title_prefix_chars,
        }
    }
}

/// Voice path configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Voice used when no preference has been saved
    #[serde(default = "default_voice_id")]
    pub default_voice_id: String,
    /// Context line used when the context lookup fails
    #[serde(default = "default_placeholder_context")]
    pub placeholder_context: String,
    /// Transient indicator shown after a transport error
    #[serde(default = "default_voice_error_message")]
    pub error_message: String,
}

fn default_voice_id() -> String {
    "pNInz6obpgDQGcFmaJgB".to_string()
}

fn default_placeholder_context() -> String {
    "This is a placeholder context. RAG pipeline not yet implemented.".to_string()
}

fn default_voice_error_message() -> String {
    "Voice input error. Please try again.".to_string()
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            default_voice_id: default_voice_id(),
            placeholder_context: default_placeholder_context(),
            error_message: default_voice_error_message(),
        }
    }
}

/// Identity configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// User id sent with every query
    #[serde(default = "default_uid")]
    pub uid: String,
}

fn default_uid() -> String {
    "anonymous".to_string()
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self { uid: default_uid() }
    }
}
