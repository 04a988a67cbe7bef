//! Session configuration handed to the external voice transport

use serde::{Deserialize, Serialize};

use crate::registry::LlmCatalog;

const ASSISTANT_NAME: &str = "ContextLLM Assistant";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranscriberOptions {
    pub provider: String,
    pub model: String,
    pub language: String,
}

impl Default for TranscriberOptions {
    fn default() -> Self {
        Self {
            provider: "deepgram".to_string(),
            model: "nova-2".to_string(),
            language: "en-US".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VoiceOptions {
    pub provider: String,
    pub voice_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SystemMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelOptions {
    pub provider: String,
    pub model: String,
    pub messages: Vec<SystemMessage>,
}

/// Full assistant definition for one voice call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssistantOptions {
    pub name: String,
    pub transcriber: TranscriberOptions,
    pub voice: VoiceOptions,
    pub model: ModelOptions,
}

impl AssistantOptions {
    /// Build the options for a call answered by `voice_llm`, spoken with
    /// `voice_id` and grounded on `context`.
    pub fn build(voice_llm: &str, voice_id: &str, context: &[String]) -> Self {
        let voice_model = LlmCatalog::new().voice_model(voice_llm);
        Self {
            name: ASSISTANT_NAME.to_string(),
            transcriber: TranscriberOptions::default(),
            voice: VoiceOptions {
                provider: "11labs".to_string(),
                voice_id: voice_id.to_string(),
            },
            model: ModelOptions {
                provider: voice_model.provider,
                model: voice_model.model,
                messages: vec![SystemMessage {
                    role: "system".to_string(),
                    content: system_prompt(context),
                }],
            },
        }
    }

    pub fn system_prompt(&self) -> &str {
        self.model
            .messages
            .first()
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }
}

fn system_prompt(context: &[String]) -> String {
    if context.is_empty() {
        return "You are a helpful AI assistant for ContextLLM. Provide clear, concise, and helpful responses to user queries.".to_string();
    }
    format!(
        "You are a helpful AI assistant for ContextLLM. Use the following context to provide accurate and helpful responses:\n\n{}\n\nProvide clear, concise, and helpful responses to user queries based on this context.",
        context.join("\n\n")
    )
}
