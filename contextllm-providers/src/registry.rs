//! Model and voice catalogs - single source of truth for display metadata

use serde::{Deserialize, Serialize};

/// Tag used when a model tag is unknown or missing
pub const DEFAULT_LLM: &str = "gpt";

/// One backend model tag and its display metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LlmSpec {
    /// Tag as reported in `chosen_llm`
    pub tag: String,
    pub display_name: String,
    pub vendor: String,
    /// Provider/model pair used when the tag drives a voice call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_model: Option<VoiceModel>,
}

impl LlmSpec {
    fn new(tag: &str, display_name: &str, vendor: &str) -> Self {
        Self {
            tag: tag.to_string(),
            display_name: display_name.to_string(),
            vendor: vendor.to_string(),
            voice_model: None,
        }
    }

    fn with_voice_model(mut self, provider: &str, model: &str) -> Self {
        self.voice_model = Some(VoiceModel::new(provider, model));
        self
    }

    pub fn label(&self) -> String {
        format!("{} ({})", self.display_name, self.vendor)
    }
}

/// Provider and model name handed to the voice transport
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoiceModel {
    pub provider: String,
    pub model: String,
}

impl VoiceModel {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }
}

/// Known model tags.
///
/// Unknown tags are still valid attribution strings; lookups simply return
/// `None` for them.
pub struct LlmCatalog {
    specs: Vec<LlmSpec>,
}

impl LlmCatalog {
    pub fn new() -> Self {
        Self {
            specs: vec![
                LlmSpec::new("gpt", "GPT-4", "OpenAI").with_voice_model("openai", "gpt-4"),
                LlmSpec::new("gemini", "Gemini", "Google")
                    .with_voice_model("google", "gemini-2.5-pro-preview-05-06"),
                LlmSpec::new("claude", "Claude", "Anthropic")
                    .with_voice_model("anthropic", "claude-3-opus-20240229"),
                LlmSpec::new("groq", "Groq", "Groq"),
                LlmSpec::new("hume", "Hume", "Hume AI"),
            ],
        }
    }

    pub fn all(&self) -> &[LlmSpec] {
        &self.specs
    }

    /// Find a spec by tag (case-insensitive)
    pub fn find(&self, tag: &str) -> Option<&LlmSpec> {
        self.specs
            .iter()
            .find(|spec| spec.tag.eq_ignore_ascii_case(tag.trim()))
    }

    /// Display label for a tag, falling back to the raw tag
    pub fn display_name(&self, tag: &str) -> String {
        self.find(tag)
            .map(|spec| spec.display_name.clone())
            .unwrap_or_else(|| tag.to_string())
    }

    /// Voice model for a tag; tags without one use the default model's
    pub fn voice_model(&self, tag: &str) -> VoiceModel {
        self.find(tag)
            .and_then(|spec| spec.voice_model.clone())
            .unwrap_or_else(|| VoiceModel::new("openai", "gpt-4"))
    }
}

impl Default for LlmCatalog {
    fn default() -> Self {
        Self::new()
    }
}

/// One selectable synthesized voice
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoiceOption {
    pub id: String,
    pub name: String,
    pub provider: String,
}

impl VoiceOption {
    fn elevenlabs(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            provider: "11labs".to_string(),
        }
    }
}

/// Voices offered for the voice assistant
pub struct VoiceCatalog {
    voices: Vec<VoiceOption>,
}

impl VoiceCatalog {
    pub fn new() -> Self {
        Self {
            voices: vec![
                VoiceOption::elevenlabs("pNInz6obpgDQGcFmaJgB", "Adam (Male)"),
                VoiceOption::elevenlabs("21m00Tcm4TlvDq8ikWAM", "Rachel (Female)"),
                VoiceOption::elevenlabs("AZnzlk1XvdvUeBnXmlld", "Domi (Female)"),
                VoiceOption::elevenlabs("EXAVITQu4vr4xnSDxMaL", "Bella (Female)"),
            ],
        }
    }

    pub fn all(&self) -> &[VoiceOption] {
        &self.voices
    }

    pub fn default_voice(&self) -> &VoiceOption {
        &self.voices[0]
    }

    pub fn find(&self, id: &str) -> Option<&VoiceOption> {
        self.voices.iter().find(|voice| voice.id == id)
    }

    /// Find by id or by case-insensitive name prefix ("rachel")
    pub fn resolve(&self, query: &str) -> Option<&VoiceOption> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }
        self.find(query).or_else(|| {
            let lowered = query.to_lowercase();
            self.voices
                .iter()
                .find(|voice| voice.name.to_lowercase().starts_with(&lowered))
        })
    }
}

impl Default for VoiceCatalog {
    fn default() -> Self {
        Self::new()
    }
}
