//! Backend integrations for ContextLLM
//!
//! This crate provides the client traits the engine depends on, their
//! reqwest implementation, and the model/voice catalogs.

pub mod assistant;
pub mod base;
pub mod http;
pub mod registry;

pub use assistant::AssistantOptions;
pub use base::{
    ContextPost, ContextSink, HealthStatus, ProviderError, ProviderResult, QueryBackend,
    QueryReply, QueryRequest, VoiceSettingsSource,
};
pub use http::{HttpBackend, VoiceDefaults};
pub use registry::{LlmCatalog, LlmSpec, VoiceCatalog, VoiceModel, VoiceOption, DEFAULT_LLM};
