//! Conversation state engine for ContextLLM
//!
//! This crate merges the text submission path and the streaming voice path
//! into the sessions owned by the core registry.

pub mod dispatcher;
pub mod engine;
pub mod reconciler;
pub mod voice;

pub use dispatcher::{CurrentLlm, DispatcherSettings, QueryDispatcher, SubmissionOutcome};
pub use engine::{ConversationEngine, EngineBackends, VoiceCallHandle, VoiceSettings};
pub use reconciler::{resolve_fallback_llm, Decision, MessageReconciler};
pub use voice::{CallEnd, VoiceCallSettings, VoiceCallSummary, VoiceEventAdapter, VoiceIndicators};
