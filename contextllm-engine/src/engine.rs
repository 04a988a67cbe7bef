//! Conversation engine: sessions, text submissions and voice calls

use std::sync::Arc;

use contextllm_core::bus::{EngineEvent, EventBus, VoiceEventSender};
use contextllm_core::config::Config;
use contextllm_core::session::{ChatSession, RegistryHandle, SessionId, SessionRegistry};
use contextllm_core::{Error, Result};
use contextllm_providers::{
    AssistantOptions, ContextSink, HttpBackend, QueryBackend, VoiceCatalog, VoiceOption,
    VoiceSettingsSource,
};
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::dispatcher::{DispatcherSettings, QueryDispatcher, SubmissionOutcome};
use crate::reconciler::MessageReconciler;
use crate::voice::{VoiceCallSettings, VoiceCallSummary, VoiceEventAdapter};

/// The collaborators the engine talks to
#[derive(Clone)]
pub struct EngineBackends {
    pub query: Arc<dyn QueryBackend>,
    pub context_sink: Arc<dyn ContextSink>,
    pub voice_settings: Arc<dyn VoiceSettingsSource>,
}

impl EngineBackends {
    /// All three collaborators served by one HTTP client
    pub fn http(config: &Config) -> Self {
        let backend = Arc::new(HttpBackend::from_config(config));
        Self {
            query: backend.clone(),
            context_sink: backend.clone(),
            voice_settings: backend,
        }
    }
}

/// Inputs of the voice assistant, refreshed from the backend on demand
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSettings {
    pub llm: String,
    pub context: Vec<String>,
    pub voice_id: String,
}

/// A running voice call.
///
/// Feed transport events through `sender`; the call ends on session end,
/// on a transport error, when every sender is dropped, or on `stop`.
pub struct VoiceCallHandle {
    pub sender: VoiceEventSender,
    session_id: SessionId,
    cancel: CancellationToken,
    join: JoinHandle<VoiceCallSummary>,
}

impl VoiceCallHandle {
    /// Session this call writes into
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Close the stream, apply already-queued events, and wait for the end
    pub async fn stop(self) -> Result<VoiceCallSummary> {
        self.cancel.cancel();
        Self::wait(self.join).await
    }

    /// Wait for the call to end on its own
    pub async fn join(self) -> Result<VoiceCallSummary> {
        drop(self.sender);
        Self::wait(self.join).await
    }

    async fn wait(join: JoinHandle<VoiceCallSummary>) -> Result<VoiceCallSummary> {
        join.await
            .map_err(|e| Error::Internal(format!("Voice call task failed: {}", e)))
    }
}

/// Owns the session registry and composes the text and voice paths over it
pub struct ConversationEngine {
    registry: RegistryHandle,
    bus: EventBus,
    dispatcher: QueryDispatcher,
    backends: EngineBackends,
    voice: RwLock<VoiceSettings>,
    uid: String,
    default_llm: String,
    dedup_window_ms: u64,
    voice_error_message: String,
}

impl ConversationEngine {
    pub fn new(config: &Config, backends: EngineBackends) -> Self {
        let registry =
            RegistryHandle::new(SessionRegistry::new(config.engine.registry_settings()));
        let bus = EventBus::new();
        let dispatcher = QueryDispatcher::new(
            registry.clone(),
            backends.query.clone(),
            bus.clone(),
            DispatcherSettings::from(&config.engine),
        );

        Self {
            registry,
            bus,
            dispatcher,
            backends,
            voice: RwLock::new(VoiceSettings {
                llm: config.engine.default_llm.clone(),
                context: vec![config.voice.placeholder_context.clone()],
                voice_id: config.voice.default_voice_id.clone(),
            }),
            uid: config.identity.uid.clone(),
            default_llm: config.engine.default_llm.clone(),
            dedup_window_ms: config.engine.dedup_window_ms,
            voice_error_message: config.voice.error_message.clone(),
        }
    }

    /// Engine backed by the HTTP client for `config.backend`
    pub fn from_config(config: &Config) -> Self {
        Self::new(config, EngineBackends::http(config))
    }

    /// Act on behalf of `uid` instead of the configured identity
    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = uid.into();
        self
    }

    pub fn with_voice_id(self, voice_id: impl Into<String>) -> Self {
        self.voice.write().voice_id = voice_id.into();
        self
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn registry(&self) -> &RegistryHandle {
        &self.registry
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.bus.subscribe()
    }

    /// Start a new empty session and make it active
    pub fn new_chat(&self) -> SessionId {
        let id = self.registry.write(|r| r.create_session());
        self.bus.publish(EngineEvent::SessionCreated { session_id: id });
        self.bus
            .publish(EngineEvent::ActiveSessionChanged { session_id: id });
        id
    }

    /// Make `id` the active session; false when it does not exist
    pub fn switch_chat(&self, id: SessionId) -> bool {
        let switched = self.registry.write(|r| r.switch_active(id));
        if switched {
            self.bus
                .publish(EngineEvent::ActiveSessionChanged { session_id: id });
        }
        switched
    }

    /// Session deletion is not supported; always false
    pub fn delete_chat(&self, id: SessionId) -> bool {
        self.registry.write(|r| r.delete_session(id))
    }

    /// Every session, newest first
    pub fn sessions(&self) -> Vec<ChatSession> {
        self.registry.snapshot()
    }

    pub fn active_session(&self) -> Option<ChatSession> {
        self.registry.active_session()
    }

    /// Submit a prompt into the active session as the engine's user
    pub fn submit(&self, prompt: &str) -> Result<JoinHandle<SubmissionOutcome>> {
        self.submit_as(prompt, &self.uid)
    }

    /// Submit a prompt into the active session on behalf of `uid`.
    ///
    /// The session id is captured here; switching chats afterwards does not
    /// redirect the reply.
    pub fn submit_as(&self, prompt: &str, uid: &str) -> Result<JoinHandle<SubmissionOutcome>> {
        let session_id = self.registry.active_id();
        self.dispatcher.submit(session_id, prompt, uid)
    }

    pub fn is_loading(&self) -> bool {
        self.dispatcher.is_loading()
    }

    /// Model of the latest reply, or the default before any reply
    pub fn current_llm(&self) -> String {
        self.dispatcher
            .current_llm()
            .get()
            .unwrap_or_else(|| self.default_llm.clone())
    }

    pub fn voice_settings(&self) -> VoiceSettings {
        self.voice.read().clone()
    }

    pub fn set_voice_id(&self, voice_id: impl Into<String>) {
        self.voice.write().voice_id = voice_id.into();
    }

    /// Use the catalog voice matching `query` (id or name) for later calls
    pub fn select_voice(&self, query: &str) -> Result<VoiceOption> {
        let voice = VoiceCatalog::new()
            .resolve(query)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("voice '{}'", query.trim())))?;
        info!(voice_id = %voice.id, "Selected voice {}", voice.name);
        self.set_voice_id(voice.id.clone());
        Ok(voice)
    }

    /// Re-fetch the voice model and context lines from the backend
    pub async fn refresh_voice_settings(&self) -> VoiceSettings {
        let llm = self.backends.voice_settings.voice_llm().await;
        let context = self.backends.voice_settings.context().await;
        debug!(llm = %llm, lines = context.len(), "Refreshed voice settings");

        let mut voice = self.voice.write();
        voice.llm = llm;
        voice.context = context;
        voice.clone()
    }

    /// Options for the external voice transport
    pub fn assistant_options(&self) -> AssistantOptions {
        let voice = self.voice.read();
        AssistantOptions::build(&voice.llm, &voice.voice_id, &voice.context)
    }

    /// Attach a voice call to the active session.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_voice_call(&self) -> VoiceCallHandle {
        let session_id = self.registry.active_id();
        let (sender, stream) = self.bus.voice_channel();
        let cancel = CancellationToken::new();

        let adapter = VoiceEventAdapter::new(
            self.registry.clone(),
            session_id,
            MessageReconciler::new(self.dedup_window_ms),
            self.bus.clone(),
            self.backends.context_sink.clone(),
            self.dispatcher.current_llm(),
            VoiceCallSettings {
                voice_llm: self.voice.read().llm.clone(),
                default_llm: self.default_llm.clone(),
                error_message: self.voice_error_message.clone(),
            },
        );
        let join = tokio::spawn(adapter.run(stream, cancel.clone()));
        info!(session_id = %session_id, "Started voice call");

        VoiceCallHandle {
            sender,
            session_id,
            cancel,
            join,
        }
    }
}
