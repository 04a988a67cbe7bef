//! Text submission path: one backend query per user prompt

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use contextllm_core::bus::{EngineEvent, EventBus};
use contextllm_core::config::EngineConfig;
use contextllm_core::session::{
    AppendOutcome, ChatMessage, MessageId, RegistryHandle, SessionId,
};
use contextllm_core::utils::preview;
use contextllm_core::{Error, Result};
use contextllm_providers::{QueryBackend, QueryReply};
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::reconciler::{resolve_fallback_llm, MessageReconciler};

/// Texts and defaults the dispatcher writes into sessions
#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    /// Assistant content appended when a query fails
    pub error_message: String,
    /// Assistant content used when a reply carries no answer
    pub fallback_answer: String,
    /// Model tag used when none has been observed yet
    pub default_llm: String,
}

impl From<&EngineConfig> for DispatcherSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            error_message: config.error_message.clone(),
            fallback_answer: config.fallback_answer.clone(),
            default_llm: config.default_llm.clone(),
        }
    }
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

/// Shared "current LLM" indicator: the model of the latest successful reply
#[derive(Debug, Clone, Default)]
pub struct CurrentLlm {
    inner: Arc<RwLock<Option<String>>>,
}

impl CurrentLlm {
    pub fn get(&self) -> Option<String> {
        self.inner.read().clone()
    }

    /// Store `llm`; returns true when the value changed
    pub fn set(&self, llm: &str) -> bool {
        let mut current = self.inner.write();
        if current.as_deref() == Some(llm) {
            return false;
        }
        *current = Some(llm.to_string());
        true
    }
}

/// How one submission ended
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    /// The backend answered; `message` is the appended assistant reply
    Succeeded {
        session_id: SessionId,
        message: ChatMessage,
    },
    /// Transport or HTTP failure; `message` carries the apology text
    Failed {
        session_id: SessionId,
        message: ChatMessage,
        reason: String,
    },
    /// The target session does not exist; nothing was appended or queried
    Dropped { session_id: SessionId },
}

impl SubmissionOutcome {
    pub fn session_id(&self) -> SessionId {
        match self {
            Self::Succeeded { session_id, .. }
            | Self::Failed { session_id, .. }
            | Self::Dropped { session_id } => *session_id,
        }
    }

    /// The appended assistant message, if any
    pub fn message(&self) -> Option<&ChatMessage> {
        match self {
            Self::Succeeded { message, .. } | Self::Failed { message, .. } => Some(message),
            Self::Dropped { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// Counts submissions in flight and publishes loading transitions
#[derive(Clone)]
struct LoadingState {
    in_flight: Arc<AtomicUsize>,
    bus: EventBus,
}

impl LoadingState {
    fn begin(&self) -> LoadingGuard {
        if self.in_flight.fetch_add(1, Ordering::SeqCst) == 0 {
            self.bus.publish(EngineEvent::LoadingChanged { loading: true });
        }
        LoadingGuard {
            state: self.clone(),
        }
    }

    fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }
}

/// Clears its share of the loading flag on every exit path, panics included
struct LoadingGuard {
    state: LoadingState,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        if self.state.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.state
                .bus
                .publish(EngineEvent::LoadingChanged { loading: false });
        }
    }
}

/// Issues one backend query per user submission and records the outcome in
/// the session that was active when the prompt was submitted.
#[derive(Clone)]
pub struct QueryDispatcher {
    registry: RegistryHandle,
    backend: Arc<dyn QueryBackend>,
    bus: EventBus,
    reconciler: MessageReconciler,
    current_llm: CurrentLlm,
    loading: LoadingState,
    settings: Arc<DispatcherSettings>,
}

impl QueryDispatcher {
    pub fn new(
        registry: RegistryHandle,
        backend: Arc<dyn QueryBackend>,
        bus: EventBus,
        settings: DispatcherSettings,
    ) -> Self {
        let loading = LoadingState {
            in_flight: Arc::new(AtomicUsize::new(0)),
            bus: bus.clone(),
        };
        Self {
            registry,
            backend,
            bus,
            reconciler: MessageReconciler::default(),
            current_llm: CurrentLlm::default(),
            loading,
            settings: Arc::new(settings),
        }
    }

    /// True while at least one submission is awaiting the backend
    pub fn is_loading(&self) -> bool {
        self.loading.is_loading()
    }

    pub fn current_llm(&self) -> CurrentLlm {
        self.current_llm.clone()
    }

    /// Submit `prompt` on behalf of `uid` into `session_id`.
    ///
    /// The user message is appended before this returns; the backend call
    /// runs on a spawned task whose handle resolves to the outcome. An
    /// unknown `session_id` is ignored and resolves to `Dropped`. Must be
    /// called from within a tokio runtime.
    pub fn submit(
        &self,
        session_id: SessionId,
        prompt: &str,
        uid: &str,
    ) -> Result<JoinHandle<SubmissionOutcome>> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(Error::Validation("Prompt must not be empty".to_string()));
        }

        let user_message = ChatMessage::user(prompt);
        let user_id = user_message.id;
        match self.registry.append_message(session_id, user_message.clone()) {
            AppendOutcome::Appended { new_title } => {
                publish_appended(&self.bus, session_id, user_message, new_title);
            }
            AppendOutcome::UnknownSession => {
                debug!(session_id = %session_id, "Ignoring prompt for unknown session");
                return Ok(tokio::spawn(async move {
                    SubmissionOutcome::Dropped { session_id }
                }));
            }
        }

        let guard = self.loading.begin();
        info!(
            session_id = %session_id,
            "Submitting prompt: {}",
            preview(prompt, 80)
        );

        let this = self.clone();
        let prompt = prompt.to_string();
        let uid = uid.to_string();
        Ok(tokio::spawn(async move {
            let outcome = this.complete(session_id, user_id, &prompt, &uid).await;
            drop(guard);
            outcome
        }))
    }

    async fn complete(
        &self,
        session_id: SessionId,
        user_id: MessageId,
        prompt: &str,
        uid: &str,
    ) -> SubmissionOutcome {
        debug!(session_id = %session_id, message_id = %user_id, "Awaiting backend reply");
        let (message, failure) = match self.backend.query(prompt, uid).await {
            Ok(reply) => (self.reply_message(session_id, reply), None),
            Err(e) => {
                error!(session_id = %session_id, "Query failed: {}", e);
                let apology = ChatMessage::assistant(self.settings.error_message.clone());
                (apology, Some(e.to_string()))
            }
        };
        let outcome = match failure {
            None => SubmissionOutcome::Succeeded {
                session_id,
                message: message.clone(),
            },
            Some(reason) => SubmissionOutcome::Failed {
                session_id,
                message: message.clone(),
                reason,
            },
        };

        match self.registry.append_message(session_id, message.clone()) {
            AppendOutcome::Appended { new_title } => {
                publish_appended(&self.bus, session_id, message, new_title);
            }
            AppendOutcome::UnknownSession => {
                warn!(session_id = %session_id, "Session vanished before the reply arrived");
            }
        }
        outcome
    }

    fn reply_message(&self, session_id: SessionId, reply: QueryReply) -> ChatMessage {
        let content = match reply.answer {
            Some(answer) => answer,
            None => {
                warn!(session_id = %session_id, "Reply carried no answer");
                self.settings.fallback_answer.clone()
            }
        };

        let mut message = ChatMessage::assistant(content);
        match reply.chosen_llm.filter(|llm| !llm.trim().is_empty()) {
            Some(llm) => {
                if self.current_llm.set(&llm) {
                    self.bus
                        .publish(EngineEvent::CurrentLlmChanged { llm: llm.clone() });
                }
                info!(session_id = %session_id, llm = %llm, "Received reply");
                message = message.with_llm(llm);
            }
            None => {
                let current = self.current_llm.get();
                let fallback = self
                    .registry
                    .session(session_id)
                    .map(|s| {
                        resolve_fallback_llm(&s, current.as_deref(), &self.settings.default_llm)
                    })
                    .unwrap_or_else(|| self.settings.default_llm.clone());
                message = self.reconciler.with_llm_tag(message, &fallback);
            }
        }
        message
    }
}

/// Publish the notifications for one appended message
pub(crate) fn publish_appended(
    bus: &EventBus,
    session_id: SessionId,
    message: ChatMessage,
    new_title: Option<String>,
) {
    bus.publish(EngineEvent::MessageAppended {
        session_id,
        message,
    });
    if let Some(title) = new_title {
        bus.publish(EngineEvent::TitleChanged { session_id, title });
    }
}
