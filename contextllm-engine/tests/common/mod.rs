//! In-process fake backends shared by the engine tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use contextllm_core::bus::EngineEvent;
use contextllm_core::config::Config;
use contextllm_engine::{ConversationEngine, EngineBackends};
use contextllm_providers::{
    ContextSink, ProviderError, ProviderResult, QueryBackend, QueryReply, VoiceSettingsSource,
};
use parking_lot::Mutex;
use tokio::sync::{broadcast, Semaphore};

/// Query backend answering from a script, optionally held until released
#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<ProviderResult<QueryReply>>>,
    gate: Option<Arc<Semaphore>>,
    pub calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<ProviderResult<QueryReply>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            gate: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Replies wait for a permit on the returned semaphore
    pub fn gated(replies: Vec<ProviderResult<QueryReply>>) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let backend = Self {
            gate: Some(gate.clone()),
            ..Self::new(replies)
        };
        (backend, gate)
    }
}

pub fn server_error() -> ProviderResult<QueryReply> {
    Err(ProviderError::ApiError {
        status: 500,
        body: "Internal Server Error".to_string(),
    })
}

#[async_trait]
impl QueryBackend for ScriptedBackend {
    async fn query(&self, prompt: &str, uid: &str) -> ProviderResult<QueryReply> {
        self.calls.lock().push((prompt.to_string(), uid.to_string()));
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?
                .forget();
        }
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(QueryReply::new("Hi!", "gpt")))
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub pairs: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl ContextSink for RecordingSink {
    async fn post_context(&self, user: &str, assistant: &str) -> ProviderResult<()> {
        self.pairs
            .lock()
            .push((user.to_string(), assistant.to_string()));
        Ok(())
    }
}

pub struct FixedVoiceSettings {
    pub llm: String,
    pub context: Vec<String>,
}

#[async_trait]
impl VoiceSettingsSource for FixedVoiceSettings {
    async fn voice_llm(&self) -> String {
        self.llm.clone()
    }

    async fn context(&self) -> Vec<String> {
        self.context.clone()
    }
}

/// Engine wired to fakes; returns the sink so pairing can be inspected
pub fn engine_with(backend: ScriptedBackend) -> (ConversationEngine, Arc<RecordingSink>) {
    engine_with_voice_llm(backend, "claude")
}

/// Like `engine_with`, with the voice model the settings source reports
pub fn engine_with_voice_llm(
    backend: ScriptedBackend,
    voice_llm: &str,
) -> (ConversationEngine, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let backends = EngineBackends {
        query: Arc::new(backend),
        context_sink: sink.clone(),
        voice_settings: Arc::new(FixedVoiceSettings {
            llm: voice_llm.to_string(),
            context: vec!["Team handbook".to_string()],
        }),
    };
    (ConversationEngine::new(&Config::default(), backends), sink)
}

/// Collect every event already published on `rx`
pub fn drain_events(rx: &mut broadcast::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn loading_transitions(events: &[EngineEvent]) -> Vec<bool> {
    events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::LoadingChanged { loading } => Some(*loading),
            _ => None,
        })
        .collect()
}

/// Poll `check` until it holds or a second passes
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
