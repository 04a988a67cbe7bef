//! Voice path: drains one call's transcript stream into a session

use std::sync::Arc;

use chrono::Utc;
use contextllm_core::bus::{EngineEvent, EventBus, TranscriptKind, VoiceEvent, VoiceEventStream};
use contextllm_core::session::{AppendOutcome, ChatMessage, RegistryHandle, Role, SessionId};
use contextllm_core::utils::preview;
use contextllm_providers::ContextSink;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dispatcher::{publish_appended, CurrentLlm};
use crate::reconciler::{resolve_fallback_llm, Decision, MessageReconciler};

/// Display-only state of a voice call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoiceIndicators {
    pub listening: bool,
    pub speaking: bool,
    pub volume: f32,
    /// Latest user transcript, partial or final
    pub transcript: String,
    /// Transient error shown after a transport failure
    pub error: Option<String>,
}

/// Why a call stopped draining its stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallEnd {
    /// The transport reported the end of the call
    SessionEnded,
    /// The transport reported an error
    Failed,
    /// The caller stopped the call
    Stopped,
    /// Every sender was dropped
    StreamClosed,
}

/// What a finished call left behind
#[derive(Debug, Clone)]
pub struct VoiceCallSummary {
    pub session_id: SessionId,
    /// Accepted final transcripts, in arrival order
    pub history: Vec<ChatMessage>,
    pub rejected: usize,
    pub pairs_logged: usize,
    pub indicators: VoiceIndicators,
    pub ended_by: CallEnd,
}

/// Settings fixed for the lifetime of one call
#[derive(Debug, Clone)]
pub struct VoiceCallSettings {
    /// Model tag attached to assistant transcripts
    pub voice_llm: String,
    pub default_llm: String,
    /// Indicator text shown after a transport error
    pub error_message: String,
}

/// Converts one call's voice events into session messages.
///
/// The adapter is bound to a single session for the whole call; only final
/// transcripts reach the session, partials only refresh the display buffer.
pub struct VoiceEventAdapter {
    registry: RegistryHandle,
    session_id: SessionId,
    reconciler: MessageReconciler,
    bus: EventBus,
    context_sink: Arc<dyn ContextSink>,
    current_llm: CurrentLlm,
    settings: VoiceCallSettings,
    indicators: VoiceIndicators,
    history: Vec<ChatMessage>,
    rejected: usize,
    pairs_logged: usize,
    /// Most recent user final not yet paired with a reply
    last_user_utterance: Option<String>,
    pair_tasks: Vec<JoinHandle<()>>,
}

impl VoiceEventAdapter {
    pub fn new(
        registry: RegistryHandle,
        session_id: SessionId,
        reconciler: MessageReconciler,
        bus: EventBus,
        context_sink: Arc<dyn ContextSink>,
        current_llm: CurrentLlm,
        settings: VoiceCallSettings,
    ) -> Self {
        Self {
            registry,
            session_id,
            reconciler,
            bus,
            context_sink,
            current_llm,
            settings,
            indicators: VoiceIndicators::default(),
            history: Vec::new(),
            rejected: 0,
            pairs_logged: 0,
            last_user_utterance: None,
            pair_tasks: Vec::new(),
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn indicators(&self) -> &VoiceIndicators {
        &self.indicators
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn pending_pair(&self) -> Option<&str> {
        self.last_user_utterance.as_deref()
    }

    /// Drain `stream` in order until the call ends or `cancel` fires.
    ///
    /// On cancel or session end the stream is closed and events already
    /// queued are still applied; on a transport error the remainder is
    /// discarded. Pending context posts are awaited before returning.
    pub async fn run(
        mut self,
        mut stream: VoiceEventStream,
        cancel: CancellationToken,
    ) -> VoiceCallSummary {
        info!(session_id = %self.session_id, "Voice call attached");

        let ended_by = loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                event = stream.recv() => Some(event),
            };

            let Some(event) = next else {
                stream.close();
                break self.drain(&mut stream, CallEnd::Stopped).await;
            };
            let Some(event) = event else {
                break CallEnd::StreamClosed;
            };
            match event {
                VoiceEvent::SessionEnd => {
                    self.handle_event(VoiceEvent::SessionEnd);
                    stream.close();
                    break self.drain(&mut stream, CallEnd::SessionEnded).await;
                }
                VoiceEvent::Error { message } => {
                    self.handle_event(VoiceEvent::Error { message });
                    stream.close();
                    break CallEnd::Failed;
                }
                other => self.handle_event(other),
            }
        };

        if self.indicators.listening {
            self.set_listening(false);
        }
        for task in self.pair_tasks.drain(..) {
            if let Err(e) = task.await {
                warn!("Context post task failed: {}", e);
            }
        }

        info!(
            session_id = %self.session_id,
            accepted = self.history.len(),
            rejected = self.rejected,
            "Voice call detached: {:?}",
            ended_by
        );
        VoiceCallSummary {
            session_id: self.session_id,
            history: self.history,
            rejected: self.rejected,
            pairs_logged: self.pairs_logged,
            indicators: self.indicators,
            ended_by,
        }
    }

    /// Apply events that were queued before the stream was closed
    async fn drain(&mut self, stream: &mut VoiceEventStream, reason: CallEnd) -> CallEnd {
        while let Some(event) = stream.recv().await {
            if let VoiceEvent::Error { .. } = event {
                self.handle_event(event);
                return CallEnd::Failed;
            }
            self.handle_event(event);
        }
        reason
    }

    /// Apply one event to the indicators and, for finals, to the session
    pub fn handle_event(&mut self, event: VoiceEvent) {
        match event {
            VoiceEvent::SessionStart => {
                self.indicators.error = None;
                self.indicators.transcript.clear();
                self.history.clear();
                self.rejected = 0;
                self.pairs_logged = 0;
                self.last_user_utterance = None;
                self.set_listening(true);
            }
            VoiceEvent::SessionEnd => {
                self.set_listening(false);
                self.set_speaking(false);
                self.indicators.volume = 0.0;
            }
            VoiceEvent::SpeechStart => self.set_speaking(true),
            VoiceEvent::SpeechEnd => self.set_speaking(false),
            VoiceEvent::VolumeLevel { level } => {
                self.indicators.volume = level.clamp(0.0, 1.0);
            }
            VoiceEvent::Transcript {
                role,
                text,
                kind: TranscriptKind::Partial,
                ..
            } => {
                if role == Role::User {
                    self.set_transcript(text);
                }
            }
            VoiceEvent::Transcript {
                role,
                text,
                kind: TranscriptKind::Final,
                timestamp,
            } => self.handle_final(role, text, timestamp.unwrap_or_else(Utc::now)),
            VoiceEvent::Error { message } => {
                warn!(session_id = %self.session_id, "Voice transport error: {}", message);
                self.set_listening(false);
                self.indicators.error = Some(self.settings.error_message.clone());
                self.bus.publish(EngineEvent::VoiceError {
                    message: self.settings.error_message.clone(),
                });
            }
        }
    }

    fn handle_final(&mut self, role: Role, text: String, timestamp: chrono::DateTime<Utc>) {
        let mut candidate = ChatMessage::new(role, text.clone()).with_timestamp(timestamp);
        if role == Role::Assistant && !self.settings.voice_llm.is_empty() {
            candidate = candidate.with_llm(self.settings.voice_llm.clone());
        }
        if role == Role::User {
            self.set_transcript(text.clone());
        }

        let current = self.current_llm.get();
        let default_llm = self.settings.default_llm.clone();
        let session_id = self.session_id;
        let reconciler = &self.reconciler;

        // Dedupe and append under one lock so no other append can interleave.
        let applied = self.registry.write(|registry| {
            let session = registry.session(session_id)?;
            let fallback = resolve_fallback_llm(session, current.as_deref(), &default_llm);
            match reconciler.reconcile_incoming(session, candidate, &fallback) {
                Decision::Accept(message) => {
                    match registry.append_message(session_id, message.clone()) {
                        AppendOutcome::Appended { new_title } => {
                            Some((Decision::Accept(message), new_title))
                        }
                        AppendOutcome::UnknownSession => None,
                    }
                }
                rejected => Some((rejected, None)),
            }
        });

        match applied {
            Some((Decision::Accept(message), new_title)) => {
                debug!(
                    session_id = %session_id,
                    role = %role,
                    "Accepted voice transcript: {}",
                    preview(&message.content, 60)
                );
                self.history.push(message.clone());
                publish_appended(&self.bus, session_id, message, new_title);
                self.track_pair(role, text);
            }
            Some((Decision::Reject(message), _)) => {
                debug!(session_id = %session_id, role = %role, "Rejected duplicate transcript");
                self.rejected += 1;
                self.bus.publish(EngineEvent::DuplicateRejected {
                    session_id,
                    message,
                });
            }
            None => {
                debug!(session_id = %session_id, "Dropping transcript for unknown session");
            }
        }
    }

    /// Keep the latest user turn and log it with the next assistant turn
    fn track_pair(&mut self, role: Role, text: String) {
        match role {
            Role::User => self.last_user_utterance = Some(text),
            Role::Assistant => {
                let Some(user) = self.last_user_utterance.take() else {
                    return;
                };
                self.pairs_logged += 1;
                self.bus.publish(EngineEvent::ContextPairLogged {
                    user: user.clone(),
                    assistant: text.clone(),
                });
                let sink = Arc::clone(&self.context_sink);
                self.pair_tasks.retain(|task| !task.is_finished());
                self.pair_tasks.push(tokio::spawn(async move {
                    if let Err(e) = sink.post_context(&user, &text).await {
                        warn!("Failed to post conversation pair: {}", e);
                    }
                }));
            }
        }
    }

    fn set_listening(&mut self, listening: bool) {
        self.indicators.listening = listening;
        self.bus.publish(EngineEvent::VoiceListening { listening });
    }

    fn set_speaking(&mut self, speaking: bool) {
        if self.indicators.speaking != speaking {
            self.indicators.speaking = speaking;
            self.bus.publish(EngineEvent::VoiceSpeaking { speaking });
        }
    }

    fn set_transcript(&mut self, text: String) {
        self.indicators.transcript = text.clone();
        self.bus.publish(EngineEvent::VoiceTranscript { text });
    }
}
