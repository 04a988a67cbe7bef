//! Event types for the engine bus

use crate::session::{ChatMessage, Role, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Completion state of a voice transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptKind {
    /// Still being revised by the transport
    Partial,
    /// Complete; will not be revised
    Final,
}

/// Normalized event emitted by the external voice transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum VoiceEvent {
    #[serde(alias = "call-start")]
    SessionStart,
    #[serde(alias = "call-end")]
    SessionEnd,
    SpeechStart,
    SpeechEnd,
    VolumeLevel {
        level: f32,
    },
    Transcript {
        role: Role,
        text: String,
        kind: TranscriptKind,
        /// Transport-side time of the transcript; receive time when absent
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<DateTime<Utc>>,
    },
    Error {
        message: String,
    },
}

impl VoiceEvent {
    /// Final transcript with an explicit timestamp
    pub fn final_transcript(role: Role, text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::Transcript {
            role,
            text: text.into(),
            kind: TranscriptKind::Final,
            timestamp: Some(timestamp),
        }
    }

    /// Partial transcript stamped on receipt
    pub fn partial_transcript(role: Role, text: impl Into<String>) -> Self {
        Self::Transcript {
            role,
            text: text.into(),
            kind: TranscriptKind::Partial,
            timestamp: None,
        }
    }
}

/// Notification published by the engine for observers (UI, logs, tests)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    SessionCreated {
        session_id: SessionId,
    },
    ActiveSessionChanged {
        session_id: SessionId,
    },
    MessageAppended {
        session_id: SessionId,
        message: ChatMessage,
    },
    TitleChanged {
        session_id: SessionId,
        title: String,
    },
    DuplicateRejected {
        session_id: SessionId,
        message: ChatMessage,
    },
    LoadingChanged {
        loading: bool,
    },
    CurrentLlmChanged {
        llm: String,
    },
    VoiceListening {
        listening: bool,
    },
    VoiceSpeaking {
        speaking: bool,
    },
    VoiceTranscript {
        text: String,
    },
    VoiceError {
        message: String,
    },
    ContextPairLogged {
        user: String,
        assistant: String,
    },
}
