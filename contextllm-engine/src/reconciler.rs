//! Deduplication and model tagging of incoming voice messages

use chrono::Duration;
use contextllm_core::session::{ChatMessage, ChatSession, Role};

/// Default window within which identical messages count as duplicates
pub const DEFAULT_DEDUP_WINDOW_MS: u64 = 1000;

/// Verdict on one incoming message
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Append this (possibly re-tagged) message
    Accept(ChatMessage),
    /// Duplicate of a recorded message; nothing is mutated
    Reject(ChatMessage),
}

impl Decision {
    pub fn is_accept(&self) -> bool {
        matches!(self, Decision::Accept(_))
    }

    pub fn message(&self) -> &ChatMessage {
        match self {
            Decision::Accept(m) | Decision::Reject(m) => m,
        }
    }
}

/// Pure rules for merging voice-sourced messages into a session
#[derive(Debug, Clone)]
pub struct MessageReconciler {
    dedup_window: Duration,
}

impl MessageReconciler {
    pub fn new(dedup_window_ms: u64) -> Self {
        Self {
            dedup_window: Duration::milliseconds(
                i64::try_from(dedup_window_ms).unwrap_or(i64::MAX),
            ),
        }
    }

    pub fn dedup_window(&self) -> Duration {
        self.dedup_window
    }

    /// True when `existing` holds a message with the same role and content
    /// whose producer time is strictly closer than the dedup window.
    pub fn is_duplicate(&self, existing: &[ChatMessage], candidate: &ChatMessage) -> bool {
        let window_ms = self.dedup_window.num_milliseconds();
        existing.iter().any(|m| {
            m.role == candidate.role
                && m.content == candidate.content
                && (m.origin_time() - candidate.origin_time()).num_milliseconds().abs() < window_ms
        })
    }

    /// Tag an assistant message that lacks a model; user messages pass through
    pub fn with_llm_tag(&self, mut message: ChatMessage, fallback_llm: &str) -> ChatMessage {
        if message.role == Role::Assistant && message.llm.is_none() {
            message.llm = Some(fallback_llm.to_string());
        }
        message
    }

    pub fn reconcile_incoming(
        &self,
        session: &ChatSession,
        candidate: ChatMessage,
        fallback_llm: &str,
    ) -> Decision {
        if self.is_duplicate(&session.messages, &candidate) {
            return Decision::Reject(candidate);
        }
        Decision::Accept(self.with_llm_tag(candidate, fallback_llm))
    }
}

impl Default for MessageReconciler {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_WINDOW_MS)
    }
}

/// Model tag for untagged assistant messages: the session's most recent tag,
/// then the engine-wide current model, then `default_llm`.
pub fn resolve_fallback_llm(
    session: &ChatSession,
    current_llm: Option<&str>,
    default_llm: &str,
) -> String {
    session
        .last_llm()
        .or(current_llm)
        .unwrap_or(default_llm)
        .to_string()
}
