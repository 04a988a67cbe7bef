//! Session data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Identifier of a chat session
pub type SessionId = Uuid;

static NEXT_MESSAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique, monotonically increasing message identifier.
///
/// Two ids minted back-to-back never collide, unlike wall-clock ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(u64);

impl MessageId {
    /// Mint the next identifier
    pub fn next() -> Self {
        Self(NEXT_MESSAGE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique message id
    pub id: MessageId,
    /// Message text
    pub content: String,
    /// Message author
    pub role: Role,
    /// Creation time
    pub timestamp: DateTime<Utc>,
    /// Backend model that produced an assistant message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<String>,
    /// Producer's time, kept when `timestamp` was clamped on append
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_timestamp: Option<DateTime<Utc>>,
}

impl ChatMessage {
    /// Create a message stamped with the current time
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::next(),
            content: content.into(),
            role,
            timestamp: Utc::now(),
            llm: None,
            origin_timestamp: None,
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Override the creation time
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Time the producer stamped, before any ordering clamp
    pub fn origin_time(&self) -> DateTime<Utc> {
        self.origin_timestamp.unwrap_or(self.timestamp)
    }

    /// Attach the producing model tag
    pub fn with_llm(mut self, llm: impl Into<String>) -> Self {
        self.llm = Some(llm.into());
        self
    }
}

/// A conversation session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    /// Session id
    pub id: SessionId,
    /// Human-readable label
    pub title: String,
    /// Messages in append order
    pub messages: Vec<ChatMessage>,
    /// Session creation time
    pub created_at: DateTime<Utc>,
}

impl ChatSession {
    /// Create an empty session with the placeholder title
    pub fn new(placeholder_title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: placeholder_title.into(),
            messages: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Most recent model tag observed in this session
    pub fn last_llm(&self) -> Option<&str> {
        self.messages.iter().rev().find_map(|m| m.llm.as_deref())
    }

    /// Last message, if any
    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }
}
