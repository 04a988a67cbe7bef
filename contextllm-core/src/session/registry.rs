//! Session registry: the single owner of all chat sessions

use super::store::{ChatMessage, ChatSession, SessionId};
use crate::utils::title_from_content;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// Settings the registry needs to create and title sessions
#[derive(Debug, Clone)]
pub struct RegistrySettings {
    /// Title given to freshly created sessions
    pub placeholder_title: String,
    /// Number of characters of the first message kept in the title
    pub title_prefix_chars: usize,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            placeholder_title: "New chat".to_string(),
            title_prefix_chars: 30,
        }
    }
}

/// Result of appending a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The message was stored; `new_title` is set when this was the first message
    Appended { new_title: Option<String> },
    /// The target session does not exist; nothing changed
    UnknownSession,
}

/// Owns the ordered (newest-first) set of sessions and the active pointer.
///
/// Invariants: `sessions` is never empty and `active_id` always names one of them.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: Vec<ChatSession>,
    active_id: SessionId,
    settings: RegistrySettings,
}

impl SessionRegistry {
    /// Create a registry holding one default, active session
    pub fn new(settings: RegistrySettings) -> Self {
        let initial = ChatSession::new(&settings.placeholder_title);
        let active_id = initial.id;
        Self {
            sessions: vec![initial],
            active_id,
            settings,
        }
    }

    /// Insert a new empty session at the front and make it active
    pub fn create_session(&mut self) -> SessionId {
        let session = ChatSession::new(&self.settings.placeholder_title);
        let id = session.id;
        self.sessions.insert(0, session);
        self.active_id = id;
        debug!(session_id = %id, "Created session");
        id
    }

    /// Point the active session at `id`; no-op when it does not exist
    pub fn switch_active(&mut self, id: SessionId) -> bool {
        let exists = self.contains(id);
        debug_assert!(exists, "switch_active called with unknown session {id}");
        if exists {
            self.active_id = id;
        } else {
            debug!(session_id = %id, "Ignoring switch to unknown session");
        }
        exists
    }

    /// Append a message to a session, titling it when it was empty.
    ///
    /// Timestamps are clamped to the previous message so insertion order and
    /// chronological order stay identical; a clamped message keeps its
    /// producer time in `origin_timestamp`.
    pub fn append_message(&mut self, id: SessionId, mut message: ChatMessage) -> AppendOutcome {
        let prefix_chars = self.settings.title_prefix_chars;
        let Some(session) = self.sessions.iter_mut().find(|s| s.id == id) else {
            debug!(session_id = %id, "Dropping message for unknown session");
            return AppendOutcome::UnknownSession;
        };

        if let Some(last) = session.messages.last() {
            if message.timestamp < last.timestamp {
                message.origin_timestamp.get_or_insert(message.timestamp);
                message.timestamp = last.timestamp;
            }
        }

        let new_title = if session.messages.is_empty() {
            let title = title_from_content(&message.content, prefix_chars);
            session.title = title.clone();
            Some(title)
        } else {
            None
        };
        session.messages.push(message);

        AppendOutcome::Appended { new_title }
    }

    /// Delete a session. Not supported yet: always a no-op returning `false`.
    pub fn delete_session(&mut self, id: SessionId) -> bool {
        debug!(session_id = %id, "Session deletion is not supported; ignoring");
        false
    }

    pub fn active_id(&self) -> SessionId {
        self.active_id
    }

    pub fn active_session(&self) -> Option<&ChatSession> {
        self.session(self.active_id)
    }

    pub fn session(&self, id: SessionId) -> Option<&ChatSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.iter().any(|s| s.id == id)
    }

    /// Sessions, newest first
    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(RegistrySettings::default())
    }
}

/// Cloneable handle to a registry shared by the dispatcher and voice adapter.
///
/// Every access runs inside one lock scope and takes a synchronous closure, so
/// the lock can never be held across an await point and each mutation is
/// observed whole.
#[derive(Debug, Clone)]
pub struct RegistryHandle {
    inner: Arc<RwLock<SessionRegistry>>,
}

impl RegistryHandle {
    pub fn new(registry: SessionRegistry) -> Self {
        Self {
            inner: Arc::new(RwLock::new(registry)),
        }
    }

    /// Run a read-only closure against the registry
    pub fn read<R>(&self, f: impl FnOnce(&SessionRegistry) -> R) -> R {
        f(&self.inner.read())
    }

    /// Run a mutating closure against the registry as one atomic update
    pub fn write<R>(&self, f: impl FnOnce(&mut SessionRegistry) -> R) -> R {
        f(&mut self.inner.write())
    }

    pub fn active_id(&self) -> SessionId {
        self.read(|r| r.active_id())
    }

    /// Owned copy of one session
    pub fn session(&self, id: SessionId) -> Option<ChatSession> {
        self.read(|r| r.session(id).cloned())
    }

    /// Owned copy of the active session
    pub fn active_session(&self) -> Option<ChatSession> {
        self.read(|r| r.active_session().cloned())
    }

    /// Owned copy of every session, newest first
    pub fn snapshot(&self) -> Vec<ChatSession> {
        self.read(|r| r.sessions().to_vec())
    }

    pub fn append_message(&self, id: SessionId, message: ChatMessage) -> AppendOutcome {
        self.write(|r| r.append_message(id, message))
    }
}

impl Default for RegistryHandle {
    fn default() -> Self {
        Self::new(SessionRegistry::default())
    }
}
