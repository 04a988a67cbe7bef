//! Session management for conversation history
//!
//! Sessions are held in memory only; the registry is their single owner and
//! everything else addresses it by session id.

pub mod registry;
pub mod store;

pub use registry::{AppendOutcome, RegistryHandle, RegistrySettings, SessionRegistry};
pub use store::{ChatMessage, ChatSession, MessageId, Role, SessionId};
