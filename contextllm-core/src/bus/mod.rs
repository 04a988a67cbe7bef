//! Event bus for decoupled communication
//!
//! Voice transcripts arrive on a per-call ordered stream; engine state
//! changes are broadcast to observers.

pub mod events;
pub mod queue;

pub use events::{EngineEvent, TranscriptKind, VoiceEvent};
pub use queue::{EventBus, VoiceEventSender, VoiceEventStream};
