//! Async event queues

use super::events::{EngineEvent, VoiceEvent};
use tokio::sync::{broadcast, mpsc};
use tracing::debug;

const EVENT_CAPACITY: usize = 256;

/// Receiving end of one voice call's transcript stream
pub type VoiceEventStream = mpsc::UnboundedReceiver<VoiceEvent>;

/// Sending end handed to the voice transport for one call
#[derive(Debug, Clone)]
pub struct VoiceEventSender {
    tx: mpsc::UnboundedSender<VoiceEvent>,
}

impl VoiceEventSender {
    /// Push an event into the call's stream, preserving delivery order
    pub fn send(&self, event: VoiceEvent) -> crate::Result<()> {
        self.tx
            .send(event)
            .map_err(|_| crate::Error::Channel("Voice event stream closed".to_string()))
    }

    /// True once the adapter has stopped draining the stream
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Event bus shared by the engine components.
///
/// Engine notifications fan out to any number of subscribers; every voice
/// call gets its own ordered stream so a stopped call never leaves a
/// listener attached.
#[derive(Clone)]
pub struct EventBus {
    events_tx: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { events_tx }
    }

    /// Subscribe to engine notifications published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events_tx.subscribe()
    }

    /// Publish a notification; returns how many subscribers received it
    pub fn publish(&self, event: EngineEvent) -> usize {
        match self.events_tx.send(event) {
            Ok(count) => count,
            Err(_) => {
                debug!("No subscribers for engine event");
                0
            }
        }
    }

    /// Mint a fresh ordered stream for one voice call
    pub fn voice_channel(&self) -> (VoiceEventSender, VoiceEventStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (VoiceEventSender { tx }, rx)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
