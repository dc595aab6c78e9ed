//! # Event Bus System
//!
//! Decoupled communication between the core modules over a typed broadcast
//! channel.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     emit      ┌───────────┐
//! │ Playback     ├──────────────>│           │
//! └──────────────┘               │           │
//!                                │ EventBus  │     subscribe    ┌────────────┐
//! ┌──────────────┐     emit      │ (broadcast├─────────────────>│ Host UI    │
//! │ Ambience     ├──────────────>│  channel) │                  └────────────┘
//! └──────────────┘               │           │
//!                                │           │     subscribe    ┌────────────┐
//! ┌──────────────┐     emit      │           ├─────────────────>│ Event log  │
//! │ Conversation ├──────────────>│           │                  └────────────┘
//! └──────────────┘               └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{AmbienceEvent, CoreEvent, EventBus};
//!
//! let event_bus = EventBus::new(100);
//! let mut sub = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Ambience(AmbienceEvent::ImageReady {
//!         url: "https://example.invalid/scene.png".to_string(),
//!     }))
//!     .ok();
//!
//! assert!(matches!(sub.try_recv(), Ok(CoreEvent::Ambience(_))));
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events. Non-fatal.
//! - **`RecvError::Closed`**: every sender was dropped. Treat as shutdown.
//!
//! Emitting with no subscribers returns an error; publishers in this
//! workspace ignore it with `.ok()`.

use core_async::sync::broadcast;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use core_async::sync::broadcast::error::{RecvError, SendError};
pub use core_async::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Streaming playback session lifecycle
    Playback(PlaybackEvent),
    /// Image and sound-effect generation
    Ambience(AmbienceEvent),
    /// Realtime conversation
    Conversation(ConversationEvent),
}

impl CoreEvent {
    /// Short human-readable description for event logs.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Ambience(e) => e.description(),
            CoreEvent::Conversation(e) => e.description(),
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::Error { .. }) => EventSeverity::Error,
            CoreEvent::Ambience(AmbienceEvent::GenerationFailed { .. }) => EventSeverity::Error,
            CoreEvent::Conversation(ConversationEvent::Error { .. }) => EventSeverity::Error,
            CoreEvent::Ambience(AmbienceEvent::GenerationSkipped { .. }) => EventSeverity::Debug,
            CoreEvent::Playback(PlaybackEvent::PassCompleted { .. }) => EventSeverity::Debug,
            CoreEvent::Conversation(ConversationEvent::ItemUpdated { .. }) => EventSeverity::Debug,
            _ => EventSeverity::Info,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Playback Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// Media source allocated, audio not yet loaded.
    Loading { session_id: String },
    /// Audio loaded and playback started. `repeat` is `None` when looping forever.
    Started {
        session_id: String,
        repeat: Option<u32>,
    },
    /// One natural playthrough finished.
    PassCompleted { session_id: String, pass: u32 },
    /// Terminal: repeat count exhausted, superseded, or stopped.
    Stopped {
        session_id: String,
        completed_passes: u32,
    },
    /// Terminal: the pipeline failed.
    Error {
        session_id: Option<String>,
        message: String,
        recoverable: bool,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::Loading { .. } => "Loading generated audio",
            PlaybackEvent::Started { .. } => "Playback started",
            PlaybackEvent::PassCompleted { .. } => "Playthrough completed",
            PlaybackEvent::Stopped { .. } => "Playback stopped",
            PlaybackEvent::Error { .. } => "Playback error",
        }
    }
}

// ============================================================================
// Ambience Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum AmbienceEvent {
    GenerationStarted { context_items: usize },
    GenerationSkipped { reason: String },
    ImageReady { url: String },
    SoundRequested { prompt: String },
    GenerationCompleted { duration_ms: u64 },
    GenerationFailed { stage: String, message: String },
}

impl AmbienceEvent {
    fn description(&self) -> &str {
        match self {
            AmbienceEvent::GenerationStarted { .. } => "Ambience generation started",
            AmbienceEvent::GenerationSkipped { .. } => "Ambience generation skipped",
            AmbienceEvent::ImageReady { .. } => "Scene image ready",
            AmbienceEvent::SoundRequested { .. } => "Sound effect requested",
            AmbienceEvent::GenerationCompleted { .. } => "Ambience generation completed",
            AmbienceEvent::GenerationFailed { .. } => "Ambience generation failed",
        }
    }
}

// ============================================================================
// Conversation Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ConversationEvent {
    Connected { user_name: String },
    Disconnected,
    ItemUpdated { item_id: String, role: String },
    ItemDeleted { item_id: String },
    Interrupted {
        item_id: Option<String>,
        sample_offset: Option<u64>,
    },
    Error { message: String },
}

impl ConversationEvent {
    fn description(&self) -> &str {
        match self {
            ConversationEvent::Connected { .. } => "Conversation connected",
            ConversationEvent::Disconnected => "Conversation disconnected",
            ConversationEvent::ItemUpdated { .. } => "Conversation item updated",
            ConversationEvent::ItemDeleted { .. } => "Conversation item deleted",
            ConversationEvent::Interrupted { .. } => "Assistant interrupted",
            ConversationEvent::Error { .. } => "Conversation error",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel for [`CoreEvent`]s.
///
/// Cheap to clone; every clone publishes into the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event, returning the number of subscribers reached.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// Receiver wrapper that skips events rejected by a predicate.
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking receive. `None` when no matching event is queued.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
