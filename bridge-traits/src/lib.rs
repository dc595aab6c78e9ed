//! # Host Bridge Traits
//!
//! Contracts between the Murmur core and the host environment.
//!
//! ## Overview
//!
//! The core never touches a browser API, an HTTP client, or an audio device
//! directly. Each capability it needs is expressed as a trait here and
//! injected by the host at construction time (see `core_runtime::config`).
//!
//! ## Traits
//!
//! ### Media pipeline
//! - [`MediaBackend`](media::MediaBackend) - Creates media sources and audio elements
//! - [`MediaSource`](media::MediaSource) - Owns the growable source buffer and end-of-input marker
//! - [`SourceBuffer`](media::SourceBuffer) - Single-writer append-only audio buffer
//! - [`AudioElement`](media::AudioElement) - Output element with play/pause/rewind
//!
//! ### Generation services
//! - [`TextGenerator`](generation::TextGenerator) - Chat completion
//! - [`ImageGenerator`](generation::ImageGenerator) - Image generation, returns a URL
//! - [`SoundEffectGenerator`](generation::SoundEffectGenerator) - Streams encoded audio chunks
//!
//! ### Conversation
//! - [`RealtimeChannel`](realtime::RealtimeChannel) - Realtime speech API connection
//! - [`MicrophoneSource`](realtime::MicrophoneSource) - PCM16 capture
//! - [`AudioOutputSink`](realtime::AudioOutputSink) - PCM16 playback of assistant speech
//!
//! ### Utilities
//! - [`SettingsStore`](storage::SettingsStore) - Key-value preferences and credentials
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with descriptive errors when a required capability is
//! missing:
//!
//! ```ignore
//! use core_runtime::error::Error;
//!
//! let media = config.media_backend.clone().ok_or_else(|| Error::CapabilityMissing {
//!     capability: "MediaBackend".to_string(),
//!     message: "No media backend provided. Inject the host media adapter.".to_string(),
//! })?;
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Host
//! implementations convert their native errors into it with an actionable
//! message.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so that implementations can be
//! shared across async tasks.

pub mod error;
pub mod generation;
pub mod media;
pub mod realtime;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use generation::{
    ChunkStream, ImageGenerator, SoundEffectGenerator, SoundEffectRequest, TextGenerator,
    TextRequest,
};
pub use media::{
    AudioElement, EndOfStreamError, MediaBackend, MediaElementEvent, MediaSource, ReadyState,
    SourceBuffer, SourceBufferEvent, AUDIO_MPEG,
};
pub use realtime::{
    AudioOutputSink, ConversationItem, ItemKind, ItemStatus, MicrophoneSource, PcmFrameStream,
    RealtimeChannel, RealtimeEvent, Role, SessionSettings, TrackOffset, TurnDetection,
    PCM_SAMPLE_RATE,
};
pub use storage::{InMemorySettingsStore, SettingsStore};
pub use time::{Clock, ConsoleLogger, LogEntry, LogLevel, LoggerSink, SystemClock};
