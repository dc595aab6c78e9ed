//! Media pipeline bridge traits.
//!
//! These traits model the host's streaming media stack: a [`MediaSource`]
//! that owns one growable [`SourceBuffer`], and an [`AudioElement`] bound to
//! that source. The core playback engine only ever talks to these contracts,
//! so the same engine drives a browser `MediaSource`/`<audio>` pair, a native
//! decoder, or the in-memory fakes used by the tests.
//!
//! # Event contract
//!
//! Hosts publish buffer and element events over `broadcast` channels. For a
//! [`SourceBuffer`], the completion event of a write (`UpdateEnd` or `Error`)
//! must be published in the same critical section that clears
//! [`SourceBuffer::updating`]. A subscriber that observed `updating() == true`
//! is therefore guaranteed to receive the completion event.

use async_trait::async_trait;
use bytes::Bytes;
use core_async::sync::broadcast;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;

/// MIME type of the compressed audio produced by the sound-effect generator.
pub const AUDIO_MPEG: &str = "audio/mpeg";

/// Completion signal of a single buffer write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceBufferEvent {
    /// The in-flight write finished and the buffer accepts a new one.
    UpdateEnd,
    /// The in-flight write failed.
    Error(String),
}

/// Marker passed when finalizing a media source abnormally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndOfStreamError {
    Decode,
    Network,
}

/// Lifecycle of a media source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadyState {
    Closed,
    Open,
    Ended,
}

/// Events emitted by an audio output element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaElementEvent {
    /// A playthrough reached the end of the buffered media.
    Ended,
    /// The element hit a runtime error (decode, network, ...).
    Error(String),
}

/// Append-only buffer of decodable audio bytes.
///
/// Accepts at most one pending write at a time: `append_buffer` must be
/// rejected while `updating()` is true.
pub trait SourceBuffer: Send + Sync {
    /// Whether a write is currently in flight.
    fn updating(&self) -> bool;

    /// Issues a write of `chunk`.
    ///
    /// Returns immediately; completion is signalled through [`subscribe`].
    ///
    /// [`subscribe`]: SourceBuffer::subscribe
    fn append_buffer(&self, chunk: Bytes) -> Result<()>;

    /// Subscribes to write completion events.
    fn subscribe(&self) -> broadcast::Receiver<SourceBufferEvent>;
}

/// Container that owns a single source buffer and the end-of-input marker.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Resolves once the source is open and can accept a source buffer.
    async fn opened(&self) -> Result<()>;

    /// Current lifecycle state.
    fn ready_state(&self) -> ReadyState;

    /// Creates the source buffer for `mime`.
    fn add_source_buffer(&self, mime: &str) -> Result<Arc<dyn SourceBuffer>>;

    /// Marks the end of input. `Some(error)` finalizes abnormally.
    fn end_of_stream(&self, error: Option<EndOfStreamError>) -> Result<()>;
}

/// Audio output element bound to a [`MediaSource`].
#[async_trait]
pub trait AudioElement: Send + Sync {
    /// Sets the output volume in `0.0..=1.0`.
    fn set_volume(&self, volume: f32);

    /// Starts or resumes playback. Hosts may reject (autoplay policy, ...).
    async fn play(&self) -> Result<()>;

    fn pause(&self);

    /// Seeks back to the start of the buffered media.
    fn rewind(&self);

    /// Unbinds the element from its media source, releasing buffered media.
    fn detach(&self);

    /// Subscribes to playthrough and error events.
    fn subscribe(&self) -> broadcast::Receiver<MediaElementEvent>;
}

/// Factory for media sources and audio elements.
pub trait MediaBackend: Send + Sync {
    /// Whether the host can decode `mime` through a media source.
    fn is_type_supported(&self, mime: &str) -> bool;

    fn create_media_source(&self) -> Result<Arc<dyn MediaSource>>;

    fn create_audio_element(&self, source: Arc<dyn MediaSource>) -> Result<Arc<dyn AudioElement>>;
}
