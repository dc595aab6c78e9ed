//! # Playback Error Types
//!
//! Error types for the streaming playback pipeline.

use bridge_traits::BridgeError;
use thiserror::Error;

/// Errors that can occur while streaming generated audio into a media buffer.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Format Errors
    // ========================================================================
    /// The host cannot decode this MIME type through a media source.
    #[error("Unsupported media type: {0}")]
    UnsupportedFormat(String),

    // ========================================================================
    // Streaming Errors
    // ========================================================================
    /// The source buffer rejected or failed a write.
    ///
    /// `position` is the zero-based index of the chunk in the appender's
    /// append sequence (replayed chunks included).
    #[error("Buffer write failed at chunk {position}: {message}")]
    BufferWrite { position: u64, message: String },

    /// The chunk stream yielded an error.
    #[error("Chunk stream failed: {0}")]
    ChunkStream(String),

    /// The media source failed to open or to finalize.
    #[error("Media source error: {0}")]
    MediaSource(String),

    // ========================================================================
    // Playback Control Errors
    // ========================================================================
    /// The audio element rejected a command (e.g. `play()`).
    #[error("Audio element error: {0}")]
    Element(String),

    /// Invalid volume value (must be in range [0.0, 1.0]).
    #[error("Invalid volume: {0} (must be between 0.0 and 1.0)")]
    InvalidVolume(f32),

    #[error("Invalid playback options: {0}")]
    InvalidOptions(String),

    // ========================================================================
    // Generic Errors
    // ========================================================================
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Returns `true` if the error came from reading or appending chunks.
    pub fn is_stream_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::ChunkStream(_) | PlaybackError::BufferWrite { .. }
        )
    }

    /// Returns `true` if the error was raised before any media was allocated.
    pub fn is_rejected_request(&self) -> bool {
        matches!(
            self,
            PlaybackError::UnsupportedFormat(_)
                | PlaybackError::InvalidVolume(_)
                | PlaybackError::InvalidOptions(_)
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
