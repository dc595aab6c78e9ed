//! # Playback Options
//!
//! Per-session options: how often to repeat, at what volume, and which media
//! type the chunk stream carries.

use crate::error::{PlaybackError, Result};
use bridge_traits::AUDIO_MPEG;
use serde::{Deserialize, Serialize};

/// Repeat policy of a playback session.
///
/// `Times(n)` plays the clip `n` times (`0` is treated as `1`); `Forever`
/// rewinds and plays again on every natural end until stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Repeat {
    Times(u32),
    Forever,
}

impl Repeat {
    /// Finite repeat with `0` clamped to `1`.
    pub fn times(count: u32) -> Self {
        Repeat::Times(count.max(1))
    }

    /// Number of playthroughs, `None` when looping forever.
    pub fn count(&self) -> Option<u32> {
        match self {
            Repeat::Times(n) => Some((*n).max(1)),
            Repeat::Forever => None,
        }
    }

    /// How many times the retained chunks are written into the media buffer.
    pub fn buffer_passes(&self) -> u32 {
        self.count().unwrap_or(1)
    }

    pub fn is_forever(&self) -> bool {
        matches!(self, Repeat::Forever)
    }
}

impl Default for Repeat {
    fn default() -> Self {
        Repeat::Times(1)
    }
}

/// Options for a single playback session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackOptions {
    /// Repeat policy.
    ///
    /// Default: play once.
    #[serde(default)]
    pub repeat: Repeat,

    /// Output volume (0.0 = muted, 1.0 = unity gain).
    ///
    /// Default: 0.8.
    #[serde(default = "default_volume")]
    pub volume: f32,

    /// MIME type of the chunk stream.
    ///
    /// Default: `audio/mpeg`.
    #[serde(default = "default_mime")]
    pub mime: String,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            repeat: Repeat::default(),
            volume: default_volume(),
            mime: default_mime(),
        }
    }
}

impl PlaybackOptions {
    pub fn with_repeat(mut self, repeat: Repeat) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = mime.into();
        self
    }

    /// Validate the options.
    pub fn validate(&self) -> Result<()> {
        if !self.volume.is_finite() || !(0.0..=1.0).contains(&self.volume) {
            return Err(PlaybackError::InvalidVolume(self.volume));
        }

        if self.mime.trim().is_empty() {
            return Err(PlaybackError::InvalidOptions(
                "mime type must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

fn default_volume() -> f32 {
    0.8
}

fn default_mime() -> String {
    AUDIO_MPEG.to_string()
}
