//! # Ambience Configuration
//!
//! Tunables for the generation workflow: when a conversation update may
//! trigger generation, which text model derives the prompts, how the sound
//! effect is requested and how it is played.

use crate::error::{AmbienceError, Result};
use bridge_traits::SoundEffectRequest;
use core_playback::{PlaybackOptions, Repeat};
use std::time::Duration;

/// Configuration for the ambience workflow
#[derive(Debug, Clone)]
pub struct AmbienceConfig {
    /// Minimum time between two successful generations
    pub min_interval: Duration,

    /// Number of trailing conversation items used as context
    pub context_window: usize,

    /// Fewest conversation items that may trigger a generation
    pub min_items: usize,

    /// Chat completion model used to derive prompts
    pub text_model: String,

    pub max_tokens: u32,

    pub temperature: f32,

    /// Sound-effect prompts are cut to this many characters
    pub max_prompt_chars: usize,

    /// Requested clip duration (seconds)
    pub sound_duration_secs: f32,

    pub prompt_influence: f32,

    /// Repeat policy of the generated clip
    pub repeat: Repeat,

    /// Playback volume of the generated clip
    pub volume: f32,

    /// Whether to generate a scene image before the sound effect
    pub generate_images: bool,

    /// Drop triggers while a generated clip is still playing
    pub skip_while_playing: bool,
}

impl Default for AmbienceConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs(60),
            context_window: 5,
            min_items: 3,
            text_model: "gpt-4o-2024-08-06".to_string(),
            max_tokens: 4000,
            temperature: 0.3,
            max_prompt_chars: 420,
            sound_duration_secs: SoundEffectRequest::MAX_DURATION_SECS,
            prompt_influence: SoundEffectRequest::DEFAULT_PROMPT_INFLUENCE,
            repeat: Repeat::Times(3),
            volume: 0.8,
            generate_images: true,
            skip_while_playing: false,
        }
    }
}

impl AmbienceConfig {
    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    pub fn with_context_window(mut self, items: usize) -> Self {
        self.context_window = items;
        self
    }

    pub fn with_min_items(mut self, items: usize) -> Self {
        self.min_items = items;
        self
    }

    pub fn with_text_model(mut self, model: impl Into<String>) -> Self {
        self.text_model = model.into();
        self
    }

    pub fn with_max_prompt_chars(mut self, chars: usize) -> Self {
        self.max_prompt_chars = chars;
        self
    }

    pub fn with_sound_duration_secs(mut self, seconds: f32) -> Self {
        self.sound_duration_secs = seconds;
        self
    }

    /// Request about `total` of ambience: sets the clip duration and the
    /// repeat count from [`plan_sound_effect`].
    pub fn with_total_duration(mut self, total: Duration) -> Self {
        let plan = plan_sound_effect(total);
        self.sound_duration_secs = plan.clip_secs;
        self.repeat = plan.repeat;
        self
    }

    pub fn with_repeat(mut self, repeat: Repeat) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_images(mut self, enabled: bool) -> Self {
        self.generate_images = enabled;
        self
    }

    pub fn with_skip_while_playing(mut self, enabled: bool) -> Self {
        self.skip_while_playing = enabled;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.context_window == 0 {
            return Err(AmbienceError::Config(
                "context_window must be greater than 0".to_string(),
            ));
        }

        if self.max_prompt_chars == 0 {
            return Err(AmbienceError::Config(
                "max_prompt_chars must be greater than 0".to_string(),
            ));
        }

        let durations =
            SoundEffectRequest::MIN_DURATION_SECS..=SoundEffectRequest::MAX_DURATION_SECS;
        if !durations.contains(&self.sound_duration_secs) {
            return Err(AmbienceError::Config(format!(
                "sound_duration_secs must be between {} and {}",
                SoundEffectRequest::MIN_DURATION_SECS,
                SoundEffectRequest::MAX_DURATION_SECS
            )));
        }

        if !(0.0..=1.0).contains(&self.prompt_influence) {
            return Err(AmbienceError::Config(
                "prompt_influence must be between 0.0 and 1.0".to_string(),
            ));
        }

        self.playback_options().validate()?;
        Ok(())
    }

    /// Playback options for generated clips.
    pub fn playback_options(&self) -> PlaybackOptions {
        PlaybackOptions::default()
            .with_repeat(self.repeat)
            .with_volume(self.volume)
    }
}

/// Clip duration and repeat policy for a requested amount of ambience.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoundPlan {
    pub clip_secs: f32,
    pub repeat: Repeat,
}

/// Split `total` into clips the generator accepts.
///
/// Totals up to the maximum clip length play once; longer totals request a
/// full-length clip repeated `ceil(total / max)` times.
pub fn plan_sound_effect(total: Duration) -> SoundPlan {
    let max = SoundEffectRequest::MAX_DURATION_SECS;
    let seconds = total.as_secs_f32();

    if seconds <= max {
        return SoundPlan {
            clip_secs: seconds.max(SoundEffectRequest::MIN_DURATION_SECS),
            repeat: Repeat::Times(1),
        };
    }

    SoundPlan {
        clip_secs: max,
        repeat: Repeat::Times((seconds / max).ceil() as u32),
    }
}
