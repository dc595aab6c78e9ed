//! # Core Configuration Module
//!
//! Builder-based configuration holding every host bridge the core needs.
//!
//! ## Overview
//!
//! [`CoreConfigBuilder`] collects bridge implementations and feature flags and
//! validates them fail-fast in [`CoreConfigBuilder::build`]. A missing bridge
//! is reported as [`Error::CapabilityMissing`] with an actionable message
//! instead of surfacing later as a runtime failure.
//!
//! ## Required Dependencies
//!
//! - `SettingsStore` - credentials and user name persistence
//! - `MediaBackend` - media sources and audio elements for generated audio
//!
//! ## Feature-dependent Dependencies
//!
//! - `TextGenerator` - required when images or sound effects are enabled
//! - `ImageGenerator` - required when `enable_images` is set
//! - `SoundEffectGenerator` - required when `enable_sound_effects` is set
//! - `RealtimeChannel`, `MicrophoneSource`, `AudioOutputSink` - required when
//!   `enable_conversation` is set
//!
//! ## Optional Dependencies
//!
//! - `Clock` - defaults to [`SystemClock`]
//! - `LoggerSink` - forwards logs to the host
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, FeatureFlags};
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .settings_store(Arc::new(BrowserSettings::new()))
//!     .media_backend(Arc::new(BrowserMedia::new()))
//!     .text_generator(Arc::new(ChatClient::new()))
//!     .sound_generator(Arc::new(SoundClient::new()))
//!     .features(FeatureFlags {
//!         enable_images: false,
//!         enable_conversation: false,
//!         ..FeatureFlags::default()
//!     })
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{
    AudioOutputSink, Clock, ImageGenerator, LoggerSink, MediaBackend, MicrophoneSource,
    RealtimeChannel, SettingsStore, SoundEffectGenerator, SystemClock, TextGenerator,
};
use std::sync::Arc;

/// Upper bound for the event bus buffer.
const MAX_EVENT_BUFFER_SIZE: usize = 10_000;

/// Core configuration.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Key-value persistence for credentials and the user name (required)
    pub settings_store: Arc<dyn SettingsStore>,

    /// Host media stack for generated audio (required)
    pub media_backend: Arc<dyn MediaBackend>,

    pub text_generator: Option<Arc<dyn TextGenerator>>,

    pub image_generator: Option<Arc<dyn ImageGenerator>>,

    pub sound_generator: Option<Arc<dyn SoundEffectGenerator>>,

    pub realtime_channel: Option<Arc<dyn RealtimeChannel>>,

    pub microphone: Option<Arc<dyn MicrophoneSource>>,

    pub audio_output: Option<Arc<dyn AudioOutputSink>>,

    /// Time source used by generation throttling
    pub clock: Arc<dyn Clock>,

    pub logger_sink: Option<Arc<dyn LoggerSink>>,

    pub features: FeatureFlags,

    /// Capacity of the core event bus
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("settings_store", &"SettingsStore { ... }")
            .field("media_backend", &"MediaBackend { ... }")
            .field(
                "text_generator",
                &self.text_generator.as_ref().map(|_| "TextGenerator { ... }"),
            )
            .field(
                "image_generator",
                &self
                    .image_generator
                    .as_ref()
                    .map(|_| "ImageGenerator { ... }"),
            )
            .field(
                "sound_generator",
                &self
                    .sound_generator
                    .as_ref()
                    .map(|_| "SoundEffectGenerator { ... }"),
            )
            .field(
                "realtime_channel",
                &self
                    .realtime_channel
                    .as_ref()
                    .map(|_| "RealtimeChannel { ... }"),
            )
            .field(
                "microphone",
                &self.microphone.as_ref().map(|_| "MicrophoneSource { ... }"),
            )
            .field(
                "audio_output",
                &self.audio_output.as_ref().map(|_| "AudioOutputSink { ... }"),
            )
            .field("logger_sink", &self.logger_sink.is_some())
            .field("features", &self.features)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

/// Feature flags control optional functionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Generate a scene image before the sound effect
    pub enable_images: bool,

    /// Generate and play ambience sound effects
    pub enable_sound_effects: bool,

    /// Starting a playback session stops every other registered session
    pub exclusive_playback: bool,

    /// Realtime voice conversation
    pub enable_conversation: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_images: true,
            enable_sound_effects: true,
            exclusive_playback: true,
            enable_conversation: true,
        }
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// Checks the event buffer bounds and that every enabled feature has the
    /// bridges it depends on.
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > MAX_EVENT_BUFFER_SIZE {
            return Err(Error::Config(format!(
                "Event buffer size exceeds maximum of {}",
                MAX_EVENT_BUFFER_SIZE
            )));
        }

        let generates = self.features.enable_images || self.features.enable_sound_effects;
        if generates && self.text_generator.is_none() {
            return Err(missing(
                "TextGenerator",
                "Image and sound prompts are derived with a text generator. \
                 Inject a TextGenerator or disable images and sound effects.",
            ));
        }

        if self.features.enable_images && self.image_generator.is_none() {
            return Err(missing(
                "ImageGenerator",
                "Images enabled but no ImageGenerator provided. \
                 Disable `enable_images` for sound-only ambience.",
            ));
        }

        if self.features.enable_sound_effects && self.sound_generator.is_none() {
            return Err(missing(
                "SoundEffectGenerator",
                "Sound effects enabled but no SoundEffectGenerator provided.",
            ));
        }

        if self.features.enable_conversation {
            if self.realtime_channel.is_none() {
                return Err(missing(
                    "RealtimeChannel",
                    "Conversation enabled but no realtime channel provided.",
                ));
            }
            if self.microphone.is_none() {
                return Err(missing(
                    "MicrophoneSource",
                    "Conversation enabled but no microphone source provided.",
                ));
            }
            if self.audio_output.is_none() {
                return Err(missing(
                    "AudioOutputSink",
                    "Conversation enabled but no audio output sink provided.",
                ));
            }
        }

        Ok(())
    }
}

fn missing(capability: &str, message: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: message.to_string(),
    }
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    settings_store: Option<Arc<dyn SettingsStore>>,
    media_backend: Option<Arc<dyn MediaBackend>>,
    text_generator: Option<Arc<dyn TextGenerator>>,
    image_generator: Option<Arc<dyn ImageGenerator>>,
    sound_generator: Option<Arc<dyn SoundEffectGenerator>>,
    realtime_channel: Option<Arc<dyn RealtimeChannel>>,
    microphone: Option<Arc<dyn MicrophoneSource>>,
    audio_output: Option<Arc<dyn AudioOutputSink>>,
    clock: Option<Arc<dyn Clock>>,
    logger_sink: Option<Arc<dyn LoggerSink>>,
    features: FeatureFlags,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    /// Sets the settings store implementation (required).
    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    /// Sets the media backend implementation (required).
    pub fn media_backend(mut self, backend: Arc<dyn MediaBackend>) -> Self {
        self.media_backend = Some(backend);
        self
    }

    pub fn text_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.text_generator = Some(generator);
        self
    }

    pub fn image_generator(mut self, generator: Arc<dyn ImageGenerator>) -> Self {
        self.image_generator = Some(generator);
        self
    }

    pub fn sound_generator(mut self, generator: Arc<dyn SoundEffectGenerator>) -> Self {
        self.sound_generator = Some(generator);
        self
    }

    pub fn realtime_channel(mut self, channel: Arc<dyn RealtimeChannel>) -> Self {
        self.realtime_channel = Some(channel);
        self
    }

    pub fn microphone(mut self, microphone: Arc<dyn MicrophoneSource>) -> Self {
        self.microphone = Some(microphone);
        self
    }

    pub fn audio_output(mut self, sink: Arc<dyn AudioOutputSink>) -> Self {
        self.audio_output = Some(sink);
        self
    }

    /// Overrides the time source (tests inject a manual clock).
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    pub fn enable_images(mut self, enabled: bool) -> Self {
        self.features.enable_images = enabled;
        self
    }

    pub fn enable_sound_effects(mut self, enabled: bool) -> Self {
        self.features.enable_sound_effects = enabled;
        self
    }

    pub fn exclusive_playback(mut self, enabled: bool) -> Self {
        self.features.exclusive_playback = enabled;
        self
    }

    pub fn enable_conversation(mut self, enabled: bool) -> Self {
        self.features.enable_conversation = enabled;
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// Returns [`Error::CapabilityMissing`] when a required bridge or a bridge
    /// needed by an enabled feature is absent, and [`Error::Config`] for
    /// out-of-range values.
    pub fn build(self) -> Result<CoreConfig> {
        let settings_store = self.settings_store.ok_or_else(|| {
            missing(
                "SettingsStore",
                "SettingsStore implementation is required for credential persistence. \
                 Web: inject a localStorage-backed store. \
                 Tests: use bridge_traits::InMemorySettingsStore.",
            )
        })?;

        let media_backend = self.media_backend.ok_or_else(|| {
            missing(
                "MediaBackend",
                "MediaBackend implementation is required to play generated audio. \
                 Web: inject the MediaSource/HTMLAudioElement adapter.",
            )
        })?;

        let config = CoreConfig {
            settings_store,
            media_backend,
            text_generator: self.text_generator,
            image_generator: self.image_generator,
            sound_generator: self.sound_generator,
            realtime_channel: self.realtime_channel,
            microphone: self.microphone,
            audio_output: self.audio_output,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            logger_sink: self.logger_sink,
            features: self.features,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}
