//! # Ambience Workflow
//!
//! Turns conversation updates into a scene image and a looping sound effect.
//!
//! ## Overview
//!
//! Each admitted run:
//! - Derives a scene description from the trailing conversation items
//! - Generates a scene image from it (optional)
//! - Derives a short sound-effect prompt from the scene description
//! - Requests the sound effect and streams it into a playback session
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │ AmbienceWorkflow │
//! │ - Config         │
//! │ - GenerationGate │
//! └────────┬─────────┘
//!          │
//!          ├──> TextGenerator        (scene + sound descriptions)
//!          ├──> ImageGenerator       (scene image URL, optional)
//!          ├──> SoundEffectGenerator (chunk stream)
//!          ├──> StreamingPlayer      (playback session)
//!          └──> EventBus             (progress events, optional)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let workflow = Arc::new(
//!     AmbienceWorkflow::new(config, text, sounds, player, clock)?
//!         .with_image_generator(images)
//!         .with_event_bus(events),
//! );
//!
//! // On every conversation update:
//! workflow.trigger(items.clone());
//! ```

use crate::config::AmbienceConfig;
use crate::error::{AmbienceError, GenerationStage, Result};
use crate::gate::{GenerationGate, GenerationPermit, SkipReason};
use crate::prompts;
use bridge_traits::{
    Clock, ConversationItem, ImageGenerator, Role, SoundEffectGenerator, SoundEffectRequest,
    TextGenerator, TextRequest,
};
use core_playback::{PlaybackSession, PlaybackSessionId, StreamingPlayer};
use core_runtime::events::{AmbienceEvent, CoreEvent, EventBus};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Whether a conversation update may start a generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Generate,
    Skip(SkipReason),
}

impl Decision {
    pub fn is_generate(&self) -> bool {
        matches!(self, Decision::Generate)
    }
}

/// Result of a completed generation run.
#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub image_url: Option<String>,
    pub sound_prompt: String,
    pub session_id: PlaybackSessionId,
    pub duration_ms: u64,
}

/// How `run` ended when it did not fail.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Generated(GenerationReport),
    Skipped(SkipReason),
}

/// Image + sound-effect generation driven by conversation updates.
pub struct AmbienceWorkflow {
    config: AmbienceConfig,
    text: Arc<dyn TextGenerator>,
    images: Option<Arc<dyn ImageGenerator>>,
    sounds: Arc<dyn SoundEffectGenerator>,
    player: StreamingPlayer,
    clock: Arc<dyn Clock>,
    gate: GenerationGate,
    events: Option<EventBus>,
    current_session: Mutex<Option<PlaybackSession>>,
    current_image: Mutex<Option<String>>,
}

impl AmbienceWorkflow {
    pub fn new(
        config: AmbienceConfig,
        text: Arc<dyn TextGenerator>,
        sounds: Arc<dyn SoundEffectGenerator>,
        player: StreamingPlayer,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let gate = GenerationGate::new(config.min_interval, Arc::clone(&clock));

        Ok(Self {
            config,
            text,
            images: None,
            sounds,
            player,
            clock,
            gate,
            events: None,
            current_session: Mutex::new(None),
            current_image: Mutex::new(None),
        })
    }

    pub fn with_image_generator(mut self, images: Arc<dyn ImageGenerator>) -> Self {
        self.images = Some(images);
        self
    }

    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn config(&self) -> &AmbienceConfig {
        &self.config
    }

    pub fn gate(&self) -> &GenerationGate {
        &self.gate
    }

    /// URL of the last generated scene image.
    pub fn current_image(&self) -> Option<String> {
        self.current_image.lock().clone()
    }

    pub fn reset_image(&self) {
        self.current_image.lock().take();
    }

    /// Session of the last generated clip, while it is live.
    pub fn current_session(&self) -> Option<PlaybackSession> {
        self.current_session
            .lock()
            .clone()
            .filter(|session| !session.state().is_terminal())
    }

    pub fn is_playing(&self) -> bool {
        self.current_session()
            .map(|session| session.is_playing())
            .unwrap_or(false)
    }

    /// Stops the current clip, if any. Returns whether one was stopped.
    pub fn stop_playback(&self) -> bool {
        self.current_session
            .lock()
            .take()
            .and_then(|session| session.stop())
            .is_some()
    }

    /// Decide whether `items` may start a generation now. Does not claim the
    /// in-progress flag.
    pub fn evaluate(&self, items: &[ConversationItem]) -> Decision {
        match self.admission_check(items) {
            Some(reason) => Decision::Skip(reason),
            None => Decision::Generate,
        }
    }

    fn admission_check(&self, items: &[ConversationItem]) -> Option<SkipReason> {
        if items.is_empty() {
            return Some(SkipReason::NoItems);
        }

        if self.gate.is_in_progress() {
            return Some(SkipReason::InProgress);
        }

        let last_is_user = items.last().map(|item| item.role == Role::User);
        if items.len() > 1 && last_is_user != Some(true) {
            return Some(SkipReason::AwaitingUser);
        }

        if items.len() < self.config.min_items {
            return Some(SkipReason::TooFewItems { count: items.len() });
        }

        if let Some(remaining) = self.gate.remaining_cooldown() {
            return Some(SkipReason::Throttled { remaining });
        }

        if self.config.skip_while_playing && self.is_playing() {
            return Some(SkipReason::StillPlaying);
        }

        None
    }

    fn admit(
        &self,
        items: &[ConversationItem],
    ) -> std::result::Result<GenerationPermit, SkipReason> {
        if let Some(reason) = self.admission_check(items) {
            return Err(reason);
        }
        self.gate.try_acquire().ok_or(SkipReason::InProgress)
    }

    /// Evaluate `items` and, when admitted, run the generation to completion.
    pub async fn run(&self, items: &[ConversationItem]) -> Result<RunOutcome> {
        match self.admit(items) {
            Ok(permit) => self.generate(items, permit).await.map(RunOutcome::Generated),
            Err(reason) => {
                self.skipped(&reason);
                Ok(RunOutcome::Skipped(reason))
            }
        }
    }

    /// Evaluate `items` now and run an admitted generation on a spawned task.
    ///
    /// Failures of the spawned run are logged and published, not returned.
    pub fn trigger(self: &Arc<Self>, items: Vec<ConversationItem>) -> Decision {
        let permit = match self.admit(&items) {
            Ok(permit) => permit,
            Err(reason) => {
                self.skipped(&reason);
                return Decision::Skip(reason);
            }
        };

        let workflow = Arc::clone(self);
        core_async::spawn(async move {
            // Errors are already logged and published by `generate`.
            let _ = workflow.generate(&items, permit).await;
        });
        Decision::Generate
    }

    #[instrument(skip(self, items, permit), fields(items = items.len()))]
    async fn generate(
        &self,
        items: &[ConversationItem],
        permit: GenerationPermit,
    ) -> Result<GenerationReport> {
        let started = self.clock.now();
        self.emit(AmbienceEvent::GenerationStarted {
            context_items: items.len(),
        });
        info!("Generating ambience");

        match self.generate_inner(items).await {
            Ok((image_url, sound_prompt, session)) => {
                permit.succeed();
                let duration_ms = (self.clock.now() - started)
                    .num_milliseconds()
                    .max(0) as u64;
                self.emit(AmbienceEvent::GenerationCompleted { duration_ms });
                info!(duration_ms, session_id = %session.id(), "Ambience generation complete");

                Ok(GenerationReport {
                    image_url,
                    sound_prompt,
                    session_id: session.id(),
                    duration_ms,
                })
            }
            Err(err) => {
                drop(permit);
                warn!(stage = err.stage_name(), error = %err, "Ambience generation failed");
                self.emit(AmbienceEvent::GenerationFailed {
                    stage: err.stage_name().to_string(),
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    async fn generate_inner(
        &self,
        items: &[ConversationItem],
    ) -> Result<(Option<String>, String, PlaybackSession)> {
        let context_start = items.len().saturating_sub(self.config.context_window);
        let context = &items[context_start..];

        let description = self
            .text
            .generate(self.text_request(prompts::image_prompt(context)))
            .await
            .map_err(AmbienceError::at(GenerationStage::ImageDescription))?;
        debug!(description = %description, "Scene description ready");

        let image_url = match (&self.images, self.config.generate_images) {
            (Some(images), true) => {
                let url = images
                    .generate(&description)
                    .await
                    .map_err(AmbienceError::at(GenerationStage::Image))?;
                *self.current_image.lock() = Some(url.clone());
                self.emit(AmbienceEvent::ImageReady { url: url.clone() });
                Some(url)
            }
            _ => None,
        };

        let sound_description = self
            .text
            .generate(self.text_request(prompts::sound_effect_prompt(&description)))
            .await
            .map_err(AmbienceError::at(GenerationStage::SoundDescription))?;
        let sound_prompt =
            prompts::truncate_chars(&sound_description, self.config.max_prompt_chars);
        self.emit(AmbienceEvent::SoundRequested {
            prompt: sound_prompt.clone(),
        });

        let request = SoundEffectRequest::new(sound_prompt.clone())
            .with_duration(self.config.sound_duration_secs)
            .with_prompt_influence(self.config.prompt_influence);
        let stream = self
            .sounds
            .generate(request)
            .await
            .map_err(AmbienceError::at(GenerationStage::SoundEffect))?;

        let session = self.player.start(stream, self.config.playback_options())?;
        *self.current_session.lock() = Some(session.clone());

        Ok((image_url, sound_prompt, session))
    }

    fn text_request(&self, prompt: String) -> TextRequest {
        TextRequest {
            model: self.config.text_model.clone(),
            prompt,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        }
    }

    fn skipped(&self, reason: &SkipReason) {
        debug!(reason = %reason, "Ambience generation skipped");
        self.emit(AmbienceEvent::GenerationSkipped {
            reason: reason.to_string(),
        });
    }

    fn emit(&self, event: AmbienceEvent) {
        if let Some(bus) = &self.events {
            bus.emit(CoreEvent::Ambience(event)).ok();
        }
    }
}

impl std::fmt::Debug for AmbienceWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmbienceWorkflow")
            .field("config", &self.config)
            .field("gate", &self.gate)
            .field("images", &self.images.is_some())
            .finish()
    }
}
