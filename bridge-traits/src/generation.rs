//! Generator bridge traits.
//!
//! External generation services (chat completion, image, sound effect) are
//! injected by the host. The core never talks HTTP itself.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::error::Result;

/// Read-once stream of compressed audio chunks.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Chat completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRequest {
    pub model: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Sound-effect request.
///
/// Duration and prompt influence are clamped to the ranges accepted by the
/// generation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundEffectRequest {
    pub text: String,
    pub duration_seconds: f32,
    pub prompt_influence: f32,
}

impl SoundEffectRequest {
    pub const MIN_DURATION_SECS: f32 = 0.5;
    pub const MAX_DURATION_SECS: f32 = 22.0;
    pub const DEFAULT_PROMPT_INFLUENCE: f32 = 0.3;

    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            duration_seconds: Self::MAX_DURATION_SECS,
            prompt_influence: Self::DEFAULT_PROMPT_INFLUENCE,
        }
    }

    pub fn with_duration(mut self, seconds: f32) -> Self {
        self.duration_seconds = seconds.clamp(Self::MIN_DURATION_SECS, Self::MAX_DURATION_SECS);
        self
    }

    pub fn with_prompt_influence(mut self, influence: f32) -> Self {
        self.prompt_influence = influence.clamp(0.0, 1.0);
        self
    }
}

/// Text generator (chat completion).
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: TextRequest) -> Result<String>;
}

/// Image generator. Returns the URL of the generated image.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Sound-effect generator. Returns the encoded audio as a chunk stream.
#[async_trait]
pub trait SoundEffectGenerator: Send + Sync {
    async fn generate(&self, request: SoundEffectRequest) -> Result<ChunkStream>;
}
