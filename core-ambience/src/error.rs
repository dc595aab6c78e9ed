use bridge_traits::error::BridgeError;
use core_playback::PlaybackError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Step of a generation run that talks to an external generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStage {
    ImageDescription,
    Image,
    SoundDescription,
    SoundEffect,
}

impl GenerationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStage::ImageDescription => "image_description",
            GenerationStage::Image => "image",
            GenerationStage::SoundDescription => "sound_description",
            GenerationStage::SoundEffect => "sound_effect",
        }
    }
}

impl fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum AmbienceError {
    #[error("Generation failed at {stage}: {source}")]
    Generation {
        stage: GenerationStage,
        #[source]
        source: BridgeError,
    },

    #[error("Playback failed: {0}")]
    Playback(#[from] PlaybackError),

    #[error("Invalid ambience configuration: {0}")]
    Config(String),
}

impl AmbienceError {
    pub(crate) fn at(stage: GenerationStage) -> impl FnOnce(BridgeError) -> Self {
        move |source| AmbienceError::Generation { stage, source }
    }

    /// Stage name for event payloads.
    pub fn stage_name(&self) -> &'static str {
        match self {
            AmbienceError::Generation { stage, .. } => stage.as_str(),
            AmbienceError::Playback(_) => "playback",
            AmbienceError::Config(_) => "config",
        }
    }
}

pub type Result<T> = std::result::Result<T, AmbienceError>;
