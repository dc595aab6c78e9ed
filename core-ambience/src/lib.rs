//! # Ambience Generation
//!
//! Generates a scene image and a looping sound effect from the running
//! conversation and plays the sound through `core-playback`.
//!
//! ## Overview
//!
//! This module handles:
//! - Admission of conversation updates (in-progress guard, minimum interval)
//! - Prompt derivation with an injected text generator
//! - Image and sound-effect generation through bridge traits
//! - Starting playback of the generated clip

pub mod config;
pub mod error;
pub mod gate;
pub mod prompts;
pub mod workflow;

pub use config::{plan_sound_effect, AmbienceConfig, SoundPlan};
pub use error::{AmbienceError, GenerationStage, Result};
pub use gate::{GenerationGate, GenerationPermit, SkipReason};
pub use workflow::{AmbienceWorkflow, Decision, GenerationReport, RunOutcome};
