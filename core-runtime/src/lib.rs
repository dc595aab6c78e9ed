//! # Core Runtime Module
//!
//! Foundational runtime infrastructure shared by every Murmur core crate:
//! - Logging and tracing infrastructure
//! - Configuration management with fail-fast bridge validation
//! - Event bus system
//!
//! ## Overview
//!
//! The playback, ambience and service crates depend on this crate for their
//! logging conventions, for the [`CoreConfig`](config::CoreConfig) that
//! carries injected host bridges, and for the [`EventBus`](events::EventBus)
//! they publish lifecycle events on.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
