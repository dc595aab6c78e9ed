//! # Streaming Playback
//!
//! Streams generated audio into a host media buffer and plays it back,
//! optionally on repeat.
//!
//! ## Overview
//!
//! This module handles:
//! - FIFO, single-writer appends into a media source buffer
//! - Draining a read-once chunk stream, with replay for repeat passes
//! - Playback sessions with a single tagged state stream and cancellation
//! - An optional exclusive registry so only one session plays at a time
//!
//! The host media stack is reached only through the `bridge_traits::media`
//! traits.

pub mod appender;
pub mod config;
pub mod error;
pub mod player;
pub mod reader;
pub mod registry;
pub mod session;

pub use appender::ChunkAppender;
pub use config::{PlaybackOptions, Repeat};
pub use error::{PlaybackError, Result};
pub use player::StreamingPlayer;
pub use reader::{ChunkReader, DrainOutcome, DrainReport};
pub use registry::SessionRegistry;
pub use session::{PlaybackSession, PlaybackSessionId, SessionObserver, SessionState};
