//! # Streaming Player
//!
//! Entry point of the playback pipeline. `start` validates the request,
//! allocates a media source and an audio element from the host
//! [`MediaBackend`], and spawns the session driver. The returned
//! [`PlaybackSession`] is live immediately, in the `Loading` state.
//!
//! ## Usage
//!
//! ```ignore
//! let registry = SessionRegistry::new();
//! let player = StreamingPlayer::exclusive(backend, registry.clone());
//!
//! let session = player.start(stream, PlaybackOptions::default().with_repeat(Repeat::Times(3)))?;
//! // ...
//! session.stop();
//! ```

use crate::config::PlaybackOptions;
use crate::error::{PlaybackError, Result};
use crate::registry::SessionRegistry;
use crate::session::{PlaybackSession, SessionObserver};
use bridge_traits::{ChunkStream, MediaBackend};
use core_runtime::events::EventBus;
use std::sync::Arc;
use tracing::{info, instrument};

/// Starts playback sessions against a host media backend.
#[derive(Clone)]
pub struct StreamingPlayer {
    backend: Arc<dyn MediaBackend>,
    registry: Option<SessionRegistry>,
    events: Option<EventBus>,
}

impl StreamingPlayer {
    /// Player whose sessions may overlap.
    pub fn new(backend: Arc<dyn MediaBackend>) -> Self {
        Self {
            backend,
            registry: None,
            events: None,
        }
    }

    /// Player that stops every session in `registry` before starting a new one.
    pub fn exclusive(backend: Arc<dyn MediaBackend>, registry: SessionRegistry) -> Self {
        Self {
            backend,
            registry: Some(registry),
            events: None,
        }
    }

    /// Mirror session state changes onto `events`.
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn registry(&self) -> Option<&SessionRegistry> {
        self.registry.as_ref()
    }

    pub fn is_exclusive(&self) -> bool {
        self.registry.is_some()
    }

    /// Start streaming `stream` into a new session.
    ///
    /// Must be called from within a runtime; the session driver is spawned.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::UnsupportedFormat`] when the backend cannot decode
    /// `options.mime`; nothing is allocated and no session is released.
    /// [`PlaybackError::Bridge`] when the host fails to allocate the media
    /// source or the audio element; registered sessions keep playing.
    pub fn start(&self, stream: ChunkStream, options: PlaybackOptions) -> Result<PlaybackSession> {
        self.spawn_session(stream, options, None)
    }

    /// Like [`start`](Self::start), reporting every state change to `observer`.
    pub fn start_with_observer(
        &self,
        stream: ChunkStream,
        options: PlaybackOptions,
        observer: Arc<dyn SessionObserver>,
    ) -> Result<PlaybackSession> {
        self.spawn_session(stream, options, Some(observer))
    }

    #[instrument(
        skip(self, stream, observer),
        fields(mime = %options.mime, repeat = ?options.repeat)
    )]
    fn spawn_session(
        &self,
        stream: ChunkStream,
        options: PlaybackOptions,
        observer: Option<Arc<dyn SessionObserver>>,
    ) -> Result<PlaybackSession> {
        options.validate()?;

        if !self.backend.is_type_supported(&options.mime) {
            return Err(PlaybackError::UnsupportedFormat(options.mime));
        }

        let source = self.backend.create_media_source()?;
        let element = self.backend.create_audio_element(Arc::clone(&source))?;
        element.set_volume(options.volume);

        // The current clip keeps playing if the host cannot allocate.
        if let Some(registry) = &self.registry {
            registry.release_all();
        }

        let session = PlaybackSession::new(
            source,
            element,
            options,
            observer,
            self.events.clone(),
            self.registry.as_ref().map(SessionRegistry::downgrade),
        );
        session.announce();

        if let Some(registry) = &self.registry {
            registry.register(session.clone());
        }

        info!(session_id = %session.id(), "Playback session created");
        core_async::spawn(session.clone().drive(stream));
        Ok(session)
    }
}

impl std::fmt::Debug for StreamingPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingPlayer")
            .field("exclusive", &self.is_exclusive())
            .field("registry", &self.registry)
            .finish()
    }
}
