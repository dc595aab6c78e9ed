//! # Playback Session
//!
//! One request to play a generated clip, possibly repeated. A session owns
//! one media source and one audio element; it streams the chunk source into
//! the media buffer, drives the element through its repeat policy, and
//! publishes a single tagged state stream:
//!
//! ```text
//! Loading ──▶ Playing ──▶ Stopped
//!    │           │
//!    └───────────┴──────▶ Errored
//! ```
//!
//! `Playing` is published at most once, and exactly one terminal state
//! (`Stopped` or `Errored`) is published per session.

use crate::appender::ChunkAppender;
use crate::config::{PlaybackOptions, Repeat};
use crate::error::{PlaybackError, Result};
use crate::reader::{ChunkReader, DrainOutcome};
use crate::registry::WeakSessionRegistry;
use bridge_traits::{AudioElement, ChunkStream, MediaElementEvent, MediaSource};
use core_async::sync::broadcast::error::RecvError;
use core_async::sync::CancellationToken;
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

// ============================================================================
// Identity & State
// ============================================================================

/// Unique identifier of a playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaybackSessionId(Uuid);

impl PlaybackSessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for PlaybackSessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlaybackSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum SessionState {
    /// Media allocated, audio not loaded yet.
    Loading,
    /// Audio loaded and playing.
    Playing,
    /// Terminal: finished, superseded or stopped.
    Stopped,
    /// Terminal: the pipeline failed.
    Errored(String),
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Stopped | SessionState::Errored(_))
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, SessionState::Playing)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Loading)
    }
}

/// Receives every state transition of a session.
///
/// Closures `Fn(PlaybackSessionId, &SessionState)` implement this trait.
pub trait SessionObserver: Send + Sync {
    fn on_state_change(&self, session_id: PlaybackSessionId, state: &SessionState);
}

impl<F> SessionObserver for F
where
    F: Fn(PlaybackSessionId, &SessionState) + Send + Sync,
{
    fn on_state_change(&self, session_id: PlaybackSessionId, state: &SessionState) {
        self(session_id, state)
    }
}

// ============================================================================
// Session
// ============================================================================

struct SessionInner {
    id: PlaybackSessionId,
    options: PlaybackOptions,
    source: Arc<dyn MediaSource>,
    element: Mutex<Option<Arc<dyn AudioElement>>>,
    state: Mutex<SessionState>,
    completed_passes: Mutex<u32>,
    cancel_token: CancellationToken,
    observer: Option<Arc<dyn SessionObserver>>,
    events: Option<EventBus>,
    registry: Option<WeakSessionRegistry>,
}

/// Shared handle to a playback session.
///
/// Cloning is cheap; all clones refer to the same session.
#[derive(Clone)]
pub struct PlaybackSession {
    inner: Arc<SessionInner>,
}

enum EndedAction {
    Replay,
    Finished,
}

impl PlaybackSession {
    pub(crate) fn new(
        source: Arc<dyn MediaSource>,
        element: Arc<dyn AudioElement>,
        options: PlaybackOptions,
        observer: Option<Arc<dyn SessionObserver>>,
        events: Option<EventBus>,
        registry: Option<WeakSessionRegistry>,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                id: PlaybackSessionId::new(),
                options,
                source,
                element: Mutex::new(Some(element)),
                state: Mutex::new(SessionState::Loading),
                completed_passes: Mutex::new(0),
                cancel_token: CancellationToken::new(),
                observer,
                events,
                registry,
            }),
        }
    }

    pub fn id(&self) -> PlaybackSessionId {
        self.inner.id
    }

    pub fn options(&self) -> &PlaybackOptions {
        &self.inner.options
    }

    pub fn state(&self) -> SessionState {
        self.inner.state.lock().clone()
    }

    pub fn is_playing(&self) -> bool {
        self.inner.state.lock().is_playing()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.lock().is_loading()
    }

    /// Natural playthroughs completed so far.
    pub fn completed_passes(&self) -> u32 {
        *self.inner.completed_passes.lock()
    }

    /// Stops the session and returns its audio element for disposal.
    ///
    /// Cancels the pending read or append, pauses and detaches the element,
    /// removes the session from its registry and publishes `Stopped` unless a
    /// terminal state was already published. Later calls return `None` and
    /// publish nothing.
    pub fn stop(&self) -> Option<Arc<dyn AudioElement>> {
        self.release(SessionState::Stopped)
    }

    fn release(&self, terminal: SessionState) -> Option<Arc<dyn AudioElement>> {
        let element = self.inner.element.lock().take()?;

        self.inner.cancel_token.cancel();
        element.pause();
        element.detach();

        if let Some(registry) = self.inner.registry.as_ref().and_then(|r| r.upgrade()) {
            registry.unregister(self.id());
        }

        self.transition(terminal);
        Some(element)
    }

    /// Publishes `Loading` to observers. Called once by the player.
    pub(crate) fn announce(&self) {
        let state = self.state();
        self.publish(&state);
    }

    fn transition(&self, next: SessionState) -> bool {
        {
            let mut state = self.inner.state.lock();
            if state.is_terminal() || *state == next {
                return false;
            }
            *state = next.clone();
        }
        self.publish(&next);
        true
    }

    fn publish(&self, state: &SessionState) {
        debug!(session_id = %self.id(), state = ?state, "Session state changed");

        if let Some(observer) = &self.inner.observer {
            observer.on_state_change(self.id(), state);
        }

        let session_id = self.id().to_string();
        let event = match state {
            SessionState::Loading => PlaybackEvent::Loading { session_id },
            SessionState::Playing => PlaybackEvent::Started {
                session_id,
                repeat: self.inner.options.repeat.count(),
            },
            SessionState::Stopped => PlaybackEvent::Stopped {
                session_id,
                completed_passes: self.completed_passes(),
            },
            SessionState::Errored(message) => PlaybackEvent::Error {
                session_id: Some(session_id),
                message: message.clone(),
                recoverable: false,
            },
        };
        self.emit(event);
    }

    fn emit(&self, event: PlaybackEvent) {
        if let Some(bus) = &self.inner.events {
            bus.emit(CoreEvent::Playback(event)).ok();
        }
    }

    fn element(&self) -> Option<Arc<dyn AudioElement>> {
        self.inner.element.lock().clone()
    }

    // ========================================================================
    // Driver
    // ========================================================================

    /// Runs the session to completion. Spawned once by the player.
    #[instrument(skip(self, stream), fields(session_id = %self.id()))]
    pub(crate) async fn drive(self, stream: ChunkStream) {
        if let Err(err) = self.run(stream).await {
            error!(error = %err, "Playback session failed");
            self.release(SessionState::Errored(err.to_string()));
        }
    }

    async fn run(&self, stream: ChunkStream) -> Result<()> {
        let cancel = self.inner.cancel_token.clone();
        let options = &self.inner.options;

        core_async::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            opened = self.inner.source.opened() => {
                opened.map_err(|e| PlaybackError::MediaSource(e.to_string()))?
            }
        }

        let buffer = self
            .inner
            .source
            .add_source_buffer(&options.mime)
            .map_err(|e| PlaybackError::MediaSource(e.to_string()))?;

        let Some(element) = self.element() else {
            return Ok(());
        };
        let mut element_events = element.subscribe();

        let reader = ChunkReader::new(
            ChunkAppender::new(buffer),
            Arc::clone(&self.inner.source),
            cancel.clone(),
        );
        let passes = options.repeat.buffer_passes();
        let mut drain = core_async::spawn(async move { reader.drain(stream, passes).await });
        let mut drained = false;

        self.transition(SessionState::Playing);
        info!(repeat = ?options.repeat, volume = options.volume, "Playback started");
        element
            .play()
            .await
            .map_err(|e| PlaybackError::Element(e.to_string()))?;

        loop {
            core_async::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                joined = &mut drain, if !drained => {
                    drained = true;
                    match joined {
                        Ok(Ok(DrainOutcome::Completed(report))) => {
                            debug!(
                                bytes = report.bytes_written,
                                passes = report.passes,
                                "Media buffer complete"
                            );
                        }
                        Ok(Ok(DrainOutcome::Cancelled(_))) => return Ok(()),
                        Ok(Err(e)) => return Err(e),
                        Err(e) => {
                            return Err(PlaybackError::Internal(format!(
                                "drain task failed: {}",
                                e
                            )))
                        }
                    }
                }
                event = element_events.recv() => match event {
                    Ok(MediaElementEvent::Ended) => {
                        if let EndedAction::Finished = self.on_ended(&element).await? {
                            return Ok(());
                        }
                    }
                    Ok(MediaElementEvent::Error(message)) => {
                        warn!(%message, "Audio element reported an error");
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Audio element events lagged");
                    }
                    Err(RecvError::Closed) => {
                        return Err(PlaybackError::Element(
                            "element event channel closed".to_string(),
                        ));
                    }
                }
            }
        }
    }

    async fn on_ended(&self, element: &Arc<dyn AudioElement>) -> Result<EndedAction> {
        let pass = {
            let mut passes = self.inner.completed_passes.lock();
            *passes += 1;
            *passes
        };
        self.emit(PlaybackEvent::PassCompleted {
            session_id: self.id().to_string(),
            pass,
        });

        let replay = match self.inner.options.repeat {
            Repeat::Forever => true,
            repeat => repeat.count().map_or(false, |count| pass < count),
        };

        if !replay {
            info!(passes = pass, "Repeat count exhausted");
            self.release(SessionState::Stopped);
            return Ok(EndedAction::Finished);
        }

        debug!(pass, "Replaying from start");
        element.rewind();
        element
            .play()
            .await
            .map_err(|e| PlaybackError::Element(e.to_string()))?;
        Ok(EndedAction::Replay)
    }
}

impl fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("id", &self.id())
            .field("state", &self.state())
            .field("repeat", &self.inner.options.repeat)
            .field("completed_passes", &self.completed_passes())
            .finish()
    }
}
