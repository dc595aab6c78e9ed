//! In-memory media host used by the playback integration tests.
//!
//! The source buffer completes writes asynchronously after a small,
//! deterministic jitter and rejects any write issued while another is in
//! flight, like a browser `SourceBuffer`. Tests run on a paused clock, so the
//! jitter costs no wall time.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::{
    AudioElement, BridgeError, ChunkStream, EndOfStreamError, MediaBackend, MediaElementEvent,
    MediaSource, ReadyState, SourceBuffer, SourceBufferEvent,
};
use bytes::Bytes;
use core_async::sync::{broadcast, watch};
use core_async::time::Duration;
use core_playback::{PlaybackSessionId, SessionObserver, SessionState};
use futures::stream::{self, Stream, StreamExt};
use parking_lot::Mutex;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

type BridgeResult<T> = bridge_traits::error::Result<T>;

const JITTER_MS: [u64; 8] = [3, 1, 4, 1, 5, 9, 2, 6];

// ============================================================================
// Source Buffer
// ============================================================================

#[derive(Default)]
struct BufferState {
    updating: bool,
    appended: Vec<Bytes>,
    issued: usize,
    rejected: usize,
    in_flight: usize,
    max_in_flight: usize,
}

pub struct MockSourceBuffer {
    state: Arc<Mutex<BufferState>>,
    events: broadcast::Sender<SourceBufferEvent>,
    fail_at: Option<usize>,
}

impl MockSourceBuffer {
    pub fn new() -> Arc<Self> {
        Self::with_failure(None)
    }

    /// Buffer whose write number `fail_at` (zero-based) signals an error.
    pub fn with_failure(fail_at: Option<usize>) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            state: Arc::new(Mutex::new(BufferState::default())),
            events,
            fail_at,
        })
    }

    /// Bytes of every completed write, in completion order.
    pub fn appended(&self) -> Vec<Bytes> {
        self.state.lock().appended.clone()
    }

    pub fn appended_bytes(&self) -> Vec<u8> {
        self.appended().concat()
    }

    pub fn rejected(&self) -> usize {
        self.state.lock().rejected
    }

    pub fn max_in_flight(&self) -> usize {
        self.state.lock().max_in_flight
    }
}

impl SourceBuffer for MockSourceBuffer {
    fn updating(&self) -> bool {
        self.state.lock().updating
    }

    fn append_buffer(&self, chunk: Bytes) -> BridgeResult<()> {
        let index = {
            let mut state = self.state.lock();
            if state.updating {
                state.rejected += 1;
                return Err(BridgeError::InvalidState(
                    "append while a write is in flight".to_string(),
                ));
            }
            state.updating = true;
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
            let index = state.issued;
            state.issued += 1;
            index
        };

        let failed = self.fail_at == Some(index);
        let state = Arc::clone(&self.state);
        let events = self.events.clone();
        let delay = Duration::from_millis(JITTER_MS[index % JITTER_MS.len()]);

        core_async::spawn(async move {
            core_async::sleep(delay).await;
            let mut state = state.lock();
            state.updating = false;
            state.in_flight -= 1;
            let event = if failed {
                SourceBufferEvent::Error(format!("write {} failed", index))
            } else {
                state.appended.push(chunk);
                SourceBufferEvent::UpdateEnd
            };
            let _ = events.send(event);
        });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<SourceBufferEvent> {
        self.events.subscribe()
    }
}

// ============================================================================
// Media Source
// ============================================================================

pub struct MockMediaSource {
    buffer: Arc<MockSourceBuffer>,
    mimes: Mutex<Vec<String>>,
    ready_state: Mutex<ReadyState>,
    end_of_stream_calls: Mutex<Vec<Option<EndOfStreamError>>>,
    finalized: watch::Sender<bool>,
}

impl MockMediaSource {
    pub fn new(buffer: Arc<MockSourceBuffer>) -> Arc<Self> {
        let (finalized, _) = watch::channel(false);
        Arc::new(Self {
            buffer,
            mimes: Mutex::new(Vec::new()),
            ready_state: Mutex::new(ReadyState::Closed),
            end_of_stream_calls: Mutex::new(Vec::new()),
            finalized,
        })
    }

    pub fn buffer(&self) -> &Arc<MockSourceBuffer> {
        &self.buffer
    }

    pub fn end_of_stream_calls(&self) -> Vec<Option<EndOfStreamError>> {
        self.end_of_stream_calls.lock().clone()
    }

    pub fn mimes(&self) -> Vec<String> {
        self.mimes.lock().clone()
    }

    /// Resolves once the source was finalized without an error.
    pub async fn wait_finalized(&self) {
        let mut rx = self.finalized.subscribe();
        let _ = rx.wait_for(|done| *done).await;
    }
}

#[async_trait]
impl MediaSource for MockMediaSource {
    async fn opened(&self) -> BridgeResult<()> {
        core_async::sleep(Duration::from_millis(1)).await;
        *self.ready_state.lock() = ReadyState::Open;
        Ok(())
    }

    fn ready_state(&self) -> ReadyState {
        *self.ready_state.lock()
    }

    fn add_source_buffer(&self, mime: &str) -> BridgeResult<Arc<dyn SourceBuffer>> {
        self.mimes.lock().push(mime.to_string());
        Ok(Arc::clone(&self.buffer) as Arc<dyn SourceBuffer>)
    }

    fn end_of_stream(&self, error: Option<EndOfStreamError>) -> BridgeResult<()> {
        self.end_of_stream_calls.lock().push(error);
        *self.ready_state.lock() = ReadyState::Ended;
        if error.is_none() {
            self.finalized.send_replace(true);
        }
        Ok(())
    }
}

// ============================================================================
// Audio Element
// ============================================================================

#[derive(Default)]
struct ElementState {
    volume: f32,
    plays: usize,
    rewinds: usize,
    paused: bool,
    detached: bool,
}

pub struct MockAudioElement {
    source: Arc<MockMediaSource>,
    state: Arc<Mutex<ElementState>>,
    events: broadcast::Sender<MediaElementEvent>,
    auto_end: bool,
    reject_play: bool,
}

impl MockAudioElement {
    pub fn plays(&self) -> usize {
        self.state.lock().plays
    }

    pub fn rewinds(&self) -> usize {
        self.state.lock().rewinds
    }

    pub fn volume(&self) -> f32 {
        self.state.lock().volume
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    pub fn is_detached(&self) -> bool {
        self.state.lock().detached
    }

    pub fn emit_error(&self, message: &str) {
        let _ = self.events.send(MediaElementEvent::Error(message.to_string()));
    }
}

#[async_trait]
impl AudioElement for MockAudioElement {
    fn set_volume(&self, volume: f32) {
        self.state.lock().volume = volume;
    }

    async fn play(&self) -> BridgeResult<()> {
        if self.reject_play {
            return Err(BridgeError::OperationFailed(
                "play() request was interrupted".to_string(),
            ));
        }

        {
            let mut state = self.state.lock();
            state.plays += 1;
            state.paused = false;
        }

        if self.auto_end {
            let source = Arc::clone(&self.source);
            let state = Arc::clone(&self.state);
            let events = self.events.clone();
            core_async::spawn(async move {
                source.wait_finalized().await;
                core_async::sleep(Duration::from_millis(5)).await;
                let playing = {
                    let state = state.lock();
                    !state.paused && !state.detached
                };
                if playing {
                    let _ = events.send(MediaElementEvent::Ended);
                }
            });
        }
        Ok(())
    }

    fn pause(&self) {
        self.state.lock().paused = true;
    }

    fn rewind(&self) {
        self.state.lock().rewinds += 1;
    }

    fn detach(&self) {
        self.state.lock().detached = true;
    }

    fn subscribe(&self) -> broadcast::Receiver<MediaElementEvent> {
        self.events.subscribe()
    }
}

// ============================================================================
// Backend
// ============================================================================

#[derive(Default)]
pub struct MockBackendOptions {
    pub unsupported: bool,
    pub manual_end: bool,
    pub reject_play: bool,
    pub fail_append_at: Option<usize>,
}

pub struct MockBackend {
    options: MockBackendOptions,
    sources: Mutex<Vec<Arc<MockMediaSource>>>,
    elements: Mutex<Vec<Arc<MockAudioElement>>>,
    refuse_element: AtomicBool,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Self::with_options(MockBackendOptions::default())
    }

    pub fn with_options(options: MockBackendOptions) -> Arc<Self> {
        Arc::new(Self {
            options,
            sources: Mutex::new(Vec::new()),
            elements: Mutex::new(Vec::new()),
            refuse_element: AtomicBool::new(false),
        })
    }

    /// Make the next `create_audio_element` call fail.
    pub fn refuse_next_element(&self) {
        self.refuse_element.store(true, Ordering::SeqCst);
    }

    pub fn sources_created(&self) -> usize {
        self.sources.lock().len()
    }

    pub fn elements_created(&self) -> usize {
        self.elements.lock().len()
    }

    pub fn source(&self, index: usize) -> Arc<MockMediaSource> {
        Arc::clone(&self.sources.lock()[index])
    }

    pub fn element(&self, index: usize) -> Arc<MockAudioElement> {
        Arc::clone(&self.elements.lock()[index])
    }
}

impl MediaBackend for MockBackend {
    fn is_type_supported(&self, mime: &str) -> bool {
        !self.options.unsupported && mime == bridge_traits::AUDIO_MPEG
    }

    fn create_media_source(&self) -> BridgeResult<Arc<dyn MediaSource>> {
        let source = MockMediaSource::new(MockSourceBuffer::with_failure(
            self.options.fail_append_at,
        ));
        self.sources.lock().push(Arc::clone(&source));
        Ok(source as Arc<dyn MediaSource>)
    }

    fn create_audio_element(
        &self,
        _source: Arc<dyn MediaSource>,
    ) -> BridgeResult<Arc<dyn AudioElement>> {
        if self.refuse_element.swap(false, Ordering::SeqCst) {
            return Err(BridgeError::OperationFailed(
                "audio element unavailable".to_string(),
            ));
        }
        let source = self
            .sources
            .lock()
            .last()
            .cloned()
            .ok_or_else(|| BridgeError::InvalidState("no media source".to_string()))?;
        let (events, _) = broadcast::channel(16);
        let element = Arc::new(MockAudioElement {
            source,
            state: Arc::new(Mutex::new(ElementState::default())),
            events,
            auto_end: !self.options.manual_end,
            reject_play: self.options.reject_play,
        });
        self.elements.lock().push(Arc::clone(&element));
        Ok(element as Arc<dyn AudioElement>)
    }
}

// ============================================================================
// Streams & Observers
// ============================================================================

pub fn chunk_stream(chunks: &[&'static [u8]]) -> ChunkStream {
    let items: Vec<_> = chunks
        .iter()
        .map(|c| Ok::<_, BridgeError>(Bytes::from_static(c)))
        .collect();
    stream::iter(items).boxed()
}

/// Yields `chunks`, then an error.
pub fn failing_stream(chunks: &[&'static [u8]]) -> ChunkStream {
    let mut items: Vec<_> = chunks
        .iter()
        .map(|c| Ok::<_, BridgeError>(Bytes::from_static(c)))
        .collect();
    items.push(Err(BridgeError::OperationFailed(
        "connection reset".to_string(),
    )));
    stream::iter(items).boxed()
}

/// Yields `chunks`, then never ends.
pub fn stalled_stream(chunks: &[&'static [u8]]) -> ChunkStream {
    let items: Vec<_> = chunks
        .iter()
        .map(|c| Ok::<_, BridgeError>(Bytes::from_static(c)))
        .collect();
    stream::iter(items).chain(stream::pending()).boxed()
}

/// Stream wrapper that records when it is dropped.
pub struct DropProbe {
    inner: ChunkStream,
    dropped: Arc<AtomicBool>,
}

impl DropProbe {
    pub fn wrap(inner: ChunkStream) -> (ChunkStream, Arc<AtomicBool>) {
        let dropped = Arc::new(AtomicBool::new(false));
        let probe = Self {
            inner,
            dropped: Arc::clone(&dropped),
        };
        (probe.boxed(), dropped)
    }
}

impl Stream for DropProbe {
    type Item = BridgeResult<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl Drop for DropProbe {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}

/// Records every state change it observes, across sessions.
#[derive(Clone, Default)]
pub struct StateRecorder {
    seen: Arc<Mutex<Vec<(PlaybackSessionId, SessionState)>>>,
    count: Arc<AtomicUsize>,
}

impl StateRecorder {
    pub fn observer(&self) -> Arc<dyn SessionObserver> {
        Arc::new(self.clone())
    }

    pub fn all(&self) -> Vec<(PlaybackSessionId, SessionState)> {
        self.seen.lock().clone()
    }

    pub fn states_of(&self, id: PlaybackSessionId) -> Vec<SessionState> {
        self.seen
            .lock()
            .iter()
            .filter(|(sid, _)| *sid == id)
            .map(|(_, state)| state.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl SessionObserver for StateRecorder {
    fn on_state_change(&self, session_id: PlaybackSessionId, state: &SessionState) {
        self.seen.lock().push((session_id, state.clone()));
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Polls `check` on the paused clock until it holds.
pub async fn eventually<F>(what: &str, check: F)
where
    F: Fn() -> bool,
{
    for _ in 0..5_000 {
        if check() {
            return;
        }
        core_async::sleep(Duration::from_millis(1)).await;
    }
    panic!("timed out waiting for {}", what);
}
