//! Fake host bridges for the service tests.
//!
//! The realtime fakes record every call in order so tests can assert the
//! connect and interruption sequences; the media and generator fakes are
//! just enough to let an ambience run start a playback session.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::{
    AudioElement, AudioOutputSink, BridgeError, ChunkStream, ConversationItem, EndOfStreamError,
    MediaBackend, MediaElementEvent, MediaSource, MicrophoneSource, PcmFrameStream, ReadyState,
    RealtimeChannel, RealtimeEvent, Role, SessionSettings, SoundEffectGenerator,
    SoundEffectRequest, SourceBuffer, SourceBufferEvent, TextGenerator, TextRequest, TrackOffset,
};
use bytes::Bytes;
use core_async::sync::{broadcast, mpsc};
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

type BridgeResult<T> = bridge_traits::error::Result<T>;

// ============================================================================
// Call log
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    MicBegin,
    MicRecord,
    MicPause,
    MicEnd,
    OutputConnect,
    OutputInterrupt,
    ChannelConnect,
    ChannelDisconnect,
    UpdateSession(SessionSettings),
    SendUserText(String),
    AppendAudio(usize),
    CreateResponse,
    CancelResponse(String, u64),
    DeleteItem(String),
}

#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    fn push(&self, call: Call) {
        self.0.lock().push(call);
    }

    pub fn all(&self) -> Vec<Call> {
        self.0.lock().clone()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.0.lock().iter().filter(|call| predicate(call)).count()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

// ============================================================================
// Realtime channel
// ============================================================================

pub struct FakeChannel {
    log: CallLog,
    connected: AtomicBool,
    events: broadcast::Sender<RealtimeEvent>,
}

impl FakeChannel {
    pub fn new(log: CallLog) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            log,
            connected: AtomicBool::new(false),
            events,
        })
    }

    /// Delivers an event to the session as the server would.
    pub fn deliver(&self, event: RealtimeEvent) {
        let _ = self.events.send(event);
    }

    pub fn update_item(&self, item: ConversationItem) {
        self.deliver(RealtimeEvent::ConversationUpdated {
            item,
            audio_delta: None,
        });
    }
}

#[async_trait]
impl RealtimeChannel for FakeChannel {
    async fn connect(&self) -> BridgeResult<()> {
        self.connected.store(true, Ordering::SeqCst);
        self.log.push(Call::ChannelConnect);
        Ok(())
    }

    async fn disconnect(&self) -> BridgeResult<()> {
        self.connected.store(false, Ordering::SeqCst);
        self.log.push(Call::ChannelDisconnect);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn update_session(&self, settings: SessionSettings) -> BridgeResult<()> {
        self.log.push(Call::UpdateSession(settings));
        Ok(())
    }

    async fn send_user_text(&self, text: &str) -> BridgeResult<()> {
        self.log.push(Call::SendUserText(text.to_string()));
        Ok(())
    }

    async fn append_input_audio(&self, pcm: Vec<i16>) -> BridgeResult<()> {
        self.log.push(Call::AppendAudio(pcm.len()));
        Ok(())
    }

    async fn create_response(&self) -> BridgeResult<()> {
        self.log.push(Call::CreateResponse);
        Ok(())
    }

    async fn cancel_response(&self, item_id: &str, sample_offset: u64) -> BridgeResult<()> {
        self.log
            .push(Call::CancelResponse(item_id.to_string(), sample_offset));
        Ok(())
    }

    async fn delete_item(&self, item_id: &str) -> BridgeResult<()> {
        self.log.push(Call::DeleteItem(item_id.to_string()));
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<RealtimeEvent> {
        self.events.subscribe()
    }
}

// ============================================================================
// Microphone
// ============================================================================

pub struct FakeMicrophone {
    log: CallLog,
    recording: AtomicBool,
    frames: Mutex<Option<mpsc::UnboundedSender<Vec<i16>>>>,
}

impl FakeMicrophone {
    pub fn new(log: CallLog) -> Arc<Self> {
        Arc::new(Self {
            log,
            recording: AtomicBool::new(false),
            frames: Mutex::new(None),
        })
    }

    /// Captures one frame. Returns false when nothing is recording.
    pub fn capture(&self, samples: usize) -> bool {
        match self.frames.lock().as_ref() {
            Some(sender) => sender.send(vec![0; samples]).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl MicrophoneSource for FakeMicrophone {
    async fn begin(&self) -> BridgeResult<()> {
        self.log.push(Call::MicBegin);
        Ok(())
    }

    async fn record(&self) -> BridgeResult<PcmFrameStream> {
        self.log.push(Call::MicRecord);
        let (sender, receiver) = mpsc::unbounded_channel();
        *self.frames.lock() = Some(sender);
        self.recording.store(true, Ordering::SeqCst);

        let frames = stream::unfold(receiver, |mut receiver| async move {
            receiver.recv().await.map(|frame| (frame, receiver))
        });
        Ok(frames.boxed())
    }

    async fn pause(&self) -> BridgeResult<()> {
        self.log.push(Call::MicPause);
        self.frames.lock().take();
        self.recording.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn end(&self) -> BridgeResult<()> {
        self.log.push(Call::MicEnd);
        self.frames.lock().take();
        self.recording.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_recording(&self) -> bool {
        self.recording.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Speech output
// ============================================================================

pub struct FakeOutput {
    log: CallLog,
    queued: Mutex<Vec<(String, usize)>>,
}

impl FakeOutput {
    pub fn new(log: CallLog) -> Arc<Self> {
        Arc::new(Self {
            log,
            queued: Mutex::new(Vec::new()),
        })
    }

    /// `(track_id, samples)` in queue order.
    pub fn queued(&self) -> Vec<(String, usize)> {
        self.queued.lock().clone()
    }
}

#[async_trait]
impl AudioOutputSink for FakeOutput {
    async fn connect(&self) -> BridgeResult<()> {
        self.log.push(Call::OutputConnect);
        Ok(())
    }

    fn add_pcm16(&self, track_id: &str, pcm: Vec<i16>) {
        self.queued.lock().push((track_id.to_string(), pcm.len()));
    }

    /// Cuts the last queued track at the number of samples queued for it.
    async fn interrupt(&self) -> BridgeResult<Option<TrackOffset>> {
        self.log.push(Call::OutputInterrupt);
        let mut queued = self.queued.lock();
        let offset = queued.last().map(|(track_id, _)| {
            let samples = queued
                .iter()
                .filter(|(id, _)| id == track_id)
                .map(|(_, len)| *len as u64)
                .sum();
            TrackOffset {
                track_id: track_id.clone(),
                offset: samples,
            }
        });
        queued.clear();
        Ok(offset)
    }
}

// ============================================================================
// Media host
// ============================================================================

struct InstantBuffer {
    updating: Arc<AtomicBool>,
    events: broadcast::Sender<SourceBufferEvent>,
}

impl SourceBuffer for InstantBuffer {
    fn updating(&self) -> bool {
        self.updating.load(Ordering::SeqCst)
    }

    fn append_buffer(&self, _chunk: Bytes) -> BridgeResult<()> {
        if self.updating.swap(true, Ordering::SeqCst) {
            return Err(BridgeError::InvalidState("busy".to_string()));
        }
        let updating = Arc::clone(&self.updating);
        let events = self.events.clone();
        core_async::spawn(async move {
            updating.store(false, Ordering::SeqCst);
            let _ = events.send(SourceBufferEvent::UpdateEnd);
        });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<SourceBufferEvent> {
        self.events.subscribe()
    }
}

struct StubSource {
    buffer: Arc<InstantBuffer>,
    ended: AtomicBool,
}

#[async_trait]
impl MediaSource for StubSource {
    async fn opened(&self) -> BridgeResult<()> {
        Ok(())
    }

    fn ready_state(&self) -> ReadyState {
        if self.ended.load(Ordering::SeqCst) {
            ReadyState::Ended
        } else {
            ReadyState::Open
        }
    }

    fn add_source_buffer(&self, _mime: &str) -> BridgeResult<Arc<dyn SourceBuffer>> {
        Ok(Arc::clone(&self.buffer) as Arc<dyn SourceBuffer>)
    }

    fn end_of_stream(&self, _error: Option<EndOfStreamError>) -> BridgeResult<()> {
        self.ended.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Plays until paused.
struct StubElement {
    events: broadcast::Sender<MediaElementEvent>,
}

#[async_trait]
impl AudioElement for StubElement {
    fn set_volume(&self, _volume: f32) {}

    async fn play(&self) -> BridgeResult<()> {
        Ok(())
    }

    fn pause(&self) {}

    fn rewind(&self) {}

    fn detach(&self) {}

    fn subscribe(&self) -> broadcast::Receiver<MediaElementEvent> {
        self.events.subscribe()
    }
}

#[derive(Default)]
pub struct StubBackend {
    sources: AtomicUsize,
}

impl StubBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sources_created(&self) -> usize {
        self.sources.load(Ordering::SeqCst)
    }
}

impl MediaBackend for StubBackend {
    fn is_type_supported(&self, mime: &str) -> bool {
        mime == bridge_traits::AUDIO_MPEG
    }

    fn create_media_source(&self) -> BridgeResult<Arc<dyn MediaSource>> {
        let (events, _) = broadcast::channel(16);
        self.sources.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(StubSource {
            buffer: Arc::new(InstantBuffer {
                updating: Arc::new(AtomicBool::new(false)),
                events,
            }),
            ended: AtomicBool::new(false),
        }))
    }

    fn create_audio_element(
        &self,
        _source: Arc<dyn MediaSource>,
    ) -> BridgeResult<Arc<dyn AudioElement>> {
        let (events, _) = broadcast::channel(16);
        Ok(Arc::new(StubElement { events }))
    }
}

// ============================================================================
// Generators
// ============================================================================

/// Answers every prompt with the same scene description.
#[derive(Default)]
pub struct SceneText {
    calls: AtomicUsize,
}

impl SceneText {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for SceneText {
    async fn generate(&self, _request: TextRequest) -> BridgeResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("Gentle rain on a tin roof".to_string())
    }
}

#[derive(Default)]
pub struct ClipSounds {
    calls: AtomicUsize,
}

impl ClipSounds {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SoundEffectGenerator for ClipSounds {
    async fn generate(&self, _request: SoundEffectRequest) -> BridgeResult<ChunkStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(stream::iter(vec![Ok::<_, BridgeError>(Bytes::from_static(b"rain"))]).boxed())
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub fn user(id: &str, text: &str) -> ConversationItem {
    ConversationItem::message(id, Role::User, text)
}

pub fn assistant(id: &str, text: &str) -> ConversationItem {
    ConversationItem::message(id, Role::Assistant, text)
}

/// Lets spawned work run to idle on the paused clock.
pub async fn settle() {
    core_async::sleep(core_async::Duration::from_millis(20)).await;
}
