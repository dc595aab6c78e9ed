//! Minimal media host and clock for workflow tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::{
    AudioElement, BridgeError, ChunkStream, Clock, ConversationItem, EndOfStreamError,
    MediaBackend, MediaElementEvent, MediaSource, ReadyState, Role, SourceBuffer,
    SourceBufferEvent,
};
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use core_async::sync::broadcast;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2024, 10, 1, 9, 0, 0).unwrap()),
        })
    }

    pub fn advance_secs(&self, seconds: i64) {
        *self.now.lock() += chrono::Duration::seconds(seconds);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Buffer whose writes complete on the next scheduler turn.
pub struct InstantBuffer {
    updating: Arc<AtomicBool>,
    bytes: Arc<Mutex<Vec<u8>>>,
    events: broadcast::Sender<SourceBufferEvent>,
}

impl SourceBuffer for InstantBuffer {
    fn updating(&self) -> bool {
        self.updating.load(Ordering::SeqCst)
    }

    fn append_buffer(&self, chunk: Bytes) -> Result<()> {
        if self.updating.swap(true, Ordering::SeqCst) {
            return Err(BridgeError::InvalidState("busy".to_string()));
        }
        let updating = Arc::clone(&self.updating);
        let bytes = Arc::clone(&self.bytes);
        let events = self.events.clone();
        core_async::spawn(async move {
            bytes.lock().extend_from_slice(&chunk);
            updating.store(false, Ordering::SeqCst);
            let _ = events.send(SourceBufferEvent::UpdateEnd);
        });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<SourceBufferEvent> {
        self.events.subscribe()
    }
}

pub struct StubSource {
    buffer: Arc<InstantBuffer>,
    finalized: Mutex<Vec<Option<EndOfStreamError>>>,
}

#[async_trait]
impl MediaSource for StubSource {
    async fn opened(&self) -> Result<()> {
        Ok(())
    }

    fn ready_state(&self) -> ReadyState {
        if self.finalized.lock().is_empty() {
            ReadyState::Open
        } else {
            ReadyState::Ended
        }
    }

    fn add_source_buffer(&self, _mime: &str) -> Result<Arc<dyn SourceBuffer>> {
        Ok(Arc::clone(&self.buffer) as Arc<dyn SourceBuffer>)
    }

    fn end_of_stream(&self, error: Option<EndOfStreamError>) -> Result<()> {
        self.finalized.lock().push(error);
        Ok(())
    }
}

/// Element that plays until paused; it never reaches a natural end.
pub struct StubElement {
    events: broadcast::Sender<MediaElementEvent>,
    paused: AtomicBool,
}

#[async_trait]
impl AudioElement for StubElement {
    fn set_volume(&self, _volume: f32) {}

    async fn play(&self) -> Result<()> {
        self.paused.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    fn rewind(&self) {}

    fn detach(&self) {}

    fn subscribe(&self) -> broadcast::Receiver<MediaElementEvent> {
        self.events.subscribe()
    }
}

#[derive(Default)]
pub struct StubBackend {
    buffers: Mutex<Vec<Arc<InstantBuffer>>>,
    sessions: AtomicUsize,
}

impl StubBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sources_created(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }

    pub fn bytes(&self, index: usize) -> Vec<u8> {
        self.buffers.lock()[index].bytes.lock().clone()
    }
}

impl MediaBackend for StubBackend {
    fn is_type_supported(&self, mime: &str) -> bool {
        mime == bridge_traits::AUDIO_MPEG
    }

    fn create_media_source(&self) -> Result<Arc<dyn MediaSource>> {
        let (events, _) = broadcast::channel(16);
        let buffer = Arc::new(InstantBuffer {
            updating: Arc::new(AtomicBool::new(false)),
            bytes: Arc::new(Mutex::new(Vec::new())),
            events,
        });
        self.buffers.lock().push(Arc::clone(&buffer));
        self.sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(StubSource {
            buffer,
            finalized: Mutex::new(Vec::new()),
        }))
    }

    fn create_audio_element(&self, _source: Arc<dyn MediaSource>) -> Result<Arc<dyn AudioElement>> {
        let (events, _) = broadcast::channel(16);
        Ok(Arc::new(StubElement {
            events,
            paused: AtomicBool::new(false),
        }))
    }
}

pub fn clip(bytes: &'static [u8]) -> ChunkStream {
    stream::iter(vec![Ok::<_, BridgeError>(Bytes::from_static(bytes))]).boxed()
}

/// `[user, assistant, user, ...]` conversation of `len` items.
pub fn conversation(len: usize) -> Vec<ConversationItem> {
    (0..len)
        .map(|i| {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            ConversationItem::message(format!("item_{}", i), role, format!("message {}", i))
        })
        .collect()
}

/// Lets spawned work run to idle on the paused clock.
pub async fn settle() {
    core_async::sleep(core_async::Duration::from_millis(50)).await;
}
