//! # Conversation Session
//!
//! Wires the realtime speech channel to the microphone and the speech output
//! sink, keeps the transcript, and feeds transcript updates to the ambience
//! workflow.
//!
//! ```text
//!   MicrophoneSource ──frames──▶ RealtimeChannel ──events──▶ ConversationSession
//!                                                              │   │   │
//!                                   AudioOutputSink ◀──pcm─────┘   │   └──▶ AmbienceWorkflow
//!                                                                  └──▶ EventBus
//! ```
//!
//! In server VAD mode microphone frames are forwarded continuously. In
//! push-to-talk mode (`turn_detection = None`) frames are forwarded only
//! between `start_recording` and `stop_recording`.

use crate::error::{Result, ServiceError};
use bridge_traits::{
    AudioOutputSink, ConversationItem, MicrophoneSource, RealtimeChannel, RealtimeEvent,
    SessionSettings, TrackOffset, TurnDetection,
};
use core_ambience::{prompts, AmbienceWorkflow};
use core_async::sync::broadcast::error::RecvError;
use core_async::sync::CancellationToken;
use core_runtime::events::{ConversationEvent, CoreEvent, EventBus};
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Realtime session parameters.
#[derive(Debug, Clone)]
pub struct ConversationConfig {
    pub temperature: f32,
    pub input_transcription_model: Option<String>,
    pub turn_detection: Option<TurnDetection>,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.6,
            input_transcription_model: Some("whisper-1".to_string()),
            turn_detection: Some(TurnDetection::ServerVad),
        }
    }
}

#[derive(Default)]
struct SessionState {
    connected: bool,
    user_name: Option<String>,
    items: Vec<ConversationItem>,
    turn_detection: Option<TurnDetection>,
    listener: Option<CancellationToken>,
    forwarder: Option<CancellationToken>,
}

/// One realtime conversation with the assistant.
pub struct ConversationSession {
    channel: Arc<dyn RealtimeChannel>,
    microphone: Arc<dyn MicrophoneSource>,
    output: Arc<dyn AudioOutputSink>,
    ambience: Option<Arc<AmbienceWorkflow>>,
    events: Option<EventBus>,
    config: ConversationConfig,
    state: Mutex<SessionState>,
}

impl ConversationSession {
    pub fn new(
        channel: Arc<dyn RealtimeChannel>,
        microphone: Arc<dyn MicrophoneSource>,
        output: Arc<dyn AudioOutputSink>,
        config: ConversationConfig,
    ) -> Self {
        let state = SessionState {
            turn_detection: config.turn_detection,
            ..Default::default()
        };
        Self {
            channel,
            microphone,
            output,
            ambience: None,
            events: None,
            config,
            state: Mutex::new(state),
        }
    }

    pub fn with_ambience(mut self, ambience: Arc<AmbienceWorkflow>) -> Self {
        self.ambience = Some(ambience);
        self
    }

    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    /// Transcript items in arrival order.
    pub fn items(&self) -> Vec<ConversationItem> {
        self.state.lock().items.clone()
    }

    pub fn turn_detection(&self) -> Option<TurnDetection> {
        self.state.lock().turn_detection
    }

    pub fn is_forwarding(&self) -> bool {
        self.state.lock().forwarder.is_some()
    }

    fn settings(&self, user_name: &str, turn_detection: Option<TurnDetection>) -> SessionSettings {
        let first_name = user_name.split_whitespace().next().unwrap_or(user_name);
        SessionSettings {
            instructions: prompts::instructions(first_name),
            temperature: self.config.temperature,
            input_transcription_model: self.config.input_transcription_model.clone(),
            turn_detection,
        }
    }

    /// Connect microphone, speech output and realtime channel, then greet the
    /// assistant with the user's name.
    #[instrument(skip(self))]
    pub async fn connect(self: &Arc<Self>, user_name: &str) -> Result<()> {
        let user_name = user_name.trim();
        if user_name.is_empty() {
            return Err(ServiceError::MissingUserName);
        }

        if self.is_connected() {
            warn!("Conversation already connected");
            return Ok(());
        }

        self.microphone.begin().await?;
        self.output.connect().await?;
        self.channel.connect().await?;

        let turn_detection = self.turn_detection();
        self.channel
            .update_session(self.settings(user_name, turn_detection))
            .await?;

        let listener = CancellationToken::new();
        let events = self.channel.subscribe();
        {
            let mut state = self.state.lock();
            state.connected = true;
            state.user_name = Some(user_name.to_string());
            state.items.clear();
            state.listener = Some(listener.clone());
        }
        core_async::spawn(Arc::clone(self).listen(events, listener));

        self.channel
            .send_user_text(&format!("Hello! My name is {}.", user_name))
            .await?;

        if turn_detection == Some(TurnDetection::ServerVad) {
            self.start_forwarding().await?;
        }

        info!("Conversation connected");
        self.emit(ConversationEvent::Connected {
            user_name: user_name.to_string(),
        });
        Ok(())
    }

    /// Disconnect and reset the transcript, speech output and ambience.
    #[instrument(skip(self))]
    pub async fn disconnect(&self) -> Result<()> {
        let (listener, forwarder) = {
            let mut state = self.state.lock();
            state.connected = false;
            state.items.clear();
            (state.listener.take(), state.forwarder.take())
        };
        for token in [listener, forwarder].into_iter().flatten() {
            token.cancel();
        }

        if let Some(ambience) = &self.ambience {
            ambience.stop_playback();
            ambience.reset_image();
        }

        self.channel.disconnect().await?;
        self.microphone.end().await?;
        self.output.interrupt().await?;

        info!("Conversation disconnected");
        self.emit(ConversationEvent::Disconnected);
        Ok(())
    }

    /// Push-to-talk: cut the assistant off and start sending microphone audio.
    pub async fn start_recording(self: &Arc<Self>) -> Result<()> {
        self.require_push_to_talk()?;
        self.interrupt_output().await?;
        self.start_forwarding().await
    }

    /// Push-to-talk: stop sending microphone audio and ask for a response.
    pub async fn stop_recording(&self) -> Result<()> {
        self.require_push_to_talk()?;
        self.stop_forwarding();
        self.microphone.pause().await?;
        self.channel.create_response().await?;
        Ok(())
    }

    /// Delete a transcript item on the server and locally.
    ///
    /// Returns `false` when the transcript held no item with that id.
    #[instrument(skip(self))]
    pub async fn delete_item(&self, item_id: &str) -> Result<bool> {
        if !self.is_connected() {
            return Err(ServiceError::NotConnected);
        }

        self.channel.delete_item(item_id).await?;

        let removed = {
            let mut state = self.state.lock();
            let before = state.items.len();
            state.items.retain(|item| item.id != item_id);
            state.items.len() != before
        };

        debug!(removed, "Conversation item deleted");
        self.emit(ConversationEvent::ItemDeleted {
            item_id: item_id.to_string(),
        });
        Ok(removed)
    }

    /// Switch between server VAD and push-to-talk.
    pub async fn set_turn_detection(self: &Arc<Self>, mode: Option<TurnDetection>) -> Result<()> {
        let (connected, user_name) = {
            let mut state = self.state.lock();
            state.turn_detection = mode;
            (state.connected, state.user_name.clone().unwrap_or_default())
        };

        if mode.is_none() && self.microphone.is_recording() {
            self.stop_forwarding();
            self.microphone.pause().await?;
        }

        if !connected {
            return Ok(());
        }

        self.channel
            .update_session(self.settings(&user_name, mode))
            .await?;

        if mode == Some(TurnDetection::ServerVad) {
            self.start_forwarding().await?;
        }
        debug!(mode = ?mode, "Turn detection changed");
        Ok(())
    }

    fn require_push_to_talk(&self) -> Result<()> {
        let state = self.state.lock();
        if !state.connected {
            return Err(ServiceError::NotConnected);
        }
        if state.turn_detection.is_some() {
            return Err(ServiceError::InvalidState(
                "push-to-talk requires turn detection to be disabled".to_string(),
            ));
        }
        Ok(())
    }

    async fn start_forwarding(self: &Arc<Self>) -> Result<()> {
        if self.is_forwarding() {
            return Ok(());
        }

        let mut frames = self.microphone.record().await?;
        let token = CancellationToken::new();
        self.state.lock().forwarder = Some(token.clone());

        let channel = Arc::clone(&self.channel);
        core_async::spawn(async move {
            loop {
                let frame = core_async::select! {
                    biased;
                    _ = token.cancelled() => break,
                    frame = frames.next() => frame,
                };
                let Some(frame) = frame else { break };
                if let Err(e) = channel.append_input_audio(frame).await {
                    warn!(error = %e, "Failed to forward microphone audio");
                }
            }
            debug!("Microphone forwarding stopped");
        });
        Ok(())
    }

    fn stop_forwarding(&self) {
        if let Some(token) = self.state.lock().forwarder.take() {
            token.cancel();
        }
    }

    async fn interrupt_output(&self) -> Result<Option<TrackOffset>> {
        let offset = self.output.interrupt().await?;
        if let Some(TrackOffset { track_id, offset }) = &offset {
            self.channel.cancel_response(track_id, *offset).await?;
        }
        Ok(offset)
    }

    async fn listen(
        self: Arc<Self>,
        mut events: core_async::sync::broadcast::Receiver<RealtimeEvent>,
        token: CancellationToken,
    ) {
        loop {
            let event = core_async::select! {
                biased;
                _ = token.cancelled() => break,
                event = events.recv() => event,
            };

            match event {
                Ok(event) => self.handle_event(event).await,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Realtime events lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
        debug!("Realtime event listener stopped");
    }

    async fn handle_event(&self, event: RealtimeEvent) {
        match event {
            RealtimeEvent::ConversationUpdated { item, audio_delta } => {
                if let Some(pcm) = audio_delta {
                    self.output.add_pcm16(&item.id, pcm);
                }
                self.upsert(item);
            }
            RealtimeEvent::ConversationInterrupted => match self.interrupt_output().await {
                Ok(offset) => {
                    debug!(offset = ?offset, "Assistant interrupted");
                    self.emit(ConversationEvent::Interrupted {
                        item_id: offset.as_ref().map(|o| o.track_id.clone()),
                        sample_offset: offset.map(|o| o.offset),
                    });
                }
                Err(e) => warn!(error = %e, "Failed to interrupt assistant"),
            },
            RealtimeEvent::Error(message) => {
                error!(%message, "Realtime channel error");
                self.emit(ConversationEvent::Error { message });
            }
        }
    }

    fn upsert(&self, item: ConversationItem) {
        let item_id = item.id.clone();
        let role = item.role;
        let items = {
            let mut state = self.state.lock();
            match state.items.iter_mut().find(|existing| existing.id == item.id) {
                Some(existing) => *existing = item,
                None => state.items.push(item),
            }
            state.items.clone()
        };

        self.emit(ConversationEvent::ItemUpdated {
            item_id,
            role: format!("{:?}", role).to_lowercase(),
        });

        if let Some(ambience) = &self.ambience {
            ambience.trigger(items);
        }
    }

    fn emit(&self, event: ConversationEvent) {
        if let Some(bus) = &self.events {
            bus.emit(CoreEvent::Conversation(event)).ok();
        }
    }
}

impl std::fmt::Debug for ConversationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ConversationSession")
            .field("connected", &state.connected)
            .field("items", &state.items.len())
            .field("turn_detection", &state.turn_detection)
            .finish()
    }
}
