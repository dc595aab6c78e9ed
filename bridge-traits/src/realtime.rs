//! Realtime conversation bridge traits.
//!
//! Covers the realtime speech channel, the microphone capture source, and the
//! PCM output sink used for streamed assistant speech.

use async_trait::async_trait;
use core_async::sync::broadcast;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::error::Result;

/// Sample rate of captured and played PCM16 audio.
pub const PCM_SAMPLE_RATE: u32 = 24_000;

/// Stream of mono PCM16 frames from the microphone.
pub type PcmFrameStream = Pin<Box<dyn Stream<Item = Vec<i16>> + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Message,
    FunctionCall,
    FunctionCallOutput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    InProgress,
    Completed,
    Incomplete,
}

/// One entry of the conversation transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationItem {
    pub id: String,
    pub role: Role,
    pub kind: ItemKind,
    pub status: ItemStatus,
    pub text: Option<String>,
    pub transcript: Option<String>,
}

impl ConversationItem {
    pub fn message(id: impl Into<String>, role: Role, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            kind: ItemKind::Message,
            status: ItemStatus::Completed,
            text: Some(text.into()),
            transcript: None,
        }
    }

    /// Transcript when present, otherwise the typed text.
    pub fn display_text(&self) -> Option<&str> {
        self.transcript
            .as_deref()
            .filter(|t| !t.is_empty())
            .or(self.text.as_deref())
    }
}

/// Turn detection mode of the realtime session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnDetection {
    ServerVad,
}

/// Session parameters pushed with `update_session`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    pub instructions: String,
    pub temperature: f32,
    pub input_transcription_model: Option<String>,
    /// `None` means push-to-talk.
    pub turn_detection: Option<TurnDetection>,
}

/// Events delivered by the realtime channel.
#[derive(Debug, Clone, PartialEq)]
pub enum RealtimeEvent {
    /// An item was created or updated, optionally with a new audio delta.
    ConversationUpdated {
        item: ConversationItem,
        audio_delta: Option<Vec<i16>>,
    },
    /// The user started speaking over the assistant.
    ConversationInterrupted,
    Error(String),
}

/// Position of the output sink when it was interrupted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackOffset {
    pub track_id: String,
    pub offset: u64,
}

/// Bidirectional realtime speech channel.
#[async_trait]
pub trait RealtimeChannel: Send + Sync {
    async fn connect(&self) -> Result<()>;

    async fn disconnect(&self) -> Result<()>;

    fn is_connected(&self) -> bool;

    async fn update_session(&self, settings: SessionSettings) -> Result<()>;

    async fn send_user_text(&self, text: &str) -> Result<()>;

    async fn append_input_audio(&self, pcm: Vec<i16>) -> Result<()>;

    async fn create_response(&self) -> Result<()>;

    /// Cancels the in-flight response, truncating `item_id` at `sample_offset`.
    async fn cancel_response(&self, item_id: &str, sample_offset: u64) -> Result<()>;

    /// Removes `item_id` from the server-side conversation.
    async fn delete_item(&self, item_id: &str) -> Result<()>;

    fn subscribe(&self) -> broadcast::Receiver<RealtimeEvent>;
}

/// Microphone capture source producing PCM16 at [`PCM_SAMPLE_RATE`].
#[async_trait]
pub trait MicrophoneSource: Send + Sync {
    /// Requests capture permission and opens the device.
    async fn begin(&self) -> Result<()>;

    /// Starts recording and returns the frame stream.
    async fn record(&self) -> Result<PcmFrameStream>;

    async fn pause(&self) -> Result<()>;

    async fn end(&self) -> Result<()>;

    fn is_recording(&self) -> bool;
}

/// Output sink for streamed PCM16 speech.
#[async_trait]
pub trait AudioOutputSink: Send + Sync {
    async fn connect(&self) -> Result<()>;

    /// Queues PCM for the track identified by `track_id`.
    fn add_pcm16(&self, track_id: &str, pcm: Vec<i16>);

    /// Stops output; returns where the current track was cut, if any.
    async fn interrupt(&self) -> Result<Option<TrackOffset>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_text_prefers_transcript() {
        let mut item = ConversationItem::message("item_1", Role::User, "typed");
        assert_eq!(item.display_text(), Some("typed"));

        item.transcript = Some("spoken".to_string());
        assert_eq!(item.display_text(), Some("spoken"));

        item.transcript = Some(String::new());
        assert_eq!(item.display_text(), Some("typed"));
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }
}
