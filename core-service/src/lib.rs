//! Core service façade and bootstrap helpers.
//!
//! This crate wires the host bridges carried by a
//! [`CoreConfig`](core_runtime::config::CoreConfig) into the playback engine,
//! the ambience workflow and the realtime conversation session, and exposes
//! them behind a single [`CoreService`] handle.

pub mod conversation;
pub mod credentials;
pub mod error;

pub use conversation::{ConversationConfig, ConversationSession};
pub use credentials::{CredentialKey, CredentialStore, Credentials};
pub use error::{Result, ServiceError};

use std::sync::Arc;

use core_ambience::{AmbienceConfig, AmbienceWorkflow};
use core_playback::{SessionRegistry, StreamingPlayer};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus};
use core_runtime::logging::{init_logging, LoggingConfig};
use core_async::sync::broadcast;
use tracing::{info, instrument};

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    config: Arc<CoreConfig>,
    events: EventBus,
    player: StreamingPlayer,
    credentials: CredentialStore,
    ambience: Option<Arc<AmbienceWorkflow>>,
    conversation: Option<Arc<ConversationSession>>,
}

impl CoreService {
    /// Build every component enabled by `config`.
    pub fn new(config: CoreConfig) -> Result<Self> {
        Self::with_ambience_config(config, AmbienceConfig::default())
    }

    /// Like [`CoreService::new`] with custom generation tunables.
    /// `enable_images` from the feature flags overrides `tunables.generate_images`.
    pub fn with_ambience_config(config: CoreConfig, tunables: AmbienceConfig) -> Result<Self> {
        config.validate()?;
        let features = config.features;

        let events = EventBus::new(config.event_buffer_size);

        let backend = Arc::clone(&config.media_backend);
        let player = if features.exclusive_playback {
            StreamingPlayer::exclusive(backend, SessionRegistry::new())
        } else {
            StreamingPlayer::new(backend)
        };
        let player = player.with_event_bus(events.clone());

        let credentials = CredentialStore::new(Arc::clone(&config.settings_store));

        let ambience = if features.enable_sound_effects {
            Some(Arc::new(build_ambience(
                &config,
                tunables.with_images(features.enable_images),
                player.clone(),
                events.clone(),
            )?))
        } else {
            None
        };

        let conversation = if features.enable_conversation {
            Some(Arc::new(build_conversation(
                &config,
                ambience.clone(),
                events.clone(),
            )?))
        } else {
            None
        };

        info!(
            images = features.enable_images,
            sound_effects = features.enable_sound_effects,
            exclusive_playback = features.exclusive_playback,
            conversation = features.enable_conversation,
            "Core service ready"
        );

        Ok(Self {
            config: Arc::new(config),
            events,
            player,
            credentials,
            ambience,
            conversation,
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<CoreEvent> {
        self.events.subscribe()
    }

    pub fn player(&self) -> &StreamingPlayer {
        &self.player
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// The ambience workflow, present when sound effects are enabled.
    pub fn ambience(&self) -> Option<&Arc<AmbienceWorkflow>> {
        self.ambience.as_ref()
    }

    /// The conversation session, present when conversation is enabled.
    pub fn conversation(&self) -> Option<&Arc<ConversationSession>> {
        self.conversation.as_ref()
    }

    /// Disconnect the conversation and release every registered session.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<()> {
        if let Some(conversation) = &self.conversation {
            if conversation.is_connected() {
                conversation.disconnect().await?;
            }
        }
        if let Some(ambience) = &self.ambience {
            ambience.stop_playback();
        }
        let released = self
            .player
            .registry()
            .map(|registry| registry.release_all())
            .unwrap_or(0);
        info!(released, "Core service shut down");
        Ok(())
    }
}

impl std::fmt::Debug for CoreService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreService")
            .field("features", &self.config.features)
            .field("player", &self.player)
            .field("ambience", &self.ambience.is_some())
            .field("conversation", &self.conversation.is_some())
            .finish()
    }
}

fn build_ambience(
    config: &CoreConfig,
    ambience: AmbienceConfig,
    player: StreamingPlayer,
    events: EventBus,
) -> Result<AmbienceWorkflow> {
    let text = required(config.text_generator.clone(), "TextGenerator")?;
    let sounds = required(config.sound_generator.clone(), "SoundEffectGenerator")?;

    let clock = Arc::clone(&config.clock);
    let mut workflow =
        AmbienceWorkflow::new(ambience, text, sounds, player, clock)?.with_event_bus(events);
    if let Some(images) = config.image_generator.clone() {
        workflow = workflow.with_image_generator(images);
    }
    Ok(workflow)
}

fn build_conversation(
    config: &CoreConfig,
    ambience: Option<Arc<AmbienceWorkflow>>,
    events: EventBus,
) -> Result<ConversationSession> {
    let channel = required(config.realtime_channel.clone(), "RealtimeChannel")?;
    let microphone = required(config.microphone.clone(), "MicrophoneSource")?;
    let output = required(config.audio_output.clone(), "AudioOutputSink")?;

    let mut session =
        ConversationSession::new(channel, microphone, output, ConversationConfig::default())
            .with_event_bus(events);
    if let Some(ambience) = ambience {
        session = session.with_ambience(ambience);
    }
    Ok(session)
}

fn required<T: ?Sized>(bridge: Option<Arc<T>>, capability: &str) -> Result<Arc<T>> {
    bridge.ok_or_else(|| ServiceError::CapabilityMissing {
        capability: capability.to_string(),
        message: format!("{} is required by an enabled feature", capability),
    })
}

/// Initialise logging and build the service.
///
/// The configured `LoggerSink`, if any, receives the mirrored log entries
/// unless `logging` already names a sink.
///
/// ```ignore
/// use core_runtime::logging::{LogFormat, LoggingConfig};
///
/// let logging = LoggingConfig::default().with_format(LogFormat::Json);
/// let core = core_service::bootstrap(config, logging)?;
/// let ambience = core.ambience().cloned();
/// ```
pub fn bootstrap(config: CoreConfig, mut logging: LoggingConfig) -> Result<CoreService> {
    if logging.logger_sink.is_none() {
        logging.logger_sink = config.logger_sink.clone();
    }
    init_logging(logging)?;
    CoreService::new(config)
}
