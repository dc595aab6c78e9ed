use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("User name is required before starting a conversation")]
    MissingUserName,

    #[error("Conversation is not connected")]
    NotConnected,

    #[error("Invalid conversation state: {0}")]
    InvalidState(String),

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::error::BridgeError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Playback error: {0}")]
    Playback(#[from] core_playback::PlaybackError),

    #[error("Ambience error: {0}")]
    Ambience(#[from] core_ambience::AmbienceError),
}

pub type Result<T> = std::result::Result<T, ServiceError>;
