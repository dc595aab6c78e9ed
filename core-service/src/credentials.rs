//! Credential Storage
//!
//! API keys for the realtime voice, sound-effect and image services plus the
//! user's display name, persisted through the host [`SettingsStore`].
//!
//! Values are never logged; `Debug` output shows only a short prefix.
//!
//! ## Example
//!
//! ```no_run
//! use core_service::credentials::{CredentialKey, CredentialStore};
//! use std::sync::Arc;
//! # use bridge_traits::SettingsStore;
//! # async fn example(settings: Arc<dyn SettingsStore>) -> core_service::Result<()> {
//! let store = CredentialStore::new(settings);
//! store.save(CredentialKey::UserName, "Ada").await?;
//!
//! let credentials = store.load().await?;
//! let voice_key = credentials.require(CredentialKey::VoiceApiKey)?;
//! # Ok(())
//! # }
//! ```

use crate::error::{Result, ServiceError};
use bridge_traits::SettingsStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// A stored credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKey {
    VoiceApiKey,
    SoundApiKey,
    ImageApiKey,
    UserName,
}

impl CredentialKey {
    pub const ALL: [CredentialKey; 4] = [
        CredentialKey::VoiceApiKey,
        CredentialKey::SoundApiKey,
        CredentialKey::ImageApiKey,
        CredentialKey::UserName,
    ];

    /// Key under which the value is persisted.
    pub fn storage_key(&self) -> &'static str {
        match self {
            CredentialKey::VoiceApiKey => "tmp::voice_api_key",
            CredentialKey::SoundApiKey => "tmp::elevenlabs_api_key",
            CredentialKey::ImageApiKey => "tmp::fal_api_key",
            CredentialKey::UserName => "tmp::user_name",
        }
    }

    pub fn is_secret(&self) -> bool {
        !matches!(self, CredentialKey::UserName)
    }
}

impl fmt::Display for CredentialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.storage_key())
    }
}

/// Snapshot of stored credentials. Absent or empty values are `None`.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub voice_api_key: Option<String>,
    pub sound_api_key: Option<String>,
    pub image_api_key: Option<String>,
    pub user_name: Option<String>,
}

impl Credentials {
    pub fn get(&self, key: CredentialKey) -> Option<&str> {
        let value = match key {
            CredentialKey::VoiceApiKey => &self.voice_api_key,
            CredentialKey::SoundApiKey => &self.sound_api_key,
            CredentialKey::ImageApiKey => &self.image_api_key,
            CredentialKey::UserName => &self.user_name,
        };
        value.as_deref()
    }

    fn slot(&mut self, key: CredentialKey) -> &mut Option<String> {
        match key {
            CredentialKey::VoiceApiKey => &mut self.voice_api_key,
            CredentialKey::SoundApiKey => &mut self.sound_api_key,
            CredentialKey::ImageApiKey => &mut self.image_api_key,
            CredentialKey::UserName => &mut self.user_name,
        }
    }

    /// The value for `key`, or [`ServiceError::MissingCredential`].
    pub fn require(&self, key: CredentialKey) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| ServiceError::MissingCredential(key.storage_key().to_string()))
    }

    pub fn require_user_name(&self) -> Result<&str> {
        self.get(CredentialKey::UserName)
            .ok_or(ServiceError::MissingUserName)
    }

    /// First three characters followed by `...`, as shown next to a key.
    pub fn masked(&self, key: CredentialKey) -> Option<String> {
        self.get(key).map(mask)
    }
}

fn mask(value: &str) -> String {
    let prefix: String = value.chars().take(3).collect();
    format!("{}...", prefix)
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("voice_api_key", &self.masked(CredentialKey::VoiceApiKey))
            .field("sound_api_key", &self.masked(CredentialKey::SoundApiKey))
            .field("image_api_key", &self.masked(CredentialKey::ImageApiKey))
            .field("user_name", &self.user_name)
            .finish()
    }
}

/// Credential persistence over a [`SettingsStore`].
#[derive(Clone)]
pub struct CredentialStore {
    settings: Arc<dyn SettingsStore>,
}

impl CredentialStore {
    pub fn new(settings: Arc<dyn SettingsStore>) -> Self {
        Self { settings }
    }

    pub async fn load(&self) -> Result<Credentials> {
        let mut credentials = Credentials::default();
        for key in CredentialKey::ALL {
            *credentials.slot(key) = self
                .settings
                .get_string(key.storage_key())
                .await?
                .filter(|value| !value.is_empty());
        }
        debug!(credentials = ?credentials, "Loaded credentials");
        Ok(credentials)
    }

    /// Persist `value` under `key`. Empty values are ignored.
    pub async fn save(&self, key: CredentialKey, value: &str) -> Result<bool> {
        if value.is_empty() {
            return Ok(false);
        }
        self.settings.set_string(key.storage_key(), value).await?;
        debug!(key = %key, "Credential saved");
        Ok(true)
    }

    pub async fn remove(&self, key: CredentialKey) -> Result<()> {
        self.settings.delete(key.storage_key()).await?;
        Ok(())
    }

    /// Clear every stored value, then persist `value` under `key`.
    pub async fn reset(&self, key: CredentialKey, value: &str) -> Result<()> {
        self.settings.clear_all().await?;
        self.settings.set_string(key.storage_key(), value).await?;
        info!(key = %key, "Credentials reset");
        Ok(())
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore").finish()
    }
}
